use anyhow::Result;
use focusguard_common::{format_minutes, MonitoredApp};

use super::{check_reply, connect};

pub async fn list() -> Result<()> {
    let proxy = connect().await?;

    let apps: Vec<MonitoredApp> = serde_json::from_str(&proxy.list_apps().await?)?;

    if apps.is_empty() {
        println!("No applications are monitored.");
        return Ok(());
    }

    println!("Monitored applications:");
    for app in &apps {
        println!("  {}", describe(app));
    }

    Ok(())
}

pub async fn add(package_id: &str, name: Option<&str>, limit: u32) -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.add_app(package_id, name.unwrap_or(package_id), limit).await?)?;
    println!("Monitoring {} with a daily limit of {}", package_id, format_minutes(limit.into()));

    Ok(())
}

pub async fn remove(package_id: &str) -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.remove_app(package_id).await?)?;
    println!("Stopped monitoring {}", package_id);

    Ok(())
}

pub async fn set_limit(package_id: &str, minutes: u32) -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.set_app_limit(package_id, minutes).await?)?;
    println!("Daily limit for {} set to {}", package_id, format_minutes(minutes.into()));

    Ok(())
}

pub async fn set_enabled(package_id: &str, enabled: bool) -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.set_app_enabled(package_id, enabled).await?)?;
    println!("{} {}", if enabled { "Enabled" } else { "Disabled" }, package_id);

    Ok(())
}

pub async fn reset_usage() -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.reset_all_usage().await?)?;
    println!("Usage reset for all applications");

    Ok(())
}

fn describe(app: &MonitoredApp) -> String {
    let state = if !app.enabled {
        " (disabled)"
    } else if app.is_over_limit() {
        " (limit reached)"
    } else {
        ""
    };

    format!(
        "{} [{}]: {} of {}{}",
        app.app_name,
        app.package_id,
        format_minutes(app.current_usage_minutes.into()),
        format_minutes(app.daily_limit_minutes.into()),
        state
    )
}
