use anyhow::Result;
use focusguard_common::{format_minutes, DailyStatistics};

use super::connect;

pub async fn show() -> Result<()> {
    let proxy = connect().await?;

    let state: serde_json::Value = serde_json::from_str(&proxy.get_engine_state().await?)?;
    let today: DailyStatistics = serde_json::from_str(&proxy.get_today_statistics().await?)?;

    println!("FocusGuard Status");
    println!("=================");
    println!();
    println!("Engine: {}", describe_state(&state));
    println!();
    println!("Today ({}):", today.date);
    println!("  Screen time:   {}", format_minutes(today.total_screen_time_minutes.into()));
    println!("  Apps blocked:  {}", today.apps_blocked);
    println!("  Problems:      {} solved of {}", today.problems_solved, today.problems_attempted);
    println!("  Breaks taken:  {}", today.breaks_taken);
    println!("  Time saved:    {}", format_minutes(today.time_saved_minutes.into()));

    Ok(())
}

fn describe_state(state: &serde_json::Value) -> String {
    let app = state["app_name"].as_str().unwrap_or("unknown");
    match state["state"].as_str() {
        Some("blocking") => format!("blocking {}", app),
        Some("challenge_presented") => format!(
            "blocking {}, waiting for an answer to {} ({}s)",
            app,
            state["question"].as_str().unwrap_or("?"),
            state["time_limit_secs"].as_u64().unwrap_or(0)
        ),
        _ => "idle".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_state() {
        assert_eq!(describe_state(&json!({ "state": "idle" })), "idle");
        assert_eq!(
            describe_state(&json!({ "state": "blocking", "app_name": "Focus" })),
            "blocking Focus"
        );
        let challenge = json!({
            "state": "challenge_presented",
            "app_name": "Focus",
            "question": "14 × 7 = ?",
            "time_limit_secs": 45
        });
        assert_eq!(
            describe_state(&challenge),
            "blocking Focus, waiting for an answer to 14 × 7 = ? (45s)"
        );
    }
}
