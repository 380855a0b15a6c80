use anyhow::Result;
use focusguard_common::{format_minutes, DailyStatistics};

use super::{check_reply, connect};

pub async fn recent(days: u32) -> Result<()> {
    let proxy = connect().await?;

    let stats: Vec<DailyStatistics> =
        serde_json::from_str(&proxy.get_recent_statistics(days).await?)?;

    if stats.is_empty() {
        println!("No statistics recorded yet.");
        return Ok(());
    }

    println!("{:<12} {:>12} {:>8} {:>8} {:>10}", "Date", "Screen time", "Solved", "Breaks", "Saved");
    for day in &stats {
        println!("{}", summary_row(day));
    }

    Ok(())
}

pub async fn reset_today() -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.reset_today_statistics().await?)?;
    println!("Today's statistics were reset");

    Ok(())
}

pub fn summary_row(day: &DailyStatistics) -> String {
    format!(
        "{:<12} {:>12} {:>8} {:>8} {:>10}",
        day.date.format("%Y-%m-%d").to_string(),
        format_minutes(day.total_screen_time_minutes.into()),
        format!("{}/{}", day.problems_solved, day.problems_attempted),
        day.breaks_taken,
        format_minutes(day.time_saved_minutes.into()),
    )
}
