use chrono::{DateTime, Local, NaiveDate};
use focusguard_common::{DailyStatistics, MonitoredApp};
use focusguard_db::queries::daily_statistics::{StatCounter, StatGauge};
use focusguard_db::queries::{DailyStatisticsQueries, MonitoredAppQueries};
use focusguard_db::{Database, Result};
use tracing::{debug, warn};

use crate::usage_sampler::local_midnight;
use crate::usage_source::UsageQuery;

pub const DEFAULT_RECENT_DAYS: u32 = 7;

/// Per-date counters. Every operation targets today's local date and creates
/// the row on first use.
#[derive(Clone)]
pub struct StatisticsAggregator {
    database: Database,
}

impl StatisticsAggregator {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub async fn ensure_today(&self) -> Result<DailyStatistics> {
        DailyStatisticsQueries::ensure(&self.database, Self::today()).await
    }

    pub async fn increment_problems_solved(&self) -> Result<()> {
        self.increment(StatCounter::ProblemsSolved).await
    }

    pub async fn increment_problems_attempted(&self) -> Result<()> {
        self.increment(StatCounter::ProblemsAttempted).await
    }

    pub async fn increment_breaks_taken(&self) -> Result<()> {
        self.increment(StatCounter::BreaksTaken).await
    }

    pub async fn increment_apps_blocked(&self) -> Result<()> {
        self.increment(StatCounter::AppsBlocked).await
    }

    pub async fn set_screen_time(&self, minutes: u32) -> Result<()> {
        DailyStatisticsQueries::set(&self.database, Self::today(), StatGauge::ScreenTime, minutes)
            .await
    }

    pub async fn set_time_saved(&self, minutes: u32) -> Result<()> {
        DailyStatisticsQueries::set(&self.database, Self::today(), StatGauge::TimeSaved, minutes)
            .await
    }

    pub async fn today_statistics(&self) -> Result<DailyStatistics> {
        self.ensure_today().await
    }

    /// Most recent days first.
    pub async fn recent(&self, days: u32) -> Result<Vec<DailyStatistics>> {
        DailyStatisticsQueries::list_recent(&self.database, days).await
    }

    pub async fn reset_today(&self) -> Result<()> {
        DailyStatisticsQueries::reset(&self.database, Self::today()).await
    }

    async fn increment(&self, counter: StatCounter) -> Result<()> {
        debug!("Incrementing {:?} for {}", counter, Self::today());
        DailyStatisticsQueries::increment(&self.database, Self::today(), counter).await
    }
}

/// Half of every minute spent beyond a limit, summed over apps.
pub fn estimate_time_saved(apps: &[MonitoredApp]) -> u32 {
    let overage: u64 = apps.iter().map(|app| u64::from(app.overage_minutes())).sum();
    u32::try_from(overage / 2).unwrap_or(u32::MAX)
}

/// Pushes today's screen time and time saved into the statistics row.
pub async fn refresh_daily_totals(
    statistics: &StatisticsAggregator,
    database: &Database,
    usage: &dyn UsageQuery,
    now: DateTime<Local>,
) {
    match usage.query_total_foreground_time(local_midnight(now), now).await {
        Ok(total) => {
            let minutes = u32::try_from(total.as_secs() / 60).unwrap_or(u32::MAX);
            if let Err(e) = statistics.set_screen_time(minutes).await {
                warn!("Failed to store screen time: {}", e);
            }
        }
        Err(e) => warn!("Failed to measure screen time: {}", e),
    }

    match MonitoredAppQueries::list_enabled(database).await {
        Ok(apps) => {
            if let Err(e) = statistics.set_time_saved(estimate_time_saved(&apps)).await {
                warn!("Failed to store time saved: {}", e);
            }
        }
        Err(e) => warn!("Failed to load apps for time saved: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(limit: u32, usage: u32) -> MonitoredApp {
        let mut app = MonitoredApp::new("org.example.App", "App", limit);
        app.current_usage_minutes = usage;
        app
    }

    #[test]
    fn test_time_saved_counts_only_overage() {
        assert_eq!(estimate_time_saved(&[]), 0);
        assert_eq!(estimate_time_saved(&[app(30, 10)]), 0);
        assert_eq!(estimate_time_saved(&[app(30, 40)]), 5);
        assert_eq!(estimate_time_saved(&[app(30, 41), app(60, 60), app(10, 20)]), 10);
    }
}
