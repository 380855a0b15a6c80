use chrono::{DateTime, Local, NaiveTime, Utc};
use focusguard_common::MonitoredApp;
use focusguard_db::queries::MonitoredAppQueries;
use focusguard_db::{Database, DbError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::usage_source::{UsageQuery, UsageQueryError};

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error(transparent)]
    Usage(#[from] UsageQueryError),

    #[error("store error: {0}")]
    Store(#[from] DbError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: usize,
    pub rolled_over: usize,
    pub skipped: usize,
}

enum AppRefresh {
    Unchanged,
    Updated,
    RolledOver,
}

/// Writes measured foreground minutes since local midnight into the app rows.
pub struct UsageSampler {
    database: Database,
    usage: Arc<dyn UsageQuery>,
    tick: Mutex<()>,
}

impl UsageSampler {
    pub fn new(database: Database, usage: Arc<dyn UsageQuery>) -> Self {
        Self { database, usage, tick: Mutex::new(()) }
    }

    pub fn usage_query(&self) -> Arc<dyn UsageQuery> {
        Arc::clone(&self.usage)
    }

    /// Periodic refresh of every enabled app.
    ///
    /// Returns `Ok(None)` without touching anything when a previous refresh is
    /// still running.
    pub async fn refresh(&self) -> Result<Option<RefreshReport>, SamplerError> {
        self.refresh_at(Local::now()).await
    }

    pub async fn refresh_at(
        &self,
        now: DateTime<Local>,
    ) -> Result<Option<RefreshReport>, SamplerError> {
        let Ok(_guard) = self.tick.try_lock() else {
            debug!("Usage refresh already in flight, skipping tick");
            return Ok(None);
        };

        self.usage.check_access().await?;

        let apps = MonitoredAppQueries::list_enabled(&self.database).await?;
        let mut report = RefreshReport::default();

        for app in &apps {
            match self.refresh_app(app, now).await {
                Ok(AppRefresh::Unchanged) => {}
                Ok(AppRefresh::Updated) => report.updated += 1,
                Ok(AppRefresh::RolledOver) => report.rolled_over += 1,
                Err(e) => {
                    warn!("Skipping usage refresh for {}: {}", app.package_id, e);
                    report.skipped += 1;
                }
            }
        }

        debug!(
            "Usage refresh: {} apps, {} updated, {} rolled over, {} skipped",
            apps.len(),
            report.updated,
            report.rolled_over,
            report.skipped
        );
        Ok(Some(report))
    }

    /// On-demand refresh of one app. Waits for an in-flight periodic refresh.
    pub async fn refresh_package(
        &self,
        package_id: &str,
    ) -> Result<Option<MonitoredApp>, SamplerError> {
        self.refresh_package_at(package_id, Local::now()).await
    }

    pub async fn refresh_package_at(
        &self,
        package_id: &str,
        now: DateTime<Local>,
    ) -> Result<Option<MonitoredApp>, SamplerError> {
        let _guard = self.tick.lock().await;

        self.usage.check_access().await?;

        let Some(app) = MonitoredAppQueries::find(&self.database, package_id).await? else {
            return Ok(None);
        };

        self.refresh_app(&app, now).await?;
        Ok(MonitoredAppQueries::find(&self.database, package_id).await?)
    }

    async fn refresh_app(
        &self,
        app: &MonitoredApp,
        now: DateTime<Local>,
    ) -> Result<AppRefresh, SamplerError> {
        let measured =
            self.usage.query_foreground_time(&app.package_id, local_midnight(now), now).await?;
        let minutes = whole_minutes(measured);

        if app.needs_daily_reset(now) {
            MonitoredAppQueries::update_usage(
                &self.database,
                &app.package_id,
                minutes,
                Some(now.with_timezone(&Utc)),
            )
            .await?;
            info!(
                "New day for {}: usage reset from {} to {} minutes",
                app.package_id, app.current_usage_minutes, minutes
            );
            return Ok(AppRefresh::RolledOver);
        }

        if app.current_usage_minutes == minutes {
            return Ok(AppRefresh::Unchanged);
        }

        MonitoredAppQueries::update_usage(&self.database, &app.package_id, minutes, None).await?;
        Ok(AppRefresh::Updated)
    }
}

/// Start of the local calendar day containing `now`.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or(now)
}

fn whole_minutes(duration: Duration) -> u32 {
    u32::try_from(duration.as_secs() / 60).unwrap_or(u32::MAX)
}
