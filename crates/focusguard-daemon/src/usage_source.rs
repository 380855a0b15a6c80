use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use focusguard_db::queries::SessionLogQueries;
use focusguard_db::{Database, DbError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use crate::session_recorder::SharedRecorder;

#[derive(Debug, Error)]
pub enum UsageQueryError {
    #[error("usage access unavailable: {0}")]
    AccessUnavailable(String),

    #[error("usage query failed for {package}: {reason}")]
    Query { package: String, reason: String },

    #[error("usage store error: {0}")]
    Store(#[from] DbError),
}

/// Foreground-time source the sampler measures against.
#[async_trait]
pub trait UsageQuery: Send + Sync {
    /// Fails when usage data cannot be read at all.
    async fn check_access(&self) -> Result<(), UsageQueryError>;

    async fn query_foreground_time(
        &self,
        package_id: &str,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError>;

    async fn query_total_foreground_time(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError>;
}

/// Usage measured from recorded focus sessions plus the one still open.
/// Access is unavailable while the focus source cannot observe a compositor.
pub struct SessionLogUsage {
    database: Database,
    recorder: SharedRecorder,
    observable: watch::Receiver<bool>,
}

impl SessionLogUsage {
    pub fn new(
        database: Database,
        recorder: SharedRecorder,
        observable: watch::Receiver<bool>,
    ) -> Self {
        Self { database, recorder, observable }
    }

    async fn open_overlap_ms(&self, package_id: Option<&str>, start_ms: i64, end_ms: i64) -> i64 {
        let recorder = self.recorder.read().await;
        match recorder.open_session() {
            Some((open, started_at)) if package_id.map_or(true, |p| p == open) => {
                overlap_ms(started_at.timestamp_millis(), Utc::now().timestamp_millis(), start_ms, end_ms)
            }
            _ => 0,
        }
    }
}

#[async_trait]
impl UsageQuery for SessionLogUsage {
    async fn check_access(&self) -> Result<(), UsageQueryError> {
        if !*self.observable.borrow() {
            return Err(UsageQueryError::AccessUnavailable(
                "no compositor is reporting focus changes".to_string(),
            ));
        }

        self.database
            .pool()
            .map(|_| ())
            .map_err(|e| UsageQueryError::AccessUnavailable(e.to_string()))
    }

    async fn query_foreground_time(
        &self,
        package_id: &str,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError> {
        let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());
        let logged =
            SessionLogQueries::foreground_ms_for_package(&self.database, package_id, start_ms, end_ms)
                .await
                .map_err(|e| UsageQueryError::Query {
                    package: package_id.to_string(),
                    reason: e.to_string(),
                })?;
        let open = self.open_overlap_ms(Some(package_id), start_ms, end_ms).await;

        Ok(millis(logged + open))
    }

    async fn query_total_foreground_time(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Duration, UsageQueryError> {
        let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());
        let logged = SessionLogQueries::foreground_ms_total(&self.database, start_ms, end_ms).await?;
        let open = self.open_overlap_ms(None, start_ms, end_ms).await;

        Ok(millis(logged + open))
    }
}

/// Length of the intersection of `[a_start, a_end)` and `[b_start, b_end)`.
pub fn overlap_ms(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> i64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0)
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}
