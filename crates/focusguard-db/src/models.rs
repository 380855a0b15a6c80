use chrono::{DateTime, NaiveDate, Utc};
use focusguard_common::{AppSession, BlockingAction, DailyStatistics, MonitoredApp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{DbError, Result};

fn to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMonitoredApp {
    pub package_id: String,
    pub app_name: String,
    pub daily_limit_minutes: i64,
    pub current_usage_minutes: i64,
    pub enabled: bool,
    pub last_reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbMonitoredApp> for MonitoredApp {
    fn from(row: DbMonitoredApp) -> Self {
        MonitoredApp {
            package_id: row.package_id,
            app_name: row.app_name,
            daily_limit_minutes: to_u32(row.daily_limit_minutes),
            current_usage_minutes: to_u32(row.current_usage_minutes),
            enabled: row.enabled,
            last_reset_at: row.last_reset_at,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbDailyStatistics {
    pub date: NaiveDate,
    pub total_screen_time_minutes: i64,
    pub problems_solved: i64,
    pub problems_attempted: i64,
    pub breaks_taken: i64,
    pub time_saved_minutes: i64,
    pub apps_blocked: i64,
    pub last_updated: DateTime<Utc>,
}

impl From<DbDailyStatistics> for DailyStatistics {
    fn from(row: DbDailyStatistics) -> Self {
        DailyStatistics {
            date: row.date,
            total_screen_time_minutes: to_u32(row.total_screen_time_minutes),
            problems_solved: to_u32(row.problems_solved),
            problems_attempted: to_u32(row.problems_attempted),
            breaks_taken: to_u32(row.breaks_taken),
            time_saved_minutes: to_u32(row.time_saved_minutes),
            apps_blocked: to_u32(row.apps_blocked),
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSessionLog {
    pub id: i64,
    pub package_id: String,
    pub session_start_ms: i64,
    pub session_end_ms: i64,
    pub duration_ms: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewSessionLog {
    pub package_id: String,
    pub session_start_ms: i64,
    pub session_end_ms: i64,
    pub date: NaiveDate,
}

impl NewSessionLog {
    /// `date` is the local calendar date the session ended on.
    pub fn from_session(session: &AppSession, date: NaiveDate) -> Self {
        Self {
            package_id: session.package_id.clone(),
            session_start_ms: session.started_at.timestamp_millis(),
            session_end_ms: session.ended_at.timestamp_millis().max(session.started_at.timestamp_millis()),
            date,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.session_end_ms - self.session_start_ms).max(0)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbBlockingEvent {
    pub id: i64,
    pub package_id: String,
    pub app_name: String,
    pub blocked_at: DateTime<Utc>,
    pub action: String,
    pub problem_attempted: bool,
    pub problem_solved: bool,
    pub extra_time_earned_minutes: i64,
    pub date: NaiveDate,
}

impl DbBlockingEvent {
    pub fn action(&self) -> Result<BlockingAction> {
        self.action.parse::<BlockingAction>().map_err(DbError::from)
    }
}

#[derive(Debug, Clone)]
pub struct NewBlockingEvent {
    pub package_id: String,
    pub app_name: String,
    pub blocked_at: DateTime<Utc>,
    pub action: BlockingAction,
    pub problem_attempted: bool,
    pub problem_solved: bool,
    pub extra_time_earned_minutes: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
