use crate::connection::Database;
use crate::error::{DbError, Result};
use crate::models::DbMonitoredApp;
use chrono::{DateTime, Utc};
use focusguard_common::MonitoredApp;
use tracing::debug;

pub struct MonitoredAppQueries;

impl MonitoredAppQueries {
    pub async fn create(db: &Database, app: &MonitoredApp) -> Result<MonitoredApp> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            INSERT INTO monitored_apps (
                package_id, app_name, daily_limit_minutes, current_usage_minutes,
                enabled, last_reset_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&app.package_id)
        .bind(&app.app_name)
        .bind(i64::from(app.daily_limit_minutes))
        .bind(i64::from(app.current_usage_minutes))
        .bind(app.enabled)
        .bind(app.last_reset_at)
        .bind(Utc::now())
        .execute(pool)
        .await;

        match result {
            Ok(_) => Self::get(db, &app.package_id).await,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DbError::Duplicate(
                format!("Application '{}' is already monitored", app.package_id),
            )),
            Err(e) => Err(DbError::Sqlx(e)),
        }
    }

    /// Insert or replace the whole row.
    pub async fn upsert(db: &Database, app: &MonitoredApp) -> Result<MonitoredApp> {
        let pool = db.pool()?;

        sqlx::query(
            r#"
            INSERT INTO monitored_apps (
                package_id, app_name, daily_limit_minutes, current_usage_minutes,
                enabled, last_reset_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(package_id) DO UPDATE SET
                app_name = excluded.app_name,
                daily_limit_minutes = excluded.daily_limit_minutes,
                current_usage_minutes = excluded.current_usage_minutes,
                enabled = excluded.enabled,
                last_reset_at = excluded.last_reset_at
            "#,
        )
        .bind(&app.package_id)
        .bind(&app.app_name)
        .bind(i64::from(app.daily_limit_minutes))
        .bind(i64::from(app.current_usage_minutes))
        .bind(app.enabled)
        .bind(app.last_reset_at)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(db, &app.package_id).await
    }

    pub async fn find(db: &Database, package_id: &str) -> Result<Option<MonitoredApp>> {
        let pool = db.pool()?;

        let row = sqlx::query_as::<_, DbMonitoredApp>(
            "SELECT * FROM monitored_apps WHERE package_id = ?",
        )
        .bind(package_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(MonitoredApp::from))
    }

    pub async fn get(db: &Database, package_id: &str) -> Result<MonitoredApp> {
        Self::find(db, package_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Application {} not monitored", package_id)))
    }

    pub async fn list_all(db: &Database) -> Result<Vec<MonitoredApp>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbMonitoredApp>(
            "SELECT * FROM monitored_apps ORDER BY app_name",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MonitoredApp::from).collect())
    }

    pub async fn list_enabled(db: &Database) -> Result<Vec<MonitoredApp>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbMonitoredApp>(
            "SELECT * FROM monitored_apps WHERE enabled = ? ORDER BY app_name",
        )
        .bind(true)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MonitoredApp::from).collect())
    }

    pub async fn list_at_limit(db: &Database) -> Result<Vec<MonitoredApp>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbMonitoredApp>(
            "SELECT * FROM monitored_apps WHERE enabled = ? AND current_usage_minutes >= daily_limit_minutes ORDER BY app_name",
        )
        .bind(true)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MonitoredApp::from).collect())
    }

    /// Writes only the usage columns so a concurrent limit grant is never overwritten.
    pub async fn update_usage(
        db: &Database,
        package_id: &str,
        usage_minutes: u32,
        last_reset_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let pool = db.pool()?;

        let result = match last_reset_at {
            Some(reset_at) => {
                sqlx::query(
                    "UPDATE monitored_apps SET current_usage_minutes = ?, last_reset_at = ? WHERE package_id = ?",
                )
                .bind(i64::from(usage_minutes))
                .bind(reset_at)
                .bind(package_id)
                .execute(pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE monitored_apps SET current_usage_minutes = ? WHERE package_id = ?",
                )
                .bind(i64::from(usage_minutes))
                .bind(package_id)
                .execute(pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Application {} not monitored", package_id)));
        }

        debug!("Usage for {} set to {} minutes", package_id, usage_minutes);
        Ok(())
    }

    /// Atomically raises the daily limit. Usage is left untouched.
    pub async fn grant_extra_time(
        db: &Database,
        package_id: &str,
        extra_minutes: u32,
    ) -> Result<MonitoredApp> {
        let pool = db.pool()?;

        let result = sqlx::query(
            "UPDATE monitored_apps SET daily_limit_minutes = daily_limit_minutes + ? WHERE package_id = ?",
        )
        .bind(i64::from(extra_minutes))
        .bind(package_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Application {} not monitored", package_id)));
        }

        Self::get(db, package_id).await
    }

    /// Explicit user edit; the only path that may lower a limit.
    pub async fn set_daily_limit(db: &Database, package_id: &str, minutes: u32) -> Result<()> {
        let pool = db.pool()?;

        let result =
            sqlx::query("UPDATE monitored_apps SET daily_limit_minutes = ? WHERE package_id = ?")
                .bind(i64::from(minutes))
                .bind(package_id)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Application {} not monitored", package_id)));
        }

        Ok(())
    }

    pub async fn set_enabled(db: &Database, package_id: &str, enabled: bool) -> Result<()> {
        let pool = db.pool()?;

        let result = sqlx::query("UPDATE monitored_apps SET enabled = ? WHERE package_id = ?")
            .bind(enabled)
            .bind(package_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Application {} not monitored", package_id)));
        }

        Ok(())
    }

    /// Removes the app together with its session logs and blocking events.
    /// Returns whether the app existed.
    pub async fn delete(db: &Database, package_id: &str) -> Result<bool> {
        let pool = db.pool()?;
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM app_session_logs WHERE package_id = ?")
            .bind(package_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM blocking_events WHERE package_id = ?")
            .bind(package_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM monitored_apps WHERE package_id = ?")
            .bind(package_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn reset_all_usage(db: &Database, reset_at: DateTime<Utc>) -> Result<u64> {
        let pool = db.pool()?;

        let result =
            sqlx::query("UPDATE monitored_apps SET current_usage_minutes = 0, last_reset_at = ?")
                .bind(reset_at)
                .execute(pool)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all(db: &Database) -> Result<u64> {
        let pool = db.pool()?;
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM app_session_logs").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM blocking_events").execute(&mut *tx).await?;
        let result = sqlx::query("DELETE FROM monitored_apps").execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
