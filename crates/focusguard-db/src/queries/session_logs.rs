use crate::connection::Database;
use crate::error::Result;
use crate::models::{DbSessionLog, NewSessionLog};

pub struct SessionLogQueries;

impl SessionLogQueries {
    pub async fn insert(db: &Database, log: &NewSessionLog) -> Result<i64> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            INSERT INTO app_session_logs (package_id, session_start_ms, session_end_ms, duration_ms, date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.package_id)
        .bind(log.session_start_ms)
        .bind(log.session_end_ms)
        .bind(log.duration_ms())
        .bind(log.date)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Milliseconds of `package_id` sessions overlapping `[start_ms, end_ms)`.
    pub async fn foreground_ms_for_package(
        db: &Database,
        package_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<i64> {
        let pool = db.pool()?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(MAX(0, MIN(session_end_ms, ?) - MAX(session_start_ms, ?))), 0)
            FROM app_session_logs
            WHERE package_id = ? AND session_end_ms > ? AND session_start_ms < ?
            "#,
        )
        .bind(end_ms)
        .bind(start_ms)
        .bind(package_id)
        .bind(start_ms)
        .bind(end_ms)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    /// Milliseconds of all sessions overlapping `[start_ms, end_ms)`.
    pub async fn foreground_ms_total(db: &Database, start_ms: i64, end_ms: i64) -> Result<i64> {
        let pool = db.pool()?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(MAX(0, MIN(session_end_ms, ?) - MAX(session_start_ms, ?))), 0)
            FROM app_session_logs
            WHERE session_end_ms > ? AND session_start_ms < ?
            "#,
        )
        .bind(end_ms)
        .bind(start_ms)
        .bind(start_ms)
        .bind(end_ms)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    pub async fn list_for_package(db: &Database, package_id: &str) -> Result<Vec<DbSessionLog>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbSessionLog>(
            "SELECT * FROM app_session_logs WHERE package_id = ? ORDER BY session_start_ms",
        )
        .bind(package_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Drops sessions that ended before `before_ms`. Returns the number removed.
    pub async fn prune_before(db: &Database, before_ms: i64) -> Result<u64> {
        let pool = db.pool()?;

        let result = sqlx::query("DELETE FROM app_session_logs WHERE session_end_ms < ?")
            .bind(before_ms)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
