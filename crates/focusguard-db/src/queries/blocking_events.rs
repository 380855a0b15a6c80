use crate::connection::Database;
use crate::error::Result;
use crate::models::{DbBlockingEvent, NewBlockingEvent};
use chrono::NaiveDate;

pub struct BlockingEventQueries;

impl BlockingEventQueries {
    pub async fn insert(db: &Database, event: &NewBlockingEvent) -> Result<i64> {
        let pool = db.pool()?;

        let result = sqlx::query(
            r#"
            INSERT INTO blocking_events (
                package_id, app_name, blocked_at, action, problem_attempted,
                problem_solved, extra_time_earned_minutes, date
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.package_id)
        .bind(&event.app_name)
        .bind(event.blocked_at)
        .bind(event.action.as_str())
        .bind(event.problem_attempted)
        .bind(event.problem_solved)
        .bind(i64::from(event.extra_time_earned_minutes))
        .bind(event.date)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_for_date(db: &Database, date: NaiveDate) -> Result<Vec<DbBlockingEvent>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbBlockingEvent>(
            "SELECT * FROM blocking_events WHERE date = ? ORDER BY blocked_at, id",
        )
        .bind(date)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_package(db: &Database, package_id: &str) -> Result<Vec<DbBlockingEvent>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbBlockingEvent>(
            "SELECT * FROM blocking_events WHERE package_id = ? ORDER BY blocked_at, id",
        )
        .bind(package_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
