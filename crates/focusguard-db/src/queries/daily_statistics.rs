use crate::connection::Database;
use crate::error::Result;
use crate::models::DbDailyStatistics;
use chrono::{NaiveDate, Utc};
use focusguard_common::DailyStatistics;

/// Counters that only ever grow by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCounter {
    ProblemsSolved,
    ProblemsAttempted,
    BreaksTaken,
    AppsBlocked,
}

impl StatCounter {
    fn column(&self) -> &'static str {
        match self {
            StatCounter::ProblemsSolved => "problems_solved",
            StatCounter::ProblemsAttempted => "problems_attempted",
            StatCounter::BreaksTaken => "breaks_taken",
            StatCounter::AppsBlocked => "apps_blocked",
        }
    }
}

/// Values that are overwritten on every refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatGauge {
    ScreenTime,
    TimeSaved,
}

impl StatGauge {
    fn column(&self) -> &'static str {
        match self {
            StatGauge::ScreenTime => "total_screen_time_minutes",
            StatGauge::TimeSaved => "time_saved_minutes",
        }
    }
}

pub struct DailyStatisticsQueries;

impl DailyStatisticsQueries {
    /// Returns the record for `date`, creating an empty one if absent.
    pub async fn ensure(db: &Database, date: NaiveDate) -> Result<DailyStatistics> {
        let pool = db.pool()?;

        sqlx::query("INSERT OR IGNORE INTO daily_statistics (date, last_updated) VALUES (?, ?)")
            .bind(date)
            .bind(Utc::now())
            .execute(pool)
            .await?;

        let row = sqlx::query_as::<_, DbDailyStatistics>(
            "SELECT * FROM daily_statistics WHERE date = ?",
        )
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find(db: &Database, date: NaiveDate) -> Result<Option<DailyStatistics>> {
        let pool = db.pool()?;

        let row = sqlx::query_as::<_, DbDailyStatistics>(
            "SELECT * FROM daily_statistics WHERE date = ?",
        )
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(DailyStatistics::from))
    }

    /// Adds one to `counter`, creating the day's record on first use.
    pub async fn increment(db: &Database, date: NaiveDate, counter: StatCounter) -> Result<()> {
        let pool = db.pool()?;
        let column = counter.column();

        let sql = format!(
            "INSERT INTO daily_statistics (date, {column}, last_updated) VALUES (?, 1, ?) \
             ON CONFLICT(date) DO UPDATE SET {column} = {column} + 1, last_updated = excluded.last_updated"
        );

        sqlx::query(&sql).bind(date).bind(Utc::now()).execute(pool).await?;

        Ok(())
    }

    /// Overwrites `gauge`. Writing the value already stored changes nothing.
    pub async fn set(db: &Database, date: NaiveDate, gauge: StatGauge, minutes: u32) -> Result<()> {
        let pool = db.pool()?;
        let column = gauge.column();

        let sql = format!(
            "INSERT INTO daily_statistics (date, {column}, last_updated) VALUES (?, ?, ?) \
             ON CONFLICT(date) DO UPDATE SET {column} = excluded.{column}, last_updated = excluded.last_updated \
             WHERE {column} != excluded.{column}"
        );

        sqlx::query(&sql)
            .bind(date)
            .bind(i64::from(minutes))
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn list_recent(db: &Database, limit: u32) -> Result<Vec<DailyStatistics>> {
        let pool = db.pool()?;

        let rows = sqlx::query_as::<_, DbDailyStatistics>(
            "SELECT * FROM daily_statistics ORDER BY date DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(DailyStatistics::from).collect())
    }

    pub async fn reset(db: &Database, date: NaiveDate) -> Result<()> {
        let pool = db.pool()?;

        sqlx::query(
            r#"
            INSERT INTO daily_statistics (date, last_updated) VALUES (?, ?)
            ON CONFLICT(date) DO UPDATE SET
                total_screen_time_minutes = 0,
                problems_solved = 0,
                problems_attempted = 0,
                breaks_taken = 0,
                time_saved_minutes = 0,
                apps_blocked = 0,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(date)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }
}
