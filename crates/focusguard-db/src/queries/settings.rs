use crate::connection::Database;
use crate::error::Result;
use chrono::Utc;

pub const DIFFICULTY_LEVEL: &str = "difficulty_level";

pub struct SettingsQueries;

impl SettingsQueries {
    pub async fn get(db: &Database, key: &str) -> Result<Option<String>> {
        let pool = db.pool()?;

        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        Ok(value)
    }

    pub async fn set(db: &Database, key: &str, value: &str) -> Result<()> {
        let pool = db.pool()?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete(db: &Database, key: &str) -> Result<bool> {
        let pool = db.pool()?;

        let result = sqlx::query("DELETE FROM settings WHERE key = ?").bind(key).execute(pool).await?;

        Ok(result.rows_affected() > 0)
    }
}
