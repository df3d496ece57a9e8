use crate::models::Theme;
use anyhow::Result;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Local preferences that outlive a session.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One connection so an in-memory database is shared by every query.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stored theme, or the default when unset or unreadable.
    pub async fn load_theme(&self) -> Result<Theme> {
        let stored = self.get_preference(Theme::PREFERENCE_KEY).await?;
        Ok(stored
            .as_deref()
            .and_then(Theme::parse)
            .unwrap_or_default())
    }

    pub async fn save_theme(&self, theme: Theme) -> Result<()> {
        self.set_preference(Theme::PREFERENCE_KEY, theme.as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> Store {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store.run_migrations().await.unwrap();
        store
    }

    #[tokio::test]
    async fn preferences_upsert() {
        let store = memory_store().await;
        assert_eq!(store.get_preference("theme").await.unwrap(), None);

        store.set_preference("theme", "dark").await.unwrap();
        store.set_preference("theme", "light").await.unwrap();
        assert_eq!(
            store.get_preference("theme").await.unwrap().as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn theme_round_trips_and_defaults() {
        let store = memory_store().await;
        assert_eq!(store.load_theme().await.unwrap(), Theme::Light);

        store.save_theme(Theme::Dark).await.unwrap();
        assert_eq!(store.load_theme().await.unwrap(), Theme::Dark);

        store.set_preference("theme", "sepia").await.unwrap();
        assert_eq!(store.load_theme().await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn migrations_are_repeatable() {
        let store = memory_store().await;
        store.save_theme(Theme::Dark).await.unwrap();
        store.run_migrations().await.unwrap();
        assert_eq!(store.load_theme().await.unwrap(), Theme::Dark);
    }
}
