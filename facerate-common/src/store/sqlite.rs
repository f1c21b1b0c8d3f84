//! SQLite backend
//!
//! Tables are created idempotently on connect. `(username, image)` is the
//! primary key of `ratings`, so an upsert is a single atomic statement and
//! concurrent writers for the same pair resolve last-writer-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{IdentityStore, RatingStore};
use crate::models::{Rating, Score};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`, e.g. `sqlite://ratings.db`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the tables if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_users_table(&pool).await?;
        create_ratings_table(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ratings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ratings (
            username TEXT NOT NULL,
            image TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 10),
            rated_at TEXT NOT NULL,
            PRIMARY KEY (username, image)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn exists(&self, username: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn create(&self, username: &str) -> Result<()> {
        let result = sqlx::query("INSERT INTO users (username) VALUES (?)")
            .bind(username)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::DuplicateUser(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RatingStore for SqliteStore {
    async fn ratings_for(&self, user: &str) -> Result<HashSet<String>> {
        let images: Vec<String> = sqlx::query_scalar("SELECT image FROM ratings WHERE username = ?")
            .bind(user)
            .fetch_all(&self.pool)
            .await?;

        Ok(images.into_iter().collect())
    }

    async fn upsert(&self, user: &str, image: &str, score: Score) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (username, image, rating, rated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (username, image)
            DO UPDATE SET rating = excluded.rating, rated_at = excluded.rated_at
            "#,
        )
        .bind(user)
        .bind(image)
        .bind(i64::from(score))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!("Stored rating {} for {} by {}", score, image, user);
        Ok(())
    }

    async fn rating(&self, user: &str, image: &str) -> Result<Option<Rating>> {
        let row = sqlx::query_as::<_, (String, String, i64, DateTime<Utc>)>(
            "SELECT username, image, rating, rated_at FROM ratings WHERE username = ? AND image = ?",
        )
        .bind(user)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(user, image, rating, rated_at)| {
            // CHECK constraint keeps stored values in range
            let score = Score::new(rating).map_err(|_| {
                Error::StoreUnavailable(format!("Corrupt rating {} for {}", rating, image))
            })?;
            Ok(Rating { user, image, score, rated_at })
        })
        .transpose()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
