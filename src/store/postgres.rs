//! PostgreSQL-backed implementation of [`Store`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use crate::error::StoreError;

use super::{FeedTweet, Store, User};

/// Idempotent schema for users and tweets.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id BIGSERIAL PRIMARY KEY,
  username VARCHAR(30) UNIQUE NOT NULL,
  email VARCHAR(255) UNIQUE NOT NULL,
  password_hash TEXT NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS tweets (
  id BIGSERIAL PRIMARY KEY,
  user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  content VARCHAR(280) NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_tweets_created_at ON tweets(created_at DESC);
"#;

/// [`Store`] over a pooled PostgreSQL connection.
///
/// Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// Fails with [`StoreError::Unavailable`] if no connection can be
    /// established within `connect_timeout`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Row counts of the `users` and `tweets` relations.
    pub async fn counts(&self) -> Result<(i64, i64), StoreError> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let tweets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, tweets))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("Schema ensured");
        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_tweet(&self, user_id: i64, content: &str) -> Result<i64, StoreError> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO tweets (user_id, content) VALUES ($1, $2) RETURNING id")
                .bind(user_id)
                .bind(content)
                .fetch_one(&self.pool)
                .await?;

        Ok(id)
    }

    async fn list_recent_tweets(&self, limit: u32) -> Result<Vec<FeedTweet>, StoreError> {
        let tweets = sqlx::query_as::<_, FeedTweet>(
            r#"
SELECT t.id, t.user_id, t.content, t.created_at, u.username
FROM tweets t
JOIN users u ON u.id = t.user_id
ORDER BY t.created_at DESC, t.id DESC
LIMIT $1
"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(tweets)
    }
}
