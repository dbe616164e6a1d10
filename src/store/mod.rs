//! Persistence for users and tweets.
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is the PostgreSQL
//! implementation used by the server; tests can substitute their own.
//!
//! All consistency rules (unique usernames and emails, tweets referencing an
//! existing user, cascading deletes) are enforced by the backend's constraints.
//! Implementations report violations as [`StoreError`] variants rather than
//! checking them in application code.

mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;

pub use postgres::{PgStore, SCHEMA};

/// Number of tweets returned by the feed.
pub const FEED_LIMIT: u32 = 50;

/// A registered user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A tweet joined with its author's username, as shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FeedTweet {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// Data access contract for users and tweets.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Create the `users` and `tweets` relations if they do not exist.
    ///
    /// Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert a user and return its generated identifier.
    ///
    /// Fails with [`StoreError::Conflict`] when the username or email is taken.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, StoreError>;

    /// Look up a user by email.
    ///
    /// Fails with [`StoreError::NotFound`] when no user has that email.
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Insert a tweet owned by `user_id` and return its generated identifier.
    ///
    /// Fails with [`StoreError::UnknownUser`] when `user_id` does not exist.
    async fn create_tweet(&self, user_id: i64, content: &str) -> Result<i64, StoreError>;

    /// The newest `limit` tweets across all users, newest first.
    async fn list_recent_tweets(&self, limit: u32) -> Result<Vec<FeedTweet>, StoreError>;
}
