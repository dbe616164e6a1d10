//! Test utilities for integration tests.
//!
//! Provides an in-memory [`Store`] that enforces the same constraints as the
//! PostgreSQL schema, plus helpers for driving the router.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;

use microfeed::error::StoreError;
use microfeed::store::{FeedTweet, Store, User};
use microfeed::{create_router, RouterConfig};

/// Secret shared by the test router and tokens minted in tests.
pub const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

// =============================================================================
// In-Memory Store
// =============================================================================

struct TweetRow {
    id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tweets: Vec<TweetRow>,
}

/// In-memory store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
    schema_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn schema_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst)
    }

    /// Delete a user and, like `ON DELETE CASCADE`, their tweets.
    pub async fn delete_user(&self, user_id: i64) {
        let mut tables = self.tables.write().await;
        tables.users.retain(|u| u.id != user_id);
        tables.tweets.retain(|t| t.user_id != user_id);
    }

    pub async fn stored_password_hash(&self, email: &str) -> Option<String> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.password_hash.clone())
    }

    pub async fn tweet_count(&self) -> usize {
        self.tables.read().await.tweets.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "connection refused (simulated)".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.check_available()?;
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.username == username || u.email == email)
        {
            return Err(StoreError::Conflict);
        }

        let id = tables.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        tables.users.push(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;

        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_tweet(&self, user_id: i64, content: &str) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::UnknownUser);
        }

        let id = tables.tweets.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        tables.tweets.push(TweetRow {
            id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn list_recent_tweets(&self, limit: u32) -> Result<Vec<FeedTweet>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;

        let mut feed: Vec<FeedTweet> = tables
            .tweets
            .iter()
            .filter_map(|t| {
                let author = tables.users.iter().find(|u| u.id == t.user_id)?;
                Some(FeedTweet {
                    id: t.id,
                    user_id: t.user_id,
                    content: t.content.clone(),
                    created_at: t.created_at,
                    username: author.username.clone(),
                })
            })
            .collect();

        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        feed.truncate(limit as usize);

        Ok(feed)
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Router over `store` with a fast bcrypt cost and no request tracing.
pub fn test_router(store: MemoryStore) -> Router {
    create_router(
        store,
        RouterConfig::new(TEST_SECRET)
            .with_bcrypt_cost(4)
            .with_tracing(false),
    )
}

/// Build a JSON request, optionally with a bearer token.
pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less GET request, optionally with a bearer token.
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::empty()).unwrap()
}

/// Send a request and return the status and JSON body (`Null` if empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

/// Sign up a user and return the new id.
pub async fn signup(router: &Router, username: &str, email: &str, password: &str) -> i64 {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/signup",
            serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    body["id"].as_i64().unwrap()
}

/// Log in and return the bearer token.
pub async fn login(router: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/login",
            serde_json::json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Post a tweet and return the response status and body.
pub async fn post_tweet(router: &Router, token: &str, content: &str) -> (StatusCode, Value) {
    send(
        router,
        json_request(
            Method::POST,
            "/tweets",
            serde_json::json!({ "content": content }),
            Some(token),
        ),
    )
    .await
}
