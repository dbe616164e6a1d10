//! HTTP request handlers for the microfeed API.
//!
//! # Endpoints
//!
//! - `POST /signup` - Register a user
//! - `POST /login` - Exchange email and password for a bearer token
//! - `POST /tweets` - Post a tweet as the authenticated user (protected)
//! - `GET /feed` - Latest tweets across all users (protected)
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{PasswordHasher, TokenService, MAX_PASSWORD_BYTES};
use crate::error::{ApiError, StoreError};
use crate::store::{FeedTweet, Store, FEED_LIMIT};

use super::auth::AuthUser;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_CHARS: usize = 30;

/// Longest accepted email, in characters.
pub const MAX_EMAIL_CHARS: usize = 255;

/// Longest accepted tweet, in characters.
pub const MAX_TWEET_CHARS: usize = 280;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers via Axum's State extractor.
pub struct AppState<S: Store> {
    /// Backing store for users and tweets
    pub store: Arc<S>,

    /// Issues tokens at login
    pub tokens: TokenService,

    /// Hashes and verifies passwords
    pub hasher: PasswordHasher,
}

impl<S: Store> AppState<S> {
    /// Create application state over the given store.
    pub fn new(store: S, tokens: TokenService, hasher: PasswordHasher) -> Self {
        Self {
            store: Arc::new(store),
            tokens,
            hasher,
        }
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: self.tokens.clone(),
            hasher: self.hasher,
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// JSON request body extractor.
///
/// Parses the body as JSON whatever the `Content-Type`, and reports any
/// failure as a 400 [`ApiError::Validation`].
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;

        // The serde message can quote submitted values, passwords included.
        serde_json::from_slice(&body).map(JsonBody).map_err(|e| {
            debug!(
                category = ?e.classify(),
                line = e.line(),
                column = e.column(),
                "Rejecting malformed JSON body"
            );
            ApiError::Validation("bad request".to_string())
        })
    }
}

/// Body of `POST /signup`. Missing fields decode as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    /// Check presence and length limits of every field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation("missing fields".to_string()));
        }
        if contains_nul(&self.username) || contains_nul(&self.email) {
            return Err(ApiError::Validation(
                "username and email must not contain NUL characters".to_string(),
            ));
        }
        if self.username.chars().count() > MAX_USERNAME_CHARS {
            return Err(ApiError::Validation(format!(
                "username must be at most {} characters",
                MAX_USERNAME_CHARS
            )));
        }
        if self.email.chars().count() > MAX_EMAIL_CHARS {
            return Err(ApiError::Validation(format!(
                "email must be at most {} characters",
                MAX_EMAIL_CHARS
            )));
        }
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err(ApiError::Validation(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        Ok(())
    }
}

/// Body of `POST /login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /tweets`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTweetRequest {
    pub content: String,
}

impl CreateTweetRequest {
    /// Content must be 1 to [`MAX_TWEET_CHARS`] characters.
    pub fn validate(&self) -> Result<(), ApiError> {
        let len = self.content.chars().count();
        if len == 0 || len > MAX_TWEET_CHARS {
            return Err(ApiError::Validation("content length invalid".to_string()));
        }
        if contains_nul(&self.content) {
            return Err(ApiError::Validation(
                "content must not contain NUL characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// PostgreSQL `text` cannot store U+0000.
fn contains_nul(value: &str) -> bool {
    value.contains('\0')
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "conflict", "invalid_token")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Identifier of a newly created resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// 5xx errors are logged at ERROR level with their detail, which is replaced
/// by a generic message in the response body. 4xx errors are logged at WARN.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Authentication(message) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message)
            }
            ApiError::Internal(detail) => {
                error!(status = 500, "Server error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "server error".to_string(),
                )
            }
        };

        if status.is_client_error() {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Authentication("invalid creds".to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle `POST /signup`.
///
/// Returns 201 with the new user's id, 400 on missing or oversized fields,
/// 409 if the username or email is already registered.
pub async fn signup_handler<S: Store>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    request.validate()?;

    let SignupRequest {
        username,
        email,
        password,
    } = request;

    let password_hash = state.hasher.hash_blocking(password).await?;
    let id = state
        .store
        .create_user(&username, &email, &password_hash)
        .await?;

    info!(user_id = id, "User signed up");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Handle `POST /login`.
///
/// An unknown email and a wrong password produce the same 401 response.
pub async fn login_handler<S: Store>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    // No stored email can contain NUL, and PostgreSQL rejects it in a query.
    if contains_nul(&request.email) {
        return Err(invalid_credentials());
    }

    let user = match state.store.find_user_by_email(&request.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            debug!("Login attempt for unknown email");
            return Err(invalid_credentials());
        }
        Err(e) => return Err(e.into()),
    };

    let matches = state
        .hasher
        .verify_blocking(user.password_hash, request.password)
        .await?;
    if !matches {
        debug!(user_id = user.id, "Login attempt with wrong password");
        return Err(invalid_credentials());
    }

    let token = state
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(TokenResponse { token }))
}

/// Handle `POST /tweets` for the authenticated user.
pub async fn create_tweet_handler<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    JsonBody(request): JsonBody<CreateTweetRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    request.validate()?;

    let id = state
        .store
        .create_tweet(user.user_id, &request.content)
        .await?;

    debug!(user_id = user.user_id, tweet_id = id, "Tweet created");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Handle `GET /feed`: the newest [`FEED_LIMIT`] tweets system-wide.
pub async fn feed_handler<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
) -> Result<Json<Vec<FeedTweet>>, ApiError> {
    let tweets = state.store.list_recent_tweets(FEED_LIMIT).await?;

    debug!(user_id = user.user_id, count = tweets.len(), "Feed served");

    Ok(Json(tweets))
}

/// Handle `GET /health`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
