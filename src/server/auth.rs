//! Bearer-token gate for protected routes.
//!
//! Each request starts unauthenticated. [`auth_middleware`] reads the
//! `Authorization: Bearer <token>` header and validates the token with the
//! [`TokenService`]. On success the subject is attached to the request as an
//! [`AuthUser`] extension and the request proceeds. On failure the request is
//! answered with 401 and never reaches its handler.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::get, Router};
//! use microfeed::auth::TokenService;
//! use microfeed::server::auth::{auth_middleware, AuthUser};
//!
//! async fn whoami(user: AuthUser) -> String {
//!     user.user_id.to_string()
//! }
//!
//! let tokens = TokenService::new("secret-key");
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .route_layer(middleware::from_fn_with_state(tokens, auth_middleware));
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::auth::TokenService;
use crate::error::TokenError;

use super::handlers::ErrorResponse;

/// Scheme prefix expected in the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

// =============================================================================
// Types
// =============================================================================

/// Reasons a request is rejected by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or no identity attached to the request
    MissingCredentials,

    /// `Authorization` header present but not a `Bearer` credential
    InvalidScheme,

    /// Bearer token failed validation
    InvalidToken(TokenError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "missing auth"),
            AuthError::InvalidScheme => write!(f, "authorization must use the Bearer scheme"),
            AuthError::InvalidToken(_) => write!(f, "invalid token"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let error_type = match &self {
            AuthError::MissingCredentials => "missing_token",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::InvalidToken(_) => "invalid_token",
        };

        // A bad signature suggests tampering; everything else is routine.
        match &self {
            AuthError::InvalidToken(reason @ TokenError::InvalidSignature) => {
                warn!(error_type, status = status.as_u16(), "Authentication failed: {}", reason);
            }
            AuthError::InvalidToken(reason) => {
                debug!(error_type, status = status.as_u16(), "Authentication failed: {}", reason);
            }
            _ => {
                debug!(error_type, status = status.as_u16(), "Authentication failed: {}", self);
            }
        }

        let error_response = ErrorResponse::with_status(error_type, self.to_string(), status);
        (status, Json(error_response)).into_response()
    }
}

/// Identity of an authenticated request.
///
/// Inserted by [`auth_middleware`]; handlers take it as an extractor argument.
/// Extracting it on a route the gate does not cover is rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// Subject identifier from the validated token
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

// =============================================================================
// Header Parsing
// =============================================================================

/// Extract the raw token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidScheme)?;

    if value.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidScheme)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware admitting only requests with a valid bearer token.
pub async fn auth_middleware(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;
    let user_id = tokens.validate(token).map_err(AuthError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
