//! Router configuration for microfeed.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! POST /signup   - Register (public)
//! POST /login    - Obtain a bearer token (public)
//! GET  /health   - Health check (public)
//! POST /tweets   - Create a tweet (bearer token)
//! GET  /feed     - Latest 50 tweets (bearer token)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use microfeed::server::routes::{create_router, RouterConfig};
//! use microfeed::store::PgStore;
//!
//! let store = PgStore::connect(&database_url, 10, Duration::from_secs(5)).await?;
//! let router = create_router(store, RouterConfig::new("my-secret-key"));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::auth_middleware;
use super::handlers::{
    create_tweet_handler, feed_handler, health_handler, login_handler, signup_handler, AppState,
};
use crate::auth::{PasswordHasher, TokenService, DEFAULT_BCRYPT_COST};
use crate::store::Store;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared secret for signing and validating bearer tokens
    pub token_secret: String,

    /// bcrypt cost for newly hashed passwords
    pub bcrypt_cost: u32,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given token secret.
    ///
    /// By default:
    /// - bcrypt cost is [`DEFAULT_BCRYPT_COST`]
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the bcrypt cost factor.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The token service is built once from `config.token_secret` and shared by
/// the login handler and the auth gate.
pub fn create_router<S: Store>(store: S, config: RouterConfig) -> Router {
    let tokens = TokenService::new(&config.token_secret);
    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let app_state = AppState::new(store, tokens.clone(), hasher);

    let cors = build_cors_layer(&config);

    // route_layer keeps unknown paths as 404 instead of 401
    let protected_routes = Router::new()
        .route("/tweets", post(create_tweet_handler::<S>))
        .route("/feed", get(feed_handler::<S>))
        .route_layer(middleware::from_fn_with_state(tokens, auth_middleware));

    let public_routes = Router::new()
        .route("/signup", post(signup_handler::<S>))
        .route("/login", post(login_handler::<S>))
        .route("/health", get(health_handler));

    let router = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
