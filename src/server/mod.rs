//! HTTP server layer for microfeed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      POST /signup  POST /login  POST /tweets  GET /feed         │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (use cases) │  │ (bearer gate│  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{auth_middleware, bearer_token, AuthError, AuthUser, BEARER_PREFIX};
pub use handlers::{
    create_tweet_handler, feed_handler, health_handler, login_handler, signup_handler, AppState,
    CreateTweetRequest, CreatedResponse, ErrorResponse, HealthResponse, JsonBody, LoginRequest,
    SignupRequest, TokenResponse, MAX_EMAIL_CHARS, MAX_TWEET_CHARS, MAX_USERNAME_CHARS,
};
pub use routes::{create_router, RouterConfig};
