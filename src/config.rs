//! Configuration management for microfeed.
//!
//! Every option can be given as a command-line flag or an environment
//! variable. The two settings the service cannot run without have
//! development defaults:
//!
//! - `DATABASE_URL` - PostgreSQL connection string
//!   (default: `postgres://postgres:postgres@db:5432/twitter_dev?sslmode=disable`)
//! - `JWT_SECRET` - Token signing secret (default: `supersecretchange`)
//!
//! The remaining options use the `MICROFEED_` prefix:
//!
//! - `MICROFEED_HOST` - Server bind address (default: 0.0.0.0)
//! - `MICROFEED_PORT` - Server port (default: 8080)
//! - `MICROFEED_DB_MAX_CONNECTIONS` - Connection pool size (default: 10)
//! - `MICROFEED_DB_CONNECT_TIMEOUT` - Seconds to wait for a connection (default: 5)
//! - `MICROFEED_BCRYPT_COST` - bcrypt cost factor (default: 10)
//! - `MICROFEED_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)
//!
//! Running the binary without a subcommand is the same as `serve`.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::auth::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};

// =============================================================================
// Default Values
// =============================================================================

/// Development database URL.
pub const DEFAULT_DATABASE_URL: &str =
    "postgres://postgres:postgres@db:5432/twitter_dev?sslmode=disable";

/// Development token secret. Never use in production.
pub const DEFAULT_JWT_SECRET: &str = "supersecretchange";

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default connection pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default seconds to wait for a pooled connection.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CLI Arguments
// =============================================================================

/// microfeed - a minimal social feed backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "microfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API server
    Serve(ServeConfig),

    /// Issue a bearer token for a user id
    Token(TokenConfig),

    /// Check database connectivity and schema
    Check(CheckConfig),
}

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MICROFEED_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MICROFEED_PORT")]
    pub port: u16,

    /// PostgreSQL connection string.
    #[arg(long, default_value = DEFAULT_DATABASE_URL, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum number of pooled database connections.
    #[arg(long, default_value_t = DEFAULT_DB_MAX_CONNECTIONS, env = "MICROFEED_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Seconds to wait for a database connection.
    #[arg(long, default_value_t = DEFAULT_DB_CONNECT_TIMEOUT_SECS, env = "MICROFEED_DB_CONNECT_TIMEOUT")]
    pub db_connect_timeout: u64,

    /// Secret used to sign and validate bearer tokens.
    #[arg(long, default_value = DEFAULT_JWT_SECRET, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// bcrypt cost factor for new password hashes (4-31).
    #[arg(long, default_value_t = DEFAULT_BCRYPT_COST, env = "MICROFEED_BCRYPT_COST")]
    pub bcrypt_cost: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MICROFEED_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("Database URL is required. Set --database-url or DATABASE_URL".to_string());
        }

        if self.jwt_secret.is_empty() {
            return Err("Token secret must not be empty. Set --jwt-secret or JWT_SECRET".to_string());
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(format!(
                "bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            ));
        }

        if self.db_max_connections == 0 {
            return Err("db_max_connections must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout for acquiring a database connection.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout)
    }

    /// Whether the built-in development secret is in use.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Output format for `token`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,

    /// A complete `Authorization` header line
    Header,
}

/// Options for `token`.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// User id to embed as the token subject.
    #[arg(long)]
    pub user_id: i64,

    /// Token lifetime in hours (default: 7 days).
    #[arg(long, default_value_t = 168)]
    pub ttl_hours: u64,

    /// Secret used to sign the token.
    #[arg(long, default_value = DEFAULT_JWT_SECRET, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }
}

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// PostgreSQL connection string.
    #[arg(long, default_value = DEFAULT_DATABASE_URL, env = "DATABASE_URL")]
    pub database_url: String,

    /// Seconds to wait for a database connection.
    #[arg(long, default_value_t = DEFAULT_DB_CONNECT_TIMEOUT_SECS, env = "MICROFEED_DB_CONNECT_TIMEOUT")]
    pub db_connect_timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
