//! microfeed - a minimal social feed backend.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use microfeed::{
    auth::TokenService,
    config::{CheckConfig, Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    server::{create_router, RouterConfig, BEARER_PREFIX},
    store::{PgStore, Store},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("microfeed v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Database pool: {} connections", config.db_max_connections);
    info!("  bcrypt cost: {}", config.bcrypt_cost);
    if config.uses_default_secret() {
        warn!("  Token secret: DEVELOPMENT DEFAULT - tokens can be forged by anyone");
        warn!("        Set JWT_SECRET for any shared deployment");
    } else {
        info!("  Token secret: configured");
    }

    let store = match PgStore::connect(
        &config.database_url,
        config.db_max_connections,
        config.connect_timeout(),
    )
    .await
    {
        Ok(store) => store,
        Err(e) => {
            error!("db connect: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = store.ensure_schema().await {
        error!("schema: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Database ready");

    let router = create_router(store, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("listening {}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build router configuration from the serve options.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.jwt_secret.clone())
        .with_bcrypt_cost(config.bcrypt_cost)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "microfeed=debug,tower_http=debug"
    } else {
        "microfeed=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if config.jwt_secret.is_empty() {
        eprintln!("Error: token secret must not be empty");
        return ExitCode::FAILURE;
    }

    let tokens = TokenService::new(&config.jwt_secret);
    let token = match tokens.issue_with_ttl(config.user_id, config.ttl()) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        TokenOutputFormat::Token => println!("{}", token),
        TokenOutputFormat::Header => println!("Authorization: {}{}", BEARER_PREFIX, token),
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("microfeed Configuration Check");
    println!("═════════════════════════════");
    println!();

    print!("Connecting to database... ");
    let store = match PgStore::connect(
        &config.database_url,
        1,
        std::time::Duration::from_secs(config.db_connect_timeout),
    )
    .await
    {
        Ok(store) => {
            println!("✓ success");
            store
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - DATABASE_URL points at a reachable PostgreSQL server");
            println!("  - The database exists and the credentials are correct");
            return ExitCode::FAILURE;
        }
    };

    print!("Ensuring schema... ");
    if let Err(e) = store.ensure_schema().await {
        println!("✗ failed");
        println!();
        println!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ ok");

    match store.counts().await {
        Ok((users, tweets)) => {
            println!();
            println!("  Users:  {}", users);
            println!("  Tweets: {}", tweets);
        }
        Err(e) => {
            println!();
            println!("Error counting rows: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("═════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
