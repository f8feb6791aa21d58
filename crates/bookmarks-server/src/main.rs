//! Bookmarks API server

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use bookmarks_api::{AppState, RateLimits, create_router};
use bookmarks_auth::{CredentialHasher, TokenIssuer};
use bookmarks_db::Database;
use bookmarks_ratelimit::{InMemoryStore, RateLimitStore, SweepTask};
use config::{Config, LogFormat};

/// Bookmarks API - bookmarks, categories and tags behind token auth
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "BOOKMARKS_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Base signing secret for access and refresh tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Access token lifetime, e.g. 24h or 15m
    #[arg(long, env = "JWT_EXPIRES_IN")]
    access_token_ttl: Option<String>,

    /// Refresh token lifetime, e.g. 7d or 12h
    #[arg(long, env = "REFRESH_TOKEN_EXPIRES_IN")]
    refresh_token_ttl: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Apply command-line and well-known environment overrides
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secret) = self.jwt_secret {
            config.auth.jwt_secret = secret;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(ttl) = self.access_token_ttl {
            config.auth.access_token_ttl = ttl;
        }
        if let Some(ttl) = self.refresh_token_ttl {
            config.auth.refresh_token_ttl = ttl;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);

    init_logging(&config.logging.level, config.logging.format);

    info!("Starting Bookmarks API v{}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;

    // Initialize database
    let db = Database::new(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;

    // Initialize credential hashing and token issuing
    let hasher = Arc::new(
        CredentialHasher::new(config.auth.hash_cost).context("Invalid auth.hash_cost")?,
    );
    let tokens = Arc::new(
        TokenIssuer::new(
            &config.auth.jwt_secret,
            &config.auth.access_token_ttl,
            &config.auth.refresh_token_ttl,
        )
        .context("Invalid token configuration")?,
    );

    // Initialize rate limiting
    let store: Arc<dyn RateLimitStore> = Arc::new(InMemoryStore::new());
    let limits = RateLimits::new(
        store.clone(),
        config.rate_limit.default,
        config.rate_limit.bookmarks_list,
        config.rate_limit.categories_list,
    )
    .context("Invalid rate limit policy")?;
    let sweeper = SweepTask::spawn(
        store,
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
    );

    // Install the Prometheus recorder
    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    // Create application state
    let state = AppState::new(db, hasher, tokens, limits);

    // Create router
    let app = create_router(state, metrics_handle)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
