//! celsched-server
//!
//! Volunteer and department service with spreadsheet batch import.

use anyhow::{Context, Result};
use celsched_common::config::{ConfigOverrides, ServerConfig};
use celsched_common::db::init_database;
use celsched_common::Store;
use celsched_server::api::{Claims, JwtKeys};
use celsched_server::import::{spawn_session_sweeper, InMemorySessionStore, SWEEP_INTERVAL};
use celsched_server::{build_router, cors_layer, AppState};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "celsched-server")]
#[command(about = "Volunteer scheduling backend with spreadsheet batch import", version)]
struct Args {
    /// HTTP server port
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "CELSCHED_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "CELSCHED_DB_PATH")]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "CELSCHED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a signed bearer token and exit
    IssueToken {
        /// User id placed in the token subject
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        username: String,

        /// 1 = admin, 2 = department head, 3 = volunteer
        #[arg(long, default_value_t = 1)]
        access_level: i32,

        /// Token lifetime in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        port: args.port,
        bind_address: args.bind,
        database_path: args.database,
        config_file: args.config.clone(),
    };
    let config = ServerConfig::resolve(overrides).context("Failed to resolve configuration")?;

    let default_filter = format!("{},sqlx=warn", config.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer())
        .init();

    // Resolution ran before the subscriber existed, so repeat its one warning
    if let Some(path) = args.config.as_ref().filter(|p| !p.exists()) {
        warn!("Config file {} not found, using environment and defaults", path.display());
    }

    let jwt = JwtKeys::from_secret(&config.jwt_secret);

    if let Some(Command::IssueToken {
        user_id,
        username,
        access_level,
        hours,
    }) = args.command
    {
        let claims = Claims::new(user_id, username, access_level, hours * 3600);
        let token = jwt.issue(&claims).context("Failed to sign token")?;
        println!("{}", token);
        return Ok(());
    }

    info!("Starting celsched-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let store = Store::sqlite(pool);

    let sessions = Arc::new(InMemorySessionStore::new());
    let state = AppState::new(store, sessions.clone(), jwt);
    let sweeper = spawn_session_sweeper(sessions, state.audit.clone(), SWEEP_INTERVAL);

    let app = build_router(state).layer(cors_layer(config.frontend_url.as_deref()));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.bind_address, config.port
            )
        })?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
