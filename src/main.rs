//! Movie catalog API entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use papka::api::{create_router, AppState};
use papka::catalog::{Catalog, MemoryCatalog, PgCatalog};
use papka::config::Config;
use papka::error::AppError;
use papka::metrics;
use papka::utils::shutdown_signal;

/// Movie and actor catalog HTTP API.
#[derive(Parser, Debug)]
#[command(name = "papka")]
#[command(about = "CRUD HTTP API for movies, actors and their casts")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// Apply the schema before serving.
        #[arg(long)]
        migrate: bool,

        /// Keep data in process memory instead of PostgreSQL.
        #[arg(long)]
        in_memory: bool,
    },

    /// Create the catalog tables and exit.
    Migrate,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; a broken environment is reported later by the command itself
    let directive = Config::load()
        .map(|config| config.log_directive(args.verbose))
        .unwrap_or_else(|_| Config::default().log_directive(args.verbose));
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { migrate, in_memory }) => {
            cmd_serve(args.port, migrate, in_memory).await
        }
        Some(Command::Migrate) => cmd_migrate().await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        None => cmd_serve(args.port, false, false).await,
    }
}

/// Load and validate configuration.
fn load_config() -> Result<Config, AppError> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        AppError::InvalidConfig(e)
    })?;

    Ok(config)
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PAPKA - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Connecting to database... ");
    let catalog = PgCatalog::from_config(&config)?;
    match catalog.ping().await {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Database connection failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Database: {}", config.redacted_database_url());
    println!("  Pool Size: {}", config.db_pool_size);
    println!("  DB Timeout: {}s", config.db_timeout_secs);
    println!("  Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Apply the schema and exit.
async fn cmd_migrate() -> anyhow::Result<()> {
    let config = load_config()?;
    info!("Migrating {}", config.redacted_database_url());

    let catalog = PgCatalog::from_config(&config)?;
    catalog.migrate().await?;
    Ok(())
}

/// Serve the HTTP API until a shutdown signal arrives.
async fn cmd_serve(port_override: Option<u16>, migrate: bool, in_memory: bool) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.port = port;
    }

    let catalog: Arc<dyn Catalog> = if in_memory {
        warn!("Using in-memory catalog; data is lost on exit");
        Arc::new(MemoryCatalog::new())
    } else {
        info!("Database: {}", config.redacted_database_url());
        let pg = PgCatalog::from_config(&config)?;
        if migrate {
            pg.migrate().await?;
        }
        if let Err(e) = pg.ping().await {
            warn!("Database not reachable yet: {}", e);
        }
        Arc::new(pg)
    };

    let mut app_state = AppState::new(catalog);
    match metrics::init_metrics() {
        Ok(handle) => app_state = app_state.with_metrics(handle),
        Err(e) => warn!("Metrics disabled: {}", e),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
