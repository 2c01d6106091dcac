//! Tally - prediction market chain-event projector.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! tally
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/tally tally
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tally_core::error::ProjectorError;
use tally_core::metrics::init_metrics;
use tally_core::services::{ProjectorConfig, ProjectorService};
use tally_decoders::DecoderRegistry;
use tally_projections::{BundleRegistry, PredictionMarketBundle};
use tally_storage::{Database, DatabaseConfig, LogSourceConfig, PgLogSource};

/// Tally CLI - prediction market projection service.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally - prediction market chain-event projector")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/tally"
    )]
    database_url: String,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Maximum deliveries leased per poll.
    #[arg(long, env = "BATCH_SIZE", default_value = "64")]
    batch_size: u32,

    /// Poll interval in milliseconds when the channel is empty.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "1000")]
    poll_interval_ms: u64,

    /// Delivery lease duration in seconds.
    #[arg(long, env = "LEASE_SECS", default_value = "30")]
    lease_secs: u64,

    /// Attempts before a delivery is dead-lettered.
    #[arg(long, env = "MAX_ATTEMPTS", default_value = "10")]
    max_attempts: i32,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all projected data from the database and exit.
    ///
    /// This will delete all markets, trades, positions, and the pending
    /// delivery channel. Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port)
        .parse::<std::net::SocketAddr>()
    {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!(
                        "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                        e
                    );
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Tally projector");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    let db_config = DatabaseConfig::for_projector(&cli.database_url);

    info!("🗄️  Connecting to database...");
    let db = Database::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    // ─────────────────────────────────────────────────────────────────────────
    // 📦 PROJECTION BUNDLES (register early for migrations and purge)
    // ─────────────────────────────────────────────────────────────────────────
    let mut bundle_registry = BundleRegistry::new();
    bundle_registry.register(Box::new(PredictionMarketBundle::new(db.pool().clone())));

    // Run bundle-specific migrations
    bundle_registry
        .run_migrations(db.pool())
        .await
        .context("Failed to run bundle migrations")?;

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, &bundle_registry, cli.yes).await;
    }

    let db = Arc::new(db);

    // ─────────────────────────────────────────────────────────────────────────
    // 📬 DELIVERY CHANNEL & DECODERS
    // ─────────────────────────────────────────────────────────────────────────
    let log_source = Arc::new(PgLogSource::new(
        db.pool().clone(),
        LogSourceConfig {
            lease_duration: Duration::from_secs(cli.lease_secs),
            max_attempts: cli.max_attempts,
        },
    ));

    let decoders = DecoderRegistry::new();
    info!(decoders = decoders.len(), "🎲 Decoder registry ready");

    let handlers = Arc::new(bundle_registry.into_handler_registry());

    let projector_config = ProjectorConfig {
        batch_size: cli.batch_size,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };

    let projector = ProjectorService::new(
        projector_config,
        log_source,
        Arc::new(decoders),
        handlers,
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let projector_handle = tokio::spawn(
        async move {
            if let Err(e) = projector.run(shutdown_rx).await {
                match &e {
                    ProjectorError::ShutdownRequested => {}
                    _ => error!(error = ?e, "❌ Projector error"),
                }
            }
        }
        .instrument(info_span!("projector")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Tally ready");
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(30), projector_handle).await {
        Ok(_) => debug!("Projector stopped"),
        Err(_) => warn!("⚠️  Projector shutdown timed out"),
    }

    db.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(
    db: &Database,
    bundle_registry: &BundleRegistry,
    skip_confirmation: bool,
) -> Result<()> {
    let bundle_tables = bundle_registry.tables_to_purge();

    warn!("⚠️  PURGE MODE: This will delete ALL projected data!");
    warn!("   - The pending delivery channel");
    if !bundle_tables.is_empty() {
        warn!("   - Bundle tables: {}", bundle_tables.join(", "));
    }
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");

    // Purge bundle tables first, then the delivery channel
    let bundle_tables_purged = bundle_registry
        .purge_tables(db.pool())
        .await
        .context("Failed to purge bundle tables")?;

    if bundle_tables_purged > 0 {
        info!("   🧹 Purged {} bundle table(s)", bundle_tables_purged);
    }

    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   📬 Deliveries removed: {}", stats.deliveries_removed);

    Ok(())
}
