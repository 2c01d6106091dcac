//! PostgreSQL database connection and configuration.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use tally_core::error::{StorageError, StorageResult};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection acquisition timeout.
    pub acquire_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/tally".to_string(),
            max_connections: 20,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration sized for the projector workload: small
    /// batches, short transactions, a handful of concurrent handlers.
    pub fn for_projector(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 10,
            min_connections: 3,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database with the given configuration.
    #[instrument(skip_all)]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        debug!(
            max_conn = config.max_connections,
            min_conn = config.min_connections,
            "Creating connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!("Connection pool created");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run base database migrations (delivery channel, migration tracking).
    /// Bundle schemas are applied separately by the bundle registry.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        debug!("Running migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        debug!("Migrations completed");

        Ok(())
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Purge the delivery channel.
    ///
    /// Bundle-owned projection tables are purged separately through the
    /// bundle registry; migration tracking stays intact so schemas are
    /// not re-applied.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StorageResult<PurgeStats> {
        debug!("Starting database purge");

        let delivery_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_log_deliveries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        sqlx::query("TRUNCATE raw_log_deliveries")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        debug!("Database purge completed");

        Ok(PurgeStats {
            deliveries_removed: delivery_count.0 as u64,
        })
    }
}

/// Statistics from a database purge operation.
#[derive(Debug, Clone)]
pub struct PurgeStats {
    /// Number of delivery rows removed.
    pub deliveries_removed: u64,
}
