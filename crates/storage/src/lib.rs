//! Storage layer for the Tally projection service.
//!
//! This crate provides the PostgreSQL implementations of the ports
//! defined in `tally-core`: the database connection pool, the base
//! schema migrations, and the at-least-once raw-log delivery channel.
//!
//! # Architecture
//!
//! - [`postgres::Database`] - Connection pool management and base migrations
//! - [`postgres::PgLogSource`] - [`LogSource`](tally_core::ports::LogSource)
//!   adapter over the `raw_log_deliveries` table
//!
//! Projection tables are not owned here; each projection bundle in
//! `tally-projections` carries its own schema and applies it through the
//! bundle registry.
//!
//! # Usage
//!
//! ```ignore
//! use tally_storage::{Database, DatabaseConfig, LogSourceConfig, PgLogSource};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_projector(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run base migrations
//! db.migrate().await?;
//!
//! // Create the delivery channel adapter
//! let source = PgLogSource::new(db.pool().clone(), LogSourceConfig::default());
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, LogSourceConfig, PgLogSource, PurgeStats};
