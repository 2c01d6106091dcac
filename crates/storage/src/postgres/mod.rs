//! PostgreSQL storage implementation.

mod database;
mod outbox;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use outbox::{LogSourceConfig, PgLogSource};
