//! Error types for the projection domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DecodeError`] - Raw log does not match its claimed event shape
//! - [`DomainError`] - Business logic errors
//! - [`StorageError`] - Database/repository errors
//! - [`DeliveryError`] - Event delivery channel errors
//! - [`ProjectorError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// A raw chain log failed to decode against the ABI shape expected for
/// its event signature.
///
/// Decode errors are fatal for the affected event: this layer never
/// retries them. Retry and dead-letter policy belong to the delivery
/// channel.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The log carries fewer (or more) indexed topics than the event declares.
    #[error("{event}: expected {expected} topics, log has {actual}")]
    TopicCount {
        event: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An indexed address topic is not a right-aligned 20-byte word.
    #[error("{event}: topic {index} is not a right-aligned address")]
    MalformedAddressTopic { event: &'static str, index: usize },

    /// The non-indexed data section is too short for the fixed layout.
    #[error("{event}: data is {len} bytes, word {word} out of range")]
    DataOutOfRange {
        event: &'static str,
        word: usize,
        len: usize,
    },

    /// A one-byte discriminant holds a value outside its domain.
    #[error("{event}: invalid {field} discriminant {value}")]
    InvalidDiscriminant {
        event: &'static str,
        field: &'static str,
        value: u8,
    },

    /// A numeric field exceeds the range of its target type.
    #[error("{event}: {field} out of range: {value}")]
    ValueOutOfRange {
        event: &'static str,
        field: &'static str,
        value: String,
    },
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Business logic and domain rule violations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Log decoding failed.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A lifecycle command targets a market not in an eligible state.
    ///
    /// The message is user-facing and returned verbatim to the command
    /// caller (e.g. "Only draft or active prediction markets can be
    /// cancelled").
    #[error("{0}")]
    InvalidStateTransition(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database constraint was violated outside the checked idempotency
    /// path (unique, foreign key, etc.). Never silently swallowed.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Delivery Errors
// =============================================================================

/// Event delivery channel errors.
///
/// These occur when polling or acknowledging deliveries from the
/// at-least-once delivery substrate.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Polling the delivery channel failed.
    #[error("Poll error: {0}")]
    PollError(String),

    /// Acknowledging a processed delivery failed.
    #[error("Ack error for delivery {delivery_id}: {message}")]
    AckError { delivery_id: i64, message: String },
}

// =============================================================================
// Projector Errors
// =============================================================================

/// Top-level projector orchestration errors.
///
/// This is the main error type returned by
/// [`crate::services::ProjectorService`].
#[derive(Debug, Error)]
pub enum ProjectorError {
    /// Domain logic error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Delivery channel error.
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Projector shutdown requested")]
    ShutdownRequested,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for projector operations.
pub type ProjectorResult<T> = Result<T, ProjectorError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for delivery channel operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    // Permet d'utiliser ? à travers les couches
    #[test]
    fn test_error_conversion_chain() {
        // Storage -> Domain -> Projector
        let storage_err = StorageError::QueryError("db failed".into());
        let domain_err: DomainError = storage_err.into();
        let projector_err: ProjectorError = domain_err.into();

        // Le message original est préservé
        assert!(projector_err.to_string().contains("db failed"));

        // Decode -> Domain -> Projector
        let decode_err = DecodeError::TopicCount {
            event: "TokensMinted",
            expected: 3,
            actual: 1,
        };
        let projector_err: ProjectorError = DomainError::from(decode_err).into();
        assert!(projector_err.to_string().contains("TokensMinted"));
    }

    // Test critique: InvalidStateTransition rend le message utilisateur verbatim
    #[test]
    fn test_invalid_state_transition_message_verbatim() {
        let err = DomainError::InvalidStateTransition(
            "Only draft or active prediction markets can be cancelled".into(),
        );
        assert_eq!(
            err.to_string(),
            "Only draft or active prediction markets can be cancelled"
        );
    }
}
