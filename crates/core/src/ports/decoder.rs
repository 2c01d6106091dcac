//! Port trait for the log decoder registry.

use crate::error::DomainResult;
use crate::models::ChainEvent;
use crate::ports::LogEnvelope;

/// Turns a raw log envelope into a typed chain event.
///
/// Decoders are pure: no I/O, no shared mutable state. `Ok(None)` means
/// no decoder is registered for the envelope's event key — the delivery
/// is simply not for us. A decode failure against a *registered* key is
/// fatal for that event and surfaces as `DomainError::Decode`.
pub trait LogDecoder: Send + Sync {
    fn decode(&self, envelope: &LogEnvelope) -> DomainResult<Option<ChainEvent>>;
}
