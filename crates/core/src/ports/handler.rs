//! Port trait for projection event handlers.
//!
//! This is the main extensibility point of the service. Each projection
//! (a named set of idempotent handlers) implements this trait and
//! declares the event names it subscribes to.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::models::ChainEvent;

/// Trait for projection event handlers.
///
/// A handler is invoked once per delivered event whose name it declared.
/// Handlers MUST be idempotent: the delivery channel is at-least-once,
/// so the same event may arrive again after a partial failure. Handlers
/// run to completion or return an error that propagates to the delivery
/// channel's retry policy; there is no cancellation.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name of the projection this handler belongs to (e.g. "prediction_market").
    fn projection_name(&self) -> &'static str;

    /// Event names this handler subscribes to.
    fn event_names(&self) -> &'static [&'static str];

    /// Apply one event. Must be safe to call again with the same event.
    async fn handle(&self, event: &ChainEvent) -> DomainResult<()>;

    /// Priority for handler registration ordering (higher = earlier).
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry mapping event names to their projection handler.
///
/// Lookup is O(1) by event name. One handler may subscribe to many
/// events; at most one handler owns a given event name (last
/// registration wins, which only matters in tests).
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under every event name it declares.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        for name in handler.event_names() {
            self.handlers.insert(name, handler.clone());
        }
    }

    /// Get the handler subscribed to an event name.
    pub fn get(&self, event_name: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(event_name)
    }

    /// Check whether any handler subscribes to an event name.
    pub fn has_handler(&self, event_name: &str) -> bool {
        self.handlers.contains_key(event_name)
    }

    /// List all subscribed event names.
    pub fn registered_events(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainEvent, CustomEventNotice};
    use alloy_primitives::B256;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        names: &'static [&'static str],
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        fn projection_name(&self) -> &'static str {
            "counting"
        }
        fn event_names(&self) -> &'static [&'static str] {
            self.names
        }
        async fn handle(&self, _: &ChainEvent) -> DomainResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // Test critique: un handler s'enregistre sous chacun de ses noms d'événement
    #[test]
    fn test_registry_registers_all_event_names() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(CountingHandler {
            names: &[
                "PredictionMarketTokensMinted",
                "PredictionMarketTokensMerged",
            ],
            calls: AtomicUsize::new(0),
        }));

        assert!(registry.has_handler("PredictionMarketTokensMinted"));
        assert!(registry.has_handler("PredictionMarketTokensMerged"));
        assert!(!registry.has_handler("PredictionMarketTokensRedeemed"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_registry_dispatch_by_event_name() {
        let handler = Arc::new(CountingHandler {
            names: &["CustomChainEventCreated"],
            calls: AtomicUsize::new(0),
        });
        let mut registry = HandlerRegistry::new();
        registry.register(handler.clone());

        let event = ChainEvent::CustomEventCreated(CustomEventNotice {
            eth_chain_id: 1,
            transaction_hash: B256::ZERO,
            created_at: chrono::Utc::now(),
        });

        registry
            .get(event.event_name())
            .unwrap()
            .handle(&event)
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
