//! Core projector service - orchestrates event projection.
//!
//! The projector polls the delivery channel, decodes each raw log into a
//! typed chain event and dispatches it to the subscribed projection
//! handler. Acknowledgement is the commit point: a delivery that fails
//! anywhere before its `ack` will be redelivered by the channel.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{DomainError, ProjectorError, ProjectorResult};
use crate::metrics::{
    ProjectionTimer, record_decode_error, record_event_decoded, record_event_projected,
    record_handler_error,
};
use crate::ports::{HandlerRegistry, LogDecoder, LogDelivery, LogSource};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the projector service.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Maximum deliveries leased per poll.
    pub batch_size: u32,
    /// Sleep between polls when the channel is empty.
    pub poll_interval: Duration,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            poll_interval: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// ProjectorService
// =============================================================================

/// Main projection service.
///
/// # Flow
///
/// 1. Lease a batch of deliveries from the channel
/// 2. Decode each raw log against the decoder registry
/// 3. Dispatch the typed event to the handler subscribed to its name
/// 4. Acknowledge the delivery
///
/// # Delivery outcomes
///
/// - Decoded and handled: ack.
/// - No decoder registered for the event key: ack — the delivery is not
///   for us and redelivering it cannot change that.
/// - Decoded but no handler subscribes to the event name: ack, same
///   reasoning.
/// - Decode failure against a registered key, or handler failure: the
///   delivery is left un-acked and the channel's retry/dead-letter
///   policy takes over.
pub struct ProjectorService<S: LogSource> {
    config: ProjectorConfig,
    log_source: Arc<S>,
    decoder: Arc<dyn LogDecoder>,
    handlers: Arc<HandlerRegistry>,
}

impl<S: LogSource> ProjectorService<S> {
    pub fn new(
        config: ProjectorConfig,
        log_source: Arc<S>,
        decoder: Arc<dyn LogDecoder>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            config,
            log_source,
            decoder,
            handlers,
        }
    }

    /// Start the projector.
    ///
    /// Polls the delivery channel until shutdown is requested.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> ProjectorResult<()> {
        info!(
            batch_size = self.config.batch_size,
            subscriptions = self.handlers.len(),
            "📽️  Starting projector"
        );

        if self.handlers.is_empty() {
            return Err(ProjectorError::ConfigError(
                "no projection handlers registered".into(),
            ));
        }

        // Exponential backoff configuration for poll failures
        const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
        const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
        let mut retry_delay = INITIAL_RETRY_DELAY;

        loop {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(ProjectorError::ShutdownRequested);
            }

            let sleep = match self.log_source.poll(self.config.batch_size).await {
                Ok(batch) => {
                    retry_delay = INITIAL_RETRY_DELAY; // Reset backoff on success

                    if batch.is_empty() {
                        trace!("Channel empty");
                        self.config.poll_interval
                    } else {
                        debug!(count = batch.len(), "📬 Deliveries leased");
                        for delivery in batch {
                            if *shutdown_rx.borrow() {
                                debug!("Shutdown requested");
                                return Err(ProjectorError::ShutdownRequested);
                            }
                            self.process_delivery(delivery).await;
                        }
                        Duration::ZERO
                    }
                }
                Err(e) => {
                    warn!(
                        error = ?e,
                        retry_in_ms = retry_delay.as_millis(),
                        "⚠️  Poll failed, retrying..."
                    );
                    let delay = retry_delay;
                    // Exponential backoff: double the delay, up to max
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                    delay
                }
            };

            if sleep > Duration::ZERO {
                tokio::select! {
                    _ = tokio::time::sleep(sleep) => {}
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            return Err(ProjectorError::ShutdownRequested);
                        }
                    }
                }
            }
        }
    }

    /// Process a single delivery end to end.
    ///
    /// Never returns an error: failures are recorded and the delivery is
    /// left un-acked so the channel redelivers it.
    #[instrument(skip(self, delivery), fields(delivery = delivery.delivery_id, attempts = delivery.attempts))]
    async fn process_delivery(&self, delivery: LogDelivery) {
        let _timer = ProjectionTimer::new();
        let delivery_id = delivery.delivery_id;

        if delivery.envelope.raw_log.removed {
            debug!("Reorg-removed log, acking without projection");
            self.ack(delivery_id).await;
            return;
        }

        let event = match self.decoder.decode(&delivery.envelope) {
            Ok(Some(event)) => event,
            Ok(None) => {
                // No decoder registered for this key: not ours, consume it.
                trace!("No decoder for event key, acking");
                self.ack(delivery_id).await;
                return;
            }
            Err(e) => {
                error!(error = %e, "❌ Decode failed");
                record_decode_error(decode_error_event(&e));
                return;
            }
        };

        let event_name = event.event_name();
        record_event_decoded(event_name);

        let Some(handler) = self.handlers.get(event_name) else {
            trace!(event = event_name, "No subscriber, acking");
            self.ack(delivery_id).await;
            return;
        };

        let projection = handler.projection_name();
        match handler.handle(&event).await {
            Ok(()) => {
                debug!(event = event_name, projection, "✅ Event projected");
                record_event_projected(projection, event_name);
                self.ack(delivery_id).await;
            }
            Err(e) => {
                error!(
                    event = event_name,
                    projection,
                    error = %e,
                    "❌ Handler failed"
                );
                record_handler_error(projection, event_name);
            }
        }
    }

    /// Acknowledge a delivery, logging (not propagating) failure.
    /// A failed ack leaves the delivery pending, so the worst case is a
    /// redelivery to an idempotent handler.
    async fn ack(&self, delivery_id: i64) {
        if let Err(e) = self.log_source.ack(delivery_id).await {
            warn!(delivery = delivery_id, error = %e, "⚠️  Ack failed");
        }
    }
}

/// Event name attached to a decode failure, for metric labels.
fn decode_error_event(err: &DomainError) -> &'static str {
    match err {
        DomainError::Decode(e) => match e {
            crate::error::DecodeError::TopicCount { event, .. }
            | crate::error::DecodeError::MalformedAddressTopic { event, .. }
            | crate::error::DecodeError::DataOutOfRange { event, .. }
            | crate::error::DecodeError::InvalidDiscriminant { event, .. }
            | crate::error::DecodeError::ValueOutOfRange { event, .. } => event,
        },
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, DeliveryResult, DomainResult};
    use crate::models::{ChainEvent, CustomEventNotice};
    use crate::ports::{
        BlockMeta, EventHandler, EventKey, EventSource, LogEnvelope, RawEvmLog,
    };
    use alloy_primitives::{Address, B256, Bytes};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(key: EventKey) -> LogEnvelope {
        LogEnvelope {
            source: EventSource {
                eth_chain_id: 8453,
                event_key: key,
            },
            raw_log: RawEvmLog {
                block_number: 1,
                block_hash: B256::ZERO,
                transaction_index: 0,
                removed: false,
                address: Address::ZERO,
                data: Bytes::new(),
                topics: vec![],
                transaction_hash: B256::ZERO,
                log_index: 0,
            },
            block: BlockMeta {
                number: 1,
                hash: B256::ZERO,
                timestamp: 1_700_000_000,
                parent_hash: B256::ZERO,
                miner: Address::ZERO,
                gas_limit: 30_000_000,
                logs_bloom: Bytes::new(),
            },
        }
    }

    /// Hands out a fixed batch once, then nothing. Records acks.
    struct ScriptedSource {
        batch: Mutex<Vec<LogDelivery>>,
        acked: Mutex<HashSet<i64>>,
    }

    impl ScriptedSource {
        fn new(batch: Vec<LogDelivery>) -> Self {
            Self {
                batch: Mutex::new(batch),
                acked: Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn poll(&self, _limit: u32) -> DeliveryResult<Vec<LogDelivery>> {
            Ok(std::mem::take(&mut *self.batch.lock().unwrap()))
        }

        async fn ack(&self, delivery_id: i64) -> DeliveryResult<()> {
            self.acked.lock().unwrap().insert(delivery_id);
            Ok(())
        }
    }

    /// Decodes logical "known" keys to a custom event; fails on "broken".
    struct StubDecoder;

    impl LogDecoder for StubDecoder {
        fn decode(&self, envelope: &LogEnvelope) -> DomainResult<Option<ChainEvent>> {
            match &envelope.source.event_key {
                EventKey::Logical(name) if name == "known" => {
                    Ok(Some(ChainEvent::CustomEventCreated(CustomEventNotice {
                        eth_chain_id: envelope.source.eth_chain_id,
                        transaction_hash: envelope.raw_log.transaction_hash,
                        created_at: chrono::Utc::now(),
                    })))
                }
                EventKey::Logical(name) if name == "broken" => {
                    Err(DecodeError::DataOutOfRange {
                        event: "CustomChainEventCreated",
                        word: 0,
                        len: 0,
                    }
                    .into())
                }
                _ => Ok(None),
            }
        }
    }

    struct RecordingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn projection_name(&self) -> &'static str {
            "recording"
        }
        fn event_names(&self) -> &'static [&'static str] {
            &["CustomChainEventCreated"]
        }
        async fn handle(&self, _: &ChainEvent) -> DomainResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DomainError::ValidationError("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn delivery(id: i64, key: &str) -> LogDelivery {
        LogDelivery {
            delivery_id: id,
            attempts: 1,
            envelope: envelope(EventKey::Logical(key.into())),
        }
    }

    fn service(
        source: Arc<ScriptedSource>,
        handler: Arc<RecordingHandler>,
    ) -> ProjectorService<ScriptedSource> {
        let mut registry = HandlerRegistry::new();
        registry.register(handler);
        ProjectorService::new(
            ProjectorConfig::default(),
            source,
            Arc::new(StubDecoder),
            Arc::new(registry),
        )
    }

    // Test critique: décodé + traité => acquitté
    #[tokio::test]
    async fn test_handled_delivery_is_acked() {
        let source = Arc::new(ScriptedSource::new(vec![delivery(1, "known")]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let svc = service(source.clone(), handler.clone());

        svc.process_delivery(delivery(1, "known")).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(source.acked.lock().unwrap().contains(&1));
    }

    // Test critique: clé inconnue => acquitté sans dispatch
    #[tokio::test]
    async fn test_unregistered_key_is_acked_without_dispatch() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let svc = service(source.clone(), handler.clone());

        svc.process_delivery(delivery(7, "someone-elses-event")).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(source.acked.lock().unwrap().contains(&7));
    }

    // Test critique: échec de décodage => non acquitté (relivraison)
    #[tokio::test]
    async fn test_decode_failure_leaves_delivery_unacked() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let svc = service(source.clone(), handler.clone());

        svc.process_delivery(delivery(3, "broken")).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(source.acked.lock().unwrap().is_empty());
    }

    // Test critique: échec du handler => non acquitté (relivraison)
    #[tokio::test]
    async fn test_handler_failure_leaves_delivery_unacked() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let svc = service(source.clone(), handler.clone());

        svc.process_delivery(delivery(4, "known")).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(source.acked.lock().unwrap().is_empty());
    }

    // Test critique: log retiré par un reorg => acquitté sans projection
    #[tokio::test]
    async fn test_reorg_removed_log_is_acked_without_dispatch() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let svc = service(source.clone(), handler.clone());

        let mut d = delivery(9, "known");
        d.envelope.raw_log.removed = true;
        svc.process_delivery(d).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(source.acked.lock().unwrap().contains(&9));
    }

    #[tokio::test]
    async fn test_run_refuses_empty_registry() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let svc = ProjectorService::new(
            ProjectorConfig::default(),
            source,
            Arc::new(StubDecoder),
            Arc::new(HandlerRegistry::new()),
        );
        let (_tx, rx) = tokio::sync::watch::channel(false);

        let err = svc.run(rx).await.unwrap_err();
        assert!(matches!(err, ProjectorError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let source = Arc::new(ScriptedSource::new(vec![delivery(1, "known")]));
        let handler = Arc::new(RecordingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let svc = service(source.clone(), handler);
        let (tx, rx) = tokio::sync::watch::channel(false);

        let run = tokio::spawn(async move { svc.run(rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, ProjectorError::ShutdownRequested));
        // Le lot initial a été traité avant l'arrêt
        assert!(source.acked.lock().unwrap().contains(&1));
    }
}
