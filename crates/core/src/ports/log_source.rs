//! Port trait for the event delivery channel.
//!
//! The delivery channel supplies raw chain logs with at-least-once
//! semantics: a delivery that is polled but never acknowledged comes back
//! after its lease expires, possibly more than once and possibly out of
//! order across streams. Implementations live in the infrastructure
//! layer (e.g. `tally-storage`).

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeliveryResult;

// =============================================================================
// Raw log input
// =============================================================================

/// A raw EVM log as delivered by the dispatcher, before decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvmLog {
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_index: u32,
    /// True if the log was removed by a reorg; such logs are never projected.
    pub removed: bool,
    /// Emitting contract address.
    pub address: Address,
    /// Non-indexed parameters, ABI-encoded.
    pub data: Bytes,
    /// Ordered indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    pub transaction_hash: B256,
    pub log_index: u32,
}

impl RawEvmLog {
    /// Event signature hash (`topics[0]`), if present.
    pub fn signature(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Block metadata accompanying a raw log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    pub number: u64,
    pub hash: B256,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub parent_hash: B256,
    pub miner: Address,
    pub gas_limit: u64,
    pub logs_bloom: Bytes,
}

/// How a delivery is keyed into the decoder registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKey {
    /// keccak256 topic0 hash of an on-chain event.
    Signature(B256),
    /// Literal logical name for events with no on-chain signature.
    Logical(String),
}

/// Descriptor of the stream a log was captured from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub eth_chain_id: u64,
    pub event_key: EventKey,
}

/// A raw log plus everything needed to decode it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEnvelope {
    pub source: EventSource,
    pub raw_log: RawEvmLog,
    pub block: BlockMeta,
}

// =============================================================================
// Delivery
// =============================================================================

/// One at-least-once delivery of a log envelope.
#[derive(Debug, Clone)]
pub struct LogDelivery {
    /// Channel-assigned delivery identifier, used for acknowledgement.
    pub delivery_id: i64,
    /// How many times this envelope has been handed out (1 = first attempt).
    pub attempts: i32,
    pub envelope: LogEnvelope,
}

/// Port trait for the at-least-once event delivery channel.
///
/// Contract: a polled delivery is leased, not consumed. Only `ack` makes
/// it permanent; an un-acked delivery reappears in a later `poll` once
/// its lease expires. Implementations decide lease duration and
/// dead-letter policy.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Lease up to `limit` pending deliveries.
    async fn poll(&self, limit: u32) -> DeliveryResult<Vec<LogDelivery>>;

    /// Mark a delivery as successfully processed.
    async fn ack(&self, delivery_id: i64) -> DeliveryResult<()>;
}
