//! Decoder registry: event key → decoder function.
//!
//! The registry is built once at startup and never mutated afterwards.
//! Lookup is O(1) by signature hash or logical name. An envelope whose
//! key is not registered decodes to `None` — the delivery is not for us.

use std::collections::HashMap;

use alloy_primitives::B256;
use tracing::debug;

use tally_core::error::{DecodeError, DomainResult};
use tally_core::models::ChainEvent;
use tally_core::ports::{EventKey, LogDecoder, LogEnvelope};

use crate::prediction_market::{
    decode_custom_event_created, decode_market_created, decode_market_resolved,
    decode_proposal_created, decode_proposal_resolved, decode_tokens_merged,
    decode_tokens_minted, decode_tokens_redeemed,
};
use crate::signatures::{
    market_created_topic, proposal_created_topic, CUSTOM_EVENT_CREATED_KEY,
    MARKET_RESOLVED_TOPIC, PROPOSAL_RESOLVED_TOPIC, TOKENS_MERGED_TOPIC, TOKENS_MINTED_TOPIC,
    TOKENS_REDEEMED_TOPIC,
};

type DecoderFn = fn(&LogEnvelope) -> Result<ChainEvent, DecodeError>;

/// Static dispatch table over every event the service understands.
pub struct DecoderRegistry {
    by_signature: HashMap<B256, DecoderFn>,
    by_logical_name: HashMap<&'static str, DecoderFn>,
}

impl DecoderRegistry {
    /// Build the registry with all prediction-market decoders installed.
    pub fn new() -> Self {
        let mut by_signature: HashMap<B256, DecoderFn> = HashMap::new();
        by_signature.insert(TOKENS_MINTED_TOPIC, decode_tokens_minted);
        by_signature.insert(TOKENS_MERGED_TOPIC, decode_tokens_merged);
        by_signature.insert(TOKENS_REDEEMED_TOPIC, decode_tokens_redeemed);
        by_signature.insert(PROPOSAL_RESOLVED_TOPIC, decode_proposal_resolved);
        by_signature.insert(MARKET_RESOLVED_TOPIC, decode_market_resolved);
        by_signature.insert(proposal_created_topic(), decode_proposal_created);
        by_signature.insert(market_created_topic(), decode_market_created);

        let mut by_logical_name: HashMap<&'static str, DecoderFn> = HashMap::new();
        by_logical_name.insert(CUSTOM_EVENT_CREATED_KEY, decode_custom_event_created);

        debug!(
            signatures = by_signature.len(),
            logical = by_logical_name.len(),
            "Decoder registry built"
        );

        Self {
            by_signature,
            by_logical_name,
        }
    }

    /// Number of registered event keys.
    pub fn len(&self) -> usize {
        self.by_signature.len() + self.by_logical_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty() && self.by_logical_name.is_empty()
    }

    fn lookup(&self, key: &EventKey) -> Option<DecoderFn> {
        match key {
            EventKey::Signature(sig) => self.by_signature.get(sig).copied(),
            EventKey::Logical(name) => self.by_logical_name.get(name.as_str()).copied(),
        }
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDecoder for DecoderRegistry {
    fn decode(&self, envelope: &LogEnvelope) -> DomainResult<Option<ChainEvent>> {
        match self.lookup(&envelope.source.event_key) {
            Some(decoder) => Ok(Some(decoder(envelope)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, Address, Bytes, U256};
    use tally_core::ports::{BlockMeta, EventSource, RawEvmLog};

    fn envelope(key: EventKey, topics: Vec<B256>, data: Vec<u8>) -> LogEnvelope {
        LogEnvelope {
            source: EventSource {
                eth_chain_id: 8453,
                event_key: key,
            },
            raw_log: RawEvmLog {
                block_number: 100,
                block_hash: B256::ZERO,
                transaction_index: 0,
                removed: false,
                address: address!("0000000000000000000000000000000000000001"),
                data: Bytes::from(data),
                topics,
                transaction_hash: b256!(
                    "abcdef0000000000000000000000000000000000000000000000000000000001"
                ),
                log_index: 0,
            },
            block: BlockMeta {
                number: 100,
                hash: B256::ZERO,
                timestamp: 1_700_000_000,
                parent_hash: B256::ZERO,
                miner: Address::ZERO,
                gas_limit: 30_000_000,
                logs_bloom: Bytes::new(),
            },
        }
    }

    // Test critique: le registre route par signature vers le bon décodeur
    #[test]
    fn test_registry_routes_by_signature() {
        let registry = DecoderRegistry::new();
        let market_id =
            b256!("1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef");
        let trader =
            b256!("0000000000000000000000001234567890123456789012345678901234567890");

        let env = envelope(
            EventKey::Signature(TOKENS_MINTED_TOPIC),
            vec![TOKENS_MINTED_TOPIC, market_id, trader],
            U256::from(5u64).to_be_bytes::<32>().to_vec(),
        );

        let event = registry.decode(&env).unwrap().unwrap();
        assert_eq!(event.event_name(), "PredictionMarketTokensMinted");
    }

    // Test critique: clé non enregistrée = Ok(None), jamais une erreur
    #[test]
    fn test_unregistered_signature_decodes_to_none() {
        let registry = DecoderRegistry::new();
        let unknown = b256!("00000000000000000000000000000000000000000000000000000000000000ff");

        let env = envelope(EventKey::Signature(unknown), vec![unknown], vec![]);
        assert!(registry.decode(&env).unwrap().is_none());

        let env = envelope(EventKey::Logical("NotOurEvent".into()), vec![], vec![]);
        assert!(registry.decode(&env).unwrap().is_none());
    }

    #[test]
    fn test_logical_key_routes_to_custom_event() {
        let registry = DecoderRegistry::new();
        let env = envelope(
            EventKey::Logical(CUSTOM_EVENT_CREATED_KEY.into()),
            vec![],
            vec![],
        );

        let event = registry.decode(&env).unwrap().unwrap();
        assert_eq!(event.event_name(), "CustomChainEventCreated");
    }

    #[test]
    fn test_registered_key_with_malformed_log_is_an_error() {
        let registry = DecoderRegistry::new();
        // Signature enregistrée mais topics manquants
        let env = envelope(
            EventKey::Signature(TOKENS_MINTED_TOPIC),
            vec![TOKENS_MINTED_TOPIC],
            vec![],
        );

        assert!(registry.decode(&env).is_err());
    }

    #[test]
    fn test_registry_covers_all_known_events() {
        let registry = DecoderRegistry::new();
        // 7 signatures + 1 nom logique
        assert_eq!(registry.len(), 8);
    }
}
