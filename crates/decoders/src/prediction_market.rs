//! Pure decoders for the prediction-market event family.
//!
//! Each decoder takes a raw log envelope and produces exactly one
//! [`ChainEvent`] variant, or fails with a [`DecodeError`] when the log
//! does not match the fixed ABI shape of its signature. No I/O, no
//! shared state.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};

use tally_core::error::DecodeError;
use tally_core::models::{
    ChainEvent, CustomEventNotice, DeploymentConfirmation, MarketResolution, Outcome, TokenFlow,
};
use tally_core::ports::LogEnvelope;

use crate::words::{
    data_i64, data_u256, data_u8, require_topics, topic_address, topic_b256,
};

/// Block timestamp as a UTC datetime.
fn block_time(envelope: &LogEnvelope) -> DateTime<Utc> {
    DateTime::from_timestamp(envelope.block.timestamp as i64, 0).unwrap_or_else(Utc::now)
}

/// Shared shape of mint and merge: `(bytes32 indexed market_id,
/// address indexed trader, uint256 amount)`. Minting and merging move
/// equal amounts of collateral and both outcome tokens.
fn decode_token_pair_flow(
    event: &'static str,
    envelope: &LogEnvelope,
) -> Result<TokenFlow, DecodeError> {
    let log = &envelope.raw_log;
    require_topics(event, &log.topics, 3)?;

    let amount = data_u256(event, &log.data, 0)?;

    Ok(TokenFlow {
        market_id: topic_b256(&log.topics, 1),
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: log.transaction_hash,
        trader_address: topic_address(event, &log.topics, 2)?,
        collateral_amount: amount,
        p_token_amount: amount,
        f_token_amount: amount,
        timestamp: block_time(envelope),
    })
}

pub fn decode_tokens_minted(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    decode_token_pair_flow("PredictionMarketTokensMinted", envelope).map(ChainEvent::TokensMinted)
}

pub fn decode_tokens_merged(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    decode_token_pair_flow("PredictionMarketTokensMerged", envelope).map(ChainEvent::TokensMerged)
}

/// `(bytes32 indexed market_id, address indexed trader, uint256 amount,
/// uint8 outcome)`. The outcome discriminant decides which token side the
/// redeemed amount applies to; the other side is zero.
pub fn decode_tokens_redeemed(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    const EVENT: &str = "PredictionMarketTokensRedeemed";
    let log = &envelope.raw_log;
    require_topics(EVENT, &log.topics, 3)?;

    let amount = data_u256(EVENT, &log.data, 0)?;
    let outcome_code = data_u8(EVENT, "outcome", &log.data, 1)?;
    let (p_token_amount, f_token_amount) = match Outcome::from_code(outcome_code) {
        Some(Outcome::Pass) => (amount, U256::ZERO),
        Some(Outcome::Fail) => (U256::ZERO, amount),
        None => {
            return Err(DecodeError::InvalidDiscriminant {
                event: EVENT,
                field: "outcome",
                value: outcome_code,
            });
        }
    };

    Ok(ChainEvent::TokensRedeemed(TokenFlow {
        market_id: topic_b256(&log.topics, 1),
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: log.transaction_hash,
        trader_address: topic_address(EVENT, &log.topics, 2)?,
        collateral_amount: amount,
        p_token_amount,
        f_token_amount,
        timestamp: block_time(envelope),
    }))
}

/// Winner discriminant shared by both resolution events.
fn decode_winner(event: &'static str, data: &[u8]) -> Result<Outcome, DecodeError> {
    let code = data_u8(event, "winner", data, 0)?;
    Outcome::from_code(code).ok_or(DecodeError::InvalidDiscriminant {
        event,
        field: "winner",
        value: code,
    })
}

/// `(bytes32 indexed proposal_id, bytes32 indexed market_id, uint8 winner)`.
pub fn decode_proposal_resolved(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    const EVENT: &str = "PredictionMarketProposalResolved";
    let log = &envelope.raw_log;
    require_topics(EVENT, &log.topics, 3)?;

    Ok(ChainEvent::ProposalResolved(MarketResolution {
        proposal_id: Some(topic_b256(&log.topics, 1)),
        market_id: topic_b256(&log.topics, 2),
        winner: decode_winner(EVENT, &log.data)?,
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: log.transaction_hash,
        timestamp: block_time(envelope),
    }))
}

/// `(bytes32 indexed market_id, uint8 winner)`.
pub fn decode_market_resolved(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    const EVENT: &str = "PredictionMarketMarketResolved";
    let log = &envelope.raw_log;
    require_topics(EVENT, &log.topics, 2)?;

    Ok(ChainEvent::MarketResolved(MarketResolution {
        proposal_id: None,
        market_id: topic_b256(&log.topics, 1),
        winner: decode_winner(EVENT, &log.data)?,
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: log.transaction_hash,
        timestamp: block_time(envelope),
    }))
}

/// Shared shape of the factory confirmation events: `(bytes32 indexed
/// onchain_id, uint256 prediction_market_id)`. The data word carries our
/// internal market row id, embedded in the deploy transaction.
fn decode_deployment_confirmation(
    event: &'static str,
    envelope: &LogEnvelope,
) -> Result<DeploymentConfirmation, DecodeError> {
    let log = &envelope.raw_log;
    require_topics(event, &log.topics, 2)?;

    Ok(DeploymentConfirmation {
        prediction_market_id: data_i64(event, "prediction_market_id", &log.data, 0)?,
        onchain_id: topic_b256(&log.topics, 1),
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: log.transaction_hash,
        timestamp: block_time(envelope),
    })
}

pub fn decode_proposal_created(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    decode_deployment_confirmation("PredictionMarketProposalCreated", envelope)
        .map(ChainEvent::ProposalCreated)
}

pub fn decode_market_created(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    decode_deployment_confirmation("PredictionMarketMarketCreated", envelope)
        .map(ChainEvent::MarketCreated)
}

/// Locally synthesized notification: no topics, no data, just the
/// transaction context and block time.
pub fn decode_custom_event_created(envelope: &LogEnvelope) -> Result<ChainEvent, DecodeError> {
    Ok(ChainEvent::CustomEventCreated(CustomEventNotice {
        eth_chain_id: envelope.source.eth_chain_id,
        transaction_hash: envelope.raw_log.transaction_hash,
        created_at: block_time(envelope),
    }))
}
