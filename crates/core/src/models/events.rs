//! Typed chain events produced by the decoder layer.
//!
//! This is the closed sum type covering every event payload the
//! projection consumes. Decoders return exactly one variant per raw log;
//! projection handlers match exhaustively, so adding a variant forces
//! every consumer to handle it at compile time.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Outcome;

// =============================================================================
// Payloads
// =============================================================================

/// On-chain confirmation that a proposal or market deployment landed.
///
/// Carries the internal market row id (embedded in the deployment
/// transaction) and the on-chain identifier to link to it. Redelivery is
/// harmless: the same value is written again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfirmation {
    /// Internal `prediction_markets.id` the deployment belongs to.
    pub prediction_market_id: i64,
    /// On-chain identifier (proposal id or market id, depending on event).
    pub onchain_id: B256,
    pub eth_chain_id: u64,
    pub transaction_hash: B256,
    pub timestamp: DateTime<Utc>,
}

/// On-chain resolution of a market, from either the governor
/// (`ProposalResolved`) or the vault (`MarketResolved`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketResolution {
    /// Governor proposal id; absent for vault-side resolution events.
    pub proposal_id: Option<B256>,
    /// On-chain market id.
    pub market_id: B256,
    pub winner: Outcome,
    pub eth_chain_id: u64,
    pub transaction_hash: B256,
    pub timestamp: DateTime<Utc>,
}

/// A ledger-affecting token movement: mint, merge, or redeem.
///
/// Amounts are unsigned 256-bit integers, never floats. For mint and
/// merge, collateral, p-token, and f-token amounts are all equal. For
/// redeem, exactly one of the two token amounts is non-zero (decided by
/// the outcome discriminant at decode time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlow {
    /// On-chain market id.
    pub market_id: B256,
    pub eth_chain_id: u64,
    /// Natural idempotency key together with `eth_chain_id`: one on-chain
    /// transaction produces exactly one ledger trade.
    pub transaction_hash: B256,
    pub trader_address: Address,
    pub collateral_amount: U256,
    pub p_token_amount: U256,
    pub f_token_amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// Locally synthesized notification with no on-chain signature.
///
/// Keyed in the decoder registry by a literal logical name instead of a
/// topic hash. Consumed by out-of-scope projections (reward engines);
/// decoded here so the registry contract is uniform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEventNotice {
    pub eth_chain_id: u64,
    pub transaction_hash: B256,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ChainEvent
// =============================================================================

/// Every typed event the decoder layer can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_name", content = "event_payload")]
pub enum ChainEvent {
    #[serde(rename = "PredictionMarketProposalCreated")]
    ProposalCreated(DeploymentConfirmation),
    #[serde(rename = "PredictionMarketMarketCreated")]
    MarketCreated(DeploymentConfirmation),
    #[serde(rename = "PredictionMarketProposalResolved")]
    ProposalResolved(MarketResolution),
    #[serde(rename = "PredictionMarketMarketResolved")]
    MarketResolved(MarketResolution),
    #[serde(rename = "PredictionMarketTokensMinted")]
    TokensMinted(TokenFlow),
    #[serde(rename = "PredictionMarketTokensMerged")]
    TokensMerged(TokenFlow),
    #[serde(rename = "PredictionMarketTokensRedeemed")]
    TokensRedeemed(TokenFlow),
    #[serde(rename = "CustomChainEventCreated")]
    CustomEventCreated(CustomEventNotice),
}

impl ChainEvent {
    /// Stable event name used for handler dispatch and logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChainEvent::ProposalCreated(_) => "PredictionMarketProposalCreated",
            ChainEvent::MarketCreated(_) => "PredictionMarketMarketCreated",
            ChainEvent::ProposalResolved(_) => "PredictionMarketProposalResolved",
            ChainEvent::MarketResolved(_) => "PredictionMarketMarketResolved",
            ChainEvent::TokensMinted(_) => "PredictionMarketTokensMinted",
            ChainEvent::TokensMerged(_) => "PredictionMarketTokensMerged",
            ChainEvent::TokensRedeemed(_) => "PredictionMarketTokensRedeemed",
            ChainEvent::CustomEventCreated(_) => "CustomChainEventCreated",
        }
    }

    /// Chain id the event originated on.
    pub fn eth_chain_id(&self) -> u64 {
        match self {
            ChainEvent::ProposalCreated(p) | ChainEvent::MarketCreated(p) => p.eth_chain_id,
            ChainEvent::ProposalResolved(p) | ChainEvent::MarketResolved(p) => p.eth_chain_id,
            ChainEvent::TokensMinted(p)
            | ChainEvent::TokensMerged(p)
            | ChainEvent::TokensRedeemed(p) => p.eth_chain_id,
            ChainEvent::CustomEventCreated(p) => p.eth_chain_id,
        }
    }
}
