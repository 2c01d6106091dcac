//! Models for the prediction-market projection.

use alloy_primitives::{Address, B256, I256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::models::{MarketStatus, Outcome, TradeAction};

/// A binary prediction market anchored to a discussion thread (1:1).
///
/// Created in `Draft` by the create command; deployment addresses and
/// on-chain ids are filled in later by the deploy command and the
/// factory confirmation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionMarket {
    pub id: i64,
    /// Owning discussion thread. One market per thread.
    pub thread_id: i64,
    pub eth_chain_id: u64,
    pub collateral_address: Address,
    pub creator_address: Address,
    /// The question the market resolves.
    pub prompt: String,
    pub status: MarketStatus,
    /// Trading window length in seconds.
    pub duration_secs: i64,
    /// Fraction of PASS-token supply needed to resolve PASS.
    pub resolution_threshold: f64,
    pub deployment: Option<Deployment>,
    /// On-chain governor proposal id, set by `ProposalCreated`.
    pub proposal_id: Option<B256>,
    /// On-chain market id, set by `MarketCreated`. Ledger events are
    /// matched against this.
    pub market_id: Option<B256>,
    /// Running algebraic sum of signed per-event collateral deltas.
    /// Non-negative under correct operation; a negative value means the
    /// event feed double-applied or skipped something upstream.
    pub total_collateral: I256,
    pub winner: Option<Outcome>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contract addresses and trading window, set when the market is deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub vault_address: Address,
    pub governor_address: Address,
    pub router_address: Address,
    pub strategy_address: Address,
    pub p_token_address: Address,
    pub f_token_address: Address,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Append-only audit row for one ledger-affecting on-chain transaction.
///
/// Uniquely keyed by `(eth_chain_id, transaction_hash)`: one on-chain
/// transaction produces exactly one trade. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub prediction_market_id: i64,
    pub eth_chain_id: u64,
    pub transaction_hash: B256,
    pub trader_address: Address,
    pub action: TradeAction,
    pub collateral_amount: U256,
    pub p_token_amount: U256,
    pub f_token_amount: U256,
    pub timestamp: DateTime<Utc>,
}

/// Mutable per-trader accumulator, uniquely keyed by
/// `(prediction_market_id, user_address)`.
///
/// Balances are updated by atomic accumulation: increment on mint,
/// decrement on merge, decrement of only the relevant side on redeem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub prediction_market_id: i64,
    pub user_address: Address,
    pub p_token_balance: I256,
    pub f_token_balance: I256,
    /// Total collateral this trader has deposited via mints.
    pub total_collateral_in: I256,
    pub updated_at: DateTime<Utc>,
}
