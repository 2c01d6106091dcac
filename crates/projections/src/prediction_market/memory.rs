//! In-memory storage used by unit tests.
//!
//! Mirrors the transactional semantics of the Postgres implementation:
//! guarded status updates, conditional trade insert on the natural key,
//! signed accumulation on positions and the market total.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use alloy_primitives::{Address, B256, I256};
use tally_core::error::{StorageError, StorageResult};
use tally_core::models::{MarketStatus, Outcome, TokenFlow, TradeAction};

use super::models::{Deployment, Position, PredictionMarket, Trade};
use super::storage::{
    NewMarket, PredictionMarketStorage, ResolutionOutcome, TradeOutcome,
};

#[derive(Default)]
struct State {
    markets: Vec<PredictionMarket>,
    trades: Vec<Trade>,
    positions: Vec<Position>,
}

pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn trade_count(&self) -> usize {
        self.state.lock().unwrap().trades.len()
    }

    pub fn position_count(&self) -> usize {
        self.state.lock().unwrap().positions.len()
    }
}

fn signed(amount: alloy_primitives::U256) -> I256 {
    I256::try_from(amount).unwrap()
}

#[async_trait]
impl PredictionMarketStorage for MemoryStorage {
    async fn create_market(&self, market: &NewMarket) -> StorageResult<PredictionMarket> {
        let mut state = self.state.lock().unwrap();
        if state.markets.iter().any(|m| m.thread_id == market.thread_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "thread {} already has a prediction market",
                market.thread_id
            )));
        }

        let now = Utc::now();
        let created = PredictionMarket {
            id: state.markets.len() as i64 + 1,
            thread_id: market.thread_id,
            eth_chain_id: market.eth_chain_id,
            collateral_address: market.collateral_address,
            creator_address: market.creator_address,
            prompt: market.prompt.clone(),
            status: MarketStatus::Draft,
            duration_secs: market.duration_secs,
            resolution_threshold: market.resolution_threshold,
            deployment: None,
            proposal_id: None,
            market_id: None,
            total_collateral: I256::ZERO,
            winner: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        state.markets.push(created.clone());
        Ok(created)
    }

    async fn activate_market(&self, id: i64, deployment: &Deployment) -> StorageResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .markets
            .iter_mut()
            .find(|m| m.id == id && m.status == MarketStatus::Draft)
        {
            Some(market) => {
                market.status = MarketStatus::Active;
                market.deployment = Some(deployment.clone());
                market.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel_market(&self, id: i64) -> StorageResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .markets
            .iter_mut()
            .find(|m| m.id == id && !m.status.is_terminal())
        {
            Some(market) => {
                market.status = MarketStatus::Cancelled;
                market.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resolve_market(
        &self,
        id: i64,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .markets
            .iter_mut()
            .find(|m| m.id == id && m.status == MarketStatus::Active)
        {
            Some(market) => {
                market.status = MarketStatus::Resolved;
                market.winner = Some(winner);
                market.resolved_at = Some(resolved_at);
                market.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn confirm_proposal(
        &self,
        prediction_market_id: i64,
        proposal_id: B256,
    ) -> StorageResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .markets
            .iter_mut()
            .find(|m| m.id == prediction_market_id)
        {
            Some(market) => {
                market.proposal_id = Some(proposal_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn confirm_market(
        &self,
        prediction_market_id: i64,
        market_id: B256,
    ) -> StorageResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .markets
            .iter_mut()
            .find(|m| m.id == prediction_market_id)
        {
            Some(market) => {
                market.market_id = Some(market_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn resolve_onchain(
        &self,
        market_id: B256,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<ResolutionOutcome> {
        let mut state = self.state.lock().unwrap();
        let Some(market) = state
            .markets
            .iter_mut()
            .find(|m| m.market_id == Some(market_id))
        else {
            return Ok(ResolutionOutcome::UnknownMarket);
        };

        if market.status.is_terminal() {
            return Ok(ResolutionOutcome::AlreadySettled);
        }

        market.status = MarketStatus::Resolved;
        market.winner = Some(winner);
        market.resolved_at = Some(resolved_at);
        market.updated_at = Utc::now();
        Ok(ResolutionOutcome::Resolved)
    }

    async fn apply_trade(
        &self,
        action: TradeAction,
        flow: &TokenFlow,
    ) -> StorageResult<TradeOutcome> {
        let mut state = self.state.lock().unwrap();

        let Some(market_row_id) = state
            .markets
            .iter()
            .find(|m| m.market_id == Some(flow.market_id))
            .map(|m| m.id)
        else {
            return Ok(TradeOutcome::UnknownMarket);
        };

        if state.trades.iter().any(|t| {
            t.eth_chain_id == flow.eth_chain_id && t.transaction_hash == flow.transaction_hash
        }) {
            return Ok(TradeOutcome::Duplicate);
        }

        let next_trade_id = state.trades.len() as i64 + 1;
        state.trades.push(Trade {
            id: next_trade_id,
            prediction_market_id: market_row_id,
            eth_chain_id: flow.eth_chain_id,
            transaction_hash: flow.transaction_hash,
            trader_address: flow.trader_address,
            action,
            collateral_amount: flow.collateral_amount,
            p_token_amount: flow.p_token_amount,
            f_token_amount: flow.f_token_amount,
            timestamp: flow.timestamp,
        });

        let (p_delta, f_delta, collateral_in_delta, total_delta) = match action {
            TradeAction::Mint => (
                signed(flow.p_token_amount),
                signed(flow.f_token_amount),
                signed(flow.collateral_amount),
                signed(flow.collateral_amount),
            ),
            TradeAction::Merge => (
                -signed(flow.p_token_amount),
                -signed(flow.f_token_amount),
                I256::ZERO,
                -signed(flow.collateral_amount),
            ),
            TradeAction::Redeem => (
                -signed(flow.p_token_amount),
                -signed(flow.f_token_amount),
                I256::ZERO,
                I256::ZERO,
            ),
        };

        let next_position_id = state.positions.len() as i64 + 1;
        match state.positions.iter_mut().find(|p| {
            p.prediction_market_id == market_row_id && p.user_address == flow.trader_address
        }) {
            Some(position) => {
                position.p_token_balance += p_delta;
                position.f_token_balance += f_delta;
                position.total_collateral_in += collateral_in_delta;
                position.updated_at = Utc::now();
            }
            None => state.positions.push(Position {
                id: next_position_id,
                prediction_market_id: market_row_id,
                user_address: flow.trader_address,
                p_token_balance: p_delta,
                f_token_balance: f_delta,
                total_collateral_in: collateral_in_delta,
                updated_at: Utc::now(),
            }),
        }

        if !total_delta.is_zero() {
            if let Some(market) = state.markets.iter_mut().find(|m| m.id == market_row_id) {
                market.total_collateral += total_delta;
            }
        }

        Ok(TradeOutcome::Applied)
    }

    async fn get_market(&self, id: i64) -> StorageResult<Option<PredictionMarket>> {
        let state = self.state.lock().unwrap();
        Ok(state.markets.iter().find(|m| m.id == id).cloned())
    }

    async fn get_market_by_thread(
        &self,
        thread_id: i64,
    ) -> StorageResult<Option<PredictionMarket>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .markets
            .iter()
            .find(|m| m.thread_id == thread_id)
            .cloned())
    }

    async fn find_market_by_onchain_id(
        &self,
        market_id: B256,
    ) -> StorageResult<Option<PredictionMarket>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .markets
            .iter()
            .find(|m| m.market_id == Some(market_id))
            .cloned())
    }

    async fn get_trade(
        &self,
        eth_chain_id: u64,
        transaction_hash: B256,
    ) -> StorageResult<Option<Trade>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .trades
            .iter()
            .find(|t| t.eth_chain_id == eth_chain_id && t.transaction_hash == transaction_hash)
            .cloned())
    }

    async fn get_position(
        &self,
        prediction_market_id: i64,
        user_address: Address,
    ) -> StorageResult<Option<Position>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .positions
            .iter()
            .find(|p| {
                p.prediction_market_id == prediction_market_id && p.user_address == user_address
            })
            .cloned())
    }
}
