//! Storage layer for the prediction-market projection.
//!
//! All ledger mutations happen here, inside single transactions, with
//! accumulation done as atomic SQL increments rather than application
//! level read-modify-write. Idempotency is explicit: the trade insert is
//! conditional on its natural key and the rest of the transaction only
//! runs when the insert landed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use alloy_primitives::{Address, B256, I256, U256};
use tally_core::error::{StorageError, StorageResult};
use tally_core::models::{MarketStatus, Outcome, TokenFlow, TradeAction};

use super::models::{Deployment, Position, PredictionMarket, Trade};

// =============================================================================
// Storage trait
// =============================================================================

/// New market attributes supplied by the create command.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub thread_id: i64,
    pub eth_chain_id: u64,
    pub collateral_address: Address,
    pub creator_address: Address,
    pub prompt: String,
    pub duration_secs: i64,
    pub resolution_threshold: f64,
}

/// Outcome of applying a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    /// Trade inserted, position and market totals updated.
    Applied,
    /// Natural key already present; nothing modified.
    Duplicate,
    /// No local market row for the on-chain market id; nothing modified.
    UnknownMarket,
}

/// Outcome of an on-chain resolution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Market transitioned to resolved with this event's winner.
    Resolved,
    /// Market already terminal; winner and resolved_at left untouched.
    AlreadySettled,
    /// No local market row for the on-chain market id.
    UnknownMarket,
}

/// Storage trait for prediction-market projection data.
#[async_trait]
pub trait PredictionMarketStorage: Send + Sync {
    /// Insert a new market in `Draft` for a thread.
    async fn create_market(&self, market: &NewMarket) -> StorageResult<PredictionMarket>;

    /// Set deployment addresses and move `Draft → Active`.
    /// Returns false if the market was not in `Draft`.
    async fn activate_market(&self, id: i64, deployment: &Deployment) -> StorageResult<bool>;

    /// Move `{Draft, Active} → Cancelled`.
    /// Returns false if the market was in neither state.
    async fn cancel_market(&self, id: i64) -> StorageResult<bool>;

    /// Move `Active → Resolved` with the given winner (command path).
    /// Returns false if the market was not `Active`.
    async fn resolve_market(
        &self,
        id: i64,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Record the on-chain proposal id on a market row. Returns false if
    /// the row does not exist. Re-delivery writes the same value again.
    async fn confirm_proposal(&self, prediction_market_id: i64, proposal_id: B256)
        -> StorageResult<bool>;

    /// Record the on-chain market id on a market row. Returns false if
    /// the row does not exist.
    async fn confirm_market(&self, prediction_market_id: i64, market_id: B256)
        -> StorageResult<bool>;

    /// Apply an on-chain resolution, first writer wins: terminal markets
    /// are never modified, whatever winner the event carries.
    async fn resolve_onchain(
        &self,
        market_id: B256,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<ResolutionOutcome>;

    /// Apply a mint/merge/redeem event: one trade row, atomic position
    /// and market-total accumulation, all in one transaction.
    async fn apply_trade(&self, action: TradeAction, flow: &TokenFlow)
        -> StorageResult<TradeOutcome>;

    async fn get_market(&self, id: i64) -> StorageResult<Option<PredictionMarket>>;

    async fn get_market_by_thread(&self, thread_id: i64)
        -> StorageResult<Option<PredictionMarket>>;

    async fn find_market_by_onchain_id(&self, market_id: B256)
        -> StorageResult<Option<PredictionMarket>>;

    async fn get_trade(
        &self,
        eth_chain_id: u64,
        transaction_hash: B256,
    ) -> StorageResult<Option<Trade>>;

    async fn get_position(
        &self,
        prediction_market_id: i64,
        user_address: Address,
    ) -> StorageResult<Option<Position>>;
}

// =============================================================================
// PostgreSQL implementation
// =============================================================================

/// PostgreSQL implementation of PredictionMarketStorage.
pub struct PgPredictionMarketStorage {
    pool: PgPool,
}

impl PgPredictionMarketStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MARKET_COLUMNS: &str = r#"
    id, thread_id, eth_chain_id, collateral_address, creator_address, prompt,
    status, duration_secs, resolution_threshold,
    vault_address, governor_address, router_address, strategy_address,
    p_token_address, f_token_address, start_time, end_time,
    proposal_id, market_id, total_collateral::TEXT, winner, resolved_at,
    created_at, updated_at
"#;

#[async_trait]
impl PredictionMarketStorage for PgPredictionMarketStorage {
    async fn create_market(&self, market: &NewMarket) -> StorageResult<PredictionMarket> {
        let query = format!(
            r#"
            INSERT INTO prediction_markets (
                thread_id, eth_chain_id, collateral_address, creator_address,
                prompt, status, duration_secs, resolution_threshold
            )
            VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7)
            RETURNING {MARKET_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, MarketRow>(&query)
            .bind(market.thread_id)
            .bind(market.eth_chain_id as i64)
            .bind(market.collateral_address.as_slice())
            .bind(market.creator_address.as_slice())
            .bind(&market.prompt)
            .bind(market.duration_secs)
            .bind(market.resolution_threshold)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StorageError::ConstraintViolation(format!(
                        "thread {} already has a prediction market",
                        market.thread_id
                    ))
                }
                _ => StorageError::QueryError(e.to_string()),
            })?;

        row.into_market()
    }

    async fn activate_market(&self, id: i64, deployment: &Deployment) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prediction_markets
            SET status = 'active',
                vault_address = $2, governor_address = $3, router_address = $4,
                strategy_address = $5, p_token_address = $6, f_token_address = $7,
                start_time = $8, end_time = $9, updated_at = now()
            WHERE id = $1 AND status = 'draft'
            "#,
        )
        .bind(id)
        .bind(deployment.vault_address.as_slice())
        .bind(deployment.governor_address.as_slice())
        .bind(deployment.router_address.as_slice())
        .bind(deployment.strategy_address.as_slice())
        .bind(deployment.p_token_address.as_slice())
        .bind(deployment.f_token_address.as_slice())
        .bind(deployment.start_time)
        .bind(deployment.end_time)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_market(&self, id: i64) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prediction_markets
            SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status IN ('draft', 'active')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn resolve_market(
        &self,
        id: i64,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prediction_markets
            SET status = 'resolved', winner = $2, resolved_at = $3, updated_at = now()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(winner.code() as i16)
        .bind(resolved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn confirm_proposal(
        &self,
        prediction_market_id: i64,
        proposal_id: B256,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE prediction_markets SET proposal_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(prediction_market_id)
        .bind(proposal_id.as_slice())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn confirm_market(
        &self,
        prediction_market_id: i64,
        market_id: B256,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE prediction_markets SET market_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(prediction_market_id)
        .bind(market_id.as_slice())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn resolve_onchain(
        &self,
        market_id: B256,
        winner: Outcome,
        resolved_at: DateTime<Utc>,
    ) -> StorageResult<ResolutionOutcome> {
        // First writer wins: the guard never lets a second resolution
        // (or a resolution of a cancelled market) overwrite anything.
        let result = sqlx::query(
            r#"
            UPDATE prediction_markets
            SET status = 'resolved', winner = $2, resolved_at = $3, updated_at = now()
            WHERE market_id = $1 AND status NOT IN ('resolved', 'cancelled')
            "#,
        )
        .bind(market_id.as_slice())
        .bind(winner.code() as i16)
        .bind(resolved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(ResolutionOutcome::Resolved);
        }

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM prediction_markets WHERE market_id = $1")
                .bind(market_id.as_slice())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(match exists {
            Some(_) => ResolutionOutcome::AlreadySettled,
            None => ResolutionOutcome::UnknownMarket,
        })
    }

    async fn apply_trade(
        &self,
        action: TradeAction,
        flow: &TokenFlow,
    ) -> StorageResult<TradeOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        // 1. Resolve the local market row by on-chain id.
        let market: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM prediction_markets WHERE market_id = $1")
                .bind(flow.market_id.as_slice())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let Some((market_row_id,)) = market else {
            return Ok(TradeOutcome::UnknownMarket);
        };

        // 2. Conditional insert on the natural key. Zero rows = the event
        //    was already applied; nothing else in this transaction runs.
        let inserted = sqlx::query(
            r#"
            INSERT INTO prediction_market_trades (
                prediction_market_id, eth_chain_id, transaction_hash,
                trader_address, action, collateral_amount, p_token_amount,
                f_token_amount, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6::NUMERIC, $7::NUMERIC, $8::NUMERIC, $9)
            ON CONFLICT (eth_chain_id, transaction_hash) DO NOTHING
            "#,
        )
        .bind(market_row_id)
        .bind(flow.eth_chain_id as i64)
        .bind(flow.transaction_hash.as_slice())
        .bind(flow.trader_address.as_slice())
        .bind(action.as_str())
        .bind(flow.collateral_amount.to_string())
        .bind(flow.p_token_amount.to_string())
        .bind(flow.f_token_amount.to_string())
        .bind(flow.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if inserted.rows_affected() == 0 {
            return Ok(TradeOutcome::Duplicate);
        }

        // 3. Accumulate the position with signed deltas. Mint creates the
        //    row if absent; merge and redeem accumulate negatively.
        let deltas = PositionDeltas::for_action(action, flow);
        let balances: (String, String) = sqlx::query_as(
            r#"
            INSERT INTO prediction_market_positions (
                prediction_market_id, user_address,
                p_token_balance, f_token_balance, total_collateral_in
            )
            VALUES ($1, $2, $3::NUMERIC, $4::NUMERIC, $5::NUMERIC)
            ON CONFLICT (prediction_market_id, user_address) DO UPDATE SET
                p_token_balance = prediction_market_positions.p_token_balance
                    + EXCLUDED.p_token_balance,
                f_token_balance = prediction_market_positions.f_token_balance
                    + EXCLUDED.f_token_balance,
                total_collateral_in = prediction_market_positions.total_collateral_in
                    + EXCLUDED.total_collateral_in,
                updated_at = now()
            RETURNING p_token_balance::TEXT, f_token_balance::TEXT
            "#,
        )
        .bind(market_row_id)
        .bind(flow.trader_address.as_slice())
        .bind(&deltas.p_token)
        .bind(&deltas.f_token)
        .bind(&deltas.collateral_in)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if balances.0.starts_with('-') || balances.1.starts_with('-') {
            warn!(
                market = market_row_id,
                trader = %flow.trader_address,
                p_balance = %balances.0,
                f_balance = %balances.1,
                "⚠️  Position balance went negative, upstream feed is inconsistent"
            );
        }

        // 4. Market total moves on mint and merge only; redemption pays
        //    out of the winning side without touching the pooled total.
        if let Some(total_delta) = deltas.market_total {
            sqlx::query(
                r#"
                UPDATE prediction_markets
                SET total_collateral = total_collateral + $2::NUMERIC, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(market_row_id)
            .bind(&total_delta)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(TradeOutcome::Applied)
    }

    async fn get_market(&self, id: i64) -> StorageResult<Option<PredictionMarket>> {
        let query = format!("SELECT {MARKET_COLUMNS} FROM prediction_markets WHERE id = $1");
        let row = sqlx::query_as::<_, MarketRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(MarketRow::into_market).transpose()
    }

    async fn get_market_by_thread(
        &self,
        thread_id: i64,
    ) -> StorageResult<Option<PredictionMarket>> {
        let query = format!("SELECT {MARKET_COLUMNS} FROM prediction_markets WHERE thread_id = $1");
        let row = sqlx::query_as::<_, MarketRow>(&query)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(MarketRow::into_market).transpose()
    }

    async fn find_market_by_onchain_id(
        &self,
        market_id: B256,
    ) -> StorageResult<Option<PredictionMarket>> {
        let query = format!("SELECT {MARKET_COLUMNS} FROM prediction_markets WHERE market_id = $1");
        let row = sqlx::query_as::<_, MarketRow>(&query)
            .bind(market_id.as_slice())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(MarketRow::into_market).transpose()
    }

    async fn get_trade(
        &self,
        eth_chain_id: u64,
        transaction_hash: B256,
    ) -> StorageResult<Option<Trade>> {
        let row = sqlx::query_as::<_, TradeRow>(
            r#"
            SELECT id, prediction_market_id, eth_chain_id, transaction_hash,
                   trader_address, action, collateral_amount::TEXT,
                   p_token_amount::TEXT, f_token_amount::TEXT, timestamp
            FROM prediction_market_trades
            WHERE eth_chain_id = $1 AND transaction_hash = $2
            "#,
        )
        .bind(eth_chain_id as i64)
        .bind(transaction_hash.as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(TradeRow::into_trade).transpose()
    }

    async fn get_position(
        &self,
        prediction_market_id: i64,
        user_address: Address,
    ) -> StorageResult<Option<Position>> {
        let row = sqlx::query_as::<_, PositionRow>(
            r#"
            SELECT id, prediction_market_id, user_address,
                   p_token_balance::TEXT, f_token_balance::TEXT,
                   total_collateral_in::TEXT, updated_at
            FROM prediction_market_positions
            WHERE prediction_market_id = $1 AND user_address = $2
            "#,
        )
        .bind(prediction_market_id)
        .bind(user_address.as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(PositionRow::into_position).transpose()
    }
}

// =============================================================================
// Accumulation deltas
// =============================================================================

/// Signed decimal deltas for one position upsert, as NUMERIC literals.
struct PositionDeltas {
    p_token: String,
    f_token: String,
    collateral_in: String,
    /// None = market total untouched (redeem).
    market_total: Option<String>,
}

impl PositionDeltas {
    fn for_action(action: TradeAction, flow: &TokenFlow) -> Self {
        match action {
            TradeAction::Mint => Self {
                p_token: flow.p_token_amount.to_string(),
                f_token: flow.f_token_amount.to_string(),
                collateral_in: flow.collateral_amount.to_string(),
                market_total: Some(flow.collateral_amount.to_string()),
            },
            TradeAction::Merge => Self {
                p_token: negated(flow.p_token_amount),
                f_token: negated(flow.f_token_amount),
                collateral_in: "0".to_string(),
                market_total: Some(negated(flow.collateral_amount)),
            },
            TradeAction::Redeem => Self {
                p_token: negated(flow.p_token_amount),
                f_token: negated(flow.f_token_amount),
                collateral_in: "0".to_string(),
                market_total: None,
            },
        }
    }
}

fn negated(amount: U256) -> String {
    if amount.is_zero() {
        "0".to_string()
    } else {
        format!("-{amount}")
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct MarketRow {
    id: i64,
    thread_id: i64,
    eth_chain_id: i64,
    collateral_address: Vec<u8>,
    creator_address: Vec<u8>,
    prompt: String,
    status: String,
    duration_secs: i64,
    resolution_threshold: f64,
    vault_address: Option<Vec<u8>>,
    governor_address: Option<Vec<u8>>,
    router_address: Option<Vec<u8>>,
    strategy_address: Option<Vec<u8>>,
    p_token_address: Option<Vec<u8>>,
    f_token_address: Option<Vec<u8>>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    proposal_id: Option<Vec<u8>>,
    market_id: Option<Vec<u8>>,
    total_collateral: String,
    winner: Option<i16>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MarketRow {
    fn into_market(self) -> StorageResult<PredictionMarket> {
        let status = MarketStatus::parse(&self.status).ok_or_else(|| {
            StorageError::SerializationError(format!("unknown market status: {}", self.status))
        })?;

        let winner = self
            .winner
            .map(|code| {
                Outcome::from_code(code as u8).ok_or_else(|| {
                    StorageError::SerializationError(format!("unknown winner code: {code}"))
                })
            })
            .transpose()?;

        // Deployment fields are written together; a partial set means the
        // row was mutated outside this service.
        let deployment = match (
            self.vault_address,
            self.governor_address,
            self.router_address,
            self.strategy_address,
            self.p_token_address,
            self.f_token_address,
            self.start_time,
            self.end_time,
        ) {
            (None, None, None, None, None, None, None, None) => None,
            (
                Some(vault),
                Some(governor),
                Some(router),
                Some(strategy),
                Some(p_token),
                Some(f_token),
                Some(start_time),
                Some(end_time),
            ) => Some(Deployment {
                vault_address: bytes_to_address(vault, "market.vault_address")?,
                governor_address: bytes_to_address(governor, "market.governor_address")?,
                router_address: bytes_to_address(router, "market.router_address")?,
                strategy_address: bytes_to_address(strategy, "market.strategy_address")?,
                p_token_address: bytes_to_address(p_token, "market.p_token_address")?,
                f_token_address: bytes_to_address(f_token, "market.f_token_address")?,
                start_time,
                end_time,
            }),
            _ => {
                return Err(StorageError::SerializationError(format!(
                    "market {} has a partial deployment",
                    self.id
                )));
            }
        };

        Ok(PredictionMarket {
            id: self.id,
            thread_id: self.thread_id,
            eth_chain_id: self.eth_chain_id as u64,
            collateral_address: bytes_to_address(
                self.collateral_address,
                "market.collateral_address",
            )?,
            creator_address: bytes_to_address(self.creator_address, "market.creator_address")?,
            prompt: self.prompt,
            status,
            duration_secs: self.duration_secs,
            resolution_threshold: self.resolution_threshold,
            deployment,
            proposal_id: self
                .proposal_id
                .map(|b| bytes_to_b256(b, "market.proposal_id"))
                .transpose()?,
            market_id: self
                .market_id
                .map(|b| bytes_to_b256(b, "market.market_id"))
                .transpose()?,
            total_collateral: parse_i256(&self.total_collateral, "market.total_collateral")?,
            winner,
            resolved_at: self.resolved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    id: i64,
    prediction_market_id: i64,
    eth_chain_id: i64,
    transaction_hash: Vec<u8>,
    trader_address: Vec<u8>,
    action: String,
    collateral_amount: String,
    p_token_amount: String,
    f_token_amount: String,
    timestamp: DateTime<Utc>,
}

impl TradeRow {
    fn into_trade(self) -> StorageResult<Trade> {
        Ok(Trade {
            id: self.id,
            prediction_market_id: self.prediction_market_id,
            eth_chain_id: self.eth_chain_id as u64,
            transaction_hash: bytes_to_b256(self.transaction_hash, "trade.transaction_hash")?,
            trader_address: bytes_to_address(self.trader_address, "trade.trader_address")?,
            action: TradeAction::parse(&self.action).ok_or_else(|| {
                StorageError::SerializationError(format!("unknown trade action: {}", self.action))
            })?,
            collateral_amount: parse_u256(&self.collateral_amount, "trade.collateral_amount")?,
            p_token_amount: parse_u256(&self.p_token_amount, "trade.p_token_amount")?,
            f_token_amount: parse_u256(&self.f_token_amount, "trade.f_token_amount")?,
            timestamp: self.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    id: i64,
    prediction_market_id: i64,
    user_address: Vec<u8>,
    p_token_balance: String,
    f_token_balance: String,
    total_collateral_in: String,
    updated_at: DateTime<Utc>,
}

impl PositionRow {
    fn into_position(self) -> StorageResult<Position> {
        Ok(Position {
            id: self.id,
            prediction_market_id: self.prediction_market_id,
            user_address: bytes_to_address(self.user_address, "position.user_address")?,
            p_token_balance: parse_i256(&self.p_token_balance, "position.p_token_balance")?,
            f_token_balance: parse_i256(&self.f_token_balance, "position.f_token_balance")?,
            total_collateral_in: parse_i256(
                &self.total_collateral_in,
                "position.total_collateral_in",
            )?,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Conversion helpers
// =============================================================================

fn bytes_to_b256(bytes: Vec<u8>, field: &str) -> StorageResult<B256> {
    if bytes.len() != 32 {
        return Err(StorageError::SerializationError(format!(
            "{} has invalid length: expected 32, got {}",
            field,
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

fn bytes_to_address(bytes: Vec<u8>, field: &str) -> StorageResult<Address> {
    if bytes.len() != 20 {
        return Err(StorageError::SerializationError(format!(
            "{} has invalid length: expected 20, got {}",
            field,
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_u256(s: &str, field: &str) -> StorageResult<U256> {
    s.parse().map_err(|e| {
        StorageError::SerializationError(format!("{field} parse error: {e} (value: {s})"))
    })
}

fn parse_i256(s: &str, field: &str) -> StorageResult<I256> {
    s.parse().map_err(|e| {
        StorageError::SerializationError(format!("{field} parse error: {e} (value: {s})"))
    })
}

// =============================================================================
// Migrations
// =============================================================================

/// SQL migrations for the prediction-market bundle.
/// Each migration is tracked and only executed once.
pub const MIGRATIONS: &[&str] = &[
    // Migration 0: markets, trades, positions
    r#"
CREATE TABLE prediction_markets (
    id BIGSERIAL PRIMARY KEY,
    thread_id BIGINT NOT NULL UNIQUE,
    eth_chain_id BIGINT NOT NULL,
    collateral_address BYTEA NOT NULL,
    creator_address BYTEA NOT NULL,
    prompt TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    duration_secs BIGINT NOT NULL,
    resolution_threshold DOUBLE PRECISION NOT NULL,
    vault_address BYTEA,
    governor_address BYTEA,
    router_address BYTEA,
    strategy_address BYTEA,
    p_token_address BYTEA,
    f_token_address BYTEA,
    start_time TIMESTAMPTZ,
    end_time TIMESTAMPTZ,
    proposal_id BYTEA,
    market_id BYTEA,
    total_collateral NUMERIC(78, 0) NOT NULL DEFAULT 0,
    winner SMALLINT,
    resolved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_prediction_markets_market_id ON prediction_markets(market_id)
    WHERE market_id IS NOT NULL;
CREATE INDEX idx_prediction_markets_status ON prediction_markets(status);

CREATE TABLE prediction_market_trades (
    id BIGSERIAL PRIMARY KEY,
    prediction_market_id BIGINT NOT NULL
        REFERENCES prediction_markets(id) ON DELETE CASCADE,
    eth_chain_id BIGINT NOT NULL,
    transaction_hash BYTEA NOT NULL,
    trader_address BYTEA NOT NULL,
    action TEXT NOT NULL,
    collateral_amount NUMERIC(78, 0) NOT NULL,
    p_token_amount NUMERIC(78, 0) NOT NULL,
    f_token_amount NUMERIC(78, 0) NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL,
    UNIQUE(eth_chain_id, transaction_hash)
);

CREATE INDEX idx_pm_trades_market ON prediction_market_trades(prediction_market_id);
CREATE INDEX idx_pm_trades_trader ON prediction_market_trades(trader_address);

CREATE TABLE prediction_market_positions (
    id BIGSERIAL PRIMARY KEY,
    prediction_market_id BIGINT NOT NULL
        REFERENCES prediction_markets(id) ON DELETE CASCADE,
    user_address BYTEA NOT NULL,
    p_token_balance NUMERIC(78, 0) NOT NULL DEFAULT 0,
    f_token_balance NUMERIC(78, 0) NOT NULL DEFAULT 0,
    total_collateral_in NUMERIC(78, 0) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE(prediction_market_id, user_address)
);

CREATE INDEX idx_pm_positions_market ON prediction_market_positions(prediction_market_id);
"#,
];
