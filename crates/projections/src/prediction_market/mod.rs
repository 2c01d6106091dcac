//! Prediction-market projection bundle.
//!
//! This bundle folds the prediction-market chain-event stream into the
//! relational ledger: markets, trades, positions, and lifecycle state.
//!
//! # Handled Events
//!
//! - Deployment confirmations (`ProposalCreated`, `MarketCreated`)
//! - Resolutions (`ProposalResolved`, `MarketResolved`)
//! - Ledger events (`TokensMinted`, `TokensMerged`, `TokensRedeemed`)
//!
//! # Database Tables
//!
//! - `prediction_markets` - one market per discussion thread
//! - `prediction_market_trades` - append-only trade audit log
//! - `prediction_market_positions` - per-trader balance accumulators
//!
//! # Usage
//!
//! ```ignore
//! use tally_projections::PredictionMarketBundle;
//!
//! let bundle = PredictionMarketBundle::new(pool);
//! registry.register(Box::new(bundle));
//! ```

mod handler;
pub mod lifecycle;
#[cfg(test)]
pub(crate) mod memory;
pub mod models;
pub mod storage;

use std::sync::Arc;

use sqlx::PgPool;
use tally_core::ports::EventHandler;

use crate::ProjectionBundle;

pub use handler::PredictionMarketProjection;
pub use lifecycle::MarketLifecycle;
pub use models::{Deployment, Position, PredictionMarket, Trade};
pub use storage::{
    NewMarket, PgPredictionMarketStorage, PredictionMarketStorage, ResolutionOutcome,
    TradeOutcome, MIGRATIONS,
};

/// Projection bundle for prediction markets.
pub struct PredictionMarketBundle {
    pool: PgPool,
}

impl PredictionMarketBundle {
    /// Create a new prediction-market bundle.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProjectionBundle for PredictionMarketBundle {
    fn name(&self) -> &'static str {
        "prediction_market"
    }

    fn handlers(&self) -> Vec<Arc<dyn EventHandler>> {
        let storage = Arc::new(PgPredictionMarketStorage::new(self.pool.clone()));
        vec![Arc::new(PredictionMarketProjection::new(storage))]
    }

    fn migrations(&self) -> &'static [&'static str] {
        MIGRATIONS
    }

    fn priority(&self) -> i32 {
        10
    }

    fn tables_to_purge(&self) -> &'static [&'static str] {
        &[
            "prediction_market_positions",
            "prediction_market_trades",
            "prediction_markets",
        ]
    }
}
