//! Event handler for the prediction-market projection.
//!
//! Applies the chain-confirmed event stream to the ledger. Every branch
//! is idempotent: deployment confirmations rewrite the same value,
//! resolutions are first-writer-wins, and ledger events are keyed by
//! their transaction hash.
//!
//! # Handled Events
//!
//! - `PredictionMarketProposalCreated` / `PredictionMarketMarketCreated`
//! - `PredictionMarketProposalResolved` / `PredictionMarketMarketResolved`
//! - `PredictionMarketTokensMinted` / `TokensMerged` / `TokensRedeemed`

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tally_core::error::DomainResult;
use tally_core::metrics::{record_duplicate_event, record_unknown_market_skip};
use tally_core::models::{
    ChainEvent, DeploymentConfirmation, MarketResolution, TokenFlow, TradeAction,
};
use tally_core::ports::EventHandler;

use super::storage::{PredictionMarketStorage, ResolutionOutcome, TradeOutcome};

/// Projection handler for the prediction-market event family.
pub struct PredictionMarketProjection {
    storage: Arc<dyn PredictionMarketStorage>,
}

impl PredictionMarketProjection {
    pub fn new(storage: Arc<dyn PredictionMarketStorage>) -> Self {
        Self { storage }
    }

    async fn on_proposal_created(&self, conf: &DeploymentConfirmation) -> DomainResult<()> {
        if self
            .storage
            .confirm_proposal(conf.prediction_market_id, conf.onchain_id)
            .await?
        {
            debug!(
                market = conf.prediction_market_id,
                proposal_id = %conf.onchain_id,
                "Proposal id confirmed"
            );
        } else {
            // Confirmation for a row we never created; nothing to attach it to.
            warn!(
                market = conf.prediction_market_id,
                "Proposal confirmation for unknown market, skipping"
            );
        }
        Ok(())
    }

    async fn on_market_created(&self, conf: &DeploymentConfirmation) -> DomainResult<()> {
        if self
            .storage
            .confirm_market(conf.prediction_market_id, conf.onchain_id)
            .await?
        {
            debug!(
                market = conf.prediction_market_id,
                market_id = %conf.onchain_id,
                "Market id confirmed"
            );
        } else {
            warn!(
                market = conf.prediction_market_id,
                "Market confirmation for unknown market, skipping"
            );
        }
        Ok(())
    }

    async fn on_resolution(
        &self,
        event_name: &'static str,
        resolution: &MarketResolution,
    ) -> DomainResult<()> {
        let outcome = self
            .storage
            .resolve_onchain(resolution.market_id, resolution.winner, resolution.timestamp)
            .await?;

        match outcome {
            ResolutionOutcome::Resolved => {
                info!(
                    market_id = %resolution.market_id,
                    winner = resolution.winner.code(),
                    "🏁 Market resolved on-chain"
                );
            }
            ResolutionOutcome::AlreadySettled => {
                // First writer won; this event's winner is ignored.
                debug!(
                    market_id = %resolution.market_id,
                    "Market already settled, resolution ignored"
                );
            }
            ResolutionOutcome::UnknownMarket => {
                debug!(
                    market_id = %resolution.market_id,
                    "Resolution for untracked market, skipping"
                );
                record_unknown_market_skip(event_name);
            }
        }
        Ok(())
    }

    async fn on_token_flow(
        &self,
        event_name: &'static str,
        action: TradeAction,
        flow: &TokenFlow,
    ) -> DomainResult<()> {
        let outcome = self.storage.apply_trade(action, flow).await?;

        match outcome {
            TradeOutcome::Applied => {
                debug!(
                    market_id = %flow.market_id,
                    trader = %flow.trader_address,
                    action = %action,
                    collateral = %flow.collateral_amount,
                    "💱 Trade applied"
                );
            }
            TradeOutcome::Duplicate => {
                debug!(
                    tx = %flow.transaction_hash,
                    "Trade already applied, skipping redelivery"
                );
                record_duplicate_event(event_name);
            }
            TradeOutcome::UnknownMarket => {
                debug!(
                    market_id = %flow.market_id,
                    "Trade for untracked market, skipping"
                );
                record_unknown_market_skip(event_name);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for PredictionMarketProjection {
    fn projection_name(&self) -> &'static str {
        "prediction_market"
    }

    fn event_names(&self) -> &'static [&'static str] {
        &[
            "PredictionMarketProposalCreated",
            "PredictionMarketMarketCreated",
            "PredictionMarketProposalResolved",
            "PredictionMarketMarketResolved",
            "PredictionMarketTokensMinted",
            "PredictionMarketTokensMerged",
            "PredictionMarketTokensRedeemed",
        ]
    }

    async fn handle(&self, event: &ChainEvent) -> DomainResult<()> {
        let name = event.event_name();
        match event {
            ChainEvent::ProposalCreated(conf) => self.on_proposal_created(conf).await,
            ChainEvent::MarketCreated(conf) => self.on_market_created(conf).await,
            ChainEvent::ProposalResolved(res) | ChainEvent::MarketResolved(res) => {
                self.on_resolution(name, res).await
            }
            ChainEvent::TokensMinted(flow) => {
                self.on_token_flow(name, TradeAction::Mint, flow).await
            }
            ChainEvent::TokensMerged(flow) => {
                self.on_token_flow(name, TradeAction::Merge, flow).await
            }
            ChainEvent::TokensRedeemed(flow) => {
                self.on_token_flow(name, TradeAction::Redeem, flow).await
            }
            // Not subscribed; harmless if dispatched anyway.
            ChainEvent::CustomEventCreated(_) => Ok(()),
        }
    }

    fn priority(&self) -> i32 {
        10
    }
}
