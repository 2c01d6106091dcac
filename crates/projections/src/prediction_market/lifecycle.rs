//! Lifecycle commands for prediction markets.
//!
//! These are the state-changing entry points the command layer calls:
//! create, deploy, cancel, resolve. Eligibility is enforced by guarded
//! updates in storage; this layer turns a refused guard into the
//! user-visible [`DomainError::InvalidStateTransition`] message.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tally_core::error::{DomainError, DomainResult};
use tally_core::models::Outcome;

use super::models::{Deployment, PredictionMarket};
use super::storage::{NewMarket, PredictionMarketStorage};

/// Command service over the market lifecycle state machine.
pub struct MarketLifecycle {
    storage: Arc<dyn PredictionMarketStorage>,
}

impl MarketLifecycle {
    pub fn new(storage: Arc<dyn PredictionMarketStorage>) -> Self {
        Self { storage }
    }

    /// Create a market in `Draft` for a thread. One market per thread;
    /// a second create surfaces the unique violation as a constraint error.
    pub async fn create(&self, market: NewMarket) -> DomainResult<PredictionMarket> {
        let created = self.storage.create_market(&market).await?;
        info!(
            market = created.id,
            thread = created.thread_id,
            "🎲 Prediction market created"
        );
        Ok(created)
    }

    /// Deploy a draft market: record contract addresses and the trading
    /// window, move `Draft → Active`.
    pub async fn deploy(
        &self,
        prediction_market_id: i64,
        deployment: Deployment,
    ) -> DomainResult<PredictionMarket> {
        if !self
            .storage
            .activate_market(prediction_market_id, &deployment)
            .await?
        {
            return Err(self
                .refusal(
                    prediction_market_id,
                    "Only draft prediction markets can be deployed",
                )
                .await?);
        }

        info!(market = prediction_market_id, "🚀 Prediction market deployed");
        self.require_market(prediction_market_id).await
    }

    /// Cancel a market that has not settled yet.
    pub async fn cancel(&self, prediction_market_id: i64) -> DomainResult<PredictionMarket> {
        if !self.storage.cancel_market(prediction_market_id).await? {
            return Err(self
                .refusal(
                    prediction_market_id,
                    "Only draft or active prediction markets can be cancelled",
                )
                .await?);
        }

        info!(market = prediction_market_id, "🚫 Prediction market cancelled");
        self.require_market(prediction_market_id).await
    }

    /// Resolve an active market with an explicit winner (author/admin path).
    pub async fn resolve(
        &self,
        prediction_market_id: i64,
        winner: Outcome,
    ) -> DomainResult<PredictionMarket> {
        if !self
            .storage
            .resolve_market(prediction_market_id, winner, Utc::now())
            .await?
        {
            return Err(self
                .refusal(
                    prediction_market_id,
                    "Only active prediction markets can be resolved",
                )
                .await?);
        }

        info!(
            market = prediction_market_id,
            winner = winner.code(),
            "🏁 Prediction market resolved"
        );
        self.require_market(prediction_market_id).await
    }

    /// A guarded update matched zero rows: either the market does not
    /// exist, or it is in an ineligible state.
    async fn refusal(&self, id: i64, message: &str) -> DomainResult<DomainError> {
        Ok(match self.storage.get_market(id).await? {
            None => DomainError::NotFound(format!("prediction market {id}")),
            Some(_) => DomainError::InvalidStateTransition(message.to_string()),
        })
    }

    async fn require_market(&self, id: i64) -> DomainResult<PredictionMarket> {
        self.storage
            .get_market(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("prediction market {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction_market::memory::MemoryStorage;
    use alloy_primitives::address;
    use chrono::Duration;
    use tally_core::models::MarketStatus;

    fn new_market(thread_id: i64) -> NewMarket {
        NewMarket {
            thread_id,
            eth_chain_id: 8453,
            collateral_address: address!("1234567890123456789012345678901234567890"),
            creator_address: address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            prompt: "Will this test pass?".to_string(),
            duration_secs: 86_400 * 7,
            resolution_threshold: 0.5,
        }
    }

    fn deployment() -> Deployment {
        let now = Utc::now();
        Deployment {
            vault_address: address!("0000000000000000000000000000000000000001"),
            governor_address: address!("0000000000000000000000000000000000000002"),
            router_address: address!("0000000000000000000000000000000000000003"),
            strategy_address: address!("0000000000000000000000000000000000000004"),
            p_token_address: address!("0000000000000000000000000000000000000005"),
            f_token_address: address!("0000000000000000000000000000000000000006"),
            start_time: now,
            end_time: now + Duration::days(7),
        }
    }

    fn lifecycle() -> MarketLifecycle {
        MarketLifecycle::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_create_then_deploy_activates() {
        let lifecycle = lifecycle();
        let market = lifecycle.create(new_market(1)).await.unwrap();
        assert_eq!(market.status, MarketStatus::Draft);
        assert!(market.deployment.is_none());

        let deployed = lifecycle.deploy(market.id, deployment()).await.unwrap();
        assert_eq!(deployed.status, MarketStatus::Active);
        assert!(deployed.deployment.is_some());
    }

    #[tokio::test]
    async fn test_deploy_twice_is_rejected() {
        let lifecycle = lifecycle();
        let market = lifecycle.create(new_market(1)).await.unwrap();
        lifecycle.deploy(market.id, deployment()).await.unwrap();

        let err = lifecycle.deploy(market.id, deployment()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only draft prediction markets can be deployed"
        );
    }

    // Test critique: annulation permise en draft et active seulement,
    // avec le message utilisateur exact
    #[tokio::test]
    async fn test_cancel_eligibility() {
        let lifecycle = lifecycle();

        let draft = lifecycle.create(new_market(1)).await.unwrap();
        let cancelled = lifecycle.cancel(draft.id).await.unwrap();
        assert_eq!(cancelled.status, MarketStatus::Cancelled);

        let active = lifecycle.create(new_market(2)).await.unwrap();
        lifecycle.deploy(active.id, deployment()).await.unwrap();
        let cancelled = lifecycle.cancel(active.id).await.unwrap();
        assert_eq!(cancelled.status, MarketStatus::Cancelled);

        // Un marché résolu ne peut plus être annulé
        let resolved = lifecycle.create(new_market(3)).await.unwrap();
        lifecycle.deploy(resolved.id, deployment()).await.unwrap();
        lifecycle.resolve(resolved.id, Outcome::Pass).await.unwrap();
        let err = lifecycle.cancel(resolved.id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only draft or active prediction markets can be cancelled"
        );
    }

    // Test critique: résolution par commande refusée hors de l'état actif
    #[tokio::test]
    async fn test_resolve_requires_active() {
        let lifecycle = lifecycle();
        let draft = lifecycle.create(new_market(1)).await.unwrap();

        let err = lifecycle.resolve(draft.id, Outcome::Pass).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only active prediction markets can be resolved"
        );

        lifecycle.deploy(draft.id, deployment()).await.unwrap();
        let resolved = lifecycle.resolve(draft.id, Outcome::Fail).await.unwrap();
        assert_eq!(resolved.status, MarketStatus::Resolved);
        assert_eq!(resolved.winner, Some(Outcome::Fail));
        assert!(resolved.resolved_at.is_some());

        // Une seconde résolution échoue: l'état terminal est immuable
        let err = lifecycle.resolve(draft.id, Outcome::Pass).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only active prediction markets can be resolved"
        );
    }

    #[tokio::test]
    async fn test_unknown_market_is_not_found() {
        let lifecycle = lifecycle();
        let err = lifecycle.cancel(999).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
