//! Domain models shared across the projection service.
//!
//! These models are storage-agnostic and represent the canonical form of
//! prediction-market lifecycle data within the domain layer. Entity rows
//! (markets, trades, positions) live with their projection bundle; this
//! module holds the vocabulary types every layer agrees on.

use serde::{Deserialize, Serialize};

pub mod events;

pub use events::{
    ChainEvent, CustomEventNotice, DeploymentConfirmation, MarketResolution, TokenFlow,
};

// =============================================================================
// Market Lifecycle
// =============================================================================

/// Lifecycle state of a prediction market.
///
/// Transitions are monotonic: `Draft → Active → {Resolved, Cancelled}`,
/// with `Draft → Cancelled` also allowed. `Resolved` and `Cancelled` are
/// terminal and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Draft,
    Active,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    /// Database/text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Draft => "draft",
            MarketStatus::Active => "active",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the database/text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(MarketStatus::Draft),
            "active" => Some(MarketStatus::Active),
            "resolved" => Some(MarketStatus::Resolved),
            "cancelled" => Some(MarketStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketStatus::Resolved | MarketStatus::Cancelled)
    }

    /// Whether the command-path lifecycle permits `self → next`.
    ///
    /// On-chain resolution events are the one exception: they resolve
    /// any non-terminal market, `Draft` included, since a confirmed
    /// on-chain outcome outranks local deployment bookkeeping.
    pub fn can_transition_to(&self, next: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Cancelled) | (Active, Resolved) | (Active, Cancelled)
        )
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Winning side of a resolved binary market.
///
/// The on-chain discriminant is `1` for the PASS claim token and `2` for
/// the FAIL claim token; `0` means unresolved and never reaches the
/// domain layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    /// On-chain discriminant value.
    pub fn code(&self) -> u8 {
        match self {
            Outcome::Pass => 1,
            Outcome::Fail => 2,
        }
    }

    /// Parse the on-chain discriminant.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Outcome::Pass),
            2 => Some(Outcome::Fail),
            _ => None,
        }
    }
}

// =============================================================================
// Trade Action
// =============================================================================

/// Kind of ledger-affecting trade recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Collateral deposited; equal amounts of both claim tokens issued.
    Mint,
    /// Both claim tokens burned; collateral returned.
    Merge,
    /// Winning-side claim tokens exchanged for collateral after resolution.
    Redeem,
}

impl TradeAction {
    /// Database/text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Mint => "mint",
            TradeAction::Merge => "merge",
            TradeAction::Redeem => "redeem",
        }
    }

    /// Parse the database/text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mint" => Some(TradeAction::Mint),
            "merge" => Some(TradeAction::Merge),
            "redeem" => Some(TradeAction::Redeem),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
