//! Event topic0 hashes for the prediction-market vault contracts.
//!
//! Pre-computed keccak256 hashes for the on-chain events we decode. The
//! dispatcher uses the same constants in its log subscription filters,
//! so a mismatch here means the event is silently never delivered.

use alloy_primitives::{b256, B256};
use tiny_keccak::{Hasher, Keccak};

// ─── Event topic0 hashes (keccak256 of event signature) ──────────────────────

/// Collateral deposited, equal amounts of both outcome tokens minted.
pub const TOKENS_MINTED_TOPIC: B256 =
    b256!("ef616469a0b35ce807813d17c53c505b9d4796a93287cd361318dbca99ac9250");

/// Equal amounts of both outcome tokens burned, collateral returned.
pub const TOKENS_MERGED_TOPIC: B256 =
    b256!("5c89c1323725653974345a374ee77b42caf5137589586f5ecd2643b4f5595284");

/// Winning-side tokens redeemed for collateral after resolution.
pub const TOKENS_REDEEMED_TOPIC: B256 =
    b256!("9a3541a9607a3b384f06a6f84bfe21fa1717a369e4c28574c6e784d586789c74");

/// Governance proposal resolved with a winning outcome.
pub const PROPOSAL_RESOLVED_TOPIC: B256 =
    b256!("a57dd01540a3fffc26f05f994ad25d6f8af2e1c9343c994e5f61be3bd5b9bff3");

/// Market resolved directly with a winning outcome.
pub const MARKET_RESOLVED_TOPIC: B256 =
    b256!("f34984473148051bc1bdf1be6ecc462d7b228d591058a8a27977b84770b738b9");

// ─── Deployment confirmations ─────────────────────────────────────────────────
//
// The factory confirmation events carry our internal market row id back
// from the deploy transaction, so their signatures are ours to define.
// They are hashed at registry build time rather than pre-computed.

/// keccak256 of this yields the ProposalCreated topic0.
pub const PROPOSAL_CREATED_SIGNATURE: &str = "ProposalCreated(bytes32,uint256)";

/// keccak256 of this yields the MarketCreated topic0.
pub const MARKET_CREATED_SIGNATURE: &str = "MarketCreated(bytes32,uint256)";

/// Logical registry key for the locally synthesized custom event
/// notification, which has no on-chain signature.
pub const CUSTOM_EVENT_CREATED_KEY: &str = "CustomChainEventCreated";

/// Compute keccak256 hash of a byte slice.
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Topic0 hash for `ProposalCreated`.
pub fn proposal_created_topic() -> B256 {
    keccak256(PROPOSAL_CREATED_SIGNATURE.as_bytes())
}

/// Topic0 hash for `MarketCreated`.
pub fn market_created_topic() -> B256 {
    keccak256(MARKET_CREATED_SIGNATURE.as_bytes())
}
