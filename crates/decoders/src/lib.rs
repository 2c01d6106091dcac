//! ABI log decoders for the Tally projection service.
//!
//! This crate turns raw EVM logs into typed [`ChainEvent`]s. It has
//! three layers:
//!
//! - [`signatures`] - keccak256 topic0 constants for every known event
//! - [`words`] - shape-checked readers for 32-byte ABI words
//! - [`prediction_market`] - one pure decoder per event
//!
//! [`DecoderRegistry`] wires them together behind the
//! [`tally_core::ports::LogDecoder`] port: O(1) lookup by signature hash
//! (or logical name for synthesized events), `None` for keys we do not
//! know, hard [`DecodeError`] for malformed logs on keys we do.
//!
//! [`ChainEvent`]: tally_core::models::ChainEvent
//! [`DecodeError`]: tally_core::error::DecodeError

pub mod prediction_market;
pub mod registry;
pub mod signatures;
pub mod words;

pub use registry::DecoderRegistry;
