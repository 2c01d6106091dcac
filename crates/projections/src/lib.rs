//! Projection bundles for the Tally service.
//!
//! Each projection ships as a self-contained [`ProjectionBundle`]: its
//! event handlers, its database schema (tracked migrations), and its
//! storage layer. Bundles are registered in a [`BundleRegistry`], which
//! runs migrations and hands the extracted handlers to the projector.
//!
//! # Available Bundles
//!
//! - [`PredictionMarketBundle`] - markets, trades, positions, lifecycle

mod bundle;
mod registry;

pub mod prediction_market;

pub use bundle::ProjectionBundle;
pub use prediction_market::PredictionMarketBundle;
pub use registry::BundleRegistry;
