//! Core domain layer for the Tally projection service.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! business logic services for projecting prediction-market chain events
//! into a relational ledger. It follows hexagonal architecture
//! principles - this is the innermost layer with no dependencies on
//! infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      tally (binary)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │       tally-decoders        │       tally-projections       │
//! │       (ABI decoding)        │       (ledger handlers)       │
//! ├─────────────────────────────┴───────────────────────────────┤
//! │                       tally-storage                         │
//! │                       (PostgreSQL)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      tally-core  ← YOU ARE HERE             │
//! │                 (models, ports, services)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (ChainEvent, MarketStatus, etc.)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Core business logic (ProjectorService)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::LogSource`] - Lease raw log deliveries from the channel
//! - [`ports::LogDecoder`] - Turn raw logs into typed chain events
//! - [`ports::EventHandler`] - Apply events to a projection
//!
//! ## Delivery Semantics
//!
//! The delivery channel is at-least-once and unordered. The projector
//! only acknowledges a delivery after its handler succeeds (or after
//! deciding the delivery is not for us), so every handler must be
//! idempotent: applying the same event twice must leave the ledger
//! unchanged.
//!
//! ## Projector Lifecycle
//!
//! 1. Lease a batch of deliveries from the channel
//! 2. Decode each raw log against the decoder registry
//! 3. Dispatch the typed event to its subscribed handler
//! 4. Acknowledge successful (or irrelevant) deliveries

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
