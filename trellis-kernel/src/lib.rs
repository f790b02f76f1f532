//! # Trellis kernel
//!
//! Every validator runs its own sequence of rounds. Each round bundles the
//! snapshots the validator confirmed and references two sealed rounds of
//! other validators, so together the rounds form a DAG instead of a single
//! chain.
//!
//! This crate holds the round graph: each validator's open round
//! ([`CacheRound`]) and latest sealed round ([`FinalRound`]), how both are
//! rebuilt from the store, and how an open round is sealed.
//!
//! ## Implementation Structure
//!
//! - `round.rs`: open and sealed rounds, the two round hashing schemes
//! - `final_log.rs`: append-only history of sealed rounds
//! - `graph.rs`: loading the graph from the store and sealing rounds
//! - `shared.rs`: an open round shared with concurrent readers
//! - `invariants.rs`: structural invariant checks
//! - `format.rs`: diagnostic formatting
//! - `config.rs`: kernel settings
//! - `tracing_setup.rs`: structured logging with tracing-rs
//!
//! ## Safety rules
//!
//! - Sealed rounds are never removed or overwritten.
//! - Every snapshot in an open round is at or after the round's start.
//! - Every snapshot in a sealed round lies within the round's bounds.
//! - Only validators in the current set have graph entries.

mod config;
mod error;
mod final_log;
mod graph;
mod invariants;
mod round;
mod shared;

pub mod format;
pub mod tracing_setup;

pub use config::{ConfigError, KernelConfig};
pub use error::GraphError;
pub use final_log::FinalLog;
pub use graph::{load_round_graph, FinalCacheEntry, RoundGraph};
pub use invariants::GraphInvariantViolation;
pub use round::{final_round_from_snapshots, snapshot_as_cache_round, CacheRound, FinalRound};
pub use shared::SharedCacheRound;
