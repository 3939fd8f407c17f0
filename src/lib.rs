//! # Reachability Engine
//!
//! A graph reachability core for software-supply-chain analysis: a typed
//! dependency graph, compressed transitive-closure caches, a set-algebra
//! query language, and a concurrency-bounded leaderboard evaluator.
//!
//! ## Architecture
//!
//! - `error`: the unified error taxonomy
//! - `config`: tunables for cache and leaderboard behavior
//! - `cancellation`: cooperative cancellation tokens
//! - `bitset`: a compressed, sparse node-ID set with set-algebra operations
//! - `node`: the node and cache record types
//! - `storage`: the storage contract and an in-memory reference backend
//! - `graph`: mutation operations (`AddNode`, `SetDependency`)
//! - `cache_engine`: the transitive-closure cache builder
//! - `query`: the query language lexer, parser, and evaluator
//! - `leaderboard`: the bounded-concurrency leaderboard evaluator
//! - `rpc`: the external service surface

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitset;
pub mod cache_engine;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod graph;
pub mod leaderboard;
pub mod node;
pub mod query;
pub mod rpc;
pub mod storage;

pub use bitset::NodeBitSet;
pub use cancellation::CancellationToken;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use graph::Graph;
pub use node::{Node, NodeId, TransitiveCache};
pub use rpc::{Engine, ReachabilityService};

/// Crate version, as reported by Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, as reported by Cargo.
pub const NAME: &str = env!("CARGO_PKG_NAME");
