//! # Engine Error Types
//!
//! A single error taxonomy shared by every component of the reachability
//! engine: the bitset, the storage contract, the node/edge model, the cache
//! engine, the query language, and the leaderboard evaluator. Concrete
//! storage backends define their own error types and convert into
//! [`EngineError`] via `From`.

use thiserror::Error;

/// Errors surfaced by the reachability engine.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Node, cache entry, or custom-data record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// `AddNode` was called with a name that already resolves.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Malformed glob, malformed script, self-loop dependency, empty name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation that requires an empty dirty set found a non-empty one.
    #[error("graph is not cached: {0} node(s) pending")]
    NotCached(usize),

    /// Query grammar violation, with the byte offset of the offending token.
    #[error("parse error at byte {position}: {message}")]
    ParseError {
        /// Byte offset into the script where the error was detected.
        position: usize,
        /// Human-readable description of the violation.
        message: String,
    },

    /// A query referenced a name absent from storage.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A storage backend failed; the caller may retry.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Cooperative cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,

    /// An invariant was violated; not recoverable.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
