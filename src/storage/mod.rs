//! # Storage Contract
//!
//! The abstract interface the reachability engine depends on. Concrete
//! backends (an on-disk relational store, a distributed KV store) are
//! external collaborators and are not implemented here; [`memory`] provides
//! an in-process reference implementation used by the engine's own test
//! suite, in the same spirit as the teacher repo's abstract `ConnectionPool`
//! contract paired with a development-mode SQLite pool.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::node::{Node, NodeId, TransitiveCache};

/// A single blob staged in the custom-data store, keyed by `(type, key,
/// subkey)`.
#[derive(Debug, Clone)]
pub struct CustomDataRecord {
    /// The staging subkey this blob was added under.
    pub subkey: String,
    /// The opaque payload.
    pub blob: Vec<u8>,
}

/// The abstract storage contract §4.1 of the engine depends on.
///
/// All operations are expected to be atomic with respect to concurrent
/// callers for a single key; cross-key consistency is the cache engine's
/// responsibility (it serializes itself, see [`crate::cache_engine`]).
#[async_trait]
pub trait GraphStorage: Send + Sync {
    /// Assign a fresh ID if `node.id == 0`, persist it, update the name
    /// index, and mark `node.id` dirty. Returns the node as saved
    /// (with its final ID).
    async fn save_node(&self, node: Node) -> Result<Node>;

    /// Fetch a node by ID, or `NotFound`.
    async fn get_node(&self, id: NodeId) -> Result<Node>;

    /// Fetch nodes by ID, preserving input order; IDs with no matching
    /// node are omitted from the result.
    async fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>>;

    /// Exact-match name lookup.
    async fn name_to_id(&self, name: &str) -> Result<NodeId>;

    /// All nodes whose name matches an anchored glob pattern (`*`, `?`).
    async fn get_nodes_by_glob(&self, pattern: &str) -> Result<Vec<Node>>;

    /// Every extant node ID.
    async fn get_all_keys(&self) -> Result<Vec<NodeId>>;

    /// Persist the transitive-cache pair for a node.
    async fn save_cache(&self, id: NodeId, cache: TransitiveCache) -> Result<()>;

    /// Read the transitive cache for a node, or `NotFound` if not cached.
    async fn get_cache(&self, id: NodeId) -> Result<TransitiveCache>;

    /// Batched cache read; IDs with no cache entry are omitted.
    async fn get_caches(&self, ids: &[NodeId]) -> Result<Vec<(NodeId, TransitiveCache)>>;

    /// The current dirty set, as a list of IDs.
    async fn to_be_cached(&self) -> Result<Vec<NodeId>>;

    /// Mark a node dirty.
    async fn add_node_to_cached_stack(&self, id: NodeId) -> Result<()>;

    /// Mark a node clean.
    async fn remove_node_from_cached_stack(&self, id: NodeId) -> Result<()>;

    /// Drop every cache entry and mark every extant node dirty.
    async fn remove_all_caches(&self) -> Result<()>;

    /// Stage an opaque blob under `(type, key, subkey)`.
    async fn add_or_update_custom_data(
        &self,
        data_type: &str,
        key: &str,
        subkey: &str,
        blob: Vec<u8>,
    ) -> Result<()>;

    /// Fetch every blob staged under `(type, key)`.
    async fn get_custom_data(&self, data_type: &str, key: &str) -> Result<Vec<CustomDataRecord>>;
}

/// Translate an anchored glob pattern (`*` = any run of characters, `?` = a
/// single character) into an anchored regular expression, reusing the
/// engine's existing `regex` dependency rather than pulling in a dedicated
/// glob crate.
pub fn glob_to_regex(pattern: &str) -> Result<regex::Regex> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');
    regex::Regex::new(&expr)
        .map_err(|e| crate::error::EngineError::InvalidArgument(format!("malformed glob: {e}")))
}
