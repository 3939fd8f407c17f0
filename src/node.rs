//! # Node & Transitive Cache Types
//!
//! The data model for a single vertex in the dependency graph and its
//! precomputed transitive-closure cache. Storage backends persist these;
//! the core never interprets `metadata` beyond moving the bytes around.

use serde::{Deserialize, Serialize};

use crate::bitset::NodeBitSet;

/// A process-unique node identifier, assigned monotonically by storage on
/// insert. `0` is reserved to mean "not yet assigned" for a node about to
/// be saved.
pub type NodeId = u32;

/// A vertex in the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Storage-assigned identity. `0` until `SaveNode` assigns one.
    pub id: NodeId,
    /// Human-facing key, unique within the graph.
    pub name: String,
    /// Short type tag (e.g. `library`, `vulnerability`, `scorecard`).
    pub node_type: String,
    /// Opaque payload interpreted only by ingest/consumers.
    pub metadata: Vec<u8>,
    /// IDs this node directly depends on.
    pub children: NodeBitSet,
    /// IDs that directly depend on this node.
    pub parents: NodeBitSet,
}

impl Node {
    /// Construct a new, unsaved node (`id == 0`) with empty adjacency.
    pub fn new(node_type: impl Into<String>, name: impl Into<String>, metadata: Vec<u8>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            node_type: node_type.into(),
            metadata,
            children: NodeBitSet::new(),
            parents: NodeBitSet::new(),
        }
    }

    /// Whether the node type matches a type filter, where `"*"` matches
    /// any type (query-language atom filtering, §4.5).
    pub fn matches_type(&self, filter: &str) -> bool {
        filter == "*" || self.node_type == filter
    }
}

/// The precomputed transitive-closure pair for a single node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitiveCache {
    /// Every node reachable from this node by following `children` edges,
    /// exclusive of the node itself unless it sits in a non-trivial SCC
    /// that loops back to itself via another member.
    pub all_children: NodeBitSet,
    /// Every node that can reach this node by following `children` edges,
    /// under the same self-membership rule.
    pub all_parents: NodeBitSet,
}
