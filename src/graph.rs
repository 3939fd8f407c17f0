//! # Node & Edge Operations
//!
//! The mutation surface of the graph: creating nodes and wiring
//! dependency edges between them. Both operations go through the storage
//! contract so that ID assignment, name indexing, and dirty-set membership
//! stay consistent.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{EngineError, Result};
use crate::node::Node;
use crate::storage::GraphStorage;

/// The mutable graph surface, backed by a [`GraphStorage`] implementation.
pub struct Graph {
    storage: Arc<dyn GraphStorage>,
}

impl Graph {
    /// Wrap a storage backend in the graph's mutation API.
    pub fn new(storage: Arc<dyn GraphStorage>) -> Self {
        Self { storage }
    }

    /// Access the underlying storage, for components (cache engine, query
    /// evaluator) that need read access alongside the graph.
    pub fn storage(&self) -> &Arc<dyn GraphStorage> {
        &self.storage
    }

    /// Create a node. Fails with `AlreadyExists` if `name` already
    /// resolves, and with `InvalidArgument` if `name` is empty.
    #[instrument(skip(self, metadata))]
    pub async fn add_node(
        &self,
        node_type: &str,
        metadata: Vec<u8>,
        name: &str,
    ) -> Result<Node> {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument("node name must not be empty".into()));
        }

        if self.storage.name_to_id(name).await.is_ok() {
            return Err(EngineError::AlreadyExists(name.to_string()));
        }

        let node = Node::new(node_type, name, metadata);
        let saved = self.storage.save_node(node).await?;
        info!(node_id = saved.id, name, "node added");
        Ok(saved)
    }

    /// Add a dependency edge `a -> b`: `b` becomes a child of `a`, `a`
    /// becomes a parent of `b`. Idempotent — re-adding an existing edge is
    /// a no-op that does not touch the dirty set. Fails with `SelfLoop`
    /// (reported as `InvalidArgument`) if `a == b`.
    #[instrument(skip(self))]
    pub async fn set_dependency(&self, a_id: u32, b_id: u32) -> Result<()> {
        if a_id == b_id {
            return Err(EngineError::InvalidArgument(format!(
                "self-loop dependency on node {a_id}"
            )));
        }

        let mut a = self.storage.get_node(a_id).await?;
        let mut b = self.storage.get_node(b_id).await?;

        if a.children.contains(b_id) {
            debug_assert!(b.parents.contains(a_id), "adjacency invariant violated");
            return Ok(());
        }

        a.children.add(b_id);
        b.parents.add(a_id);

        self.storage.save_node(a).await?;
        self.storage.save_node(b).await?;

        self.storage.add_node_to_cached_stack(a_id).await?;
        self.storage.add_node_to_cached_stack(b_id).await?;

        info!(from = a_id, to = b_id, "dependency set");
        Ok(())
    }
}
