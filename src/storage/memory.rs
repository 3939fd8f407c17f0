//! # In-Memory Reference Storage Backend
//!
//! Implements [`GraphStorage`] over process memory, guarded by
//! `parking_lot::RwLock`s the same way the teacher repo's L1 cache tier
//! (`database::cache::CacheManager`) guards its statistics and the Moka
//! in-process cache guards its entries. This is the reference backend used
//! by the engine's own tests; it is not a production persistence layer.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use super::{glob_to_regex, CustomDataRecord, GraphStorage};
use crate::error::{EngineError, Result};
use crate::node::{Node, NodeId, TransitiveCache};

#[derive(Default)]
struct Inner {
    nodes: HashMap<NodeId, Node>,
    name_index: HashMap<String, NodeId>,
    caches: HashMap<NodeId, TransitiveCache>,
    dirty: HashSet<NodeId>,
    custom_data: HashMap<(String, String), Vec<CustomDataRecord>>,
}

/// An in-process implementation of the storage contract.
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
    next_id: AtomicU32,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU32::new(1),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStorage for InMemoryStorage {
    async fn save_node(&self, mut node: Node) -> Result<Node> {
        let mut inner = self.inner.write();

        if node.id == 0 {
            node.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }

        inner.name_index.insert(node.name.clone(), node.id);
        inner.dirty.insert(node.id);
        inner.nodes.insert(node.id, node.clone());

        Ok(node)
    }

    async fn get_node(&self, id: NodeId) -> Result<Node> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("node {id}")))
    }

    async fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        Ok(ids.iter().filter_map(|id| inner.nodes.get(id).cloned()).collect())
    }

    async fn name_to_id(&self, name: &str) -> Result<NodeId> {
        self.inner
            .read()
            .name_index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::NotFound(format!("name {name}")))
    }

    async fn get_nodes_by_glob(&self, pattern: &str) -> Result<Vec<Node>> {
        let regex = glob_to_regex(pattern)?;
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .values()
            .filter(|node| regex.is_match(&node.name))
            .cloned()
            .collect())
    }

    async fn get_all_keys(&self) -> Result<Vec<NodeId>> {
        Ok(self.inner.read().nodes.keys().copied().collect())
    }

    async fn save_cache(&self, id: NodeId, cache: TransitiveCache) -> Result<()> {
        let mut inner = self.inner.write();
        inner.caches.insert(id, cache);
        Ok(())
    }

    async fn get_cache(&self, id: NodeId) -> Result<TransitiveCache> {
        self.inner
            .read()
            .caches
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("cache for node {id}")))
    }

    async fn get_caches(&self, ids: &[NodeId]) -> Result<Vec<(NodeId, TransitiveCache)>> {
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.caches.get(id).map(|c| (*id, c.clone())))
            .collect())
    }

    async fn to_be_cached(&self) -> Result<Vec<NodeId>> {
        Ok(self.inner.read().dirty.iter().copied().collect())
    }

    async fn add_node_to_cached_stack(&self, id: NodeId) -> Result<()> {
        self.inner.write().dirty.insert(id);
        Ok(())
    }

    async fn remove_node_from_cached_stack(&self, id: NodeId) -> Result<()> {
        self.inner.write().dirty.remove(&id);
        Ok(())
    }

    async fn remove_all_caches(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.caches.clear();
        let all_ids: Vec<NodeId> = inner.nodes.keys().copied().collect();
        inner.dirty.extend(all_ids);
        Ok(())
    }

    async fn add_or_update_custom_data(
        &self,
        data_type: &str,
        key: &str,
        subkey: &str,
        blob: Vec<u8>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .custom_data
            .entry((data_type.to_string(), key.to_string()))
            .or_default();

        if let Some(existing) = entry.iter_mut().find(|r| r.subkey == subkey) {
            existing.blob = blob;
        } else {
            entry.push(CustomDataRecord {
                subkey: subkey.to_string(),
                blob,
            });
        }

        Ok(())
    }

    async fn get_custom_data(&self, data_type: &str, key: &str) -> Result<Vec<CustomDataRecord>> {
        Ok(self
            .inner
            .read()
            .custom_data
            .get(&(data_type.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
