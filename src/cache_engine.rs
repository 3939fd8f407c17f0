//! # Transitive Cache Engine
//!
//! Computes, for every node, the two bitsets of all transitive dependencies
//! and all transitive dependents, per spec §4.4. Cycles are handled by
//! Tarjan SCC condensation rather than naive DFS-and-memoize: all members
//! of a strongly connected component share an identical `AllChildren` and
//! `AllParents` (the union of out-closures of the whole component), which a
//! plain memoized DFS would get wrong for any node inside a cycle.
//!
//! `petgraph` does the SCC and topological-sort legwork; the teacher repo
//! carries no graph-algorithm crate of its own for this, but the pack's
//! `pantsbuild/pants` execution engine builds its own dependency graph on
//! `petgraph::graph::DiGraph` (`src/rust/engine/graph/src/lib.rs`), so the
//! dependency is adopted from there rather than hand-rolled; the specific
//! `tarjan_scc`/`toposort` algorithms used here are this crate's own choice
//! for the condensation problem, not something pants itself calls.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bitset::NodeBitSet;
use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::node::{Node, NodeId, TransitiveCache};
use crate::storage::GraphStorage;

/// Drives the `Cache()` operation of spec §4.4 over a storage backend.
pub struct CacheEngine {
    storage: Arc<dyn GraphStorage>,
    config: EngineConfig,
}

impl CacheEngine {
    /// Build a cache engine over a storage backend.
    pub fn new(storage: Arc<dyn GraphStorage>, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Run the cache operation: for every node, recompute `AllChildren` and
    /// `AllParents` against the current topology, then clear the dirty
    /// entries that were present at the start of this pass. Entries marked
    /// dirty *during* the pass (a concurrent `SetDependency`) are left
    /// dirty, matching spec §4.4 step 5 — the caller must re-invoke
    /// `cache()`.
    pub async fn cache(&self, token: &CancellationToken) -> Result<()> {
        let dirty_at_start: HashSet<NodeId> =
            self.storage.to_be_cached().await?.into_iter().collect();

        if dirty_at_start.is_empty() {
            debug!("cache() called with empty dirty set, nothing to do");
            return Ok(());
        }

        info!(dirty_count = dirty_at_start.len(), "cache pass starting");
        token.check()?;

        let all_ids = self.storage.get_all_keys().await?;
        let nodes: HashMap<NodeId, Node> = self
            .storage
            .get_nodes(&all_ids)
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();

        token.check()?;

        let (scc_of, scc_members) = compute_sccs(&nodes);
        debug!(scc_count = scc_members.len(), "SCC condensation computed");

        token.check()?;

        let children_closures =
            compute_scc_closures(&nodes, &scc_of, &scc_members, |n| &n.children)?;
        token.check()?;
        let parents_closures =
            compute_scc_closures(&nodes, &scc_of, &scc_members, |n| &n.parents)?;
        token.check()?;

        let mut failures = 0usize;
        for (processed, &id) in all_ids.iter().enumerate() {
            token.check()?;
            let scc = scc_of[&id];
            let cache = TransitiveCache {
                all_children: children_closures[scc].clone(),
                all_parents: parents_closures[scc].clone(),
            };

            if let Err(e) = self.storage.save_cache(id, cache).await {
                warn!(node_id = id, error = %e, "failed to persist cache entry, will remain dirty");
                failures += 1;
                continue;
            }

            if dirty_at_start.contains(&id) {
                self.storage.remove_node_from_cached_stack(id).await?;
            }

            let interval = self.config.cache_progress_log_interval.max(1);
            if (processed + 1) % interval == 0 {
                info!(
                    processed = processed + 1,
                    total = all_ids.len(),
                    "cache pass progress"
                );
            }
        }

        if failures > 0 {
            warn!(failures, "cache pass completed with partial failures; dirty set remains non-empty for those nodes");
        }

        info!("cache pass complete");
        Ok(())
    }
}

/// Partition nodes into strongly connected components. Returns a map from
/// node ID to SCC index and the members of each SCC.
fn compute_sccs(nodes: &HashMap<NodeId, Node>) -> (HashMap<NodeId, usize>, Vec<Vec<NodeId>>) {
    let mut graph = DiGraph::<NodeId, ()>::new();
    let mut index_of: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nodes.len());

    for &id in nodes.keys() {
        index_of.insert(id, graph.add_node(id));
    }

    for node in nodes.values() {
        let src = index_of[&node.id];
        for child in node.children.iter() {
            if let Some(&dst) = index_of.get(&child) {
                graph.add_edge(src, dst, ());
            }
        }
    }

    let components = tarjan_scc(&graph);
    let mut scc_of = HashMap::with_capacity(nodes.len());
    let mut scc_members = Vec::with_capacity(components.len());

    for (scc_id, component) in components.into_iter().enumerate() {
        let members: Vec<NodeId> = component.into_iter().map(|idx| graph[idx]).collect();
        for &member in &members {
            scc_of.insert(member, scc_id);
        }
        scc_members.push(members);
    }

    (scc_of, scc_members)
}

/// Compute, for every SCC, the closure bitset over a given adjacency
/// direction (`|node| &node.children` or `|node| &node.parents`). All
/// members of an SCC end up sharing the same closure.
fn compute_scc_closures<F>(
    nodes: &HashMap<NodeId, Node>,
    scc_of: &HashMap<NodeId, usize>,
    scc_members: &[Vec<NodeId>],
    neighbors_of: F,
) -> Result<Vec<NodeBitSet>>
where
    F: Fn(&Node) -> &NodeBitSet,
{
    let scc_count = scc_members.len();
    let mut condensation = DiGraph::<(), ()>::with_capacity(scc_count, 0);
    for _ in 0..scc_count {
        condensation.add_node(());
    }

    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();
    for node in nodes.values() {
        let src_scc = scc_of[&node.id];
        for neighbor in neighbors_of(node).iter() {
            if let Some(&dst_scc) = scc_of.get(&neighbor) {
                if src_scc != dst_scc && seen_edges.insert((src_scc, dst_scc)) {
                    condensation.add_edge(NodeIndex::new(src_scc), NodeIndex::new(dst_scc), ());
                }
            }
        }
    }

    let order = toposort(&condensation, None).map_err(|_| {
        EngineError::Internal("SCC condensation contained a cycle, which is impossible by construction".into())
    })?;

    let mut closures: Vec<NodeBitSet> = vec![NodeBitSet::new(); scc_count];

    for idx in order.iter().rev() {
        let scc_id = idx.index();
        let members = &scc_members[scc_id];
        let mut result = NodeBitSet::new();

        if members.len() > 1 {
            for &member in members {
                result.add(member);
            }
        }

        for &member in members {
            let node = &nodes[&member];
            for neighbor in neighbors_of(node).iter() {
                let Some(&neighbor_scc) = scc_of.get(&neighbor) else {
                    continue;
                };
                if neighbor_scc == scc_id {
                    continue;
                }
                result.add(neighbor);
                let neighbor_closure = closures[neighbor_scc].clone();
                result.union_with(&neighbor_closure);
            }
        }

        closures[scc_id] = result;
    }

    Ok(closures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::storage::memory::InMemoryStorage;

    async fn add(graph: &Graph, name: &str) -> NodeId {
        graph.add_node("library", vec![], name).await.unwrap().id
    }

    #[tokio::test]
    async fn linear_chain() {
        let storage: Arc<dyn GraphStorage> = Arc::new(InMemoryStorage::new());
        let graph = Graph::new(storage.clone());
        let a = add(&graph, "A").await;
        let b = add(&graph, "B").await;
        let c = add(&graph, "C").await;
        graph.set_dependency(a, b).await.unwrap();
        graph.set_dependency(b, c).await.unwrap();

        let engine = CacheEngine::new(storage.clone(), EngineConfig::default());
        engine.cache(&CancellationToken::new()).await.unwrap();

        let cache_a = storage.get_cache(a).await.unwrap();
        assert_eq!(cache_a.all_children.to_array(), vec![b, c]);

        let cache_c = storage.get_cache(c).await.unwrap();
        assert_eq!(cache_c.all_parents.to_array(), {
            let mut v = vec![a, b];
            v.sort();
            v
        });

        assert!(storage.to_be_cached().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn diamond() {
        let storage: Arc<dyn GraphStorage> = Arc::new(InMemoryStorage::new());
        let graph = Graph::new(storage.clone());
        let a = add(&graph, "A").await;
        let b = add(&graph, "B").await;
        let c = add(&graph, "C").await;
        let d = add(&graph, "D").await;
        graph.set_dependency(a, b).await.unwrap();
        graph.set_dependency(a, c).await.unwrap();
        graph.set_dependency(b, d).await.unwrap();
        graph.set_dependency(c, d).await.unwrap();

        CacheEngine::new(storage.clone(), EngineConfig::default())
            .cache(&CancellationToken::new())
            .await
            .unwrap();

        let cache_a = storage.get_cache(a).await.unwrap();
        assert_eq!(cache_a.all_children.to_array(), {
            let mut v = vec![b, c, d];
            v.sort();
            v
        });

        let cache_d = storage.get_cache(d).await.unwrap();
        assert_eq!(cache_d.all_parents.to_array(), {
            let mut v = vec![a, b, c];
            v.sort();
            v
        });
    }

    #[tokio::test]
    async fn cycle() {
        let storage: Arc<dyn GraphStorage> = Arc::new(InMemoryStorage::new());
        let graph = Graph::new(storage.clone());
        let a = add(&graph, "A").await;
        let b = add(&graph, "B").await;
        graph.set_dependency(a, b).await.unwrap();
        graph.set_dependency(b, a).await.unwrap();

        CacheEngine::new(storage.clone(), EngineConfig::default())
            .cache(&CancellationToken::new())
            .await
            .unwrap();

        let cache_a = storage.get_cache(a).await.unwrap();
        assert!(cache_a.all_children.contains(a));
        assert!(cache_a.all_children.contains(b));

        let cache_b = storage.get_cache(b).await.unwrap();
        assert!(cache_b.all_children.contains(a));
        assert!(cache_b.all_children.contains(b));
    }

    #[tokio::test]
    async fn no_op_on_clean_graph() {
        let storage: Arc<dyn GraphStorage> = Arc::new(InMemoryStorage::new());
        let graph = Graph::new(storage.clone());
        add(&graph, "A").await;

        let engine = CacheEngine::new(storage.clone(), EngineConfig::default());
        engine.cache(&CancellationToken::new()).await.unwrap();
        assert!(storage.to_be_cached().await.unwrap().is_empty());

        // Second call with nothing dirty should be a trivial no-op.
        engine.cache(&CancellationToken::new()).await.unwrap();
        assert!(storage.to_be_cached().await.unwrap().is_empty());
    }
}
