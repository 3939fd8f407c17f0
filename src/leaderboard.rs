//! # Leaderboard Evaluator
//!
//! Runs a parameterized query with every node substituted as the "focus"
//! atom, under a bounded worker pool, and returns results ordered by
//! output-set cardinality (spec §4.6).
//!
//! Concurrency is bounded with a `tokio::sync::Semaphore`, the same
//! primitive the teacher's `scheduling::worker::Worker` uses for
//! `max_concurrent_tasks`. Per spec §9's open question, the source this
//! system is modeled on only checks its error channel once and can lose
//! errors that arrive after that check; this implementation instead awaits
//! every worker before looking at results, so the first error observed is
//! never dropped by a race.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::node::{Node, NodeId};
use crate::query::{evaluate_unchecked, parse};
use crate::storage::GraphStorage;

/// One row of a leaderboard result: the node evaluated as focus, and the
/// output set the script produced for it.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    /// The node bound to the `focus` token for this row.
    pub node: Node,
    /// The script's output set, as an ascending array of node IDs.
    pub output: Vec<NodeId>,
}

/// Runs a script across every node in storage under a concurrency budget.
pub struct LeaderboardEvaluator {
    storage: Arc<dyn GraphStorage>,
    config: EngineConfig,
}

impl LeaderboardEvaluator {
    /// Build an evaluator over a storage backend.
    pub fn new(storage: Arc<dyn GraphStorage>, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Evaluate `script` with every named node substituted as `focus`,
    /// admitting at most `concurrency` evaluations at a time, and return
    /// rows ordered by descending output cardinality, ties broken by
    /// ascending node name.
    pub async fn run(
        &self,
        script: &str,
        concurrency: usize,
        token: &CancellationToken,
    ) -> Result<Vec<LeaderboardEntry>> {
        if concurrency == 0 {
            return Err(EngineError::InvalidArgument(
                "leaderboard concurrency must be positive".into(),
            ));
        }

        let dirty = self.storage.to_be_cached().await?;
        if !dirty.is_empty() {
            return Err(EngineError::NotCached(dirty.len()));
        }

        let expr = Arc::new(parse(script)?);

        let all_ids = self.storage.get_all_keys().await?;
        let nodes = self.storage.get_nodes(&all_ids).await?;
        info!(node_count = nodes.len(), concurrency, "leaderboard evaluation starting");

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut handles = Vec::with_capacity(nodes.len());
        let eval_timeout = self.config.leaderboard_eval_timeout;

        for node in nodes.into_iter().filter(|n| !n.name.is_empty()) {
            let storage = self.storage.clone();
            let expr = expr.clone();
            let token = token.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| EngineError::Internal("leaderboard semaphore closed early".into()))?;

                token.check()?;
                let node_id = node.id;
                let output = tokio::time::timeout(
                    eval_timeout,
                    evaluate_unchecked(&expr, storage.as_ref(), Some(node_id), &token),
                )
                .await
                .map_err(|_| {
                    EngineError::Internal(format!(
                        "evaluation for focus node {node_id} exceeded the configured timeout"
                    ))
                })??;
                Ok::<_, EngineError>(LeaderboardEntry {
                    node,
                    output: output.to_array(),
                })
            }));
        }

        // Await every worker before inspecting results or cancelling the
        // rest, rather than racing the first completion against the error
        // channel (the source behavior spec §9 flags as a bug to avoid).
        let joined = futures::future::join_all(handles).await;

        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut entries = Vec::with_capacity(joined.len());
        let mut first_error = None;

        for result in joined {
            match result {
                Ok(Ok(entry)) => entries.push(entry),
                Ok(Err(e)) => first_error.get_or_insert(e),
                Err(join_error) => {
                    warn!(%join_error, "leaderboard worker task failed to join");
                    first_error
                        .get_or_insert(EngineError::Internal(format!("worker panicked: {join_error}")));
                }
            };
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(order_entries(entries))
    }
}

/// Order entries by `(−cardinality, name)` using a `BTreeMap`, which yields
/// descending-cardinality order on a forward scan without any
/// heap-and-reverse-pop trick (spec §9's second open question).
fn order_entries(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut ordered: BTreeMap<(Reverse<usize>, String), LeaderboardEntry> = BTreeMap::new();
    for entry in entries {
        let key = (Reverse(entry.output.len()), entry.node.name.clone());
        ordered.insert(key, entry);
    }
    ordered.into_values().collect()
}
