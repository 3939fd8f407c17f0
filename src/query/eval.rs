//! Query expression evaluation.

use futures::future::BoxFuture;

use super::ast::{BinOp, Direction, Expr, Term};
use super::FOCUS_TOKEN;
use crate::bitset::NodeBitSet;
use crate::cancellation::CancellationToken;
use crate::error::{EngineError, Result};
use crate::node::NodeId;
use crate::storage::GraphStorage;

/// Evaluate a parsed script against the graph and its caches.
///
/// Requires the dirty set to be empty, checked once at entry; callers that
/// need many evaluations against a shared dirty-set snapshot (the
/// leaderboard evaluator) check once themselves and call
/// [`evaluate_unchecked`] directly.
///
/// `focus` binds the reserved `focus` token to a node ID (leaderboard use);
/// pass `None` for plain `Query`, where the token resolves through ordinary
/// name lookup and therefore always fails `UnknownNode`.
///
/// Bitset operations are CPU-bound and are not preemptively interrupted;
/// `token` is checked once per atom evaluated, between terms.
pub async fn evaluate(
    expr: &Expr,
    storage: &dyn GraphStorage,
    focus: Option<NodeId>,
    token: &CancellationToken,
) -> Result<NodeBitSet> {
    let dirty = storage.to_be_cached().await?;
    if !dirty.is_empty() {
        return Err(EngineError::NotCached(dirty.len()));
    }

    evaluate_unchecked(expr, storage, focus, token).await
}

/// Evaluate without re-checking the dirty set. The caller is responsible
/// for having verified it is empty for the snapshot being evaluated
/// against.
pub fn evaluate_unchecked<'a>(
    expr: &'a Expr,
    storage: &'a dyn GraphStorage,
    focus: Option<NodeId>,
    token: &'a CancellationToken,
) -> BoxFuture<'a, Result<NodeBitSet>> {
    Box::pin(async move {
        token.check()?;
        match expr {
            Expr::Term(term) => eval_term(term, storage, focus).await,
            Expr::BinOp(op, lhs, rhs) => {
                let lhs_set = evaluate_unchecked(lhs, storage, focus, token).await?;
                let rhs_set = evaluate_unchecked(rhs, storage, focus, token).await?;
                Ok(combine(*op, &lhs_set, &rhs_set))
            }
        }
    })
}

fn combine(op: BinOp, lhs: &NodeBitSet, rhs: &NodeBitSet) -> NodeBitSet {
    match op {
        BinOp::Or => lhs.union(rhs),
        BinOp::And => lhs.intersect(rhs),
        BinOp::Xor => lhs.symmetric_difference(rhs),
    }
}

async fn eval_term(term: &Term, storage: &dyn GraphStorage, focus: Option<NodeId>) -> Result<NodeBitSet> {
    let node_id = resolve_name(&term.name, storage, focus).await?;

    let cache = storage.get_cache(node_id).await.map_err(|_| {
        EngineError::Internal(format!(
            "node {node_id} has no cache entry despite an empty dirty set"
        ))
    })?;

    let raw = match term.direction {
        Direction::Dependencies => cache.all_children,
        Direction::Dependents => cache.all_parents,
    };

    filter_by_type(&raw, &term.type_filter, storage).await
}

async fn resolve_name(name: &str, storage: &dyn GraphStorage, focus: Option<NodeId>) -> Result<NodeId> {
    if name == FOCUS_TOKEN {
        return focus.ok_or_else(|| EngineError::UnknownNode(name.to_string()));
    }

    storage
        .name_to_id(name)
        .await
        .map_err(|_| EngineError::UnknownNode(name.to_string()))
}

async fn filter_by_type(
    set: &NodeBitSet,
    type_filter: &str,
    storage: &dyn GraphStorage,
) -> Result<NodeBitSet> {
    if type_filter == "*" {
        return Ok(set.clone());
    }

    let ids = set.to_array();
    let nodes = storage.get_nodes(&ids).await?;
    Ok(nodes
        .into_iter()
        .filter(|node| node.matches_type(type_filter))
        .map(|node| node.id)
        .collect())
}
