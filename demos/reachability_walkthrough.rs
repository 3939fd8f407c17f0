//! Reachability Engine Walkthrough
//!
//! Builds a small dependency graph, runs the transitive cache pass, and
//! issues a handful of queries and a leaderboard evaluation against it.

use std::sync::Arc;

use reachability_engine::rpc::{
    AddNodeRequest, LeaderboardRequest, QueryRequest, ReachabilityService, SetDependencyRequest,
};
use reachability_engine::storage::memory::InMemoryStorage;
use reachability_engine::{CancellationToken, Engine, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let engine = Engine::new(Arc::new(InMemoryStorage::new()), EngineConfig::default());

    let left_pad = engine
        .add_node(AddNodeRequest {
            node_type: "library".into(),
            name: "left-pad".into(),
            metadata: vec![],
        })
        .await?;
    let string_utils = engine
        .add_node(AddNodeRequest {
            node_type: "library".into(),
            name: "string-utils".into(),
            metadata: vec![],
        })
        .await?;
    let app = engine
        .add_node(AddNodeRequest {
            node_type: "application".into(),
            name: "checkout-service".into(),
            metadata: vec![],
        })
        .await?;

    engine
        .set_dependency(SetDependencyRequest { from: string_utils.id, to: left_pad.id })
        .await?;
    engine
        .set_dependency(SetDependencyRequest { from: app.id, to: string_utils.id })
        .await?;

    let token = CancellationToken::new();
    engine.cache(&token).await?;

    let downstream_of_left_pad = engine
        .query(
            QueryRequest { script: "dependents * left-pad".into() },
            &token,
        )
        .await?;
    println!(
        "depends transitively on left-pad: {:?}",
        downstream_of_left_pad.iter().map(|n| &n.name).collect::<Vec<_>>()
    );

    let leaderboard = engine
        .custom_leaderboard(
            LeaderboardRequest { script: "dependents * focus".into(), concurrency: Some(4) },
            &token,
        )
        .await?;
    for row in &leaderboard {
        println!("{}: {} dependents", row.node.name, row.output.len());
    }

    Ok(())
}
