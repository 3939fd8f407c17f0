//! # RPC Surface (semantic)
//!
//! The method table of spec §6, realized as an `async_trait` with one
//! request/response pair per row. Wire encoding and transport are explicit
//! external collaborators (spec §1) and are not implemented here — this
//! mirrors the teacher's own `api::handlers` shape (a typed request in, a
//! typed response out, delegating to a service object) without standing up
//! the HTTP layer itself.

use async_trait::async_trait;
use std::sync::Arc;

use crate::cache_engine::CacheEngine;
use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::leaderboard::{LeaderboardEntry, LeaderboardEvaluator};
use crate::node::{Node, NodeId};
use crate::query::{evaluate, parse};
use crate::storage::{CustomDataRecord, GraphStorage};

/// Request for [`ReachabilityService::add_node`].
#[derive(Debug, Clone)]
pub struct AddNodeRequest {
    /// Short type tag.
    pub node_type: String,
    /// Unique human-facing name.
    pub name: String,
    /// Opaque payload, uninterpreted by the core.
    pub metadata: Vec<u8>,
}

/// Request for [`ReachabilityService::set_dependency`].
#[derive(Debug, Clone, Copy)]
pub struct SetDependencyRequest {
    /// The dependent node.
    pub from: NodeId,
    /// The dependency node.
    pub to: NodeId,
}

/// Request for [`ReachabilityService::query`].
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The script to evaluate (spec §4.5 grammar).
    pub script: String,
}

/// Request for [`ReachabilityService::custom_leaderboard`].
#[derive(Debug, Clone)]
pub struct LeaderboardRequest {
    /// The script to evaluate once per focus node.
    pub script: String,
    /// The concurrency budget `K`. `None` uses the engine's configured
    /// `default_leaderboard_concurrency`; `Some(0)` still fails
    /// `InvalidArgument` rather than silently falling back to the default.
    pub concurrency: Option<usize>,
}

/// Request for custom-data ingestion staging, shared by the
/// `IngestSBOM` / `IngestVulnerability` / `IngestScorecard` rows, which are
/// delegated to ingest modules outside this crate's scope; this service
/// only exposes the generic staging primitive they would build on.
#[derive(Debug, Clone)]
pub struct CustomDataRequest {
    /// The auxiliary data type tag.
    pub data_type: String,
    /// The staging key.
    pub key: String,
    /// The staging subkey.
    pub subkey: String,
    /// The opaque payload.
    pub blob: Vec<u8>,
}

/// The semantic RPC surface of spec §6.
#[async_trait]
pub trait ReachabilityService: Send + Sync {
    /// `GetNode`
    async fn get_node(&self, id: NodeId) -> Result<Node>;

    /// `GetNodeByName`
    async fn get_node_by_name(&self, name: &str) -> Result<Node>;

    /// `GetNodesByGlob`
    async fn get_nodes_by_glob(&self, pattern: &str) -> Result<Vec<Node>>;

    /// `AddNode`
    async fn add_node(&self, request: AddNodeRequest) -> Result<Node>;

    /// `SetDependency`
    async fn set_dependency(&self, request: SetDependencyRequest) -> Result<()>;

    /// `Cache`
    async fn cache(&self, token: &CancellationToken) -> Result<()>;

    /// `Clear`
    async fn clear(&self) -> Result<()>;

    /// `Query`
    async fn query(&self, request: QueryRequest, token: &CancellationToken) -> Result<Vec<Node>>;

    /// `CustomLeaderboard`
    async fn custom_leaderboard(
        &self,
        request: LeaderboardRequest,
        token: &CancellationToken,
    ) -> Result<Vec<LeaderboardEntry>>;

    /// `AllKeys`
    async fn all_keys(&self) -> Result<Vec<Node>>;

    /// Generic custom-data staging primitive that `IngestSBOM` /
    /// `IngestVulnerability` / `IngestScorecard` build on; concrete format
    /// parsing is an ingest-module concern outside this crate.
    async fn stage_custom_data(&self, request: CustomDataRequest) -> Result<()>;

    /// Auxiliary blobs staged under `(type, key)`.
    async fn get_custom_data(&self, data_type: &str, key: &str) -> Result<Vec<CustomDataRecord>>;

    /// `Check`
    async fn check(&self) -> Result<&'static str>;
}

/// The default, in-process implementation of [`ReachabilityService`],
/// wiring the graph, cache engine, and leaderboard evaluator over a single
/// storage backend.
pub struct Engine {
    storage: Arc<dyn GraphStorage>,
    graph: Graph,
    cache_engine: CacheEngine,
    leaderboard: LeaderboardEvaluator,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine over a storage backend.
    pub fn new(storage: Arc<dyn GraphStorage>, config: EngineConfig) -> Self {
        Self {
            graph: Graph::new(storage.clone()),
            cache_engine: CacheEngine::new(storage.clone(), config.clone()),
            leaderboard: LeaderboardEvaluator::new(storage.clone(), config.clone()),
            storage,
            config,
        }
    }

    async fn resolve_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        self.storage.get_nodes(ids).await
    }
}

#[async_trait]
impl ReachabilityService for Engine {
    async fn get_node(&self, id: NodeId) -> Result<Node> {
        self.storage.get_node(id).await
    }

    async fn get_node_by_name(&self, name: &str) -> Result<Node> {
        let id = self.storage.name_to_id(name).await?;
        self.storage.get_node(id).await
    }

    async fn get_nodes_by_glob(&self, pattern: &str) -> Result<Vec<Node>> {
        self.storage.get_nodes_by_glob(pattern).await
    }

    async fn add_node(&self, request: AddNodeRequest) -> Result<Node> {
        self.graph
            .add_node(&request.node_type, request.metadata, &request.name)
            .await
    }

    async fn set_dependency(&self, request: SetDependencyRequest) -> Result<()> {
        self.graph.set_dependency(request.from, request.to).await
    }

    async fn cache(&self, token: &CancellationToken) -> Result<()> {
        self.cache_engine.cache(token).await
    }

    async fn clear(&self) -> Result<()> {
        self.storage.remove_all_caches().await
    }

    async fn query(&self, request: QueryRequest, token: &CancellationToken) -> Result<Vec<Node>> {
        let expr = parse(&request.script)?;
        let result = evaluate(&expr, self.storage.as_ref(), None, token).await?;
        self.resolve_nodes(&result.to_array()).await
    }

    async fn custom_leaderboard(
        &self,
        request: LeaderboardRequest,
        token: &CancellationToken,
    ) -> Result<Vec<LeaderboardEntry>> {
        let concurrency = request
            .concurrency
            .unwrap_or(self.config.default_leaderboard_concurrency);
        self.leaderboard.run(&request.script, concurrency, token).await
    }

    async fn all_keys(&self) -> Result<Vec<Node>> {
        let ids = self.storage.get_all_keys().await?;
        self.resolve_nodes(&ids).await
    }

    async fn stage_custom_data(&self, request: CustomDataRequest) -> Result<()> {
        self.storage
            .add_or_update_custom_data(&request.data_type, &request.key, &request.subkey, request.blob)
            .await
    }

    async fn get_custom_data(&self, data_type: &str, key: &str) -> Result<Vec<CustomDataRecord>> {
        self.storage.get_custom_data(data_type, key).await
    }

    async fn check(&self) -> Result<&'static str> {
        Ok("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStorage;

    fn new_engine() -> Engine {
        Engine::new(Arc::new(InMemoryStorage::new()), EngineConfig::default())
    }

    #[tokio::test]
    async fn add_node_then_get_by_name_round_trips() {
        let engine = new_engine();
        let node = engine
            .add_node(AddNodeRequest {
                node_type: "library".into(),
                name: "left-pad".into(),
                metadata: vec![1, 2, 3],
            })
            .await
            .unwrap();

        let fetched = engine.get_node_by_name("left-pad").await.unwrap();
        assert_eq!(fetched.id, node.id);
        assert_eq!(fetched.metadata, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn duplicate_name_fails() {
        let engine = new_engine();
        engine
            .add_node(AddNodeRequest {
                node_type: "library".into(),
                name: "left-pad".into(),
                metadata: vec![],
            })
            .await
            .unwrap();

        let err = engine
            .add_node(AddNodeRequest {
                node_type: "library".into(),
                name: "left-pad".into(),
                metadata: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, crate::error::EngineError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn check_reports_ok() {
        let engine = new_engine();
        assert_eq!(engine.check().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn clear_marks_everything_dirty_again() {
        let engine = new_engine();
        let a = engine
            .add_node(AddNodeRequest { node_type: "library".into(), name: "A".into(), metadata: vec![] })
            .await
            .unwrap();
        let b = engine
            .add_node(AddNodeRequest { node_type: "library".into(), name: "B".into(), metadata: vec![] })
            .await
            .unwrap();
        engine
            .set_dependency(SetDependencyRequest { from: a.id, to: b.id })
            .await
            .unwrap();

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();
        engine.clear().await.unwrap();

        let err = engine
            .query(QueryRequest { script: "dependencies library A".into() }, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::EngineError::NotCached(_)));
    }
}
