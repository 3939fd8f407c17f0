// End-to-end tests for the reachability engine: node/edge mutation, the
// transitive cache pass, the query language, and the leaderboard evaluator,
// driven through the public `Engine` / `ReachabilityService` surface.

#[cfg(test)]
mod reachability_tests {
    use std::sync::Arc;

    use reachability_engine::rpc::{
        AddNodeRequest, LeaderboardRequest, QueryRequest, ReachabilityService, SetDependencyRequest,
    };
    use reachability_engine::storage::memory::InMemoryStorage;
    use reachability_engine::{CancellationToken, EngineConfig, EngineError, NodeId};
    use reachability_engine::rpc::Engine;

    fn new_engine() -> Engine {
        Engine::new(Arc::new(InMemoryStorage::new()), EngineConfig::default())
    }

    async fn add(engine: &Engine, name: &str) -> NodeId {
        engine
            .add_node(AddNodeRequest {
                node_type: "library".into(),
                name: name.into(),
                metadata: vec![],
            })
            .await
            .unwrap()
            .id
    }

    async fn dep(engine: &Engine, from: NodeId, to: NodeId) {
        engine
            .set_dependency(SetDependencyRequest { from, to })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn linear_chain_query_returns_full_downstream_closure() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        let c = add(&engine, "C").await;
        dep(&engine, a, b).await;
        dep(&engine, b, c).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let result = engine
            .query(QueryRequest { script: "dependencies * A".into() }, &token)
            .await
            .unwrap();
        let mut names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn diamond_closure_matches_expected_membership() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        let c = add(&engine, "C").await;
        let d = add(&engine, "D").await;
        dep(&engine, a, b).await;
        dep(&engine, a, c).await;
        dep(&engine, b, d).await;
        dep(&engine, c, d).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let result = engine
            .query(QueryRequest { script: "dependencies * A".into() }, &token)
            .await
            .unwrap();
        let mut names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["B", "C", "D"]);

        let result = engine
            .query(QueryRequest { script: "dependents * D".into() }, &token)
            .await
            .unwrap();
        let mut names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn cycle_includes_every_member_in_its_own_closure() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        dep(&engine, a, b).await;
        dep(&engine, b, a).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let result = engine
            .query(QueryRequest { script: "dependencies * A".into() }, &token)
            .await
            .unwrap();
        let mut names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn set_algebra_combines_dependency_directions() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        let c = add(&engine, "C").await;
        let d = add(&engine, "D").await;
        dep(&engine, a, b).await;
        dep(&engine, a, c).await;
        dep(&engine, b, d).await;
        dep(&engine, c, d).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let result = engine
            .query(
                QueryRequest {
                    script: "(dependencies * A) and (dependents * D)".into(),
                },
                &token,
            )
            .await
            .unwrap();
        let mut names: Vec<&str> = result.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_downstream_fanout() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        let c = add(&engine, "C").await;
        let d = add(&engine, "D").await;
        dep(&engine, a, b).await;
        dep(&engine, a, c).await;
        dep(&engine, b, d).await;
        dep(&engine, c, d).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let rows = engine
            .custom_leaderboard(
                LeaderboardRequest { script: "dependencies * focus".into(), concurrency: Some(2) },
                &token,
            )
            .await
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.node.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(rows[0].output.len(), 3);
        assert_eq!(rows[3].output.len(), 0);
    }

    #[tokio::test]
    async fn leaderboard_without_explicit_concurrency_uses_configured_default() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let b = add(&engine, "B").await;
        dep(&engine, a, b).await;

        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let rows = engine
            .custom_leaderboard(
                LeaderboardRequest { script: "dependencies * focus".into(), concurrency: None },
                &token,
            )
            .await
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.node.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn uncached_dirty_graph_rejects_query_and_leaderboard() {
        let engine = new_engine();
        add(&engine, "A").await;
        let token = CancellationToken::new();

        let err = engine
            .query(QueryRequest { script: "dependencies * A".into() }, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCached(1)));

        let err = engine
            .custom_leaderboard(
                LeaderboardRequest { script: "dependencies * focus".into(), concurrency: Some(4) },
                &token,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCached(1)));
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let engine = new_engine();
        let err = engine
            .add_node(AddNodeRequest { node_type: "library".into(), name: "".into(), metadata: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn self_loop_dependency_is_rejected() {
        let engine = new_engine();
        let a = add(&engine, "A").await;
        let err = engine
            .set_dependency(SetDependencyRequest { from: a, to: a })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn zero_concurrency_leaderboard_is_rejected() {
        let engine = new_engine();
        add(&engine, "A").await;
        let token = CancellationToken::new();
        engine.cache(&token).await.unwrap();

        let err = engine
            .custom_leaderboard(
                LeaderboardRequest { script: "dependencies * focus".into(), concurrency: Some(0) },
                &token,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn wildcard_glob_matches_every_node() {
        let engine = new_engine();
        add(&engine, "left-pad").await;
        add(&engine, "right-pad").await;
        add(&engine, "core").await;

        let matches = engine.get_nodes_by_glob("*").await.unwrap();
        assert_eq!(matches.len(), 3);

        let matches = engine.get_nodes_by_glob("*-pad").await.unwrap();
        assert_eq!(matches.len(), 2);
    }
}
