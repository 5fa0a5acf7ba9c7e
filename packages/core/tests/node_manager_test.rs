//! Integration tests for NodeManager
//!
//! Tests cover:
//! - A realistic bookmarking session across two files
//! - Concurrent mutations from many tasks
//! - Search over a populated graph
//! - Lenient line numbers at the data boundary

use anyhow::Result;
use codetrail_core::{
    config::TrailConfig,
    db::MemoryStore,
    models::{ConfidenceLevel, MatchQuery, MatchType, Node, NodeUpdate},
    services::{GraphManager, NodeManager},
    source::InMemoryFileReader,
};
use std::sync::Arc;

const SERVER_RS: &str = "\
use crate::router::Router;

pub async fn start(config: Config) -> Result<()> {
    let router = Router::new();
    let listener = bind(&config.addr).await?;
    serve(listener, router).await
}
";

const ROUTER_RS: &str = "\
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(&mut self, path: &str) {
        self.routes.push(Route::new(path));
    }
}
";

/// Test helper: managers over in-memory files
async fn create_test_env() -> (Arc<NodeManager>, Arc<InMemoryFileReader>) {
    let reader = Arc::new(InMemoryFileReader::new());
    reader.insert_file("src/server.rs", SERVER_RS).await;
    reader.insert_file("src/router.rs", ROUTER_RS).await;

    let graphs = Arc::new(GraphManager::new(
        Arc::new(MemoryStore::new()),
        reader.clone(),
        TrailConfig::default(),
    ));
    (Arc::new(NodeManager::new(graphs)), reader)
}

#[tokio::test]
async fn test_bookmarking_session() -> Result<()> {
    let (nodes, reader) = create_test_env().await;

    let start = nodes.create_node("Server start", "src/server.rs", 3, None).await?;
    let router_new = nodes
        .create_child_node(&start.id, "Router::new", "src/server.rs", 4)
        .await?;
    let ctor = nodes
        .create_child_node(&router_new.id, "Router constructor", "src/router.rs", 6)
        .await?;
    nodes
        .create_bro_node(&router_new.id, "Bind listener", "src/server.rs", 5)
        .await?;

    let ancestors: Vec<String> = nodes
        .get_ancestors(&ctor.id)
        .await?
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(ancestors, vec!["Router::new", "Server start"]);
    assert_eq!(ctor.code_snippet.as_deref(), Some("    pub fn new() -> Self {"));

    // Someone adds a field above the constructor
    reader
        .insert_file(
            "src/router.rs",
            ROUTER_RS.replace("    routes: Vec<Route>,\n", "    routes: Vec<Route>,\n    fallback: Option<Route>,\n"),
        )
        .await;

    let navigation = nodes.navigate_to_node(&ctor.id).await?;
    assert!(navigation.success);
    assert_eq!(navigation.validation.confidence, ConfidenceLevel::High);
    assert_eq!(navigation.actual_location.map(|l| l.line_number), Some(7));

    // The file disappears entirely
    reader.remove_file("src/router.rs").await;
    let validation = nodes.validate_node(&ctor.id).await?;
    assert!(!validation.is_valid);
    assert_eq!(validation.confidence, ConfidenceLevel::Failed);
    assert!(!nodes.navigate_to_node(&ctor.id).await?.success);

    assert_eq!(nodes.list_nodes().await.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_child_creation() -> Result<()> {
    let (nodes, _) = create_test_env().await;
    let root = nodes.create_node("Root", "src/router.rs", 1, None).await?;

    let mut handles = Vec::new();
    for i in 0..25 {
        let nodes = nodes.clone();
        let root_id = root.id.clone();
        handles.push(tokio::spawn(async move {
            nodes
                .create_child_node(&root_id, &format!("Child {}", i), "src/router.rs", (i % 12) + 1)
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let root = nodes.get_node(&root.id).await?;
    assert_eq!(root.child_ids.len(), 25);

    let graph = nodes.graph_manager().current_graph().await.expect("graph is open");
    assert_eq!(graph.node_count(), 26);
    assert!(graph.invariant_violations().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_mixed_mutations() -> Result<()> {
    let (nodes, _) = create_test_env().await;
    let root = nodes.create_node("Root", "src/server.rs", 1, None).await?;
    let mut children = Vec::new();
    for i in 0..10 {
        children.push(
            nodes
                .create_child_node(&root.id, &format!("Step {}", i), "src/server.rs", i + 1)
                .await?,
        );
    }

    let mut handles = Vec::new();
    for (i, child) in children.into_iter().enumerate() {
        let nodes = nodes.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                nodes.delete_node(&child.id).await.map(|_| ())
            } else {
                nodes
                    .update_node(&child.id, NodeUpdate::new().with_name(format!("Renamed {}", i)))
                    .await
                    .map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let remaining: Vec<Node> = nodes.get_children(&root.id).await?;
    assert_eq!(remaining.len(), 5);
    assert!(remaining.iter().all(|n| n.name.starts_with("Renamed")));
    Ok(())
}

#[tokio::test]
async fn test_search_ranking() -> Result<()> {
    let (nodes, _) = create_test_env().await;
    let route = nodes.create_node("route", "src/router.rs", 10, None).await?;
    nodes.create_node("Router constructor", "src/router.rs", 6, None).await?;
    nodes.create_node("start server", "src/server.rs", 3, None).await?;

    let by_location = nodes
        .find_nodes(&MatchQuery::new().with_file_path("src/router.rs").with_line_number(10))
        .await;
    assert_eq!(by_location[0].node.id, route.id);
    assert_eq!(by_location[0].match_type, MatchType::ExactLocation);

    let by_name = nodes.find_nodes(&MatchQuery::new().with_text("route")).await;
    assert_eq!(by_name[0].node.id, route.id);
    assert_eq!(by_name[0].score, 1.0);

    let limited = nodes
        .find_nodes(&MatchQuery::new().with_text("r").with_limit(1))
        .await;
    assert!(limited.len() <= 1);
    Ok(())
}

#[tokio::test]
async fn test_fractional_line_numbers_in_stored_nodes() -> Result<()> {
    let node: Node = serde_json::from_value(serde_json::json!({
        "id": "a0b1c2d3-0000-4000-8000-000000000001",
        "name": "Imported",
        "filePath": "src/server.rs",
        "lineNumber": 4.9,
        "childIds": [],
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    }))?;
    assert_eq!(node.line_number, 4);

    let node: Node = serde_json::from_value(serde_json::json!({
        "id": "a0b1c2d3-0000-4000-8000-000000000002",
        "name": "Imported",
        "filePath": "src/server.rs",
        "lineNumber": -3,
        "childIds": [],
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    }))?;
    assert_eq!(node.line_number, 1);
    Ok(())
}

#[tokio::test]
async fn test_fractional_line_number_in_update() -> Result<()> {
    let (nodes, _) = create_test_env().await;
    let node = nodes.create_node("Router", "src/router.rs", 1, None).await?;

    let update: NodeUpdate = serde_json::from_value(serde_json::json!({ "lineNumber": 6.8 }))?;
    let updated = nodes.update_node(&node.id, update).await?;

    assert_eq!(updated.line_number, 6);
    Ok(())
}
