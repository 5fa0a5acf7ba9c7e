//! Integration tests for graph persistence and lifecycle
//!
//! Tests cover:
//! - Saving to and reloading from the JSON file store
//! - The validation pass that runs when a graph is loaded
//! - Implicit saves that fail without failing the mutation
//! - Export and import through the manager

use anyhow::Result;
use async_trait::async_trait;
use codetrail_core::{
    config::TrailConfig,
    db::{GraphStore, JsonFileStore, MemoryStore, StorageError},
    models::{Graph, GraphMetadata},
    services::{ErrorKind, ExportFormat, GraphManager, NodeManager},
    source::{FileReader, FsFileReader, InMemoryFileReader},
};
use std::sync::Arc;
use tempfile::TempDir;

const LIB_RS: &str = "pub fn parse(input: &str) -> Ast {\n    let tokens = lex(input);\n    build(tokens)\n}\n";

/// Test helper: a workspace with one source file and a graph directory
async fn create_test_env() -> Result<(TempDir, Arc<JsonFileStore>, Arc<FsFileReader>)> {
    let temp_dir = TempDir::new()?;
    tokio::fs::create_dir_all(temp_dir.path().join("src")).await?;
    tokio::fs::write(temp_dir.path().join("src/lib.rs"), LIB_RS).await?;

    let store = Arc::new(JsonFileStore::new(temp_dir.path().join("graphs")));
    let reader = Arc::new(FsFileReader::with_workspace_root(temp_dir.path()));
    Ok((temp_dir, store, reader))
}

fn create_managers(store: Arc<dyn GraphStore>, reader: Arc<dyn FileReader>) -> (Arc<GraphManager>, NodeManager) {
    let graphs = Arc::new(GraphManager::new(store, reader, TrailConfig::default()));
    let nodes = NodeManager::new(graphs.clone());
    (graphs, nodes)
}

/// A store whose writes always fail
struct ReadOnlyStore;

#[async_trait]
impl GraphStore for ReadOnlyStore {
    async fn save(&self, _graph: &Graph) -> Result<(), StorageError> {
        Err(StorageError::backend("store is read-only"))
    }

    async fn load(&self, id: &str) -> Result<Graph, StorageError> {
        Err(StorageError::graph_not_found(id))
    }

    async fn delete(&self, _id: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn list(&self) -> Result<Vec<GraphMetadata>, StorageError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_graph_survives_restart() -> Result<()> {
    let (_temp_dir, store, reader) = create_test_env().await?;

    let (graphs, nodes) = create_managers(store.clone(), reader.clone());
    graphs.create_graph("Parser walkthrough").await?;
    let parse = nodes.create_node("parse", "src/lib.rs", 1, None).await?;
    let lex = nodes.create_child_node(&parse.id, "lex", "src/lib.rs", 2).await?;
    let graph_id = graphs.current_graph_id().await.expect("graph is open");

    // A fresh manager over the same directory
    let (graphs, nodes) = create_managers(store, reader);
    let listed = graphs.list_graphs().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Parser walkthrough");
    assert_eq!(listed[0].node_count, 2);

    let loaded = graphs.load_graph(&graph_id).await?;
    assert_eq!(loaded.root_nodes(), &[parse.id.clone()]);
    assert_eq!(loaded.current_node_id(), Some(lex.id.as_str()));

    let lex = nodes.get_node(&lex.id).await?;
    assert_eq!(lex.code_snippet.as_deref(), Some("    let tokens = lex(input);"));
    assert!(lex.validation_warning.is_none());
    Ok(())
}

#[tokio::test]
async fn test_load_flags_drifted_nodes() -> Result<()> {
    let (temp_dir, store, reader) = create_test_env().await?;

    let (graphs, nodes) = create_managers(store.clone(), reader.clone());
    let lex = nodes.create_node("lex", "src/lib.rs", 2, None).await?;
    let graph_id = graphs.current_graph_id().await.expect("graph is open");

    // Two lines of docs added above the function
    let edited = format!("/// Parse the input.\n///\n{}", LIB_RS);
    tokio::fs::write(temp_dir.path().join("src/lib.rs"), edited).await?;

    let (graphs, nodes) = create_managers(store, reader);
    graphs.load_graph(&graph_id).await?;

    let flagged = nodes.get_node(&lex.id).await?;
    let warning = flagged.validation_warning.expect("drift is reported");
    assert!(warning.contains("(suggested line 4)"), "unexpected warning: {}", warning);
    // Loading reports drift but does not move the node
    assert_eq!(flagged.line_number, 2);

    let moved = nodes.accept_suggested_location(&lex.id).await?.expect("suggestion exists");
    assert_eq!(moved.line_number, 4);
    assert!(moved.validation_warning.is_none());

    let report = graphs.validate_current_graph().await?;
    assert_eq!(report.checked, 1);
    assert_eq!(report.valid, 1);
    Ok(())
}

#[tokio::test]
async fn test_load_unknown_graph_is_not_found() -> Result<()> {
    let (_temp_dir, store, reader) = create_test_env().await?;
    let (graphs, _) = create_managers(store, reader);

    let err = graphs
        .load_graph("4f1c2b8e-9d3a-4e6f-8a7b-0c1d2e3f4a5b")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(graphs.current_graph().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_failed_implicit_save_keeps_mutation() -> Result<()> {
    let reader = Arc::new(InMemoryFileReader::new());
    reader.insert_file("src/lib.rs", LIB_RS).await;
    let (graphs, nodes) = create_managers(Arc::new(ReadOnlyStore), reader);

    let node = nodes.create_node("parse", "src/lib.rs", 1, None).await?;
    assert_eq!(nodes.get_node(&node.id).await?.name, "parse");
    assert_eq!(graphs.current_graph().await.map(|g| g.node_count()), Some(1));

    // The explicit save reports what the implicit one swallowed
    let err = graphs.save_current_graph().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    Ok(())
}

#[tokio::test]
async fn test_export_import_through_manager() -> Result<()> {
    let reader = Arc::new(InMemoryFileReader::new());
    reader.insert_file("src/lib.rs", LIB_RS).await;
    let store = Arc::new(MemoryStore::new());
    let (graphs, nodes) = create_managers(store.clone(), reader);

    graphs.create_graph("Parser").await?;
    let parse = nodes.create_node("parse", "src/lib.rs", 1, None).await?;
    nodes.create_child_node(&parse.id, "build", "src/lib.rs", 3).await?;
    let original_id = graphs.current_graph_id().await.expect("graph is open");

    let markdown = graphs.export_current_graph(ExportFormat::Markdown).await?;
    assert!(markdown.starts_with("# Parser"));

    let imported = graphs.import_graph(&markdown).await?;
    assert_ne!(imported.id, original_id);
    assert_eq!(imported.name, "Parser");
    assert_eq!(imported.node_count(), 2);
    assert!(imported.get_node(&parse.id).is_none());

    let names: Vec<String> = nodes.list_nodes().await.into_iter().map(|n| n.name).collect();
    assert_eq!(names, vec!["parse".to_string(), "build".to_string()]);
    assert_eq!(store.len().await, 2);
    Ok(())
}
