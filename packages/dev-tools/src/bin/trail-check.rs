//! Graph Store Inspection Binary
//!
//! Lists the graphs in a CodeTrail store directory, or loads one and prints
//! the result of checking every node's location against the source files.
//!
//! # Usage
//!
//! ```bash
//! # List stored graphs
//! cargo run --bin trail-check
//!
//! # Validate one graph, reading sources relative to the current directory
//! cargo run --bin trail-check -- <graph-id>
//!
//! # Same, as JSON
//! cargo run --bin trail-check -- <graph-id> --json
//! ```
//!
//! # Environment Variables
//!
//! - `CODETRAIL_CONFIG`: Path to a JSON config file (defaults apply otherwise)
//! - `CODETRAIL_WORKSPACE`: Root that node file paths resolve against
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//!
//! Loading a graph records validation warnings on its nodes and saves them
//! back to the store.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use codetrail_core::db::JsonFileStore;
use codetrail_core::models::LocationValidation;
use codetrail_core::services::GraphManager;
use codetrail_core::source::FsFileReader;
use codetrail_core::TrailConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("CODETRAIL_CONFIG") {
        Ok(path) => TrailConfig::load(&path).await?,
        Err(_) => TrailConfig::default(),
    };

    let storage_dir = config.resolve_storage_dir()?;
    tracing::info!("Graph store: {}", storage_dir.display());

    let workspace = match env::var("CODETRAIL_WORKSPACE") {
        Ok(root) => PathBuf::from(root),
        Err(_) => env::current_dir()?,
    };
    tracing::info!("Workspace: {}", workspace.display());

    let manager = GraphManager::new(
        Arc::new(JsonFileStore::new(storage_dir)),
        Arc::new(FsFileReader::with_workspace_root(workspace)),
        config,
    );

    let args: Vec<String> = env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    let graph_id = args.iter().find(|a| !a.starts_with("--"));

    let Some(graph_id) = graph_id else {
        let graphs = manager.list_graphs().await?;
        if graphs.is_empty() {
            println!("No graphs stored");
        }
        for meta in graphs {
            println!(
                "{}  {:<30} {:>5} node(s)  updated {}",
                meta.id,
                meta.name,
                meta.node_count,
                meta.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    };

    let (graph, report) = manager.load_graph_with_report(graph_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({})", graph.name, graph.id);
    for result in &report.results {
        let Some(node) = graph.get_node(&result.node_id) else {
            continue;
        };
        let status = node_status(&result.validation);
        print!("  [{:>7}] {} ({})", status, result.node_name, node.location());
        match &result.validation.suggested_location {
            Some(suggested) => println!(" -> {} [{}]", suggested, result.validation.confidence),
            None => println!(),
        }
    }
    println!(
        "{} checked, {} valid, {} relocatable, {} failed",
        report.checked, report.valid, report.relocatable, report.failed
    );

    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn node_status(validation: &LocationValidation) -> &'static str {
    if validation.is_valid {
        "ok"
    } else if validation.suggested_location.is_some() {
        "MOVED"
    } else {
        "MISSING"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codetrail_core::models::{ConfidenceLevel, Location};

    #[test]
    fn test_node_status() {
        let unanchored = LocationValidation {
            is_valid: true,
            confidence: ConfidenceLevel::High,
            reason: Some("No code snippet recorded".to_string()),
            suggested_location: None,
        };
        assert_eq!(node_status(&unanchored), "ok");
        assert_eq!(node_status(&LocationValidation::exact()), "ok");

        let moved = LocationValidation::relocated(
            ConfidenceLevel::High,
            Location::new("src/main.rs", 4),
            "Code moved",
        );
        assert_eq!(node_status(&moved), "MOVED");
        assert_eq!(node_status(&LocationValidation::failed("File not found")), "MISSING");
    }
}
