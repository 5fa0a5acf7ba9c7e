//! Graph export and import
//!
//! Two export formats:
//!
//! - `Json`: the full graph, pretty-printed
//! - `Markdown`: a readable outline of the hierarchy followed by the full
//!   graph JSON in a `<!-- codetrail:graph ... -->` comment, so the file
//!   can be imported again without loss
//!
//! Import tries structured data first (the embedded comment, then a fenced
//! `json` block, then the whole content as JSON) and falls back to parsing
//! the outline. Imported graphs always get fresh graph and node IDs.

use crate::db::StorageError;
use crate::models::{Graph, Node};
use crate::services::{LocationTracker, Result, TrailError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use uuid::Uuid;

const GRAPH_COMMENT_OPEN: &str = "<!-- codetrail:graph";
const GRAPH_COMMENT_CLOSE: &str = "-->";
const DEFAULT_IMPORT_NAME: &str = "Imported Graph";
const CURRENT_MARKER: &str = "_(current)_";

/// `- **name** (`path:line`) rest`
static OUTLINE_NODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)[-*+][ \t]+\*\*(?P<name>.+?)\*\*[ \t]*\(`(?P<loc>[^`]+)`\)(?P<rest>.*)$")
        .unwrap()
});

static OUTLINE_SNIPPET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*>[ \t]?(?P<text>.*)$").unwrap());

static OUTLINE_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[ \t]+(?P<title>.+?)[ \t]*$").unwrap());

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json[ \t]*\r?\n(?P<body>.*?)\r?\n[ \t]*```").unwrap());

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = TrailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(TrailError::parse(format!("Unknown export format: {}", other))),
        }
    }
}

/// Serialize a graph in the given format
pub fn export_graph(graph: &Graph, format: ExportFormat) -> Result<String> {
    let json = serde_json::to_string_pretty(graph)
        .map_err(|e| TrailError::from(StorageError::serialization(&graph.id, e)))?;

    match format {
        ExportFormat::Json => Ok(json),
        ExportFormat::Markdown => Ok(render_markdown(graph, &json)),
    }
}

fn render_markdown(graph: &Graph, json: &str) -> String {
    let mut out = format!("# {}\n\n", graph.name);

    let mut visited = HashSet::new();
    for root_id in graph.root_nodes() {
        render_node(graph, root_id, 0, &mut visited, &mut out);
    }
    if graph.is_empty() {
        out.push_str("_No nodes_\n");
    }

    // `<` and `-->` may only appear inside JSON strings, where `\u` escapes
    // are equivalent, so neither comment marker occurs in the body
    let embedded = json
        .replace('<', "\\u003c")
        .replace(GRAPH_COMMENT_CLOSE, "--\\u003e");
    out.push_str(&format!(
        "\n{}\n{}\n{}\n",
        GRAPH_COMMENT_OPEN, embedded, GRAPH_COMMENT_CLOSE
    ));
    out
}

fn render_node<'a>(
    graph: &'a Graph,
    id: &'a str,
    depth: usize,
    visited: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(node) = graph.get_node(id) else {
        return;
    };

    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{}- **{}** (`{}:{}`)",
        indent, node.name, node.file_path, node.line_number
    ));
    if graph.current_node_id() == Some(id) {
        out.push(' ');
        out.push_str(CURRENT_MARKER);
    }
    out.push('\n');

    if let Some(first_line) = node
        .code_snippet
        .as_deref()
        .and_then(|s| s.lines().map(str::trim).find(|l| !l.is_empty()))
    {
        out.push_str(&format!("{}  > {}\n", indent, first_line));
    }

    for child_id in &node.child_ids {
        render_node(graph, child_id, depth + 1, visited, out);
    }
}

/// Loosely typed graph document accepted on import
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    nodes: NodeCollection,
    #[serde(default)]
    root_nodes: Vec<String>,
    #[serde(default)]
    current_node_id: Option<String>,
}

/// Nodes keyed by ID, or a plain list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeCollection {
    Map(HashMap<String, Node>),
    List(Vec<Node>),
}

impl NodeCollection {
    fn is_empty(&self) -> bool {
        match self {
            Self::Map(map) => map.is_empty(),
            Self::List(list) => list.is_empty(),
        }
    }

    fn into_vec(self) -> Vec<Node> {
        match self {
            Self::Map(map) => {
                let mut nodes: Vec<Node> = map.into_values().collect();
                // Stable order for root placement of orphans
                nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
                nodes
            }
            Self::List(list) => list,
        }
    }
}

/// Parse exported content back into a new graph with fresh IDs
///
/// A structured candidate must carry a `nodes` field. One without any nodes
/// (an exported empty graph, or an unrelated JSON snippet) is only used
/// when neither a later candidate nor the outline yields nodes.
pub fn import_graph(content: &str) -> Result<Graph> {
    let mut last_error = None;
    let mut empty_document = None;

    for candidate in structured_candidates(content) {
        match serde_json::from_str::<GraphDocument>(candidate) {
            Ok(document) if document.nodes.is_empty() => {
                empty_document.get_or_insert(document);
            }
            Ok(document) => {
                let graph = remap_document(document);
                tracing::debug!("Imported {} node(s) from structured data", graph.node_count());
                return Ok(graph);
            }
            Err(e) => last_error = Some(e),
        }
    }

    let graph = parse_outline(content);
    if graph.is_empty() {
        if let Some(document) = empty_document {
            tracing::debug!("Imported an empty graph");
            return Ok(remap_document(document));
        }
        return Err(match last_error {
            Some(e) => TrailError::parse(format!("No graph data found (invalid JSON: {})", e)),
            None => TrailError::parse("No graph data found"),
        });
    }

    tracing::debug!("Imported {} node(s) from outline", graph.node_count());
    Ok(graph)
}

/// JSON blobs to try, most specific first
fn structured_candidates(content: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    // The embedded graph is written last; an earlier marker is node text
    if let Some(start) = content.rfind(GRAPH_COMMENT_OPEN) {
        let body = &content[start + GRAPH_COMMENT_OPEN.len()..];
        if let Some(end) = body.find(GRAPH_COMMENT_CLOSE) {
            candidates.push(body[..end].trim());
        }
    }

    if let Some(caps) = FENCED_JSON_RE.captures(content) {
        if let Some(body) = caps.name("body") {
            candidates.push(body.as_str().trim());
        }
    }

    let whole = content.trim();
    if whole.starts_with('{') {
        candidates.push(whole);
    }

    candidates
}

/// Rebuild a document under fresh IDs, repairing broken links
fn remap_document(document: GraphDocument) -> Graph {
    let nodes = document.nodes.into_vec();
    let id_map: HashMap<String, String> = nodes
        .iter()
        .map(|n| (n.id.clone(), Uuid::new_v4().to_string()))
        .collect();
    let remap = |id: &String| id_map.get(id).cloned();

    let remapped: Vec<Node> = nodes
        .into_iter()
        .filter_map(|mut node| {
            node.id = remap(&node.id)?;
            node.parent_id = node.parent_id.as_ref().and_then(remap);
            node.child_ids = node.child_ids.iter().filter_map(remap).collect();
            if node.code_hash.is_none() {
                node.code_hash = LocationTracker::code_hash_for(node.code_snippet.as_deref());
            }
            Some(node)
        })
        .collect();

    let name = document
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_IMPORT_NAME.to_string());
    let now = Utc::now();

    Graph::from_parts(
        Uuid::new_v4().to_string(),
        name,
        document.created_at.unwrap_or(now),
        now,
        remapped,
        document.root_nodes.iter().filter_map(remap).collect(),
        document.current_node_id.as_ref().and_then(remap),
    )
}

/// Parse the human-readable outline. Indentation (two columns per level)
/// gives the hierarchy; a `>` line right after a node is its snippet.
fn parse_outline(content: &str) -> Graph {
    let mut graph = Graph::new(DEFAULT_IMPORT_NAME);
    // (indent width, node ID) of the open ancestors
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut last_node: Option<String> = None;
    let mut current: Option<String> = None;
    let mut titled = false;

    for line in content.lines() {
        if line.trim_start().starts_with(GRAPH_COMMENT_OPEN) {
            break;
        }

        if !titled {
            if let Some(caps) = OUTLINE_TITLE_RE.captures(line) {
                graph.name = caps["title"].to_string();
                titled = true;
                continue;
            }
        }

        if let Some(caps) = OUTLINE_NODE_RE.captures(line) {
            let indent = caps["indent"].replace('\t', "  ").len();
            let (file_path, line_number) = split_location(&caps["loc"]);

            while stack.last().is_some_and(|(width, _)| *width >= indent) {
                stack.pop();
            }

            let mut node = Node::new(caps["name"].trim().to_string(), file_path, line_number);
            node.parent_id = stack.last().map(|(_, id)| id.clone());
            let id = node.id.clone();
            if graph.add_node(node).is_err() {
                continue;
            }

            if caps["rest"].contains(CURRENT_MARKER) {
                current = Some(id.clone());
            }
            stack.push((indent, id.clone()));
            last_node = Some(id);
            continue;
        }

        if let (Some(caps), Some(id)) = (OUTLINE_SNIPPET_RE.captures(line), last_node.take()) {
            let text = caps["text"].to_string();
            if let Ok(node) = graph.node_mut(&id) {
                let hash = LocationTracker::code_hash_for(Some(&text));
                node.set_code(Some(text), hash);
            }
            continue;
        }

        if !line.trim().is_empty() {
            last_node = None;
        }
    }

    if let Some(id) = current {
        // The ID was just inserted above
        let _ = graph.set_current_node(&id);
    }
    graph
}

/// `path:line` -> (path, line); a missing or bad line number becomes 1
fn split_location(location: &str) -> (String, u32) {
    let location = location.trim();
    match location.rsplit_once(':') {
        Some((path, line)) if !path.is_empty() => match line.trim().parse::<i64>() {
            Ok(n) => (path.to_string(), crate::models::coerce_line_number(n)),
            Err(_) => (location.to_string(), 1),
        },
        _ => (location.to_string(), 1),
    }
}
