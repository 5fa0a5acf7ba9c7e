//! Tests for hierarchy edits that rewrite more than one link
//!
//! Tests cover:
//! - Inserting a parent above a node that already has one (tree fork)
//! - Deleting a node and promoting its children
//! - Deleting a whole subtree

#[cfg(test)]
mod tests {
    use crate::config::TrailConfig;
    use crate::db::MemoryStore;
    use crate::models::Node;
    use crate::services::{GraphManager, NodeManager};
    use crate::source::InMemoryFileReader;
    use std::sync::Arc;

    const FILE: &str = "src/handlers.rs";

    async fn create_test_manager() -> NodeManager {
        let reader = Arc::new(InMemoryFileReader::new());
        let content: String = (1..=20).map(|i| format!("fn handler_{}() {{}}\n", i)).collect();
        reader.insert_file(FILE, content).await;

        let graphs = Arc::new(GraphManager::new(
            Arc::new(MemoryStore::new()),
            reader,
            TrailConfig::default(),
        ));
        NodeManager::new(graphs)
    }

    /// Builds A -> B -> C and returns the three nodes
    async fn create_chain(nodes: &NodeManager) -> (Node, Node, Node) {
        let a = nodes.create_node("A", FILE, 1, None).await.unwrap();
        let b = nodes.create_child_node(&a.id, "B", FILE, 2).await.unwrap();
        let c = nodes.create_child_node(&b.id, "C", FILE, 3).await.unwrap();
        (a, b, c)
    }

    #[tokio::test]
    async fn test_create_parent_forks_tree() {
        let nodes = create_test_manager().await;
        let (a, b, c) = create_chain(&nodes).await;

        let d = nodes.create_parent_node(&b.id, "D", FILE, 4).await.unwrap();

        // A still owns the original B, which lost its children
        let a = nodes.get_node(&a.id).await.unwrap();
        let b = nodes.get_node(&b.id).await.unwrap();
        assert_eq!(a.child_ids, vec![b.id.clone()]);
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));
        assert!(b.child_ids.is_empty());

        // D is a new root holding a copy of B, which took over C
        let d = nodes.get_node(&d.id).await.unwrap();
        assert!(d.is_root());
        assert_eq!(d.child_ids.len(), 1);

        let copy = nodes.get_node(&d.child_ids[0]).await.unwrap();
        assert_ne!(copy.id, b.id);
        assert_eq!(copy.name, b.name);
        assert_eq!(copy.location(), b.location());
        assert_eq!(copy.code_hash, b.code_hash);
        assert_eq!(copy.child_ids, vec![c.id.clone()]);

        let c = nodes.get_node(&c.id).await.unwrap();
        assert_eq!(c.parent_id.as_deref(), Some(copy.id.as_str()));

        let roots: Vec<String> = nodes.get_root_nodes().await.into_iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![a.id.clone(), d.id.clone()]);
        assert_eq!(nodes.get_current_node().await.unwrap().id, d.id);
        assert_eq!(nodes.list_nodes().await.len(), 5);
    }

    #[tokio::test]
    async fn test_fork_keeps_graph_consistent() {
        let nodes = create_test_manager().await;
        let (_, b, _) = create_chain(&nodes).await;
        nodes.create_child_node(&b.id, "C2", FILE, 5).await.unwrap();

        nodes.create_parent_node(&b.id, "D", FILE, 6).await.unwrap();

        let graph = nodes.graph_manager().current_graph().await.unwrap();
        assert!(graph.invariant_violations().is_empty());

        let ancestors: Vec<String> = nodes
            .get_ancestors(&graph.descendants_preorder(&graph.root_nodes()[1])[1])
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(ancestors, vec!["B".to_string(), "D".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_node_promotes_children() {
        let nodes = create_test_manager().await;
        let (a, b, c) = create_chain(&nodes).await;

        let removed = nodes.delete_node(&b.id).await.unwrap();
        assert_eq!(removed.id, b.id);

        let c = nodes.get_node(&c.id).await.unwrap();
        assert!(c.is_root());
        assert!(nodes.get_node(&a.id).await.unwrap().child_ids.is_empty());
        assert!(nodes.get_node(&b.id).await.unwrap_err().is_not_found());

        let roots: Vec<String> = nodes.get_root_nodes().await.into_iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![a.id.clone(), c.id.clone()]);
        assert_eq!(nodes.get_current_node().await.unwrap().id, c.id);

        // Deleting the focused node clears the focus
        nodes.delete_node(&c.id).await.unwrap();
        assert!(nodes.get_current_node().await.is_none());
    }

    #[tokio::test]
    async fn test_delete_node_with_children() {
        let nodes = create_test_manager().await;
        let (a, b, c) = create_chain(&nodes).await;
        let other = nodes.create_node("Other", FILE, 10, None).await.unwrap();

        let removed = nodes.delete_node_with_children(&a.id).await.unwrap();
        assert_eq!(removed, vec![a.id.clone(), b.id.clone(), c.id.clone()]);

        let remaining: Vec<String> = nodes.list_nodes().await.into_iter().map(|n| n.id).collect();
        assert_eq!(remaining, vec![other.id]);

        assert!(nodes
            .delete_node_with_children(&a.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
