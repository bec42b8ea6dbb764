//! The node/edge store with adjacency indexing and idempotent upserts.

use chrono::Utc;
use opsgraph_types::graph::{Edge, EdgeId, EntityType, GraphStats, Node, NodeId};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// In-memory entity-relationship store.
///
/// Owned by exactly one logical session at a time; callers that need to
/// share it across agents wrap it in `Arc<Mutex<GraphStore>>`. The store
/// itself takes no locks.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeId, Edge>,
    /// Node id -> ids of every edge touching that node, in sync with `edges`.
    pub(crate) adjacency: HashMap<NodeId, HashSet<EdgeId>>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a node.
    ///
    /// Returns true when the node was created. On an existing id the stored
    /// props are replaced wholesale (not merged), `updated_at` advances,
    /// `created_at` is preserved, and `source` is refreshed when the new
    /// assertion carries one.
    pub fn upsert_node(&mut self, node: Node) -> bool {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                existing.props = node.props;
                existing.updated_at = Utc::now();
                if node.source.is_some() {
                    existing.source = node.source;
                }
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(node);
                true
            }
        }
    }

    /// Insert or refresh an edge, keyed by its deterministic id.
    ///
    /// Returns true when the edge was created; the adjacency index is
    /// updated for both endpoints. Re-asserting the same
    /// `(from, relation, to)` triple never duplicates the edge, it only
    /// replaces its props (and `source` when provided).
    pub fn upsert_edge(&mut self, edge: Edge) -> bool {
        let id = edge.id();
        match self.edges.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                existing.props = edge.props;
                if edge.source.is_some() {
                    existing.source = edge.source;
                }
                false
            }
            Entry::Vacant(vacant) => {
                self.adjacency
                    .entry(edge.from_id.clone())
                    .or_default()
                    .insert(id.clone());
                self.adjacency
                    .entry(edge.to_id.clone())
                    .or_default()
                    .insert(id);
                vacant.insert(edge);
                true
            }
        }
    }

    /// Look up a node by id.
    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    /// Look up an edge by id.
    pub fn get_edge(&self, id: &EdgeId) -> Option<Edge> {
        self.edges.get(id).cloned()
    }

    /// Linear scan over nodes of one type with AND-equality prop filters.
    ///
    /// A node matches when every filter key is present in its props with an
    /// exactly equal value. Result order is map order, not stable.
    pub fn query_by_type(
        &self,
        entity_type: EntityType,
        filters: &HashMap<String, serde_json::Value>,
    ) -> Vec<Node> {
        self.nodes
            .values()
            .filter(|node| node.entity_type == entity_type)
            .filter(|node| {
                filters
                    .iter()
                    .all(|(key, value)| node.props.get(key) == Some(value))
            })
            .cloned()
            .collect()
    }

    /// Aggregate node/edge counts, per type.
    pub fn stats(&self) -> GraphStats {
        let mut node_type_counts: HashMap<String, usize> = HashMap::new();
        for node in self.nodes.values() {
            *node_type_counts
                .entry(node.entity_type.as_str().to_string())
                .or_default() += 1;
        }
        let mut edge_type_counts: HashMap<String, usize> = HashMap::new();
        for edge in self.edges.values() {
            *edge_type_counts
                .entry(edge.relation_type.as_str().to_string())
                .or_default() += 1;
        }
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            node_type_counts,
            edge_type_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgraph_types::graph::RelationType;
    use serde_json::json;

    fn service(name: &str) -> Node {
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(name));
        Node::with_key(EntityType::Service, name, props, None)
    }

    fn env_var(name: &str) -> Node {
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(name));
        Node::with_key(EntityType::EnvVar, name, props, None)
    }

    #[test]
    fn test_upsert_node_created_then_updated() {
        let mut store = GraphStore::new();
        assert!(store.upsert_node(service("acme")));
        assert!(!store.upsert_node(service("acme")));
        assert_eq!(store.stats().total_nodes, 1);
    }

    #[test]
    fn test_upsert_node_replaces_props_wholesale() {
        let mut store = GraphStore::new();
        let mut first = service("acme");
        first
            .props
            .insert("region".to_string(), json!("eu-west-1"));
        store.upsert_node(first.clone());
        let created_at = store.get_node(&first.id).unwrap().created_at;

        std::thread::sleep(std::time::Duration::from_millis(2));
        store.upsert_node(service("acme"));

        let stored = store.get_node(&first.id).unwrap();
        assert!(stored.props.get("region").is_none());
        assert_eq!(stored.created_at, created_at);
        assert!(stored.updated_at > created_at);
    }

    #[test]
    fn test_upsert_edge_idempotent_identity() {
        let mut store = GraphStore::new();
        let acme = service("acme");
        let foo = env_var("FOO");
        store.upsert_node(acme.clone());
        store.upsert_node(foo.clone());

        let first = Edge::new(
            acme.id.clone(),
            RelationType::ServiceRequiresEnvvar,
            foo.id.clone(),
        );
        let mut props = HashMap::new();
        props.insert("observed".to_string(), json!("missing"));
        let second = Edge::new(
            acme.id.clone(),
            RelationType::ServiceRequiresEnvvar,
            foo.id.clone(),
        )
        .with_props(props);

        assert!(store.upsert_edge(first));
        assert!(!store.upsert_edge(second.clone()));
        assert_eq!(store.stats().total_edges, 1);
        let stored = store.get_edge(&second.id()).unwrap();
        assert_eq!(stored.props.get("observed"), Some(&json!("missing")));
    }

    #[test]
    fn test_parallel_edges_of_different_relation_types() {
        let mut store = GraphStore::new();
        let a = service("a");
        let b = service("b");
        store.upsert_node(a.clone());
        store.upsert_node(b.clone());
        store.upsert_edge(Edge::new(
            a.id.clone(),
            RelationType::ServiceIntegratesWith,
            b.id.clone(),
        ));
        store.upsert_edge(Edge::new(
            a.id.clone(),
            RelationType::FeatureDependsOn,
            b.id.clone(),
        ));
        assert_eq!(store.stats().total_edges, 2);
    }

    #[test]
    fn test_query_by_type_with_filters() {
        let mut store = GraphStore::new();
        let mut eu = service("acme");
        eu.props.insert("region".to_string(), json!("eu-west-1"));
        let mut us = service("umbrella");
        us.props.insert("region".to_string(), json!("us-east-1"));
        store.upsert_node(eu);
        store.upsert_node(us);
        store.upsert_node(env_var("FOO"));

        let all = store.query_by_type(EntityType::Service, &HashMap::new());
        assert_eq!(all.len(), 2);

        let mut filters = HashMap::new();
        filters.insert("region".to_string(), json!("eu-west-1"));
        let matched = store.query_by_type(EntityType::Service, &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].prop_str("name"), Some("acme"));

        filters.insert("tier".to_string(), json!("gold"));
        assert!(store.query_by_type(EntityType::Service, &filters).is_empty());
    }

    #[test]
    fn test_stats_counts_per_type() {
        let mut store = GraphStore::new();
        let acme = service("acme");
        let foo = env_var("FOO");
        store.upsert_node(acme.clone());
        store.upsert_node(foo.clone());
        store.upsert_edge(Edge::new(
            acme.id,
            RelationType::ServiceRequiresEnvvar,
            foo.id,
        ));

        let stats = store.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.node_type_counts.get("Service"), Some(&1));
        assert_eq!(stats.node_type_counts.get("EnvVar"), Some(&1));
        assert_eq!(
            stats.edge_type_counts.get("SERVICE_REQUIRES_ENVVAR"),
            Some(&1)
        );
    }
}
