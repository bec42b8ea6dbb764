//! Generic traversal primitives: neighbor expansion, bounded path search,
//! and subgraph extraction.

use crate::store::GraphStore;
use opsgraph_types::graph::{Direction, Node, NodeId, RelationType};
use std::collections::{HashSet, VecDeque};

impl GraphStore {
    /// Resolve the neighbors of a node through its adjacency-indexed edges.
    ///
    /// `relation_types` restricts which edges are followed; `direction`
    /// selects outgoing, incoming, or both. Result order is adjacency-index
    /// order and is not guaranteed stable; callers sort when they need to.
    pub fn get_neighbors(
        &self,
        id: &NodeId,
        relation_types: Option<&[RelationType]>,
        direction: Direction,
    ) -> Vec<Node> {
        let mut neighbors = Vec::new();
        let Some(edge_ids) = self.adjacency.get(id) else {
            return neighbors;
        };
        for edge_id in edge_ids {
            let Some(edge) = self.edges.get(edge_id) else {
                continue;
            };
            if let Some(types) = relation_types {
                if !types.contains(&edge.relation_type) {
                    continue;
                }
            }
            let neighbor_id = match direction {
                Direction::Out if edge.from_id == *id => &edge.to_id,
                Direction::In if edge.to_id == *id => &edge.from_id,
                Direction::Both => {
                    if edge.from_id == *id {
                        &edge.to_id
                    } else {
                        &edge.from_id
                    }
                }
                _ => continue,
            };
            if let Some(node) = self.nodes.get(neighbor_id) {
                neighbors.push(node.clone());
            }
        }
        neighbors
    }

    /// Breadth-first search over outgoing edges, returning every discovered
    /// path from `from` to `to` with at most `max_hops` edges.
    ///
    /// A self-path returns `[[from]]` immediately. A node may be revisited
    /// while the accumulated path holds no more than 2 nodes; the visited
    /// cutoff applies beyond that, so short cyclic paths stay explorable
    /// over a small reasoning radius. Callers that need unique paths dedupe.
    pub fn find_path(&self, from: &NodeId, to: &NodeId, max_hops: usize) -> Vec<Vec<NodeId>> {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return Vec::new();
        }
        if from == to {
            return vec![vec![from.clone()]];
        }

        let mut paths = Vec::new();
        let mut queue: VecDeque<Vec<NodeId>> = VecDeque::new();
        queue.push_back(vec![from.clone()]);

        while let Some(path) = queue.pop_front() {
            let hops = path.len() - 1;
            if hops >= max_hops {
                continue;
            }
            let Some(current) = path.last() else {
                continue;
            };
            let Some(edge_ids) = self.adjacency.get(current) else {
                continue;
            };
            for edge_id in edge_ids {
                let Some(edge) = self.edges.get(edge_id) else {
                    continue;
                };
                if edge.from_id != *current {
                    continue;
                }
                let next = &edge.to_id;
                if next == to {
                    let mut found = path.clone();
                    found.push(next.clone());
                    paths.push(found);
                } else if path.len() <= 2 || !path.contains(next) {
                    let mut extended = path.clone();
                    extended.push(next.clone());
                    queue.push_back(extended);
                }
            }
        }
        paths
    }

    /// Extract the bounded neighborhood of `center` as an independent store.
    ///
    /// Breadth-first layer expansion: each of the `hops` rounds adds every
    /// not-yet-visited neighbor (any direction, any relation type) of the
    /// current frontier, then every edge whose endpoints are both included
    /// is copied over. With `hops = 0` the result holds only the center
    /// node and no edges. Timestamps are preserved as-is; the copy shares
    /// no state with the source graph.
    pub fn get_subgraph(&self, center: &NodeId, hops: usize) -> GraphStore {
        let mut sub = GraphStore::new();
        let Some(center_node) = self.nodes.get(center) else {
            return sub;
        };
        sub.nodes.insert(center.clone(), center_node.clone());
        if hops == 0 {
            return sub;
        }

        let mut included: HashSet<NodeId> = HashSet::new();
        included.insert(center.clone());
        let mut frontier = vec![center.clone()];
        for _ in 0..hops {
            let mut next_frontier = Vec::new();
            for id in &frontier {
                let Some(edge_ids) = self.adjacency.get(id) else {
                    continue;
                };
                for edge_id in edge_ids {
                    let Some(edge) = self.edges.get(edge_id) else {
                        continue;
                    };
                    for neighbor_id in [&edge.from_id, &edge.to_id] {
                        if included.contains(neighbor_id) {
                            continue;
                        }
                        let Some(node) = self.nodes.get(neighbor_id) else {
                            continue;
                        };
                        included.insert(neighbor_id.clone());
                        sub.nodes.insert(neighbor_id.clone(), node.clone());
                        next_frontier.push(neighbor_id.clone());
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        for (edge_id, edge) in &self.edges {
            if included.contains(&edge.from_id) && included.contains(&edge.to_id) {
                sub.edges.insert(edge_id.clone(), edge.clone());
                sub.adjacency
                    .entry(edge.from_id.clone())
                    .or_default()
                    .insert(edge_id.clone());
                sub.adjacency
                    .entry(edge.to_id.clone())
                    .or_default()
                    .insert(edge_id.clone());
            }
        }
        sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgraph_types::graph::{Edge, EntityType};
    use serde_json::json;
    use std::collections::HashMap;

    fn node(entity_type: EntityType, key: &str) -> Node {
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(key));
        Node::with_key(entity_type, key, props, None)
    }

    /// acme -> FOO, INC-1 -> acme, acme -> payments, INC-2 -> payments.
    fn setup() -> (GraphStore, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut store = GraphStore::new();
        let acme = node(EntityType::Service, "acme");
        let foo = node(EntityType::EnvVar, "FOO");
        let inc1 = node(EntityType::Incident, "INC-1");
        let payments = node(EntityType::Service, "payments");
        let inc2 = node(EntityType::Incident, "INC-2");
        let ids = (
            acme.id.clone(),
            foo.id.clone(),
            inc1.id.clone(),
            payments.id.clone(),
            inc2.id.clone(),
        );
        for n in [acme, foo, inc1, payments, inc2] {
            store.upsert_node(n);
        }
        store.upsert_edge(Edge::new(
            ids.0.clone(),
            RelationType::ServiceRequiresEnvvar,
            ids.1.clone(),
        ));
        store.upsert_edge(Edge::new(
            ids.2.clone(),
            RelationType::IncidentImpactsService,
            ids.0.clone(),
        ));
        store.upsert_edge(Edge::new(
            ids.0.clone(),
            RelationType::ServiceIntegratesWith,
            ids.3.clone(),
        ));
        store.upsert_edge(Edge::new(
            ids.4.clone(),
            RelationType::IncidentImpactsService,
            ids.3.clone(),
        ));
        (store, ids.0, ids.1, ids.2, ids.3, ids.4)
    }

    #[test]
    fn test_neighbors_directions() {
        let (store, acme, foo, inc1, _, _) = setup();
        let out = store.get_neighbors(
            &acme,
            Some(&[RelationType::ServiceRequiresEnvvar]),
            Direction::Out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, foo);

        let incoming = store.get_neighbors(&acme, None, Direction::In);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, inc1);

        let both = store.get_neighbors(&acme, None, Direction::Both);
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn test_neighbors_relation_filter() {
        let (store, acme, _, _, payments, _) = setup();
        let integrations = store.get_neighbors(
            &acme,
            Some(&[RelationType::ServiceIntegratesWith]),
            Direction::Out,
        );
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0].id, payments);
    }

    #[test]
    fn test_neighbors_of_unknown_node() {
        let (store, _, _, _, _, _) = setup();
        let ghost = NodeId::from_key(EntityType::Service, "ghost");
        assert!(store.get_neighbors(&ghost, None, Direction::Both).is_empty());
    }

    #[test]
    fn test_find_path_self() {
        let (store, acme, _, _, _, _) = setup();
        assert_eq!(store.find_path(&acme, &acme, 0), vec![vec![acme.clone()]]);
        assert_eq!(store.find_path(&acme, &acme, 5), vec![vec![acme]]);
    }

    #[test]
    fn test_find_path_two_hops() {
        let (store, acme, foo, inc1, _, _) = setup();
        let paths = store.find_path(&inc1, &foo, 2);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], vec![inc1.clone(), acme, foo.clone()]);
        // One hop is not enough to reach the env var.
        assert!(store.find_path(&inc1, &foo, 1).is_empty());
    }

    #[test]
    fn test_find_path_outgoing_only() {
        let (store, acme, _, inc1, _, _) = setup();
        // The impact edge points incident -> service, so nothing flows back.
        assert!(store.find_path(&acme, &inc1, 3).is_empty());
    }

    #[test]
    fn test_find_path_terminates_on_cycles() {
        let mut store = GraphStore::new();
        let a = node(EntityType::Service, "a");
        let b = node(EntityType::Service, "b");
        let c = node(EntityType::Service, "c");
        let (a_id, b_id, c_id) = (a.id.clone(), b.id.clone(), c.id.clone());
        for n in [a, b, c] {
            store.upsert_node(n);
        }
        store.upsert_edge(Edge::new(
            a_id.clone(),
            RelationType::ServiceIntegratesWith,
            b_id.clone(),
        ));
        store.upsert_edge(Edge::new(
            b_id.clone(),
            RelationType::ServiceIntegratesWith,
            a_id.clone(),
        ));
        store.upsert_edge(Edge::new(
            b_id.clone(),
            RelationType::ServiceIntegratesWith,
            c_id.clone(),
        ));

        let paths = store.find_path(&a_id, &c_id, 4);
        assert!(paths.contains(&vec![a_id, b_id, c_id]));
    }

    #[test]
    fn test_subgraph_zero_hops() {
        let (store, acme, _, _, _, _) = setup();
        let sub = store.get_subgraph(&acme, 0);
        let stats = sub.stats();
        assert_eq!(stats.total_nodes, 1);
        assert_eq!(stats.total_edges, 0);
    }

    #[test]
    fn test_subgraph_one_hop_excludes_far_edges() {
        let (store, acme, _, _, _, _) = setup();
        let sub = store.get_subgraph(&acme, 1);
        let stats = sub.stats();
        // acme + FOO + INC-1 + payments; INC-2 is two hops out.
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 3);
    }

    #[test]
    fn test_subgraph_two_hops_is_whole_fixture() {
        let (store, acme, _, _, _, _) = setup();
        let sub = store.get_subgraph(&acme, 2);
        assert_eq!(sub.stats(), store.stats());
    }

    #[test]
    fn test_subgraph_is_independent() {
        let (store, acme, _, _, _, _) = setup();
        let mut sub = store.get_subgraph(&acme, 1);
        let before = store.stats();
        sub.upsert_node(node(EntityType::Service, "extra"));
        assert_eq!(store.stats(), before);
    }

    #[test]
    fn test_subgraph_unknown_center_is_empty() {
        let (store, _, _, _, _, _) = setup();
        let ghost = NodeId::from_key(EntityType::Service, "ghost");
        assert_eq!(store.get_subgraph(&ghost, 2).stats().total_nodes, 0);
    }
}
