//! Full-graph JSON snapshot persistence.
//!
//! The snapshot holds the complete node and edge lists; edge ids are not
//! persisted (they are recomputed from each triple on load) and the
//! adjacency index is rebuilt from the edge list.

use crate::store::GraphStore;
use opsgraph_types::error::{OpsGraphError, OpsGraphResult};
use opsgraph_types::graph::{Edge, Node};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// On-disk snapshot shape.
#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphStore {
    /// Write the full graph to `path` as pretty-printed JSON.
    ///
    /// I/O failure is fatal and surfaced to the caller, never retried.
    pub fn save(&self, path: impl AsRef<Path>) -> OpsGraphResult<()> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| OpsGraphError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), json)?;
        info!(
            path = %path.as_ref().display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Saved graph snapshot"
        );
        Ok(())
    }

    /// Load a snapshot from `path`, rebuilding the adjacency index.
    ///
    /// An edge whose endpoints are not among the loaded nodes is skipped
    /// with a warning; the rest of the snapshot still loads.
    pub fn load(path: impl AsRef<Path>) -> OpsGraphResult<GraphStore> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let snapshot: GraphSnapshot = serde_json::from_str(&contents)
            .map_err(|e| OpsGraphError::Snapshot(e.to_string()))?;

        let mut store = GraphStore::new();
        for node in snapshot.nodes {
            store.nodes.insert(node.id.clone(), node);
        }

        let mut dangling = 0usize;
        for edge in snapshot.edges {
            if !store.nodes.contains_key(&edge.from_id) || !store.nodes.contains_key(&edge.to_id) {
                warn!(
                    from = %edge.from_id,
                    to = %edge.to_id,
                    relation = %edge.relation_type,
                    "Skipping edge with missing endpoint"
                );
                dangling += 1;
                continue;
            }
            let edge_id = edge.id();
            store
                .adjacency
                .entry(edge.from_id.clone())
                .or_default()
                .insert(edge_id.clone());
            store
                .adjacency
                .entry(edge.to_id.clone())
                .or_default()
                .insert(edge_id.clone());
            store.edges.insert(edge_id, edge);
        }
        if dangling > 0 {
            warn!(count = dangling, "Snapshot contained dangling edges");
        }
        info!(
            path = %path.as_ref().display(),
            nodes = store.nodes.len(),
            edges = store.edges.len(),
            "Loaded graph snapshot"
        );
        Ok(store)
    }
}
