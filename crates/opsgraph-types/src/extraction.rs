//! Result types reported by the extraction agent.

use crate::graph::{EntityType, GraphStats, Node, NodeId, RelationType};
use serde::{Deserialize, Serialize};

/// One entity touched during an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Graph id of the entity.
    pub id: NodeId,
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Display name.
    pub name: String,
    /// True if this upsert created the node, false if it refreshed it.
    pub created: bool,
}

/// One relationship touched during an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelation {
    /// Relation type.
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Source node id.
    pub from: NodeId,
    /// Target node id.
    pub to: NodeId,
    /// True if this upsert created the edge, false if it refreshed it.
    pub created: bool,
}

/// Summary of a single `ingest_*` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Nodes inserted for the first time.
    pub nodes_created: usize,
    /// Nodes that already existed and were refreshed.
    pub nodes_updated: usize,
    /// Edges inserted for the first time.
    pub edges_created: usize,
    /// Edges that already existed and were refreshed.
    pub edges_updated: usize,
    /// Every entity the run touched, in extraction order.
    pub entities: Vec<ExtractedEntity>,
    /// Every relationship the run touched, in extraction order.
    pub relationships: Vec<ExtractedRelation>,
}

impl ExtractionResult {
    /// Record a node upsert outcome.
    pub fn record_node(&mut self, node: &Node, created: bool) {
        if created {
            self.nodes_created += 1;
        } else {
            self.nodes_updated += 1;
        }
        let name = node
            .prop_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| node.id.tail().to_string());
        self.entities.push(ExtractedEntity {
            id: node.id.clone(),
            entity_type: node.entity_type,
            name,
            created,
        });
    }

    /// Record an edge upsert outcome.
    pub fn record_edge(
        &mut self,
        relation_type: RelationType,
        from: NodeId,
        to: NodeId,
        created: bool,
    ) {
        if created {
            self.edges_created += 1;
        } else {
            self.edges_updated += 1;
        }
        self.relationships.push(ExtractedRelation {
            relation_type,
            from,
            to,
            created,
        });
    }
}

/// Snapshot of the extraction rule library plus the graph it feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Number of compiled patterns across all rule families.
    pub total_patterns: usize,
    /// Names of the rule families.
    pub pattern_categories: Vec<String>,
    /// Current stats of the underlying graph.
    pub graph_stats: GraphStats,
}
