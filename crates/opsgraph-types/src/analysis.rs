//! Report types produced by the planning agent.
//!
//! Every report is plain data meant to be serialized by an external API
//! layer. Absence is modeled with `found = false` plus a message, never
//! with an error.

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of reasoning produced a path record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningKind {
    /// A required env var with no configured value.
    MissingEnvVar,
    /// An incident directly impacting the service.
    RelatedIncident,
    /// An incident impacting an integration dependency.
    DependencyChain,
}

/// An ordered list of node ids plus a human-readable explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningPath {
    /// What analysis produced this path.
    #[serde(rename = "type")]
    pub kind: ReasoningKind,
    /// Node ids from cause to effect.
    pub path: Vec<NodeId>,
    /// Rendered explanation of the hop sequence.
    pub explanation: String,
}

/// An incident directly impacting the analyzed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedIncident {
    /// Incident node id.
    pub incident_id: NodeId,
    /// Incident description, when extracted.
    pub description: Option<String>,
}

/// An integration dependency with its own active incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyIssue {
    /// Name of the dependency service.
    pub dependency: String,
    /// The incident impacting it.
    pub incident_id: NodeId,
}

/// Result of `what_blocks_service`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingReport {
    /// Whether the service exists in the graph.
    pub found: bool,
    /// Explanation when `found` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Id of the analyzed service node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<NodeId>,
    /// Human-readable blocking factors, one per finding.
    pub blocking_factors: Vec<String>,
    /// Names of required env vars with no configured value.
    pub missing_env_vars: Vec<String>,
    /// Incidents directly impacting the service.
    pub related_incidents: Vec<RelatedIncident>,
    /// Integration dependencies with their own incidents.
    pub dependency_issues: Vec<DependencyIssue>,
    /// Explainable traces backing each finding.
    pub reasoning_paths: Vec<ReasoningPath>,
}

/// One env var entry in a dependency report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVarDependency {
    /// Variable name.
    pub key: String,
    /// Configured value, when known.
    pub value: Option<serde_json::Value>,
    /// Whether the variable counts as configured.
    pub configured: bool,
}

/// One integration entry in a dependency report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    /// Name of the integrated service.
    pub service_name: String,
}

/// Result of `get_service_dependencies`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub environment_variables: Vec<EnvVarDependency>,
    pub integrations: Vec<Integration>,
    pub total_env_vars: usize,
    pub total_integrations: usize,
}

/// One incident with its discovered paths from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentPaths {
    /// Incident node id.
    pub incident: NodeId,
    /// Incident description, when extracted.
    pub description: Option<String>,
    /// Shortest discovered directed path (empty when none).
    pub shortest_path: Vec<NodeId>,
    /// Edge count of the shortest path (0 when none discovered).
    pub path_length: usize,
    /// Every discovered directed path within the hop bound.
    pub all_paths: Vec<Vec<NodeId>>,
}

/// Result of `find_related_incidents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentPathReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub related_incidents: Vec<IncidentPaths>,
    pub total_incidents: usize,
}

/// One entity in an impact radius, with its BFS distance from the center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactedEntity {
    /// Node id.
    pub node_id: NodeId,
    /// Display name (falls back to the id tail).
    pub name: String,
    /// BFS layer at which the node was first reached.
    pub shortest_path_length: usize,
    /// The node's property bag.
    pub properties: HashMap<String, serde_json::Value>,
}

/// Result of `analyze_impact_radius`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<NodeId>,
    /// Reached entities grouped by entity-type name.
    pub impact_radius: HashMap<String, Vec<ImpactedEntity>>,
    pub total_impacted_entities: usize,
}

/// Recommendation priority, highest first.
///
/// The variant order is the sort rank: `Critical < High < Medium < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// The serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// What kind of action a recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Configure a missing environment variable.
    ConfigureEnvironment,
    /// Resolve an active incident.
    ResolveIncident,
    /// Follow up on an impacted integration dependency.
    AddressDependency,
}

/// A single prioritized action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    /// Short imperative action.
    pub action: String,
    /// Supporting detail for the action.
    pub details: String,
    /// Why this action is recommended.
    pub reasoning: String,
}

/// Result of `recommend_actions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Recommendations sorted by priority rank, stable within a rank.
    pub recommendations: Vec<Recommendation>,
    pub total_recommendations: usize,
    /// Count of recommendations per priority name.
    pub priority_summary: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn test_reasoning_path_wire_shape() {
        let path = ReasoningPath {
            kind: ReasoningKind::MissingEnvVar,
            path: vec![],
            explanation: "x".to_string(),
        };
        let value = serde_json::to_value(&path).unwrap();
        assert_eq!(value["type"], "missing_env_var");
    }
}
