//! The read-side planning agent.
//!
//! Composes the store's traversal primitives into domain queries and
//! produces explainable reasoning traces. Never mutates the graph; an
//! absent entity is reported as `found = false`, never as an error.

use opsgraph_store::GraphStore;
use opsgraph_types::analysis::{
    BlockingReport, DependencyIssue, DependencyReport, EnvVarDependency, ImpactReport,
    ImpactedEntity, IncidentPathReport, IncidentPaths, Integration, Priority, ReasoningKind,
    ReasoningPath, Recommendation, RecommendationKind, RecommendationReport, RelatedIncident,
};
use opsgraph_types::config::PlannerConfig;
use opsgraph_types::error::{OpsGraphError, OpsGraphResult};
use opsgraph_types::graph::{Direction, EntityType, Node, NodeId, RelationType};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Query types accepted by [`Planner::query_graph`].
const SUPPORTED_QUERIES: &[&str] = &[
    "what_blocks_service",
    "service_dependencies",
    "related_incidents",
    "impact_radius",
    "recommend_actions",
];

/// Graph-reasoning agent ("Agent B").
#[derive(Clone)]
pub struct Planner {
    graph: Arc<Mutex<GraphStore>>,
    config: PlannerConfig,
}

impl Planner {
    /// Create a planner over the given shared store with default tuning.
    pub fn new(graph: Arc<Mutex<GraphStore>>) -> Self {
        Self::with_config(graph, PlannerConfig::default())
    }

    /// Create a planner with explicit tuning.
    pub fn with_config(graph: Arc<Mutex<GraphStore>>, config: PlannerConfig) -> Self {
        Self { graph, config }
    }

    fn store(&self) -> OpsGraphResult<MutexGuard<'_, GraphStore>> {
        self.graph
            .lock()
            .map_err(|e| OpsGraphError::Internal(e.to_string()))
    }

    fn service_id(name: &str) -> NodeId {
        NodeId::from_key(EntityType::Service, &name.to_lowercase())
    }

    fn display_name(node: &Node) -> String {
        node.prop_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| node.id.tail().to_string())
    }

    /// Combine missing env vars, active incidents, and impacted
    /// integration dependencies into one blocking analysis.
    pub fn what_blocks_service(&self, name: &str) -> OpsGraphResult<BlockingReport> {
        let store = self.store()?;
        let service_id = Self::service_id(name);
        let Some(service) = store.get_node(&service_id) else {
            return Ok(BlockingReport {
                error: Some(format!("Service '{name}' not found in graph")),
                ..Default::default()
            });
        };
        let service_name = Self::display_name(&service);
        let mut report = BlockingReport {
            found: true,
            service: Some(service_id.clone()),
            ..Default::default()
        };

        // A required var with neither a value nor a configured flag blocks.
        for var in store.get_neighbors(
            &service_id,
            Some(&[RelationType::ServiceRequiresEnvvar]),
            Direction::Out,
        ) {
            if var.props.contains_key("value") || var.props.contains_key("configured") {
                continue;
            }
            let var_name = Self::display_name(&var);
            report
                .blocking_factors
                .push(format!("Missing environment variable: {var_name}"));
            report.missing_env_vars.push(var_name.clone());
            report.reasoning_paths.push(ReasoningPath {
                kind: ReasoningKind::MissingEnvVar,
                path: vec![service_id.clone(), var.id.clone()],
                explanation: format!(
                    "{service_name} requires {var_name}, which has no configured value"
                ),
            });
        }

        for incident in store.get_neighbors(
            &service_id,
            Some(&[RelationType::IncidentImpactsService]),
            Direction::In,
        ) {
            let incident_name = Self::display_name(&incident);
            report
                .blocking_factors
                .push(format!("Active incident: {incident_name}"));
            report.related_incidents.push(RelatedIncident {
                incident_id: incident.id.clone(),
                description: incident.prop_str("description").map(str::to_string),
            });
            report.reasoning_paths.push(ReasoningPath {
                kind: ReasoningKind::RelatedIncident,
                path: vec![incident.id.clone(), service_id.clone()],
                explanation: format!("{incident_name} is impacting {service_name}"),
            });
        }

        for dependency in store.get_neighbors(
            &service_id,
            Some(&[RelationType::ServiceIntegratesWith]),
            Direction::Out,
        ) {
            let dependency_name = Self::display_name(&dependency);
            for incident in store.get_neighbors(
                &dependency.id,
                Some(&[RelationType::IncidentImpactsService]),
                Direction::In,
            ) {
                let incident_name = Self::display_name(&incident);
                report.blocking_factors.push(format!(
                    "Dependency {dependency_name} is impacted by {incident_name}"
                ));
                report.dependency_issues.push(DependencyIssue {
                    dependency: dependency_name.clone(),
                    incident_id: incident.id.clone(),
                });
                report.reasoning_paths.push(ReasoningPath {
                    kind: ReasoningKind::DependencyChain,
                    path: vec![
                        service_id.clone(),
                        dependency.id.clone(),
                        incident.id.clone(),
                    ],
                    explanation: format!(
                        "{service_name} integrates with {dependency_name}, \
                         which is impacted by {incident_name}"
                    ),
                });
            }
        }

        debug!(
            service = %service_id,
            factors = report.blocking_factors.len(),
            "Blocking analysis complete"
        );
        Ok(report)
    }

    /// List a service's env-var requirements and integrations.
    pub fn get_service_dependencies(&self, name: &str) -> OpsGraphResult<DependencyReport> {
        let store = self.store()?;
        let service_id = Self::service_id(name);
        if store.get_node(&service_id).is_none() {
            return Ok(DependencyReport {
                error: Some(format!("Service '{name}' not found in graph")),
                ..Default::default()
            });
        }

        let environment_variables: Vec<EnvVarDependency> = store
            .get_neighbors(
                &service_id,
                Some(&[RelationType::ServiceRequiresEnvvar]),
                Direction::Out,
            )
            .iter()
            .map(|var| {
                let value = var.props.get("value").cloned();
                let configured = value.is_some()
                    || var
                        .props
                        .get("configured")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                EnvVarDependency {
                    key: Self::display_name(var),
                    value,
                    configured,
                }
            })
            .collect();

        let integrations: Vec<Integration> = store
            .get_neighbors(
                &service_id,
                Some(&[RelationType::ServiceIntegratesWith]),
                Direction::Out,
            )
            .iter()
            .map(|dependency| Integration {
                service_name: Self::display_name(dependency),
            })
            .collect();

        Ok(DependencyReport {
            found: true,
            error: None,
            total_env_vars: environment_variables.len(),
            total_integrations: integrations.len(),
            environment_variables,
            integrations,
        })
    }

    /// Correlate incidents reachable within `max_hops` of a service.
    pub fn find_related_incidents(
        &self,
        name: &str,
        max_hops: usize,
    ) -> OpsGraphResult<IncidentPathReport> {
        let store = self.store()?;
        let service_id = Self::service_id(name);
        if store.get_node(&service_id).is_none() {
            return Ok(IncidentPathReport {
                error: Some(format!("Service '{name}' not found in graph")),
                ..Default::default()
            });
        }

        let subgraph = store.get_subgraph(&service_id, max_hops);
        let mut related_incidents = Vec::new();
        for incident in subgraph.query_by_type(EntityType::Incident, &HashMap::new()) {
            let all_paths = store.find_path(&service_id, &incident.id, max_hops);
            let shortest_path = all_paths
                .iter()
                .min_by_key(|path| path.len())
                .cloned()
                .unwrap_or_default();
            let path_length = shortest_path.len().saturating_sub(1);
            related_incidents.push(IncidentPaths {
                incident: incident.id.clone(),
                description: incident.prop_str("description").map(str::to_string),
                shortest_path,
                path_length,
                all_paths,
            });
        }

        Ok(IncidentPathReport {
            found: true,
            error: None,
            total_incidents: related_incidents.len(),
            related_incidents,
        })
    }

    /// Group every entity reachable within `max_hops` of `entity_id` by
    /// type, with the BFS layer depth as its distance from the center.
    pub fn analyze_impact_radius(
        &self,
        entity_id: &NodeId,
        max_hops: usize,
    ) -> OpsGraphResult<ImpactReport> {
        let store = self.store()?;
        if store.get_node(entity_id).is_none() {
            return Ok(ImpactReport {
                error: Some(format!("Entity '{entity_id}' not found in graph")),
                ..Default::default()
            });
        }

        let mut visited: HashMap<NodeId, usize> = HashMap::new();
        visited.insert(entity_id.clone(), 0);
        let mut frontier = vec![entity_id.clone()];
        let mut impact_radius: HashMap<String, Vec<ImpactedEntity>> = HashMap::new();
        let mut total_impacted_entities = 0;

        for depth in 1..=max_hops {
            let mut next_frontier = Vec::new();
            for id in &frontier {
                for neighbor in store.get_neighbors(id, None, Direction::Both) {
                    if visited.contains_key(&neighbor.id) {
                        continue;
                    }
                    visited.insert(neighbor.id.clone(), depth);
                    impact_radius
                        .entry(neighbor.entity_type.as_str().to_string())
                        .or_default()
                        .push(ImpactedEntity {
                            node_id: neighbor.id.clone(),
                            name: Self::display_name(&neighbor),
                            shortest_path_length: depth,
                            properties: neighbor.props.clone(),
                        });
                    total_impacted_entities += 1;
                    next_frontier.push(neighbor.id.clone());
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(ImpactReport {
            found: true,
            error: None,
            center: Some(entity_id.clone()),
            impact_radius,
            total_impacted_entities,
        })
    }

    /// Derive prioritized actions from the blocking analysis.
    pub fn recommend_actions(&self, name: &str) -> OpsGraphResult<RecommendationReport> {
        let blocking = self.what_blocks_service(name)?;
        if !blocking.found {
            return Ok(RecommendationReport {
                error: blocking.error,
                ..Default::default()
            });
        }

        let mut recommendations = Vec::new();
        for var_name in &blocking.missing_env_vars {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ConfigureEnvironment,
                priority: Priority::High,
                action: format!("Set environment variable {var_name}"),
                details: format!("{name} requires {var_name} but no value is configured"),
                reasoning: format!(
                    "Required environment variable {var_name} has no configured value"
                ),
            });
        }
        for incident in &blocking.related_incidents {
            let label = incident.incident_id.tail().to_string();
            recommendations.push(Recommendation {
                kind: RecommendationKind::ResolveIncident,
                priority: Priority::Critical,
                action: format!("Resolve incident {label}"),
                details: incident
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("{label} is impacting {name}")),
                reasoning: format!("Incident {label} directly impacts {name}"),
            });
        }
        for issue in &blocking.dependency_issues {
            recommendations.push(Recommendation {
                kind: RecommendationKind::AddressDependency,
                priority: Priority::Medium,
                action: format!("Check dependency {}", issue.dependency),
                details: format!(
                    "{} is impacted by {}",
                    issue.dependency,
                    issue.incident_id.tail()
                ),
                reasoning: format!(
                    "{name} integrates with {}, which has an active incident",
                    issue.dependency
                ),
            });
        }

        // Stable: equal priorities keep their discovery order.
        recommendations.sort_by_key(|r| r.priority);
        let mut priority_summary: HashMap<String, usize> = HashMap::new();
        for recommendation in &recommendations {
            *priority_summary
                .entry(recommendation.priority.as_str().to_string())
                .or_default() += 1;
        }

        Ok(RecommendationReport {
            found: true,
            error: None,
            total_recommendations: recommendations.len(),
            recommendations,
            priority_summary,
        })
    }

    /// Render reasoning paths as a numbered, human-readable explanation.
    ///
    /// Paths longer than two nodes get a rendered trail of id tails.
    pub fn explain_reasoning(&self, paths: &[ReasoningPath]) -> String {
        let mut out = String::new();
        for (index, reasoning) in paths.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", index + 1, reasoning.explanation));
            if reasoning.path.len() > 2 {
                let trail = reasoning
                    .path
                    .iter()
                    .map(|id| id.tail())
                    .collect::<Vec<_>>()
                    .join(" → ");
                out.push_str(&format!("   Path: {trail}\n"));
            }
        }
        out
    }

    /// String-keyed dispatcher over the planner queries.
    ///
    /// Unknown query types and missing parameters come back as error
    /// payloads listing the supported types, never as an `Err`.
    pub fn query_graph(
        &self,
        query_type: &str,
        params: serde_json::Value,
    ) -> OpsGraphResult<serde_json::Value> {
        let service = |params: &serde_json::Value| {
            params
                .get("service")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let max_hops = params
            .get("max_hops")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(self.config.max_hops);

        match query_type {
            "what_blocks_service" => match service(&params) {
                Some(name) => to_payload(self.what_blocks_service(&name)?),
                None => Ok(missing_param("service")),
            },
            "service_dependencies" => match service(&params) {
                Some(name) => to_payload(self.get_service_dependencies(&name)?),
                None => Ok(missing_param("service")),
            },
            "related_incidents" => match service(&params) {
                Some(name) => to_payload(self.find_related_incidents(&name, max_hops)?),
                None => Ok(missing_param("service")),
            },
            "impact_radius" => {
                let entity_id = params
                    .get("entity_id")
                    .cloned()
                    .map(serde_json::from_value::<NodeId>)
                    .and_then(Result::ok);
                match entity_id {
                    Some(id) => to_payload(self.analyze_impact_radius(&id, max_hops)?),
                    None => Ok(missing_param("entity_id")),
                }
            }
            "recommend_actions" => match service(&params) {
                Some(name) => to_payload(self.recommend_actions(&name)?),
                None => Ok(missing_param("service")),
            },
            unknown => Ok(json!({
                "error": format!("Unknown query type '{unknown}'"),
                "supported_types": SUPPORTED_QUERIES,
            })),
        }
    }
}

fn to_payload<T: serde::Serialize>(report: T) -> OpsGraphResult<serde_json::Value> {
    serde_json::to_value(report).map_err(|e| OpsGraphError::Serialization(e.to_string()))
}

fn missing_param(name: &str) -> serde_json::Value {
    json!({
        "error": format!("Missing required parameter '{name}'"),
        "supported_types": SUPPORTED_QUERIES,
    })
}
