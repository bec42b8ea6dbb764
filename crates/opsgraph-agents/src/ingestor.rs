//! The write-side extraction agent.
//!
//! Consumes free text and deployment-log snippets, applies the fixed
//! pattern library, and upserts the nodes/edges each match implies. Every
//! upsert is tagged with the caller's source pointer for audit trails. A
//! malformed match is skipped; the remaining matches still run.

use crate::patterns::PatternLibrary;
use opsgraph_store::GraphStore;
use opsgraph_types::error::{OpsGraphError, OpsGraphResult};
use opsgraph_types::extraction::{ExtractionResult, ExtractionStats};
use opsgraph_types::graph::{Edge, EntityType, Node, NodeId, RelationType};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Pattern-based extraction agent ("Agent A").
#[derive(Clone)]
pub struct Ingestor {
    graph: Arc<Mutex<GraphStore>>,
    patterns: PatternLibrary,
}

impl Ingestor {
    /// Create an ingestor writing into the given shared store.
    pub fn new(graph: Arc<Mutex<GraphStore>>) -> Self {
        Self {
            graph,
            patterns: PatternLibrary::new(),
        }
    }

    fn store(&self) -> OpsGraphResult<MutexGuard<'_, GraphStore>> {
        self.graph
            .lock()
            .map_err(|e| OpsGraphError::Internal(e.to_string()))
    }

    /// Run every extraction rule family against `text`.
    ///
    /// Re-ingesting identical text yields the same final graph: node and
    /// edge identity is content-derived, so repeats flip the `_created`
    /// counters into `_updated` ones.
    pub fn ingest_text(&self, text: &str, source: Option<&str>) -> OpsGraphResult<ExtractionResult> {
        let mut store = self.store()?;
        let mut result = ExtractionResult::default();

        self.extract_env_requirements(&mut store, text, source, &mut result);
        self.extract_incidents(&mut store, text, source, &mut result);
        self.extract_integrations(&mut store, text, source, &mut result);
        self.extract_structured(&mut store, text, source, &mut result);

        debug!(
            nodes_created = result.nodes_created,
            nodes_updated = result.nodes_updated,
            edges_created = result.edges_created,
            edges_updated = result.edges_updated,
            "Text extraction complete"
        );
        Ok(result)
    }

    /// Scan a deployment log for env-var lines on behalf of one service.
    ///
    /// The service node is created/refreshed up front even when no line
    /// matches. `Setting|Loading|Using` marks the variable configured;
    /// `Missing|Required` leaves it bare so the planner reports it.
    pub fn ingest_deployment_log(
        &self,
        log_text: &str,
        service_name: &str,
        source: Option<&str>,
    ) -> OpsGraphResult<ExtractionResult> {
        let mut store = self.store()?;
        let mut result = ExtractionResult::default();

        let service_id = self.upsert_service(&mut store, service_name, source, &mut result);
        for line in log_text.lines() {
            let Some(caps) = self.patterns.deploy_line.captures(line) else {
                continue;
            };
            let verb = caps[1].to_lowercase();
            let var_name = &caps[2];
            let configured = matches!(verb.as_str(), "setting" | "loading" | "using");
            let var_id =
                self.upsert_env_var(&mut store, var_name, None, configured, source, &mut result);
            let mut props = HashMap::new();
            props.insert("observed".to_string(), json!(verb));
            self.upsert_relation(
                &mut store,
                &service_id,
                RelationType::ServiceRequiresEnvvar,
                &var_id,
                props,
                source,
                &mut result,
            );
        }

        debug!(
            service = service_name,
            nodes_created = result.nodes_created,
            edges_created = result.edges_created,
            "Deployment log extraction complete"
        );
        Ok(result)
    }

    /// Pattern-library and graph counters.
    pub fn get_extraction_stats(&self) -> OpsGraphResult<ExtractionStats> {
        let store = self.store()?;
        Ok(ExtractionStats {
            total_patterns: self.patterns.total(),
            pattern_categories: self.patterns.categories(),
            graph_stats: store.stats(),
        })
    }

    // -- Rule family: service <-> env var --

    fn extract_env_requirements(
        &self,
        store: &mut GraphStore,
        text: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        for caps in self.patterns.requires.captures_iter(text) {
            // `X on Y requires Z` belongs to the platform variant below.
            if let Some(service_match) = caps.get(1) {
                let prefix = &text[..service_match.start()];
                if prefix.to_lowercase().ends_with("on ") {
                    continue;
                }
            }
            self.record_requirement(store, &caps[1], &caps[2], source, result);
        }
        for caps in self.patterns.requires_on.captures_iter(text) {
            self.record_requirement(store, &caps[1], &caps[2], source, result);
        }
    }

    fn record_requirement(
        &self,
        store: &mut GraphStore,
        service: &str,
        var_list: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        let service_id = self.upsert_service(store, service, source, result);
        for token in var_list.split(|c: char| c == ',' || c.is_whitespace()) {
            let token = token.trim();
            if !self.patterns.env_token.is_match(token) {
                continue;
            }
            let var_id = self.upsert_env_var(store, token, None, false, source, result);
            self.upsert_relation(
                store,
                &service_id,
                RelationType::ServiceRequiresEnvvar,
                &var_id,
                HashMap::new(),
                source,
                result,
            );
        }
    }

    // -- Rule family: incident <-> service --

    fn extract_incidents(
        &self,
        store: &mut GraphStore,
        text: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        for caps in self.patterns.incident.captures_iter(text) {
            let incident_key = &caps[1];
            let service = &caps[2];
            let description = caps
                .get(0)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let service_id = self.upsert_service(store, service, source, result);
            let incident_id =
                self.upsert_incident(store, incident_key, &description, source, result);
            self.upsert_relation(
                store,
                &incident_id,
                RelationType::IncidentImpactsService,
                &service_id,
                HashMap::new(),
                source,
                result,
            );
        }

        // Richer variant: a missing/failed env var correlated with the
        // impacted service implies a derived incident plus the requirement.
        let correlations = self
            .patterns
            .failure_correlation
            .captures_iter(text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string(), caps[0].to_string()))
            .chain(
                self.patterns
                    .missing_for
                    .captures_iter(text)
                    .map(|caps| (caps[2].to_string(), caps[1].to_string(), caps[0].to_string())),
            )
            .collect::<Vec<_>>();
        for (service, var_name, description) in correlations {
            let service_id = self.upsert_service(store, &service, source, result);
            let var_id = self.upsert_env_var(store, &var_name, None, false, source, result);
            let incident_key = format!("{}-{}-failure", service.to_lowercase(), var_name);
            let incident_id =
                self.upsert_incident(store, &incident_key, &description, source, result);
            self.upsert_relation(
                store,
                &incident_id,
                RelationType::IncidentImpactsService,
                &service_id,
                HashMap::new(),
                source,
                result,
            );
            let mut props = HashMap::new();
            props.insert("observed".to_string(), json!("missing"));
            self.upsert_relation(
                store,
                &service_id,
                RelationType::ServiceRequiresEnvvar,
                &var_id,
                props,
                source,
                result,
            );
        }
    }

    // -- Rule family: service <-> service --

    fn extract_integrations(
        &self,
        store: &mut GraphStore,
        text: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        for caps in self.patterns.integrates.captures_iter(text) {
            let from = caps[1].to_lowercase();
            let to = caps[2].to_lowercase();
            if from == to {
                continue;
            }
            let from_id = self.upsert_service(store, &from, source, result);
            let to_id = self.upsert_service(store, &to, source, result);
            self.upsert_relation(
                store,
                &from_id,
                RelationType::ServiceIntegratesWith,
                &to_id,
                HashMap::new(),
                source,
                result,
            );
        }
    }

    // -- Structured pass: embedded JSON and assignment lines --

    fn extract_structured(
        &self,
        store: &mut GraphStore,
        text: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        for object in scan_json_objects(text) {
            if let Some(services) = object.get("services").and_then(|v| v.as_array()) {
                for name in services.iter().filter_map(|v| v.as_str()) {
                    self.upsert_service(store, name, source, result);
                }
            }
            for key in ["environment", "env"] {
                let Some(env) = object.get(key).and_then(|v| v.as_object()) else {
                    continue;
                };
                for (name, value) in env {
                    if !self.patterns.env_token.is_match(name) {
                        continue;
                    }
                    self.upsert_env_var(
                        store,
                        name,
                        Some(value.clone()),
                        false,
                        source,
                        result,
                    );
                }
            }
        }

        for caps in self.patterns.assignment.captures_iter(text) {
            let name = &caps[1];
            let value = caps[2].trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            self.upsert_env_var(store, name, Some(json!(value)), false, source, result);
        }
    }

    // -- Upsert helpers --

    fn upsert_service(
        &self,
        store: &mut GraphStore,
        name: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) -> NodeId {
        let name = name.to_lowercase();
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(name));
        let node = Node::with_key(
            EntityType::Service,
            &name,
            props,
            source.map(str::to_string),
        );
        let id = node.id.clone();
        let created = store.upsert_node(node.clone());
        result.record_node(&node, created);
        id
    }

    fn upsert_env_var(
        &self,
        store: &mut GraphStore,
        name: &str,
        value: Option<serde_json::Value>,
        configured: bool,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) -> NodeId {
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(name));
        if let Some(value) = value {
            props.insert("value".to_string(), value);
        }
        if configured {
            props.insert("configured".to_string(), json!(true));
        }
        let node = Node::with_key(EntityType::EnvVar, name, props, source.map(str::to_string));
        let id = node.id.clone();
        let created = store.upsert_node(node.clone());
        result.record_node(&node, created);
        id
    }

    fn upsert_incident(
        &self,
        store: &mut GraphStore,
        key: &str,
        description: &str,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) -> NodeId {
        let mut props = HashMap::new();
        props.insert("name".to_string(), json!(key));
        props.insert("description".to_string(), json!(description));
        let node = Node::with_key(
            EntityType::Incident,
            key,
            props,
            source.map(str::to_string),
        );
        let id = node.id.clone();
        let created = store.upsert_node(node.clone());
        result.record_node(&node, created);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_relation(
        &self,
        store: &mut GraphStore,
        from: &NodeId,
        relation_type: RelationType,
        to: &NodeId,
        props: HashMap<String, serde_json::Value>,
        source: Option<&str>,
        result: &mut ExtractionResult,
    ) {
        let edge = Edge::new(from.clone(), relation_type, to.clone())
            .with_props(props)
            .with_source(source.map(str::to_string));
        let created = store.upsert_edge(edge);
        result.record_edge(relation_type, from.clone(), to.clone(), created);
    }
}

/// Find every parseable top-level JSON object embedded in `text`.
///
/// Balanced-brace scan that respects string literals; a blob that fails to
/// parse is skipped (logged) without aborting the remaining matches.
fn scan_json_objects(text: &str) -> Vec<serde_json::Value> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        match balanced_object_end(bytes, i) {
            Some(end) => {
                let candidate = &text[i..=end];
                match serde_json::from_str::<serde_json::Value>(candidate) {
                    Ok(value) if value.is_object() => {
                        objects.push(value);
                        i = end + 1;
                    }
                    Ok(_) => {
                        i += 1;
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed embedded JSON object");
                        i += 1;
                    }
                }
            }
            None => {
                i += 1;
            }
        }
    }
    objects
}

/// Index of the `}` closing the object starting at `start`, if balanced.
fn balanced_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgraph_types::graph::Direction;

    fn setup() -> (Ingestor, Arc<Mutex<GraphStore>>) {
        let graph = Arc::new(Mutex::new(GraphStore::new()));
        (Ingestor::new(graph.clone()), graph)
    }

    #[test]
    fn test_requires_extraction_counts() {
        let (ingestor, _graph) = setup();
        let result = ingestor
            .ingest_text("acme requires FOO, BAR", Some("notes.txt"))
            .unwrap();
        assert_eq!(result.nodes_created, 3);
        assert_eq!(result.nodes_updated, 0);
        assert_eq!(result.edges_created, 2);
        assert_eq!(result.edges_updated, 0);
        assert_eq!(result.entities.len(), 3);
        assert_eq!(result.relationships.len(), 2);
    }

    #[test]
    fn test_reingestion_is_idempotent() {
        let (ingestor, graph) = setup();
        ingestor.ingest_text("acme requires FOO, BAR", None).unwrap();
        let second = ingestor.ingest_text("acme requires FOO, BAR", None).unwrap();
        assert_eq!(second.nodes_created, 0);
        assert_eq!(second.nodes_updated, 3);
        assert_eq!(second.edges_created, 0);
        assert_eq!(second.edges_updated, 2);

        let stats = graph.lock().unwrap().stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 2);
    }

    #[test]
    fn test_platform_variant_attributes_to_service() {
        let (ingestor, graph) = setup();
        ingestor
            .ingest_text("checkout on kubernetes requires REDIS_URL", None)
            .unwrap();
        let store = graph.lock().unwrap();
        let checkout = NodeId::from_key(EntityType::Service, "checkout");
        assert!(store.get_node(&checkout).is_some());
        // The platform word must not become a service.
        let kubernetes = NodeId::from_key(EntityType::Service, "kubernetes");
        assert!(store.get_node(&kubernetes).is_none());
        let vars = store.get_neighbors(
            &checkout,
            Some(&[RelationType::ServiceRequiresEnvvar]),
            Direction::Out,
        );
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].prop_str("name"), Some("REDIS_URL"));
    }

    #[test]
    fn test_incident_extraction() {
        let (ingestor, graph) = setup();
        ingestor
            .ingest_text("Incident INC-42 impacts payments", Some("pager.log"))
            .unwrap();
        let store = graph.lock().unwrap();
        let payments = NodeId::from_key(EntityType::Service, "payments");
        let incidents = store.get_neighbors(
            &payments,
            Some(&[RelationType::IncidentImpactsService]),
            Direction::In,
        );
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].prop_str("name"), Some("INC-42"));
        assert_eq!(incidents[0].source.as_deref(), Some("pager.log"));
    }

    #[test]
    fn test_failure_correlation_derives_incident() {
        let (ingestor, graph) = setup();
        ingestor
            .ingest_text("payments is down because of a missing STRIPE_KEY", None)
            .unwrap();
        let store = graph.lock().unwrap();
        let payments = NodeId::from_key(EntityType::Service, "payments");
        let incidents = store.get_neighbors(
            &payments,
            Some(&[RelationType::IncidentImpactsService]),
            Direction::In,
        );
        assert_eq!(incidents.len(), 1);
        assert_eq!(
            incidents[0].prop_str("name"),
            Some("payments-STRIPE_KEY-failure")
        );
        let vars = store.get_neighbors(
            &payments,
            Some(&[RelationType::ServiceRequiresEnvvar]),
            Direction::Out,
        );
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].prop_str("name"), Some("STRIPE_KEY"));
    }

    #[test]
    fn test_integration_extraction() {
        let (ingestor, graph) = setup();
        ingestor
            .ingest_text("Acme integrates with Payments", None)
            .unwrap();
        let store = graph.lock().unwrap();
        let acme = NodeId::from_key(EntityType::Service, "acme");
        let neighbors = store.get_neighbors(
            &acme,
            Some(&[RelationType::ServiceIntegratesWith]),
            Direction::Out,
        );
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].prop_str("name"), Some("payments"));
    }

    #[test]
    fn test_embedded_json_extraction() {
        let (ingestor, graph) = setup();
        let text = r#"Deploy config: {"services": ["api", "worker"], "environment": {"DATABASE_URL": "postgres://db", "POOL_SIZE": 10}}"#;
        let result = ingestor.ingest_text(text, None).unwrap();
        assert_eq!(result.nodes_created, 4);

        let store = graph.lock().unwrap();
        let db = store
            .get_node(&NodeId::from_key(EntityType::EnvVar, "DATABASE_URL"))
            .unwrap();
        assert_eq!(db.prop_str("value"), Some("postgres://db"));
        assert!(store
            .get_node(&NodeId::from_key(EntityType::Service, "api"))
            .is_some());
    }

    #[test]
    fn test_malformed_json_does_not_abort() {
        let (ingestor, _graph) = setup();
        let text = "{broken json, acme requires FOO";
        let result = ingestor.ingest_text(text, None).unwrap();
        // The requires match still lands.
        assert_eq!(result.nodes_created, 2);
    }

    #[test]
    fn test_assignment_lines_set_values() {
        let (ingestor, graph) = setup();
        let text = "export DATABASE_URL=postgres://db\nSECRET_KEY=\"abc\"";
        ingestor.ingest_text(text, None).unwrap();
        let store = graph.lock().unwrap();
        let secret = store
            .get_node(&NodeId::from_key(EntityType::EnvVar, "SECRET_KEY"))
            .unwrap();
        assert_eq!(secret.prop_str("value"), Some("abc"));
    }

    #[test]
    fn test_deployment_log_marks_configured() {
        let (ingestor, graph) = setup();
        let log = "Loading environment variable: DATABASE_URL\n\
                   Missing env var: STRIPE_KEY\n\
                   plain noise line";
        let result = ingestor
            .ingest_deployment_log(log, "acme", Some("deploy.log"))
            .unwrap();
        // Service + two env vars.
        assert_eq!(result.nodes_created, 3);
        assert_eq!(result.edges_created, 2);

        let store = graph.lock().unwrap();
        let db = store
            .get_node(&NodeId::from_key(EntityType::EnvVar, "DATABASE_URL"))
            .unwrap();
        assert_eq!(db.props.get("configured"), Some(&json!(true)));
        let stripe = store
            .get_node(&NodeId::from_key(EntityType::EnvVar, "STRIPE_KEY"))
            .unwrap();
        assert!(stripe.props.get("configured").is_none());
        assert!(stripe.props.get("value").is_none());
    }

    #[test]
    fn test_extraction_stats() {
        let (ingestor, _graph) = setup();
        ingestor.ingest_text("acme requires FOO", None).unwrap();
        let stats = ingestor.get_extraction_stats().unwrap();
        assert_eq!(stats.total_patterns, 8);
        assert_eq!(stats.pattern_categories.len(), 4);
        assert_eq!(stats.graph_stats.total_nodes, 2);
    }

    #[test]
    fn test_scan_json_objects_respects_strings() {
        let text = r#"prefix {"a": "brace } inside"} suffix {"b": 2}"#;
        let objects = scan_json_objects(text);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["a"], "brace } inside");
        assert_eq!(objects[1]["b"], 2);
    }
}
