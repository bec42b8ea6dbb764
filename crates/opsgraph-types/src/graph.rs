//! Graph primitives: typed nodes, directed edges, and deterministic ids.
//!
//! Node identity is content-derived (`"{prefix}:{key}"`) and edge identity
//! is a pure function of `(from, relation, to)`, which is what makes
//! upserts idempotent: re-asserting a fact can never create a duplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque identifier for a node, shaped as `"{prefix}:{key}"`.
///
/// Construct via [`NodeId::from_key`] or [`NodeId::derive`] only, so every
/// id in the graph carries its entity-type prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Build an id from an entity type and an explicit key.
    pub fn from_key(entity_type: EntityType, key: &str) -> Self {
        Self(format!("{}:{}", entity_type.id_prefix(), key))
    }

    /// Build an id from the best identifying property (`name`, `key`, or
    /// `id`), falling back to a random suffix when none is present.
    pub fn derive(entity_type: EntityType, props: &HashMap<String, serde_json::Value>) -> Self {
        let key = ["name", "key", "id"]
            .iter()
            .find_map(|k| props.get(*k))
            .and_then(identifying_string);
        match key {
            Some(key) => Self::from_key(entity_type, &key),
            None => Self::from_key(entity_type, &Uuid::new_v4().to_string()),
        }
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier component after the last `:` (used in path trails).
    pub fn tail(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render an identifying property value as an id key.
fn identifying_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Opaque identifier for an edge, a pure function of its triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Derive the id for a `(from, relation, to)` triple.
    ///
    /// `|` cannot appear in node ids, so the encoding is collision-free.
    pub fn derive(from: &NodeId, relation: RelationType, to: &NodeId) -> Self {
        Self(format!("{}|{}|{}", from, relation.as_str(), to))
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Types of entities in the graph (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A deployed service.
    Service,
    /// An environment variable a service depends on.
    EnvVar,
    /// An operational incident.
    Incident,
    /// A product feature.
    Feature,
    /// An API route.
    Route,
    /// A permission guarding a route.
    Permission,
    /// An external integration.
    Integration,
    /// A support/engineering ticket.
    Ticket,
    /// A customer account.
    Customer,
    /// A subscription plan.
    Plan,
    /// A product module included in a plan.
    Module,
}

impl EntityType {
    /// The serialized name, exactly as stored in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Service => "Service",
            EntityType::EnvVar => "EnvVar",
            EntityType::Incident => "Incident",
            EntityType::Feature => "Feature",
            EntityType::Route => "Route",
            EntityType::Permission => "Permission",
            EntityType::Integration => "Integration",
            EntityType::Ticket => "Ticket",
            EntityType::Customer => "Customer",
            EntityType::Plan => "Plan",
            EntityType::Module => "Module",
        }
    }

    /// The lowercase tag used as the node-id prefix.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityType::Service => "service",
            EntityType::EnvVar => "envvar",
            EntityType::Incident => "incident",
            EntityType::Feature => "feature",
            EntityType::Route => "route",
            EntityType::Permission => "permission",
            EntityType::Integration => "integration",
            EntityType::Ticket => "ticket",
            EntityType::Customer => "customer",
            EntityType::Plan => "plan",
            EntityType::Module => "module",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types of relations in the graph (closed set, directed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// A service requires an environment variable.
    ServiceRequiresEnvvar,
    /// An incident impacts a service.
    IncidentImpactsService,
    /// A feature depends on another entity.
    FeatureDependsOn,
    /// A route requires a permission.
    RouteRequiresPermission,
    /// A service integrates with another service.
    ServiceIntegratesWith,
    /// A ticket is assigned to someone.
    TicketAssignedTo,
    /// A customer has a plan.
    CustomerHasPlan,
    /// A plan includes a module.
    PlanIncludesModule,
    /// A ticket relates to another entity.
    TicketRelatesTo,
}

impl RelationType {
    /// The serialized name, exactly as stored in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::ServiceRequiresEnvvar => "SERVICE_REQUIRES_ENVVAR",
            RelationType::IncidentImpactsService => "INCIDENT_IMPACTS_SERVICE",
            RelationType::FeatureDependsOn => "FEATURE_DEPENDS_ON",
            RelationType::RouteRequiresPermission => "ROUTE_REQUIRES_PERMISSION",
            RelationType::ServiceIntegratesWith => "SERVICE_INTEGRATES_WITH",
            RelationType::TicketAssignedTo => "TICKET_ASSIGNED_TO",
            RelationType::CustomerHasPlan => "CUSTOMER_HAS_PLAN",
            RelationType::PlanIncludesModule => "PLAN_INCLUDES_MODULE",
            RelationType::TicketRelatesTo => "TICKET_RELATES_TO",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed entity in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique content-derived id.
    pub id: NodeId,
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Open property bag (flexible schema per entity type).
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
    /// When this node was first created.
    pub created_at: DateTime<Utc>,
    /// When this node was last upserted.
    pub updated_at: DateTime<Utc>,
    /// Free-text provenance pointer for audit trails (e.g. a file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Node {
    /// Create a node whose id is derived from its identifying property.
    pub fn new(
        entity_type: EntityType,
        props: HashMap<String, serde_json::Value>,
        source: Option<String>,
    ) -> Self {
        let id = NodeId::derive(entity_type, &props);
        Self::with_id(id, entity_type, props, source)
    }

    /// Create a node with an explicit identifying key.
    pub fn with_key(
        entity_type: EntityType,
        key: &str,
        props: HashMap<String, serde_json::Value>,
        source: Option<String>,
    ) -> Self {
        let id = NodeId::from_key(entity_type, key);
        Self::with_id(id, entity_type, props, source)
    }

    fn with_id(
        id: NodeId,
        entity_type: EntityType,
        props: HashMap<String, serde_json::Value>,
        source: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type,
            props,
            created_at: now,
            updated_at: now,
            source,
        }
    }

    /// Convenience accessor for a string property.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(|v| v.as_str())
    }
}

/// A typed, directed fact connecting two nodes.
///
/// The edge id is not stored: it is a pure function of the triple and is
/// recomputed wherever it is needed (see [`Edge::id`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Relation type.
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// Source node id.
    #[serde(rename = "from")]
    pub from_id: NodeId,
    /// Target node id.
    #[serde(rename = "to")]
    pub to_id: NodeId,
    /// Open property bag.
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
    /// When this edge was first created.
    pub created_at: DateTime<Utc>,
    /// Free-text provenance pointer for audit trails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Edge {
    /// Create an edge with empty props.
    pub fn new(from_id: NodeId, relation_type: RelationType, to_id: NodeId) -> Self {
        Self {
            relation_type,
            from_id,
            to_id,
            props: HashMap::new(),
            created_at: Utc::now(),
            source: None,
        }
    }

    /// Attach properties.
    pub fn with_props(mut self, props: HashMap<String, serde_json::Value>) -> Self {
        self.props = props;
        self
    }

    /// Attach a provenance pointer.
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// The deterministic id for this edge's `(from, relation, to)` triple.
    pub fn id(&self) -> EdgeId {
        EdgeId::derive(&self.from_id, self.relation_type, &self.to_id)
    }
}

/// Traversal direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow outgoing edges only.
    Out,
    /// Follow incoming edges only.
    In,
    /// Follow edges in either direction.
    Both,
}

/// Aggregate counts over a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of nodes.
    pub total_nodes: usize,
    /// Total number of edges.
    pub total_edges: usize,
    /// Node count per entity-type name.
    pub node_type_counts: HashMap<String, usize>,
    /// Edge count per relation-type name.
    pub edge_type_counts: HashMap<String, usize>,
}
