//! Extraction and planning agents for the OpsGraph memory subsystem.
//!
//! Two collaborators share one [`opsgraph_store::GraphStore`] behind an
//! `Arc<Mutex<_>>` handle and never call each other directly:
//!
//! - **[`Ingestor`]** (write side): applies a fixed library of extraction
//!   rules to free text and log snippets, upserting the nodes and edges
//!   they imply, each tagged with a provenance pointer.
//! - **[`Planner`]** (read side): composes the store's traversal
//!   primitives into domain queries (blocking analysis, dependency
//!   listing, incident correlation, impact radius, prioritized
//!   recommendations) with explainable reasoning traces.

mod patterns;

pub mod ingestor;
pub mod planner;

pub use ingestor::Ingestor;
pub use planner::Planner;
