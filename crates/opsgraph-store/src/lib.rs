//! In-process entity-relationship store for the OpsGraph memory subsystem.
//!
//! Nodes and edges live in flat maps owned solely by the [`GraphStore`];
//! every cross-reference (adjacency sets, edge endpoints) is a plain id,
//! never a borrowed pointer. An adjacency index maps each node to the edge
//! ids touching it and is kept in sync with the edge map on every upsert.
//!
//! The store has no knowledge of domain semantics: extraction and planning
//! live in `opsgraph-agents` and compose the traversal primitives here.

mod snapshot;
mod store;
mod traverse;

pub use store::GraphStore;
