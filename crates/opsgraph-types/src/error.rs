//! Shared error types for the OpsGraph subsystem.

use thiserror::Error;

/// Top-level error type for the OpsGraph subsystem.
///
/// Expected absence (missing node, unknown service) is never an error:
/// lookups return `Option`/empty collections and planner reports carry a
/// `found` flag. These variants cover systemic failures only.
#[derive(Error, Debug)]
pub enum OpsGraphError {
    /// An I/O error occurred while reading or writing a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A snapshot file was structurally invalid.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// An internal invariant was broken (e.g. a poisoned store lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alias for Result with OpsGraphError.
pub type OpsGraphResult<T> = Result<T, OpsGraphError>;
