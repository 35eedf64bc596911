//! Error types shared by every store implementation.

use crate::types::{UserId, VertexId};
use thiserror::Error;

/// Failures reported by a graph engine.
///
/// The two `Duplicate*` variants are schema violations: the engine refused
/// a write that would break a uniqueness constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("vertex for user '{0}' already exists")]
    DuplicateVertex(UserId),

    #[error("edge {from} -[{label}]-> {to} already exists")]
    DuplicateEdge {
        label: String,
        from: VertexId,
        to: VertexId,
    },

    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("graph backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true for uniqueness-constraint violations.
    pub fn is_schema_violation(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateVertex(_) | StoreError::DuplicateEdge { .. }
        )
    }
}

/// Failures reported by an identifier index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("index write failed for '{user_id}': {reason}")]
    Write { user_id: UserId, reason: String },

    #[error("index read failed: {0}")]
    Read(String),

    #[error("index entry could not be decoded: {0}")]
    Codec(String),
}
