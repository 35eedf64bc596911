//! Result types for mutations.
//!
//! Mutations never raise for the common failure modes; they report what
//! happened instead. Callers that do not care can ignore the value and get
//! plain best-effort behaviour.

use amity_core::{StoreError, VertexId};
use serde::Serialize;
use std::fmt;

/// Classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// The edge already exists.
    DuplicateRelation,
    /// A vertex for this user already exists.
    DuplicateVertex,
    /// A vertex the operation needed is missing.
    NotFound,
    /// Anything else the store reported.
    Store,
}

impl Violation {
    pub fn classify(error: &StoreError) -> Self {
        match error {
            StoreError::DuplicateEdge { .. } => Violation::DuplicateRelation,
            StoreError::DuplicateVertex(_) => Violation::DuplicateVertex,
            StoreError::VertexNotFound(_) => Violation::NotFound,
            StoreError::Backend(_) => Violation::Store,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Violation::DuplicateRelation => "duplicate_relation",
            Violation::DuplicateVertex => "duplicate_vertex",
            Violation::NotFound => "not_found",
            Violation::Store => "store",
        };
        f.write_str(s)
    }
}

/// Result of creating a user vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Vertex and index entry were both written.
    Created(VertexId),
    /// Legacy policy only: the index write failed and the vertex
    /// transaction was left uncommitted, yet its id is handed back.
    Uncommitted(VertexId),
    /// A vertex for this user already exists.
    AlreadyExists,
    /// Anything else; everything was rolled back.
    Failed(String),
}

impl CreateOutcome {
    /// The vertex id the caller may use, if any.
    pub fn vertex_id(&self) -> Option<VertexId> {
        match self {
            CreateOutcome::Created(id) | CreateOutcome::Uncommitted(id) => Some(*id),
            CreateOutcome::AlreadyExists | CreateOutcome::Failed(_) => None,
        }
    }
}

/// Result of adding a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationOutcome {
    /// The edge was created on the first attempt.
    Applied,
    /// The edge already existed; nothing changed.
    AlreadyApplied,
    /// The first attempt failed; reconciliation repaired the store and the
    /// retry created the edge.
    Repaired,
    /// Both attempts failed. The failure is reported here and nowhere else.
    GaveUp(String),
}

impl RelationOutcome {
    /// Returns true if the edge exists afterwards.
    pub fn is_established(&self) -> bool {
        !matches!(self, RelationOutcome::GaveUp(_))
    }
}

/// Result of deleting a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// This many edges were removed.
    Removed(usize),
    /// The user exists but has no such relation.
    NothingToRemove,
    /// No vertex could be found for the user.
    UnknownUser,
    /// The store failed; nothing was removed.
    GaveUp(String),
}
