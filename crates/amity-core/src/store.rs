//! Contracts for the two external collaborators.
//!
//! A [`GraphStore`] owns the vertices and `knows` edges and hands out
//! [`GraphHandle`]s from a pool. An [`IdentifierIndex`] maps external user
//! identifiers to vertex identifiers. The two are committed independently;
//! nothing in these traits ties their writes together.

use crate::error::{IndexError, StoreError};
use crate::types::{UserId, UserVertex, VertexId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A pool of graph handles.
pub trait GraphStore: Send + Sync {
    /// Picks the handle responsible for `key`.
    ///
    /// Must be deterministic: the same key always maps to the same handle
    /// for the lifetime of the pool.
    fn select_handle(&self, key: &UserId) -> Arc<dyn GraphHandle>;
}

/// One connection to the graph engine.
///
/// Writes are staged in a transaction bound to the calling thread. The
/// transaction opens implicitly on the first write and ends with
/// [`commit`](GraphHandle::commit) or [`rollback`](GraphHandle::rollback).
pub trait GraphHandle: Send + Sync {
    /// Stages a new vertex and returns its freshly assigned identifier.
    ///
    /// Fails with [`StoreError::DuplicateVertex`] when a vertex with the same
    /// `user_id` already exists.
    fn add_vertex(&self, label: &str, user_id: &UserId) -> Result<VertexId, StoreError>;

    /// Stages a directed edge.
    ///
    /// Fails with [`StoreError::VertexNotFound`] when either endpoint is
    /// missing and with [`StoreError::DuplicateEdge`] when the ordered pair
    /// is already connected under `label`.
    fn add_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<(), StoreError>;

    /// Stages the removal of an edge. Returns false when no such edge exists.
    fn remove_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<bool, StoreError>;

    /// Applies the staged writes of the calling thread.
    fn commit(&self) -> Result<(), StoreError>;

    /// Discards the staged writes of the calling thread.
    fn rollback(&self);

    /// Read access to committed state.
    fn traversal(&self) -> &dyn Traversal;
}

/// Read-only traversal primitives over committed graph state.
///
/// Engines implement the lookups and `neighbors`; the set primitives have
/// default implementations an engine may override to push work down.
pub trait Traversal {
    /// Looks a vertex up by identifier.
    fn vertex(&self, id: VertexId) -> Result<Option<UserVertex>, StoreError>;

    /// Finds the vertex whose `userId` attribute equals `user_id`.
    ///
    /// Answers from the graph itself, never from the identifier index.
    fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<VertexId>, StoreError>;

    /// Follows outgoing `label` edges from every vertex in `from`.
    ///
    /// Yields one entry per traversed edge, so a vertex reached along two
    /// paths appears twice.
    fn neighbors(&self, from: &[VertexId], label: &str) -> Result<Vec<VertexId>, StoreError>;

    /// Projects vertices onto their `userId` attribute, skipping unknown ids.
    fn project_user_ids(&self, vertices: &[VertexId]) -> Result<Vec<UserId>, StoreError>;

    /// Keeps the vertices contained in `keep`.
    fn intersect(&self, vertices: Vec<VertexId>, keep: &HashSet<VertexId>) -> Vec<VertexId> {
        vertices.into_iter().filter(|v| keep.contains(v)).collect()
    }

    /// Drops the vertices contained in `without`.
    fn exclude(&self, vertices: Vec<VertexId>, without: &HashSet<VertexId>) -> Vec<VertexId> {
        vertices.into_iter().filter(|v| !without.contains(v)).collect()
    }

    /// Removes repeated vertices, keeping first occurrences in order.
    fn dedup(&self, vertices: Vec<VertexId>) -> Vec<VertexId> {
        let mut seen = HashSet::with_capacity(vertices.len());
        vertices.into_iter().filter(|v| seen.insert(*v)).collect()
    }

    /// Counts occurrences per `userId`.
    fn group_count(&self, vertices: &[VertexId]) -> Result<HashMap<UserId, u64>, StoreError> {
        let mut counts = HashMap::new();
        for user_id in self.project_user_ids(vertices)? {
            *counts.entry(user_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Secondary mapping from external user identifier to vertex identifier.
pub trait IdentifierIndex: Send + Sync {
    /// Writes the entry for `user_id`, replacing any previous one.
    fn create(&self, user_id: &UserId, vertex_id: VertexId) -> Result<(), IndexError>;

    /// Looks up a single user.
    fn vertex_id(&self, user_id: &UserId) -> Result<Option<VertexId>, IndexError>;

    /// Looks up many users. Unresolved users are omitted, so the result may
    /// be shorter than the input and carries no positional meaning.
    fn vertex_ids(&self, user_ids: &[UserId]) -> Result<Vec<VertexId>, IndexError> {
        let mut found = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(id) = self.vertex_id(user_id)? {
                found.push(id);
            }
        }
        Ok(found)
    }
}
