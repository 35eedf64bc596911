//! Translation from external user ids to vertex ids.

use amity_core::{IdentifierIndex, UserId, VertexId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Looks users up in the identifier index. Never touches the graph.
///
/// Index read failures are logged and treated as "not indexed": every
/// caller already has a path for users without an entry.
#[derive(Clone)]
pub struct IdentityResolver {
    index: Arc<dyn IdentifierIndex>,
}

impl IdentityResolver {
    pub fn new(index: Arc<dyn IdentifierIndex>) -> Self {
        Self { index }
    }

    pub fn resolve(&self, user_id: &UserId) -> Option<VertexId> {
        match self.index.vertex_id(user_id) {
            Ok(found) => found,
            Err(e) => {
                warn!("Index lookup failed for user '{}': {}", user_id, e);
                None
            }
        }
    }

    /// Resolves every user independently; unresolved users are dropped.
    pub fn resolve_many(&self, user_ids: &[UserId]) -> HashSet<VertexId> {
        match self.index.vertex_ids(user_ids) {
            Ok(found) => found.into_iter().collect(),
            Err(e) => {
                warn!("Batch index lookup of {} users failed: {}", user_ids.len(), e);
                HashSet::new()
            }
        }
    }

    pub(crate) fn index(&self) -> &dyn IdentifierIndex {
        self.index.as_ref()
    }
}
