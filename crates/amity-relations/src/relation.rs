//! Adding and removing `knows` relations.
//!
//! The graph and the identifier index are committed independently, so an
//! index entry can outlive its vertex (or a vertex can exist without a
//! correct entry). [`RelationManager::add_relation`] detects this after a
//! failed edge insert, repairs it using the graph's own `userId` attribute
//! as the source of truth, and retries exactly once.

use crate::outcome::{DeleteOutcome, RelationOutcome, Violation};
use crate::resolver::IdentityResolver;
use crate::transaction::{in_transaction, TxError, TxOutcome};
use crate::vertex::VertexManager;
use amity_core::{GraphHandle, GraphStore, StoreError, UserId, VertexId, KNOWS_LABEL};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a single edge insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAdded {
    Created,
    /// The edge was already there; the insert was rolled back as a no-op.
    AlreadyExisted,
}

#[derive(Clone)]
pub struct RelationManager {
    store: Arc<dyn GraphStore>,
    resolver: IdentityResolver,
    vertices: VertexManager,
}

impl RelationManager {
    pub fn new(
        store: Arc<dyn GraphStore>,
        resolver: IdentityResolver,
        vertices: VertexManager,
    ) -> Self {
        Self {
            store,
            resolver,
            vertices,
        }
    }

    /// Inserts `from -knows-> to` on `handle` and commits.
    ///
    /// A duplicate edge is a warning and a no-op. Every other failure is
    /// rolled back, logged and returned.
    pub fn add_edge(
        &self,
        handle: &dyn GraphHandle,
        from: VertexId,
        to: VertexId,
    ) -> Result<EdgeAdded, StoreError> {
        let outcome = in_transaction(handle, |h| {
            let traversal = h.traversal();
            for id in [from, to] {
                if traversal.vertex(id)?.is_none() {
                    return Err(StoreError::VertexNotFound(id).into());
                }
            }
            h.add_edge(KNOWS_LABEL, from, to)?;
            Ok(())
        });

        match outcome {
            TxOutcome::Committed(()) => {
                debug!("Added relation {} -knows-> {}", from, to);
                Ok(EdgeAdded::Created)
            }
            TxOutcome::Violation(Violation::DuplicateRelation, e) => {
                warn!("Relation already exists: {}", e);
                Ok(EdgeAdded::AlreadyExisted)
            }
            TxOutcome::Violation(_, e) => {
                error!("Adding relation {} -knows-> {} failed: {}", from, to, e);
                Err(e)
            }
            TxOutcome::Failed(e) | TxOutcome::Abandoned(_, e) => {
                error!("Adding relation {} -knows-> {} failed: {}", from, to, e);
                Err(e.into_store_error())
            }
        }
    }

    /// Makes `user_id` know `friend_user_id`, creating either user on demand.
    ///
    /// Never fails outright. If the first insert fails, both sides are
    /// re-checked against the graph, repaired, and the insert is retried
    /// once; a second failure is reported as [`RelationOutcome::GaveUp`].
    pub fn add_relation(&self, user_id: &UserId, friend_user_id: &UserId) -> RelationOutcome {
        let handle = self.store.select_handle(user_id);
        let handle = handle.as_ref();

        let from = self.resolve_or_create(handle, user_id);
        let to = self.resolve_or_create(handle, friend_user_id);

        let first_failure = match (from, to) {
            (Some(from), Some(to)) => match self.add_edge(handle, from, to) {
                Ok(EdgeAdded::Created) => return RelationOutcome::Applied,
                Ok(EdgeAdded::AlreadyExisted) => return RelationOutcome::AlreadyApplied,
                Err(e) => e.to_string(),
            },
            _ => "user vertex could not be created".to_string(),
        };
        warn!(
            "Relation '{}' -> '{}' failed ({}), reconciling with graph",
            user_id, friend_user_id, first_failure
        );

        let from = self.reconcile(handle, user_id, from);
        let to = self.reconcile(handle, friend_user_id, to);

        let (Some(from), Some(to)) = (from, to) else {
            error!(
                "Giving up on relation '{}' -> '{}': vertices unavailable after reconciliation",
                user_id, friend_user_id
            );
            return RelationOutcome::GaveUp("user vertex unavailable".into());
        };

        match self.add_edge(handle, from, to) {
            Ok(EdgeAdded::Created) => {
                info!(
                    "Relation '{}' -> '{}' established after reconciliation",
                    user_id, friend_user_id
                );
                RelationOutcome::Repaired
            }
            Ok(EdgeAdded::AlreadyExisted) => RelationOutcome::AlreadyApplied,
            Err(e) => {
                error!(
                    "Giving up on relation '{}' -> '{}' after retry: {}",
                    user_id, friend_user_id, e
                );
                RelationOutcome::GaveUp(e.to_string())
            }
        }
    }

    /// Removes `user_id -knows-> friend_user_id`. Never fails outright.
    pub fn delete_relation(&self, user_id: &UserId, friend_user_id: &UserId) -> DeleteOutcome {
        let Some(from) = self.resolver.resolve(user_id) else {
            warn!("Delete relation: no vertex id for user '{}'", user_id);
            return DeleteOutcome::UnknownUser;
        };

        let handle = self.store.select_handle(user_id);
        let outcome = in_transaction(handle.as_ref(), |h| {
            let traversal = h.traversal();
            if traversal.vertex(from)?.is_none() {
                return Err(StoreError::VertexNotFound(from).into());
            }

            let mut removed = 0;
            for target in traversal.neighbors(&[from], KNOWS_LABEL)? {
                let is_friend = traversal
                    .vertex(target)?
                    .is_some_and(|v| &v.user_id == friend_user_id);
                if is_friend && h.remove_edge(KNOWS_LABEL, from, target)? {
                    removed += 1;
                }
            }
            Ok(removed)
        });

        match outcome {
            TxOutcome::Committed(0) => {
                debug!("No relation '{}' -> '{}' to delete", user_id, friend_user_id);
                DeleteOutcome::NothingToRemove
            }
            TxOutcome::Committed(n) => {
                debug!("Deleted relation '{}' -> '{}'", user_id, friend_user_id);
                DeleteOutcome::Removed(n)
            }
            TxOutcome::Failed(TxError::Store(StoreError::VertexNotFound(id))) => {
                warn!(
                    "Delete relation failed, user '{}': vertex {} not found",
                    user_id, id
                );
                DeleteOutcome::UnknownUser
            }
            TxOutcome::Violation(_, e) => {
                error!("Delete relation '{}' -> '{}' failed: {}", user_id, friend_user_id, e);
                DeleteOutcome::GaveUp(e.to_string())
            }
            TxOutcome::Failed(e) | TxOutcome::Abandoned(_, e) => {
                error!("Delete relation '{}' -> '{}' failed: {}", user_id, friend_user_id, e);
                DeleteOutcome::GaveUp(e.to_string())
            }
        }
    }

    fn resolve_or_create(&self, handle: &dyn GraphHandle, user_id: &UserId) -> Option<VertexId> {
        self.resolver
            .resolve(user_id)
            .or_else(|| self.vertices.create_user_on(handle, user_id).vertex_id())
    }

    /// Re-derives the vertex for `user_id` from the graph itself.
    ///
    /// A vertex missing from the graph is recreated. A vertex present under
    /// a different id than `known` gets its index entry rewritten.
    fn reconcile(
        &self,
        handle: &dyn GraphHandle,
        user_id: &UserId,
        known: Option<VertexId>,
    ) -> Option<VertexId> {
        match handle.traversal().find_by_user_id(user_id) {
            Ok(Some(found)) => {
                if known != Some(found) {
                    warn!(
                        "Index has {:?} for user '{}' but graph has {}, rewriting entry",
                        known, user_id, found
                    );
                    if let Err(e) = self.resolver.index().create(user_id, found) {
                        warn!("Rewriting index entry for '{}' failed: {}", user_id, e);
                    }
                }
                Some(found)
            }
            Ok(None) => {
                warn!(
                    "User '{}' missing from graph (index had {:?}), recreating vertex",
                    user_id, known
                );
                self.vertices.create_user_on(handle, user_id).vertex_id()
            }
            Err(e) => {
                error!("Graph lookup for user '{}' failed: {}", user_id, e);
                known
            }
        }
    }
}
