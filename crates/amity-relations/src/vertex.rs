//! User vertex creation.
//!
//! Creating a user touches both stores: the vertex goes into the graph and
//! the `userId -> vertexId` entry into the index. There is no transaction
//! spanning both, so the order is fixed (vertex, index entry, graph commit)
//! and the behaviour on an index failure is an explicit policy.

use crate::outcome::CreateOutcome;
use crate::transaction::{in_transaction, Abort, TxOutcome};
use amity_core::{
    GraphHandle, GraphStore, IdentifierIndex, IndexFailurePolicy, UserId, PERSON_LABEL,
};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct VertexManager {
    store: Arc<dyn GraphStore>,
    index: Arc<dyn IdentifierIndex>,
    policy: IndexFailurePolicy,
}

impl VertexManager {
    pub fn new(
        store: Arc<dyn GraphStore>,
        index: Arc<dyn IdentifierIndex>,
        policy: IndexFailurePolicy,
    ) -> Self {
        Self {
            store,
            index,
            policy,
        }
    }

    pub fn policy(&self) -> IndexFailurePolicy {
        self.policy
    }

    /// Creates the vertex and index entry for `user_id` on the user's own handle.
    pub fn create_user(&self, user_id: &UserId) -> CreateOutcome {
        let handle = self.store.select_handle(user_id);
        self.create_user_on(handle.as_ref(), user_id)
    }

    /// Creates the vertex and index entry for `user_id` on `handle`.
    ///
    /// A duplicate user rolls back and yields [`CreateOutcome::AlreadyExists`].
    /// An index write failure rolls back under
    /// [`IndexFailurePolicy::Rollback`]; under [`IndexFailurePolicy::Legacy`]
    /// the transaction is left open and the id is returned anyway.
    pub fn create_user_on(&self, handle: &dyn GraphHandle, user_id: &UserId) -> CreateOutcome {
        let outcome = in_transaction(handle, |h| {
            let id = h.add_vertex(PERSON_LABEL, user_id)?;
            match self.index.create(user_id, id) {
                Ok(()) => Ok(id),
                Err(e) => match self.policy {
                    IndexFailurePolicy::Rollback => Err(Abort::from(e)),
                    IndexFailurePolicy::Legacy => Err(Abort::Abandon(id, e.into())),
                },
            }
        });

        match outcome {
            TxOutcome::Committed(id) => {
                debug!("Added user '{}' as {}", user_id, id);
                CreateOutcome::Created(id)
            }
            TxOutcome::Violation(_, e) => {
                error!("User '{}' already exists, insert rolled back: {}", user_id, e);
                CreateOutcome::AlreadyExists
            }
            TxOutcome::Failed(e) => {
                error!("Adding user '{}' failed, rolled back: {}", user_id, e);
                CreateOutcome::Failed(e.to_string())
            }
            TxOutcome::Abandoned(id, e) => {
                error!(
                    "Index write for user '{}' failed; vertex {} left uncommitted: {}",
                    user_id, id, e
                );
                CreateOutcome::Uncommitted(id)
            }
        }
    }
}
