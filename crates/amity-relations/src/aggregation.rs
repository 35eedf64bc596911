//! Common-friend counts.

use crate::resolver::IdentityResolver;
use amity_core::{GraphStore, StoreError, Traversal, UserId, VertexId, KNOWS_LABEL};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Counts, per candidate, the two-hop paths from `user` that end there.
///
/// Paths through `user` itself are not counted and neither are paths that
/// end at `user`. Unlike [`two_degree`](crate::traversal::two_degree) the
/// result keeps multiplicity: two intermediates reaching the same
/// candidate count twice.
pub fn common_friend_counts(
    t: &dyn Traversal,
    user: VertexId,
    candidates: &HashSet<VertexId>,
) -> Result<HashMap<UserId, u64>, StoreError> {
    let me = HashSet::from([user]);

    let middle = t.exclude(t.neighbors(&[user], KNOWS_LABEL)?, &me);
    let ends = t.neighbors(&middle, KNOWS_LABEL)?;
    let ends = t.exclude(t.intersect(ends, candidates), &me);

    t.group_count(&ends)
}

#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn GraphStore>,
    resolver: IdentityResolver,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn GraphStore>, resolver: IdentityResolver) -> Self {
        Self { store, resolver }
    }

    /// Number of common friends between `user_id` and each candidate.
    /// Candidates with no common friend are absent.
    pub fn common_friends_count(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<HashMap<UserId, u64>, StoreError> {
        let Some(user) = self.resolver.resolve(user_id) else {
            info!("Common friends: no vertex for user '{}'", user_id);
            return Ok(HashMap::new());
        };
        let candidates = self.resolver.resolve_many(candidates);
        if candidates.is_empty() {
            info!("Common friends: no candidate of '{}' resolved", user_id);
            return Ok(HashMap::new());
        }

        let handle = self.store.select_handle(user_id);
        let counts = common_friend_counts(handle.traversal(), user, &candidates)?;
        debug!("Common friends for '{}': {} candidates hit", user_id, counts.len());
        Ok(counts)
    }
}
