//! The caller-facing entry point.

use crate::aggregation::AggregationEngine;
use crate::outcome::{CreateOutcome, DeleteOutcome, RelationOutcome};
use crate::relation::{EdgeAdded, RelationManager};
use crate::resolver::IdentityResolver;
use crate::traversal::{FriendLevel, TraversalEngine};
use crate::vertex::VertexManager;
use amity_core::{
    Config, GraphStore, IdentifierIndex, IndexFailurePolicy, StoreError, UserId, VertexId,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Friend graph operations keyed by external user ids.
///
/// Holds no state of its own beyond the two collaborators it was built
/// with; cloning is cheap and clones share the stores.
#[derive(Clone)]
pub struct FriendService {
    store: Arc<dyn GraphStore>,
    resolver: IdentityResolver,
    vertices: VertexManager,
    relations: RelationManager,
    traversal: TraversalEngine,
    aggregation: AggregationEngine,
}

impl FriendService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        index: Arc<dyn IdentifierIndex>,
        policy: IndexFailurePolicy,
    ) -> Self {
        let resolver = IdentityResolver::new(index.clone());
        let vertices = VertexManager::new(store.clone(), index, policy);
        Self {
            relations: RelationManager::new(store.clone(), resolver.clone(), vertices.clone()),
            traversal: TraversalEngine::new(store.clone(), resolver.clone()),
            aggregation: AggregationEngine::new(store.clone(), resolver.clone()),
            store,
            resolver,
            vertices,
        }
    }

    pub fn from_config(
        store: Arc<dyn GraphStore>,
        index: Arc<dyn IdentifierIndex>,
        config: &Config,
    ) -> Self {
        Self::new(store, index, config.index_failure)
    }

    pub fn policy(&self) -> IndexFailurePolicy {
        self.vertices.policy()
    }

    pub fn resolve(&self, user_id: &UserId) -> Option<VertexId> {
        self.resolver.resolve(user_id)
    }

    pub fn add_user(&self, user_id: &UserId) -> CreateOutcome {
        self.vertices.create_user(user_id)
    }

    pub fn add_relation(&self, user_id: &UserId, friend_user_id: &UserId) -> RelationOutcome {
        self.relations.add_relation(user_id, friend_user_id)
    }

    pub fn delete_relation(&self, user_id: &UserId, friend_user_id: &UserId) -> DeleteOutcome {
        self.relations.delete_relation(user_id, friend_user_id)
    }

    /// Adds `from -knows-> to` for callers that already hold vertex ids.
    ///
    /// `shard_key` picks the handle, the same way the owning user's id
    /// would. No reconciliation is attempted.
    pub fn add_relation_by_vertex_ids(
        &self,
        shard_key: &UserId,
        from: VertexId,
        to: VertexId,
    ) -> Result<EdgeAdded, StoreError> {
        let handle = self.store.select_handle(shard_key);
        self.relations.add_edge(handle.as_ref(), from, to)
    }

    pub fn all_friend_vertex_ids(&self, user_id: &UserId) -> Result<BTreeSet<VertexId>, StoreError> {
        self.traversal.all_friend_vertex_ids(user_id)
    }

    pub fn friends(&self, user_id: &UserId) -> Result<Vec<UserId>, StoreError> {
        self.traversal.direct_friends(user_id)
    }

    pub fn friends_level(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<HashMap<UserId, FriendLevel>, StoreError> {
        self.traversal.friends_level(user_id, candidates)
    }

    pub fn one_degree_friends(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<Vec<UserId>, StoreError> {
        self.traversal.one_degree_friends(user_id, candidates)
    }

    pub fn two_degree_friends(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<Vec<UserId>, StoreError> {
        self.traversal.two_degree_friends(user_id, candidates)
    }

    pub fn common_friends_count(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<HashMap<UserId, u64>, StoreError> {
        self.aggregation.common_friends_count(user_id, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyStore;
    use amity_core::KNOWS_LABEL;
    use amity_graph::{MemoryGraphStore, MemoryIndex};

    fn user(name: &str) -> UserId {
        UserId::new(name)
    }

    fn users(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|n| user(n)).collect()
    }

    fn service() -> (FriendService, Arc<MemoryGraphStore>) {
        let store = Arc::new(MemoryGraphStore::new(4));
        let index = Arc::new(MemoryIndex::new());
        let service = FriendService::new(store.clone(), index, IndexFailurePolicy::Rollback);
        (service, store)
    }

    #[test]
    fn test_add_user_then_resolve() {
        let (service, _) = service();

        let id = service.add_user(&user("alice")).vertex_id().unwrap();
        assert_eq!(service.resolve(&user("alice")), Some(id));
    }

    #[test]
    fn test_add_user_twice_keeps_identity() {
        let (service, _) = service();

        let id = service.add_user(&user("alice")).vertex_id();
        assert_eq!(service.add_user(&user("alice")), CreateOutcome::AlreadyExists);
        assert_eq!(service.resolve(&user("alice")), id);
    }

    #[test]
    fn test_relation_is_idempotent_and_directed() {
        let (service, store) = service();

        assert_eq!(service.add_relation(&user("a"), &user("b")), RelationOutcome::Applied);
        assert_eq!(
            service.add_relation(&user("a"), &user("b")),
            RelationOutcome::AlreadyApplied
        );
        assert_eq!(store.stats().edge_count, 1);

        assert_eq!(
            service.one_degree_friends(&user("a"), &users(&["b"])).unwrap(),
            users(&["b"])
        );
        assert!(service
            .one_degree_friends(&user("b"), &users(&["a"]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_two_degree_and_levels() {
        let (service, _) = service();
        service.add_relation(&user("a"), &user("b"));
        service.add_relation(&user("b"), &user("c"));

        assert_eq!(
            service.two_degree_friends(&user("a"), &users(&["c"])).unwrap(),
            users(&["c"])
        );
        assert!(service
            .two_degree_friends(&user("a"), &users(&["b"]))
            .unwrap()
            .is_empty());
        assert!(service
            .two_degree_friends(&user("a"), &users(&["a"]))
            .unwrap()
            .is_empty());

        service.add_relation(&user("a"), &user("x"));
        service.add_relation(&user("x"), &user("b"));
        let levels = service.friends_level(&user("a"), &users(&["b", "c"])).unwrap();
        assert_eq!(levels[&user("b")], FriendLevel::Direct);
        assert_eq!(levels[&user("c")], FriendLevel::SecondDegree);
    }

    #[test]
    fn test_common_friends() {
        let (service, _) = service();
        for (from, to) in [("a", "m1"), ("a", "m2"), ("m1", "d"), ("m2", "d")] {
            service.add_relation(&user(from), &user(to));
        }

        let counts = service.common_friends_count(&user("a"), &users(&["d"])).unwrap();
        assert_eq!(counts[&user("d")], 2);
    }

    #[test]
    fn test_delete_relation() {
        let (service, _) = service();
        service.add_relation(&user("a"), &user("b"));

        assert_eq!(
            service.delete_relation(&user("a"), &user("b")),
            DeleteOutcome::Removed(1)
        );
        assert!(service
            .one_degree_friends(&user("a"), &users(&["b"]))
            .unwrap()
            .is_empty());
        assert_eq!(
            service.delete_relation(&user("a"), &user("b")),
            DeleteOutcome::NothingToRemove
        );
        assert_eq!(
            service.delete_relation(&user("q"), &user("r")),
            DeleteOutcome::UnknownUser
        );
    }

    #[test]
    fn test_stale_index_reconciled() {
        let (service, store) = service();
        service.add_user(&user("a"));
        let stale = service.resolve(&user("a")).unwrap();
        store.remove_vertex(stale);

        let outcome = service.add_relation(&user("a"), &user("b"));
        assert!(outcome.is_established());
        assert_eq!(
            service.one_degree_friends(&user("a"), &users(&["b"])).unwrap(),
            users(&["b"])
        );
    }

    #[test]
    fn test_vertex_id_batch_path() {
        let (service, store) = service();
        let a = service.add_user(&user("a")).vertex_id().unwrap();
        let b = service.add_user(&user("b")).vertex_id().unwrap();
        let c = service.add_user(&user("c")).vertex_id().unwrap();

        assert_eq!(
            service.add_relation_by_vertex_ids(&user("a"), a, b),
            Ok(EdgeAdded::Created)
        );
        assert_eq!(
            service.add_relation_by_vertex_ids(&user("a"), a, c),
            Ok(EdgeAdded::Created)
        );
        assert_eq!(
            service.add_relation_by_vertex_ids(&user("a"), a, b),
            Ok(EdgeAdded::AlreadyExisted)
        );

        assert_eq!(
            service.all_friend_vertex_ids(&user("a")).unwrap(),
            BTreeSet::from([b, c])
        );
        assert!(store.read(|g| g.has_edge(KNOWS_LABEL, a, c)));

        let mut friends = service.friends(&user("a")).unwrap();
        friends.sort();
        assert_eq!(friends, users(&["b", "c"]));
    }

    #[test]
    fn test_from_config_uses_policy() {
        let config = Config {
            index_failure: IndexFailurePolicy::Legacy,
            ..Config::default()
        };
        let store = Arc::new(FlakyStore::new(config.pool_size));
        let service = FriendService::from_config(store, Arc::new(MemoryIndex::new()), &config);
        assert_eq!(service.policy(), IndexFailurePolicy::Legacy);
    }

    #[test]
    fn test_concurrent_add_relation_single_edge() {
        let (service, store) = service();
        service.add_user(&user("a"));
        service.add_user(&user("b"));

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let outcome = service.add_relation(&user("a"), &user("b"));
                    assert!(outcome.is_established());
                });
            }
        });
        assert_eq!(store.stats().edge_count, 1);
    }
}
