//! One-hop and two-hop friend queries.
//!
//! Queries run against committed state on the handle of the asking user
//! and need no transaction. Candidates are given as user ids; the ones
//! without an index entry are dropped before the graph is touched.

use crate::resolver::IdentityResolver;
use amity_core::{GraphStore, StoreError, Traversal, UserId, VertexId, KNOWS_LABEL};
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Distance of a candidate from the asking user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FriendLevel {
    Direct = 1,
    SecondDegree = 2,
}

impl FriendLevel {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl Serialize for FriendLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

/// Direct out-neighbors of `user` that are in `candidates`.
pub fn one_degree(
    t: &dyn Traversal,
    user: VertexId,
    candidates: &HashSet<VertexId>,
) -> Result<Vec<UserId>, StoreError> {
    let direct = t.neighbors(&[user], KNOWS_LABEL)?;
    let hits = t.dedup(t.intersect(direct, candidates));
    t.project_user_ids(&hits)
}

/// Vertices exactly two hops from `user` that are in `candidates`.
///
/// Anything also reachable in one hop, and `user` itself, is excluded. A
/// candidate reached along several paths is reported once.
pub fn two_degree(
    t: &dyn Traversal,
    user: VertexId,
    candidates: &HashSet<VertexId>,
) -> Result<Vec<UserId>, StoreError> {
    let first = t.neighbors(&[user], KNOWS_LABEL)?;
    let second = t.neighbors(&first, KNOWS_LABEL)?;

    let mut closer: HashSet<VertexId> = first.into_iter().collect();
    closer.insert(user);

    let hits = t.dedup(t.intersect(t.exclude(second, &closer), candidates));
    t.project_user_ids(&hits)
}

#[derive(Clone)]
pub struct TraversalEngine {
    store: Arc<dyn GraphStore>,
    resolver: IdentityResolver,
}

impl TraversalEngine {
    pub fn new(store: Arc<dyn GraphStore>, resolver: IdentityResolver) -> Self {
        Self { store, resolver }
    }

    /// Maps each reachable candidate to its level. A candidate reachable at
    /// both distances is reported as [`FriendLevel::Direct`]; unreachable
    /// candidates are absent.
    pub fn friends_level(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<HashMap<UserId, FriendLevel>, StoreError> {
        let Some((user, candidates)) = self.prepare(user_id, candidates) else {
            return Ok(HashMap::new());
        };
        let handle = self.store.select_handle(user_id);
        let t = handle.traversal();

        let mut levels = HashMap::new();
        for found in two_degree(t, user, &candidates)? {
            levels.insert(found, FriendLevel::SecondDegree);
        }
        // Written second so direct relations win.
        for found in one_degree(t, user, &candidates)? {
            levels.insert(found, FriendLevel::Direct);
        }

        debug!("Friend levels for '{}': {} hits", user_id, levels.len());
        Ok(levels)
    }

    pub fn one_degree_friends(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<Vec<UserId>, StoreError> {
        match self.prepare(user_id, candidates) {
            Some((user, candidates)) => {
                let handle = self.store.select_handle(user_id);
                one_degree(handle.traversal(), user, &candidates)
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn two_degree_friends(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Result<Vec<UserId>, StoreError> {
        match self.prepare(user_id, candidates) {
            Some((user, candidates)) => {
                let handle = self.store.select_handle(user_id);
                two_degree(handle.traversal(), user, &candidates)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Vertex ids of every user `user_id` knows directly.
    pub fn all_friend_vertex_ids(&self, user_id: &UserId) -> Result<BTreeSet<VertexId>, StoreError> {
        let Some(user) = self.resolver.resolve(user_id) else {
            debug!("No vertex for user '{}', no friends", user_id);
            return Ok(BTreeSet::new());
        };
        let handle = self.store.select_handle(user_id);
        Ok(handle
            .traversal()
            .neighbors(&[user], KNOWS_LABEL)?
            .into_iter()
            .collect())
    }

    /// User ids of every user `user_id` knows directly, in edge order.
    pub fn direct_friends(&self, user_id: &UserId) -> Result<Vec<UserId>, StoreError> {
        let Some(user) = self.resolver.resolve(user_id) else {
            return Ok(Vec::new());
        };
        let handle = self.store.select_handle(user_id);
        let t = handle.traversal();
        let direct = t.dedup(t.neighbors(&[user], KNOWS_LABEL)?);
        t.project_user_ids(&direct)
    }

    fn prepare(
        &self,
        user_id: &UserId,
        candidates: &[UserId],
    ) -> Option<(VertexId, HashSet<VertexId>)> {
        let Some(user) = self.resolver.resolve(user_id) else {
            debug!("No vertex for user '{}', empty result", user_id);
            return None;
        };
        let candidates = self.resolver.resolve_many(candidates);
        if candidates.is_empty() {
            debug!("No candidate of '{}' resolved, empty result", user_id);
            return None;
        }
        Some((user, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded;
    use amity_core::IdentifierIndex;
    use proptest::prelude::*;

    fn user(name: &str) -> UserId {
        UserId::new(name)
    }

    fn users(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|n| user(n)).collect()
    }

    fn engine(edges: &[(&str, &str)]) -> TraversalEngine {
        let (store, index) = seeded(edges);
        TraversalEngine::new(store, IdentityResolver::new(index))
    }

    #[test]
    fn test_one_degree_respects_candidates() {
        let engine = engine(&[("a", "b"), ("a", "c"), ("b", "d")]);

        let mut found = engine
            .one_degree_friends(&user("a"), &users(&["b", "c", "d"]))
            .unwrap();
        found.sort();
        assert_eq!(found, users(&["b", "c"]));

        let found = engine.one_degree_friends(&user("a"), &users(&["c"])).unwrap();
        assert_eq!(found, users(&["c"]));
    }

    #[test]
    fn test_two_degree_exclusions() {
        let engine = engine(&[("a", "b"), ("b", "c"), ("b", "a")]);

        let two = |names: &[&str]| engine.two_degree_friends(&user("a"), &users(names)).unwrap();
        assert_eq!(two(&["c"]), users(&["c"]));
        assert!(two(&["b"]).is_empty());
        assert!(two(&["a"]).is_empty());
    }

    #[test]
    fn test_two_degree_dedups_paths() {
        let engine = engine(&[("a", "m1"), ("a", "m2"), ("m1", "d"), ("m2", "d")]);

        let found = engine.two_degree_friends(&user("a"), &users(&["d"])).unwrap();
        assert_eq!(found, users(&["d"]));
    }

    #[test]
    fn test_levels_direct_wins() {
        let engine = engine(&[("a", "b"), ("a", "x"), ("x", "b"), ("x", "y")]);

        let levels = engine
            .friends_level(&user("a"), &users(&["b", "x", "y", "zed"]))
            .unwrap();
        assert_eq!(levels[&user("b")], FriendLevel::Direct);
        assert_eq!(levels[&user("x")], FriendLevel::Direct);
        assert_eq!(levels[&user("y")], FriendLevel::SecondDegree);
        assert_eq!(levels.len(), 3);
    }

    #[test]
    fn test_unreachable_candidate_absent() {
        let engine = engine(&[("a", "b"), ("c", "d")]);

        let levels = engine.friends_level(&user("a"), &users(&["d"])).unwrap();
        assert!(levels.is_empty());
    }

    #[test]
    fn test_unresolved_inputs_give_empty_results() {
        let engine = engine(&[("a", "b")]);

        assert!(engine
            .friends_level(&user("nobody"), &users(&["b"]))
            .unwrap()
            .is_empty());
        assert!(engine
            .friends_level(&user("a"), &users(&["ghost"]))
            .unwrap()
            .is_empty());
        assert!(engine.friends_level(&user("a"), &[]).unwrap().is_empty());
        assert!(engine
            .all_friend_vertex_ids(&user("nobody"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_all_friend_vertex_ids() {
        let (store, index) = seeded(&[("a", "b"), ("a", "c"), ("b", "c")]);
        let engine = TraversalEngine::new(store, IdentityResolver::new(index.clone()));

        let ids = engine.all_friend_vertex_ids(&user("a")).unwrap();
        let expected: BTreeSet<VertexId> = index
            .vertex_ids(&users(&["b", "c"]))
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, expected);

        let mut friends = engine.direct_friends(&user("a")).unwrap();
        friends.sort();
        assert_eq!(friends, users(&["b", "c"]));
    }

    #[test]
    fn test_level_serializes_as_number() {
        let json = serde_json::to_string(&FriendLevel::SecondDegree).unwrap();
        assert_eq!(json, "2");
    }

    const NAMES: [&str; 6] = ["u0", "u1", "u2", "u3", "u4", "u5"];

    proptest! {
        #[test]
        fn prop_levels_follow_hop_distance(
            pairs in prop::collection::vec((0usize..6, 0usize..6), 0..20),
            asker in 0usize..6,
        ) {
            let edges: Vec<(&str, &str)> = pairs.iter().map(|(a, b)| (NAMES[*a], NAMES[*b])).collect();
            let engine = engine(&edges);
            let me = NAMES[asker];

            let levels = engine.friends_level(&user(me), &users(&NAMES)).unwrap();

            let direct: HashSet<&str> = edges.iter().filter(|(a, _)| *a == me).map(|(_, b)| *b).collect();
            let via: HashSet<&str> = edges
                .iter()
                .filter(|(a, _)| direct.contains(a))
                .map(|(_, b)| *b)
                .collect();

            for name in NAMES {
                let expected = if direct.contains(name) {
                    Some(FriendLevel::Direct)
                } else if name != me && via.contains(name) {
                    Some(FriendLevel::SecondDegree)
                } else {
                    None
                };
                prop_assert_eq!(levels.get(&user(name)).copied(), expected, "user {}", name);
            }
        }
    }
}
