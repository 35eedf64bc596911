//! Friend relations over a graph store and an identifier index.
//!
//! This crate holds the logic that keeps the two collaborators consistent
//! when users and `knows` relations are created, repairs them when they
//! drift apart, and answers bounded-distance friend queries.
//!
//! Everything is reached through [`FriendService`]:
//!
//! ```
//! use amity_core::{IndexFailurePolicy, UserId};
//! use amity_graph::{MemoryGraphStore, MemoryIndex};
//! use amity_relations::{FriendLevel, FriendService};
//! use std::sync::Arc;
//!
//! let service = FriendService::new(
//!     Arc::new(MemoryGraphStore::new(4)),
//!     Arc::new(MemoryIndex::new()),
//!     IndexFailurePolicy::Rollback,
//! );
//! let (alice, bob, carol) = (UserId::new("alice"), UserId::new("bob"), UserId::new("carol"));
//! service.add_relation(&alice, &bob);
//! service.add_relation(&bob, &carol);
//!
//! let levels = service.friends_level(&alice, &[bob.clone(), carol.clone()]).unwrap();
//! assert_eq!(levels[&bob], FriendLevel::Direct);
//! assert_eq!(levels[&carol], FriendLevel::SecondDegree);
//! ```

mod aggregation;
mod outcome;
mod relation;
mod resolver;
mod service;
mod transaction;
mod traversal;
mod vertex;

#[cfg(test)]
mod testing;

pub use aggregation::{common_friend_counts, AggregationEngine};
pub use outcome::{CreateOutcome, DeleteOutcome, RelationOutcome, Violation};
pub use relation::{EdgeAdded, RelationManager};
pub use resolver::IdentityResolver;
pub use service::FriendService;
pub use transaction::{in_transaction, Abort, TxError, TxOutcome};
pub use traversal::{one_degree, two_degree, FriendLevel, TraversalEngine};
pub use vertex::VertexManager;
