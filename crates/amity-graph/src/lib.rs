//! Amity Graph - the storage collaborators
//!
//! This crate provides concrete implementations of the contracts defined in
//! `amity-core`:
//!
//! - [`MemoryGraphStore`]: a petgraph-backed graph engine with a handle pool
//!   and thread-bound transactions
//! - [`SledIndex`] / [`MemoryIndex`]: the `userId -> vertexId` index
//! - [`SnapshotStore`]: sled persistence for the committed graph
//!
//! # Example
//!
//! ```
//! use amity_core::{GraphHandle, GraphStore, UserId, PERSON_LABEL};
//! use amity_graph::MemoryGraphStore;
//!
//! let store = MemoryGraphStore::new(4);
//! let alice = UserId::new("alice");
//! let handle = store.select_handle(&alice);
//!
//! let id = handle.add_vertex(PERSON_LABEL, &alice).unwrap();
//! handle.commit().unwrap();
//! assert_eq!(handle.traversal().find_by_user_id(&alice).unwrap(), Some(id));
//! ```

mod edge;
mod graph;
mod index;
mod pool;
mod store;

pub use edge::{Edge, GraphEdge};
pub use graph::{GraphStats, SocialGraph};
pub use index::{IndexEntry, MemoryIndex, SledIndex, INDEX_TREE};
pub use pool::{MemoryGraphStore, MemoryHandle, SharedGraph};
pub use store::{PersistError, SnapshotStore};
