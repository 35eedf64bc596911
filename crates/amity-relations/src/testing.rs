//! Fault-injecting test doubles.

use amity_core::{
    GraphHandle, GraphStore, IdentifierIndex, IndexError, StoreError, Traversal, UserId, VertexId,
};
use amity_graph::{MemoryGraphStore, MemoryHandle, MemoryIndex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A [`MemoryIndex`] whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyIndex {
    inner: MemoryIndex,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn remove(&self, user_id: &UserId) -> bool {
        self.inner.remove(user_id)
    }
}

impl IdentifierIndex for FlakyIndex {
    fn create(&self, user_id: &UserId, vertex_id: VertexId) -> Result<(), IndexError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(IndexError::Write {
                user_id: user_id.clone(),
                reason: "injected".into(),
            });
        }
        self.inner.create(user_id, vertex_id)
    }

    fn vertex_id(&self, user_id: &UserId) -> Result<Option<VertexId>, IndexError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(IndexError::Read("injected".into()));
        }
        self.inner.vertex_id(user_id)
    }
}

#[derive(Default)]
struct Faults {
    edge_failures: AtomicUsize,
    commit_failures: AtomicUsize,
}

/// Consumes one pending failure, if any.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// A [`MemoryGraphStore`] that fails a configurable number of upcoming
/// edge inserts or commits with a backend error.
pub struct FlakyStore {
    inner: MemoryGraphStore,
    faults: Arc<Faults>,
}

impl FlakyStore {
    pub fn new(pool_size: usize) -> Self {
        Self {
            inner: MemoryGraphStore::new(pool_size),
            faults: Arc::new(Faults::default()),
        }
    }

    pub fn fail_next_edges(&self, n: usize) {
        self.faults.edge_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_commits(&self, n: usize) {
        self.faults.commit_failures.store(n, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryGraphStore {
        &self.inner
    }
}

impl GraphStore for FlakyStore {
    fn select_handle(&self, key: &UserId) -> Arc<dyn GraphHandle> {
        Arc::new(FlakyHandle {
            inner: self.inner.handle_for(key),
            faults: self.faults.clone(),
        })
    }
}

struct FlakyHandle {
    inner: Arc<MemoryHandle>,
    faults: Arc<Faults>,
}

impl GraphHandle for FlakyHandle {
    fn add_vertex(&self, label: &str, user_id: &UserId) -> Result<VertexId, StoreError> {
        self.inner.add_vertex(label, user_id)
    }

    fn add_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<(), StoreError> {
        if take(&self.faults.edge_failures) {
            return Err(StoreError::Backend("injected edge failure".into()));
        }
        self.inner.add_edge(label, from, to)
    }

    fn remove_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<bool, StoreError> {
        self.inner.remove_edge(label, from, to)
    }

    fn commit(&self) -> Result<(), StoreError> {
        if take(&self.faults.commit_failures) {
            self.inner.rollback();
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        self.inner.commit()
    }

    fn rollback(&self) {
        self.inner.rollback()
    }

    fn traversal(&self) -> &dyn Traversal {
        self.inner.traversal()
    }
}

/// Builds a committed graph and matching index from `(user, friend)` pairs.
/// Every user gets its index entry.
pub fn seeded(edges: &[(&str, &str)]) -> (Arc<MemoryGraphStore>, Arc<MemoryIndex>) {
    let store = Arc::new(MemoryGraphStore::new(2));
    let index = Arc::new(MemoryIndex::new());
    let setup = store.handle_for(&UserId::new("setup"));

    let vertex = |name: &str| -> VertexId {
        let user_id = UserId::new(name);
        if let Some(id) = index.vertex_id(&user_id).unwrap() {
            return id;
        }
        let id = setup.add_vertex(amity_core::PERSON_LABEL, &user_id).unwrap();
        setup.commit().unwrap();
        index.create(&user_id, id).unwrap();
        id
    };

    for (from, to) in edges {
        let (from, to) = (vertex(from), vertex(to));
        // Repeated pairs are skipped.
        match setup.add_edge(amity_core::KNOWS_LABEL, from, to) {
            Ok(()) => setup.commit().unwrap(),
            Err(_) => setup.rollback(),
        }
    }
    (store, index)
}
