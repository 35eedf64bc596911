//! Handle pool and thread-bound transactions over a shared [`SocialGraph`].
//!
//! Every handle in the pool points at the same committed graph. A handle
//! stages writes per calling thread; nothing becomes visible to readers
//! until that thread commits. Commit re-checks the uniqueness constraints
//! under the write lock, so of two racing writers of the same vertex or
//! edge exactly one wins and the other sees a schema violation.

use crate::graph::{GraphStats, SocialGraph};
use amity_core::{GraphHandle, GraphStore, StoreError, Traversal, UserId, UserVertex, VertexId};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::debug;

/// Committed graph shared by all handles of a pool.
pub type SharedGraph = Arc<RwLock<SocialGraph>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeKey {
    label: String,
    from: VertexId,
    to: VertexId,
}

impl EdgeKey {
    fn new(label: &str, from: VertexId, to: VertexId) -> Self {
        Self {
            label: label.to_string(),
            from,
            to,
        }
    }

    fn duplicate(&self) -> StoreError {
        StoreError::DuplicateEdge {
            label: self.label.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

/// Writes staged by one thread on one handle.
#[derive(Debug, Default)]
struct PendingTx {
    vertices: Vec<UserVertex>,
    added: Vec<EdgeKey>,
    removed: Vec<EdgeKey>,
}

impl PendingTx {
    fn has_vertex(&self, id: VertexId) -> bool {
        self.vertices.iter().any(|v| v.id == id)
    }

    fn has_user(&self, user_id: &UserId) -> bool {
        self.vertices.iter().any(|v| &v.user_id == user_id)
    }

    fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    fn edge_visible(&self, graph: &SocialGraph, key: &EdgeKey) -> bool {
        self.added.contains(key)
            || (graph.has_edge(&key.label, key.from, key.to) && !self.removed.contains(key))
    }

    /// Checks the staged writes against the current committed graph.
    fn validate(&self, graph: &SocialGraph) -> Result<(), StoreError> {
        for vertex in &self.vertices {
            if graph.find_by_user_id(&vertex.user_id).is_some() {
                return Err(StoreError::DuplicateVertex(vertex.user_id.clone()));
            }
        }

        for key in &self.added {
            for id in [key.from, key.to] {
                if !graph.contains(id) && !self.has_vertex(id) {
                    return Err(StoreError::VertexNotFound(id));
                }
            }
            if graph.has_edge(&key.label, key.from, key.to) && !self.removed.contains(key) {
                return Err(key.duplicate());
            }
        }

        Ok(())
    }

    fn apply(self, graph: &mut SocialGraph) -> Result<(), StoreError> {
        for vertex in self.vertices {
            graph.insert_vertex(vertex)?;
        }
        for key in &self.removed {
            graph.remove_edge(&key.label, key.from, key.to);
        }
        for key in &self.added {
            graph.insert_edge(&key.label, key.from, key.to)?;
        }
        Ok(())
    }
}

/// One handle of a [`MemoryGraphStore`] pool.
#[derive(Debug)]
pub struct MemoryHandle {
    slot: usize,
    graph: SharedGraph,
    pending: Mutex<HashMap<ThreadId, PendingTx>>,
}

impl MemoryHandle {
    fn new(slot: usize, graph: SharedGraph) -> Self {
        Self {
            slot,
            graph,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Position of this handle in its pool.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns true if the calling thread has staged writes on this handle.
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .get(&thread::current().id())
            .is_some_and(|tx| !tx.is_empty())
    }
}

impl GraphHandle for MemoryHandle {
    fn add_vertex(&self, label: &str, user_id: &UserId) -> Result<VertexId, StoreError> {
        let mut graph = self.graph.write();
        let mut pending = self.pending.lock();
        let tx = pending.entry(thread::current().id()).or_default();

        if graph.find_by_user_id(user_id).is_some() || tx.has_user(user_id) {
            return Err(StoreError::DuplicateVertex(user_id.clone()));
        }

        let id = graph.reserve_vertex_id();
        tx.vertices.push(UserVertex {
            id,
            label: label.to_string(),
            user_id: user_id.clone(),
        });
        debug!("Staged vertex {} for user '{}' on handle {}", id, user_id, self.slot);
        Ok(id)
    }

    fn add_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<(), StoreError> {
        let graph = self.graph.read();
        let mut pending = self.pending.lock();
        let tx = pending.entry(thread::current().id()).or_default();

        for id in [from, to] {
            if !graph.contains(id) && !tx.has_vertex(id) {
                return Err(StoreError::VertexNotFound(id));
            }
        }

        let key = EdgeKey::new(label, from, to);
        if tx.edge_visible(&graph, &key) {
            return Err(key.duplicate());
        }

        tx.added.push(key);
        Ok(())
    }

    fn remove_edge(&self, label: &str, from: VertexId, to: VertexId) -> Result<bool, StoreError> {
        let graph = self.graph.read();
        let mut pending = self.pending.lock();
        let tx = pending.entry(thread::current().id()).or_default();

        let key = EdgeKey::new(label, from, to);
        if let Some(pos) = tx.added.iter().position(|k| *k == key) {
            tx.added.remove(pos);
            return Ok(true);
        }
        if graph.has_edge(label, from, to) && !tx.removed.contains(&key) {
            tx.removed.push(key);
            return Ok(true);
        }
        Ok(false)
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut graph = self.graph.write();
        let Some(tx) = self.pending.lock().remove(&thread::current().id()) else {
            return Ok(());
        };

        if let Err(e) = tx.validate(&graph) {
            debug!("Commit rejected on handle {}: {}", self.slot, e);
            return Err(e);
        }

        let staged = (tx.vertices.len(), tx.added.len(), tx.removed.len());
        tx.apply(&mut graph)?;
        debug!(
            "Committed on handle {}: {} vertices, {} edges added, {} edges removed",
            self.slot, staged.0, staged.1, staged.2
        );
        Ok(())
    }

    fn rollback(&self) {
        if let Some(tx) = self.pending.lock().remove(&thread::current().id()) {
            if !tx.is_empty() {
                debug!("Rolled back staged writes on handle {}", self.slot);
            }
        }
    }

    fn traversal(&self) -> &dyn Traversal {
        self
    }
}

impl Traversal for MemoryHandle {
    fn vertex(&self, id: VertexId) -> Result<Option<UserVertex>, StoreError> {
        Ok(self.graph.read().get(id).cloned())
    }

    fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<VertexId>, StoreError> {
        Ok(self.graph.read().find_by_user_id(user_id))
    }

    fn neighbors(&self, from: &[VertexId], label: &str) -> Result<Vec<VertexId>, StoreError> {
        let guard = self.graph.read();
        let graph: &SocialGraph = &guard;
        Ok(from
            .iter()
            .flat_map(|v| graph.out_neighbors(*v, label))
            .collect())
    }

    fn project_user_ids(&self, vertices: &[VertexId]) -> Result<Vec<UserId>, StoreError> {
        let graph = self.graph.read();
        Ok(vertices
            .iter()
            .filter_map(|v| graph.get(*v))
            .map(|vertex| vertex.user_id.clone())
            .collect())
    }
}

/// An in-memory graph engine with a fixed pool of handles.
pub struct MemoryGraphStore {
    graph: SharedGraph,
    handles: Vec<Arc<MemoryHandle>>,
}

impl MemoryGraphStore {
    /// Creates an empty store with `pool_size` handles (at least one).
    pub fn new(pool_size: usize) -> Self {
        Self::from_graph(SocialGraph::new(), pool_size)
    }

    /// Wraps an existing graph, e.g. one loaded from a snapshot.
    pub fn from_graph(graph: SocialGraph, pool_size: usize) -> Self {
        let graph = Arc::new(RwLock::new(graph));
        let handles = (0..pool_size.max(1))
            .map(|slot| Arc::new(MemoryHandle::new(slot, graph.clone())))
            .collect();
        Self { graph, handles }
    }

    pub fn pool_size(&self) -> usize {
        self.handles.len()
    }

    /// Returns the concrete handle `key` maps to.
    pub fn handle_for(&self, key: &UserId) -> Arc<MemoryHandle> {
        self.handles[slot_for(key, self.handles.len())].clone()
    }

    /// Runs `f` against the committed graph.
    pub fn read<R>(&self, f: impl FnOnce(&SocialGraph) -> R) -> R {
        f(&self.graph.read())
    }

    /// Removes a committed vertex outside of any transaction.
    pub fn remove_vertex(&self, id: VertexId) -> Option<UserVertex> {
        let removed = self.graph.write().remove_vertex(id);
        if let Some(vertex) = &removed {
            debug!("Removed vertex {} for user '{}'", id, vertex.user_id);
        }
        removed
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.read().stats()
    }
}

impl GraphStore for MemoryGraphStore {
    fn select_handle(&self, key: &UserId) -> Arc<dyn GraphHandle> {
        self.handle_for(key)
    }
}

/// Stable mapping from a key to a pool slot.
fn slot_for(key: &UserId, pool_size: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.as_str().hash(&mut hasher);
    (hasher.finish() % pool_size as u64) as usize
}
