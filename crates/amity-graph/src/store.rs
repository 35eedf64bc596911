use crate::graph::SocialGraph;
use crate::index::SledIndex;
use sled::Db;
use std::path::Path;
use thiserror::Error;

const GRAPH_TREE: &str = "graph";
const GRAPH_KEY: &str = "social_graph";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Sled database holding the graph snapshot and the identifier index.
pub struct SnapshotStore {
    db: Db,
}

impl SnapshotStore {
    /// Opens or creates a snapshot store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Opens the identifier index living in the same database.
    pub fn index(&self) -> Result<SledIndex, PersistError> {
        Ok(SledIndex::open(&self.db)?)
    }

    /// Saves the committed graph.
    ///
    /// The graph is serialized using bincode and stored under a fixed key.
    pub fn save_graph(&self, graph: &SocialGraph) -> Result<(), PersistError> {
        let bytes = bincode::serialize(graph)?;
        self.db.open_tree(GRAPH_TREE)?.insert(GRAPH_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the graph from the store.
    pub fn load_graph(&self) -> Result<Option<SocialGraph>, PersistError> {
        if let Some(bytes) = self.db.open_tree(GRAPH_TREE)?.get(GRAPH_KEY)? {
            let graph: SocialGraph = bincode::deserialize(&bytes)?;
            Ok(Some(graph))
        } else {
            Ok(None)
        }
    }

    /// Clears the stored graph. The index is left untouched.
    pub fn clear(&self) -> Result<(), PersistError> {
        self.db.open_tree(GRAPH_TREE)?.remove(GRAPH_KEY)?;
        self.db.flush()?;
        Ok(())
    }

    /// Flushes every tree to disk.
    pub fn flush(&self) -> Result<(), PersistError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amity_core::{IdentifierIndex, UserId, UserVertex, KNOWS_LABEL};
    use tempfile::tempdir;

    #[test]
    fn test_save_load_graph() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let mut graph = SocialGraph::new();
        let a = graph.reserve_vertex_id();
        let b = graph.reserve_vertex_id();
        graph
            .insert_vertex(UserVertex::person(a, UserId::new("a")))
            .unwrap();
        graph
            .insert_vertex(UserVertex::person(b, UserId::new("b")))
            .unwrap();
        graph.insert_edge(KNOWS_LABEL, a, b).unwrap();

        store.save_graph(&graph).unwrap();

        let mut loaded = store.load_graph().unwrap().unwrap();
        assert_eq!(loaded.vertex_count(), 2);
        assert!(loaded.has_edge(KNOWS_LABEL, a, b));
        assert_eq!(loaded.find_by_user_id(&UserId::new("b")), Some(b));

        // The id counter survives, so new vertices never collide.
        let c = loaded.reserve_vertex_id();
        assert!(c > b);
    }

    #[test]
    fn test_load_empty_store() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        assert!(store.load_graph().unwrap().is_none());
    }

    #[test]
    fn test_clear_keeps_index() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save_graph(&SocialGraph::new()).unwrap();

        let index = store.index().unwrap();
        index
            .create(&UserId::new("a"), amity_core::VertexId::new(1))
            .unwrap();

        store.clear().unwrap();
        assert!(store.load_graph().unwrap().is_none());
        assert_eq!(index.len(), 1);
    }
}
