//! Identifier index implementations.
//!
//! [`SledIndex`] keeps `userId -> vertexId` entries in a sled tree, encoded
//! with bincode. [`MemoryIndex`] is the same mapping in a hash map, for
//! embedding and tests.

use amity_core::{IdentifierIndex, IndexError, UserId, VertexId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Name of the sled tree holding the index.
pub const INDEX_TREE: &str = "user_vertex_index";

/// One stored mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub user_id: UserId,
    pub vertex_id: VertexId,
}

/// Identifier index backed by a sled tree.
#[derive(Clone)]
pub struct SledIndex {
    tree: sled::Tree,
}

impl SledIndex {
    /// Opens (or creates) the index tree inside `db`.
    pub fn open(db: &sled::Db) -> Result<Self, sled::Error> {
        Ok(Self {
            tree: db.open_tree(INDEX_TREE)?,
        })
    }

    /// Deletes the entry for `user_id`. Returns true if one existed.
    pub fn remove(&self, user_id: &UserId) -> Result<bool, IndexError> {
        let removed = self
            .tree
            .remove(user_id.as_str().as_bytes())
            .map_err(|e| IndexError::Write {
                user_id: user_id.clone(),
                reason: e.to_string(),
            })?;
        Ok(removed.is_some())
    }

    /// Reads every stored entry, in key order.
    pub fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        self.tree
            .iter()
            .values()
            .map(|value| {
                let bytes = value.map_err(|e| IndexError::Read(e.to_string()))?;
                bincode::deserialize(&bytes).map_err(|e| IndexError::Codec(e.to_string()))
            })
            .collect()
    }

    /// Removes every entry.
    pub fn clear(&self) -> Result<(), sled::Error> {
        self.tree.clear()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<(), sled::Error> {
        self.tree.flush()?;
        Ok(())
    }
}

impl IdentifierIndex for SledIndex {
    fn create(&self, user_id: &UserId, vertex_id: VertexId) -> Result<(), IndexError> {
        let entry = IndexEntry {
            user_id: user_id.clone(),
            vertex_id,
        };
        let bytes = bincode::serialize(&entry).map_err(|e| IndexError::Codec(e.to_string()))?;
        self.tree
            .insert(user_id.as_str().as_bytes(), bytes)
            .map_err(|e| IndexError::Write {
                user_id: user_id.clone(),
                reason: e.to_string(),
            })?;
        debug!("Indexed user '{}' -> {}", user_id, vertex_id);
        Ok(())
    }

    fn vertex_id(&self, user_id: &UserId) -> Result<Option<VertexId>, IndexError> {
        let Some(bytes) = self
            .tree
            .get(user_id.as_str().as_bytes())
            .map_err(|e| IndexError::Read(e.to_string()))?
        else {
            return Ok(None);
        };
        let entry: IndexEntry =
            bincode::deserialize(&bytes).map_err(|e| IndexError::Codec(e.to_string()))?;
        Ok(Some(entry.vertex_id))
    }
}

/// Identifier index held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<UserId, VertexId>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletes the entry for `user_id`. Returns true if one existed.
    pub fn remove(&self, user_id: &UserId) -> bool {
        self.entries.write().remove(user_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl IdentifierIndex for MemoryIndex {
    fn create(&self, user_id: &UserId, vertex_id: VertexId) -> Result<(), IndexError> {
        self.entries.write().insert(user_id.clone(), vertex_id);
        Ok(())
    }

    fn vertex_id(&self, user_id: &UserId) -> Result<Option<VertexId>, IndexError> {
        Ok(self.entries.read().get(user_id).copied())
    }
}
