//! Core graph data structure.
//!
//! `SocialGraph` wraps a petgraph `StableDiGraph` and adds the indexes the
//! engine needs: vertex id to node index, and the unique `userId` index
//! that enforces one vertex per user. It holds committed state only;
//! transactions are staged in [`crate::pool`].

use crate::edge::{Edge, GraphEdge};
use amity_core::{StoreError, UserId, UserVertex, VertexId};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Committed vertices and edges.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SocialGraph {
    /// The underlying petgraph graph. Stable so removals keep indices valid.
    graph: StableDiGraph<UserVertex, Edge>,

    /// Maps vertex ids to graph node indexes.
    vertex_index: HashMap<VertexId, NodeIndex>,

    /// Unique index on the `userId` attribute.
    user_index: HashMap<UserId, VertexId>,

    /// Next vertex id to hand out. Ids are never reused.
    next_vertex_id: u64,
}

impl SocialGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh vertex id.
    pub fn reserve_vertex_id(&mut self) -> VertexId {
        self.next_vertex_id += 1;
        VertexId::new(self.next_vertex_id)
    }

    /// Inserts a vertex whose id was previously reserved.
    pub fn insert_vertex(&mut self, vertex: UserVertex) -> Result<(), StoreError> {
        if self.user_index.contains_key(&vertex.user_id) {
            return Err(StoreError::DuplicateVertex(vertex.user_id));
        }

        let id = vertex.id;
        let user_id = vertex.user_id.clone();
        let index = self.graph.add_node(vertex);

        self.vertex_index.insert(id, index);
        self.user_index.insert(user_id, id);
        Ok(())
    }

    /// Removes a vertex and every edge touching it.
    ///
    /// The relation logic never deletes vertices; this exists for
    /// maintenance and to reproduce lost-vertex states.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<UserVertex> {
        let index = self.vertex_index.remove(&id)?;
        let vertex = self.graph.remove_node(index)?;
        self.user_index.remove(&vertex.user_id);
        Some(vertex)
    }

    /// Gets a vertex by id.
    pub fn get(&self, id: VertexId) -> Option<&UserVertex> {
        let index = self.vertex_index.get(&id)?;
        self.graph.node_weight(*index)
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertex_index.contains_key(&id)
    }

    /// Finds a vertex by its `userId` attribute.
    pub fn find_by_user_id(&self, user_id: &UserId) -> Option<VertexId> {
        self.user_index.get(user_id).copied()
    }

    /// Returns true if `from -[label]-> to` exists.
    pub fn has_edge(&self, label: &str, from: VertexId, to: VertexId) -> bool {
        self.find_edge(label, from, to).is_some()
    }

    /// Adds a directed edge. At most one edge per ordered pair and label.
    pub fn insert_edge(
        &mut self,
        label: &str,
        from: VertexId,
        to: VertexId,
    ) -> Result<(), StoreError> {
        let source = *self
            .vertex_index
            .get(&from)
            .ok_or(StoreError::VertexNotFound(from))?;
        let target = *self
            .vertex_index
            .get(&to)
            .ok_or(StoreError::VertexNotFound(to))?;

        if self.has_edge(label, from, to) {
            return Err(StoreError::DuplicateEdge {
                label: label.to_string(),
                from,
                to,
            });
        }

        self.graph.add_edge(source, target, Edge::new(label));
        Ok(())
    }

    /// Removes `from -[label]-> to`. Returns false if it did not exist.
    pub fn remove_edge(&mut self, label: &str, from: VertexId, to: VertexId) -> bool {
        match self.find_edge(label, from, to) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Iterates over the targets of outgoing `label` edges.
    pub fn out_neighbors<'a>(
        &'a self,
        from: VertexId,
        label: &'a str,
    ) -> impl Iterator<Item = VertexId> + 'a {
        self.vertex_index
            .get(&from)
            .into_iter()
            .flat_map(move |index| self.graph.edges_directed(*index, Direction::Outgoing))
            .filter(move |edge| edge.weight().label == label)
            .filter_map(move |edge| self.graph.node_weight(edge.target()))
            .map(|vertex| vertex.id)
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = &UserVertex> {
        self.graph
            .node_indices()
            .filter_map(move |index| self.graph.node_weight(index))
    }

    /// Returns all edges with source and target user ids for export.
    pub fn export_edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .filter_map(|edge_ref| {
                let source = self.graph.node_weight(edge_ref.source())?;
                let target = self.graph.node_weight(edge_ref.target())?;
                Some(GraphEdge {
                    source: source.user_id.clone(),
                    target: target.user_id.clone(),
                    label: edge_ref.weight().label.clone(),
                })
            })
            .collect()
    }

    fn find_edge(&self, label: &str, from: VertexId, to: VertexId) -> Option<EdgeIndex> {
        let source = *self.vertex_index.get(&from)?;
        let target = *self.vertex_index.get(&to)?;
        self.graph
            .edges_directed(source, Direction::Outgoing)
            .find(|edge| edge.target() == target && edge.weight().label == label)
            .map(|edge| edge.id())
    }
}

/// Graph statistics for the status command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
}

impl SocialGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
        }
    }
}
