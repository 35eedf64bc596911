//! Edge types for the social graph.
//!
//! Friendship edges carry no payload beyond their label. The label is kept
//! as a string so the engine stays agnostic of the relation vocabulary.

use amity_core::UserId;
use serde::{Deserialize, Serialize};

/// An edge as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub label: String,
}

impl Edge {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// An edge resolved to user identifiers, for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: UserId,
    pub target: UserId,
    pub label: String,
}
