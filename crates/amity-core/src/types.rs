//! Identifier and vertex types.
//!
//! Two identifier spaces exist side by side: the external [`UserId`] callers
//! know about, and the opaque [`VertexId`] the graph engine hands out. The
//! identifier index is the only bridge between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label carried by every user vertex.
pub const PERSON_LABEL: &str = "person";

/// Label of the directed friendship edge.
pub const KNOWS_LABEL: &str = "knows";

/// Caller-facing identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier assigned by the graph engine when a vertex is created.
///
/// Immutable for the lifetime of the vertex. Never reused, even when the
/// transaction that reserved it is rolled back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VertexId(u64);

impl VertexId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A user as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVertex {
    pub id: VertexId,
    pub label: String,
    pub user_id: UserId,
}

impl UserVertex {
    /// Creates a `person` vertex.
    pub fn person(id: VertexId, user_id: UserId) -> Self {
        Self {
            id,
            label: PERSON_LABEL.to_string(),
            user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_conversions() {
        let a = UserId::from("alice");
        let b = UserId::from(String::from("alice"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "alice");
        assert_eq!(a.as_ref(), "alice");
    }

    #[test]
    fn test_vertex_id_display() {
        assert_eq!(VertexId::new(42).to_string(), "v42");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new("bob")).unwrap();
        assert_eq!(json, "\"bob\"");
        let json = serde_json::to_string(&VertexId::new(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_person_vertex() {
        let v = UserVertex::person(VertexId::new(1), UserId::new("carol"));
        assert_eq!(v.label, PERSON_LABEL);
        assert_eq!(v.user_id.as_str(), "carol");
    }
}
