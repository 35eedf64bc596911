//! Amity Core - shared vocabulary for the friend graph
//!
//! This crate holds everything the other Amity crates agree on:
//! identifiers, the error taxonomy, the contracts a graph engine and an
//! identifier index must satisfy, and the runtime configuration.
//!
//! It carries no storage of its own. Concrete engines live in
//! `amity-graph`; the relation logic that drives them lives in
//! `amity-relations`.
//!
//! # Example
//!
//! ```
//! use amity_core::{UserId, VertexId};
//!
//! let user = UserId::new("u-1001");
//! assert_eq!(user.as_str(), "u-1001");
//! assert_eq!(VertexId::new(7).get(), 7);
//! ```

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError, IndexFailurePolicy, CONFIG_FILE};
pub use error::{IndexError, StoreError};
pub use store::{GraphHandle, GraphStore, IdentifierIndex, Traversal};
pub use types::{UserId, UserVertex, VertexId, KNOWS_LABEL, PERSON_LABEL};
