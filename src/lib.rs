//! Samyama Graph Store
//!
//! An in-memory property graph storage core: a node set with multiple labels,
//! independently typed relationship topologies, and columnar property stores
//! for nodes, relationships and the graph itself. Read-optimized projections
//! share the stored data instead of copying it.
//!
//! # Architecture
//!
//! - Nodes are addressed by dense ordinals `0..node_count`, mapped to and
//!   from caller-supplied ids by the [`IdMap`](graph::IdMap)
//! - Each relationship type is a CSR [`Topology`](graph::Topology) whose edge
//!   ids index that type's property columns
//! - Every mutation is validated against the [`GraphSchema`](graph::GraphSchema)
//!   and installed by a copy-on-write swap, so it is all-or-nothing
//! - A [`Graph`](graph::Graph) projection keeps the state it was built from
//!   until dropped
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_graph_store::graph::{GraphStore, PropertyValue, RelationshipType, ValueType};
//! use samyama_graph_store::StoreConfig;
//!
//! let store = GraphStore::new(StoreConfig::default());
//! let alice = store.add_node(1, ["Person"]);
//! let bob = store.add_node(2, ["Person"]);
//!
//! let mut knows = store.relationships_builder("KNOWS");
//! knows.declare_property("since", ValueType::Long, PropertyValue::Long(0)).unwrap();
//! knows.add(alice, bob).unwrap();
//! store.add_relationship_type(knows.build().unwrap()).unwrap();
//!
//! let iter = store
//!     .get_composite_relationship_iterator(&RelationshipType::new("KNOWS"), &["since"])
//!     .unwrap();
//! let tuples: Vec<_> = iter.iter().collect();
//! assert_eq!(tuples, vec![(alice, bob, vec![0.0])]);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;

// Re-export main types for convenience
pub use config::StoreConfig;
pub use graph::{
    CompositeRelationshipIterator, DeletionResult, Graph, GraphSelection, GraphStore,
    GraphStoreBuilder, GraphStoreError, GraphStoreResult, NodeLabel, NodeOrdinal,
    OriginalNodeId, PropertyValue, PropertyValues, RelationshipType, ValueType,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
