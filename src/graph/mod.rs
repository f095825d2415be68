//! Property graph storage core
//!
//! This module implements:
//! - Dense node ordinals with multi-label membership (`id_map`)
//! - Per-type CSR topologies with optional inverse indexes (`topology`, `relationships`)
//! - Typed columnar property stores for nodes, relationships and the graph (`storage`)
//! - Schema validation for every mutation (`schema`)
//! - Copy-on-write store with read-only projections (`store`, `projection`)
//! - Multi-property relationship streaming (`composite`)

pub mod builder;
pub mod composite;
pub mod error;
pub mod id_map;
pub mod projection;
pub mod property;
pub mod relationships;
pub mod schema;
pub mod selection;
pub mod storage;
pub mod store;
pub mod topology;
pub mod types;

// Re-export main types
pub use builder::GraphStoreBuilder;
pub use composite::{CompositeCursor, CompositeRelationshipIterator};
pub use error::{GraphStoreError, GraphStoreResult};
pub use id_map::IdMap;
pub use projection::{Graph, NodeFilter};
pub use property::{PropertyValue, ValueType};
pub use relationships::{RelationshipsBuilder, SingleTypeRelationships};
pub use schema::{GraphSchema, PropertyOwner, PropertySchema};
pub use selection::GraphSelection;
pub use storage::{ArrayLayout, PropertyStore, PropertyValues};
pub use store::{DeletionResult, GraphStore};
pub use topology::{InverseIndex, Topology, TopologyOptions};
pub use types::{Direction, NodeLabel, NodeOrdinal, OriginalNodeId, RelationshipType};
