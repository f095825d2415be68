//! Errors returned by graph store operations
//!
//! Every failure is reported synchronously at the offending call. A failed
//! mutation leaves the store exactly as it was.

use super::property::ValueType;
use super::schema::PropertyOwner;
use super::types::{NodeOrdinal, OriginalNodeId, RelationshipType};
use thiserror::Error;

/// Errors that can occur during graph store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphStoreError {
    #[error("Node {0} not found")]
    NodeNotFound(OriginalNodeId),

    #[error("Relationship type {0} not found")]
    UnknownRelationshipType(RelationshipType),

    #[error("Relationship type {0} already exists")]
    DuplicateRelationshipType(RelationshipType),

    #[error("Property '{key}' is not declared for {owner}")]
    UndeclaredProperty { owner: PropertyOwner, key: String },

    #[error("Property '{key}' on {owner} is declared as {existing}, cannot redeclare as {requested}")]
    SchemaConflict {
        owner: PropertyOwner,
        key: String,
        existing: String,
        requested: String,
    },

    #[error("Type mismatch for property '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("Ordinal {ordinal} out of bounds for {node_count} nodes")]
    OrdinalOutOfBounds {
        ordinal: NodeOrdinal,
        node_count: usize,
    },

    #[error("Column '{key}' has {actual} values but its domain has {expected}")]
    ColumnLengthMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Node selection is empty")]
    EmptyNodeSelection,

    #[error("Node {0} appears more than once in the selection")]
    DuplicateNodeId(OriginalNodeId),

    #[error("Edge list has {sources} sources but {targets} targets")]
    EdgeListLengthMismatch { sources: usize, targets: usize },

    #[error("Relationship type {0} has no inverse index")]
    MissingInverseIndex(RelationshipType),

    #[error("Inverse index for {rel_type} holds {inverse} relationships, forward topology holds {forward}")]
    InverseIndexMismatch {
        rel_type: RelationshipType,
        forward: usize,
        inverse: usize,
    },
}

pub type GraphStoreResult<T> = Result<T, GraphStoreError>;
