//! Core type definitions for the graph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense internal node index in `[0, node_count)`.
///
/// Ordinals are assigned in insertion order and never renumbered, so every
/// topology and property column can be addressed by position.
pub type NodeOrdinal = usize;

/// Caller-supplied node identifier.
///
/// Not assumed to be dense or contiguous; the [`IdMap`](super::IdMap) is the
/// only place that translates these into ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum OriginalNodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for OriginalNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginalNodeId::Int(id) => write!(f, "{}", id),
            OriginalNodeId::Str(id) => write!(f, "\"{}\"", id),
        }
    }
}

impl From<i64> for OriginalNodeId {
    fn from(id: i64) -> Self {
        OriginalNodeId::Int(id)
    }
}

impl From<i32> for OriginalNodeId {
    fn from(id: i32) -> Self {
        OriginalNodeId::Int(id as i64)
    }
}

impl From<u32> for OriginalNodeId {
    fn from(id: u32) -> Self {
        OriginalNodeId::Int(id as i64)
    }
}

impl From<String> for OriginalNodeId {
    fn from(id: String) -> Self {
        OriginalNodeId::Str(id)
    }
}

impl From<&str> for OriginalNodeId {
    fn from(id: &str) -> Self {
        OriginalNodeId::Str(id.to_string())
    }
}

/// Node label (e.g., "Person", "Employee")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeLabel(String);

impl NodeLabel {
    /// Label assigned to nodes that were added without any label.
    pub const ALL_NODES: &'static str = "__ALL__";

    pub fn new(label: impl Into<String>) -> Self {
        NodeLabel(label.into())
    }

    pub fn all_nodes() -> Self {
        NodeLabel(Self::ALL_NODES.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeLabel {
    fn from(s: String) -> Self {
        NodeLabel(s)
    }
}

impl From<&str> for NodeLabel {
    fn from(s: &str) -> Self {
        NodeLabel(s.to_string())
    }
}

/// Relationship type (e.g., "KNOWS", "WORKS_AT")
///
/// Types partition the edge set: every relationship belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RelationshipType(String);

impl RelationshipType {
    pub fn new(rel_type: impl Into<String>) -> Self {
        RelationshipType(rel_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RelationshipType {
    fn from(s: String) -> Self {
        RelationshipType(s)
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        RelationshipType(s.to_string())
    }
}

/// Whether a relationship type is stored directed or in both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    Directed,
    Undirected,
}
