//! Selection predicate for building projections
//!
//! Every shape of projection request reduces to one predicate over
//! (node labels or node ids, relationship types, relationship property). A
//! `None` component means "everything".

use super::types::{NodeLabel, OriginalNodeId, RelationshipType};
use std::collections::HashSet;

/// Which part of a store a projection covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GraphSelection {
    /// Every label and every relationship type
    #[default]
    All,
    ByLabel(NodeLabel),
    ByLabelSet(Vec<NodeLabel>),
    ByRelType(RelationshipType),
    ByRelTypeSet(Vec<RelationshipType>),
    /// Relationship types declaring this property, exposing only it
    ByProperty(String),
    /// Subgraph induced by these nodes; unknown ids select nothing
    ByNodeIds(Vec<OriginalNodeId>),
    Combined {
        labels: Option<Vec<NodeLabel>>,
        rel_types: Option<Vec<RelationshipType>>,
        rel_property: Option<String>,
    },
}

impl GraphSelection {
    pub fn labels<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<NodeLabel>,
    {
        GraphSelection::ByLabelSet(labels.into_iter().map(Into::into).collect())
    }

    pub fn rel_types<I, T>(rel_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RelationshipType>,
    {
        GraphSelection::ByRelTypeSet(rel_types.into_iter().map(Into::into).collect())
    }

    pub fn node_ids<I, N>(ids: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<OriginalNodeId>,
    {
        GraphSelection::ByNodeIds(ids.into_iter().map(Into::into).collect())
    }

    /// Nodes selected by id, if the selection is by node id
    pub fn node_id_filter(&self) -> Option<&[OriginalNodeId]> {
        match self {
            GraphSelection::ByNodeIds(ids) => Some(ids),
            _ => None,
        }
    }

    /// Nodes carrying any of these labels; `None` selects all nodes
    pub fn label_filter(&self) -> Option<HashSet<NodeLabel>> {
        match self {
            GraphSelection::ByLabel(label) => Some(HashSet::from([label.clone()])),
            GraphSelection::ByLabelSet(labels) => Some(labels.iter().cloned().collect()),
            GraphSelection::Combined {
                labels: Some(labels),
                ..
            } => Some(labels.iter().cloned().collect()),
            GraphSelection::All
            | GraphSelection::ByRelType(_)
            | GraphSelection::ByRelTypeSet(_)
            | GraphSelection::ByProperty(_)
            | GraphSelection::ByNodeIds(_)
            | GraphSelection::Combined { labels: None, .. } => None,
        }
    }

    /// Relationship types to include; `None` selects all types
    pub fn rel_type_filter(&self) -> Option<HashSet<RelationshipType>> {
        match self {
            GraphSelection::ByRelType(rel_type) => Some(HashSet::from([rel_type.clone()])),
            GraphSelection::ByRelTypeSet(rel_types) => Some(rel_types.iter().cloned().collect()),
            GraphSelection::Combined {
                rel_types: Some(rel_types),
                ..
            } => Some(rel_types.iter().cloned().collect()),
            GraphSelection::All
            | GraphSelection::ByLabel(_)
            | GraphSelection::ByLabelSet(_)
            | GraphSelection::ByProperty(_)
            | GraphSelection::ByNodeIds(_)
            | GraphSelection::Combined { rel_types: None, .. } => None,
        }
    }

    /// Relationship property the projection is restricted to
    pub fn rel_property(&self) -> Option<&str> {
        match self {
            GraphSelection::ByProperty(key) => Some(key),
            GraphSelection::Combined {
                rel_property: Some(key),
                ..
            } => Some(key),
            _ => None,
        }
    }
}

impl From<NodeLabel> for GraphSelection {
    fn from(label: NodeLabel) -> Self {
        GraphSelection::ByLabel(label)
    }
}

impl From<RelationshipType> for GraphSelection {
    fn from(rel_type: RelationshipType) -> Self {
        GraphSelection::ByRelType(rel_type)
    }
}
