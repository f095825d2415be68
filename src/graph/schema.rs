//! Declared labels, relationship types and property keys
//!
//! The schema is append-only and non-contradictory: a property key keeps the
//! type and default it was first declared with until it is removed. Every
//! store mutation validates against it before touching any column.

use super::error::{GraphStoreError, GraphStoreResult};
use super::property::{PropertyValue, ValueType};
use super::types::{Direction, NodeLabel, RelationshipType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What a property key is declared on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyOwner {
    NodeLabel(NodeLabel),
    RelationshipType(RelationshipType),
    Graph,
}

impl fmt::Display for PropertyOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyOwner::NodeLabel(label) => write!(f, "label {}", label),
            PropertyOwner::RelationshipType(rel_type) => write!(f, "relationship type {}", rel_type),
            PropertyOwner::Graph => write!(f, "graph"),
        }
    }
}

/// Type and default of one declared property key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub key: String,
    pub value_type: ValueType,
    pub default_value: PropertyValue,
}

impl PropertySchema {
    pub fn new(key: impl Into<String>, value_type: ValueType, default_value: PropertyValue) -> Self {
        PropertySchema {
            key: key.into(),
            value_type,
            default_value,
        }
    }

    /// Same type and bit-identical default
    pub fn matches(&self, value_type: ValueType, default_value: &PropertyValue) -> bool {
        self.value_type == value_type && self.default_value.is_identical(default_value)
    }
}

impl fmt::Display for PropertySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (default {})", self.value_type, self.default_value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipSchemaEntry {
    pub direction: Direction,
    pub properties: IndexMap<String, PropertySchema>,
}

/// Declared labels, relationship types and property keys with their types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSchema {
    node_labels: IndexMap<NodeLabel, IndexMap<String, PropertySchema>>,
    relationship_types: IndexMap<RelationshipType, RelationshipSchemaEntry>,
    graph_properties: IndexMap<String, PropertySchema>,
}

impl GraphSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_label(&mut self, label: NodeLabel) {
        self.node_labels.entry(label).or_default();
    }

    pub fn has_label(&self, label: &NodeLabel) -> bool {
        self.node_labels.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &NodeLabel> {
        self.node_labels.keys()
    }

    pub fn add_relationship_type(&mut self, rel_type: RelationshipType, direction: Direction) {
        self.relationship_types
            .entry(rel_type)
            .or_insert_with(|| RelationshipSchemaEntry {
                direction,
                properties: IndexMap::new(),
            });
    }

    pub fn remove_relationship_type(&mut self, rel_type: &RelationshipType) -> Option<RelationshipSchemaEntry> {
        self.relationship_types.shift_remove(rel_type)
    }

    pub fn has_relationship_type(&self, rel_type: &RelationshipType) -> bool {
        self.relationship_types.contains_key(rel_type)
    }

    pub fn relationship_types(&self) -> impl Iterator<Item = &RelationshipType> {
        self.relationship_types.keys()
    }

    pub fn direction(&self, rel_type: &RelationshipType) -> Option<Direction> {
        self.relationship_types.get(rel_type).map(|e| e.direction)
    }

    /// Mark every relationship type undirected
    pub fn make_undirected(&mut self) {
        for entry in self.relationship_types.values_mut() {
            entry.direction = Direction::Undirected;
        }
    }

    /// Declare `key` on `owner`.
    ///
    /// Returns `true` for a new declaration and `false` when an identical one
    /// already exists. Node property keys share one column across labels, so a
    /// key must have the same type and default on every label it appears on.
    pub fn declare_property(
        &mut self,
        owner: &PropertyOwner,
        key: &str,
        value_type: ValueType,
        default_value: PropertyValue,
    ) -> GraphStoreResult<bool> {
        if default_value.value_type() != value_type {
            return Err(GraphStoreError::TypeMismatch {
                key: key.to_string(),
                expected: value_type,
                actual: default_value.value_type(),
            });
        }

        let conflict = |existing: &PropertySchema| GraphStoreError::SchemaConflict {
            owner: owner.clone(),
            key: key.to_string(),
            existing: existing.to_string(),
            requested: PropertySchema::new(key, value_type, default_value.clone()).to_string(),
        };

        let existing = match owner {
            PropertyOwner::NodeLabel(_) => self.node_property(key),
            PropertyOwner::RelationshipType(rel_type) => self
                .relationship_types
                .get(rel_type)
                .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?
                .properties
                .get(key),
            PropertyOwner::Graph => self.graph_properties.get(key),
        };
        if let Some(existing) = existing {
            if !existing.matches(value_type, &default_value) {
                return Err(conflict(existing));
            }
        }

        let schema = PropertySchema::new(key, value_type, default_value);
        let properties = match owner {
            PropertyOwner::NodeLabel(label) => self.node_labels.entry(label.clone()).or_default(),
            PropertyOwner::RelationshipType(rel_type) => {
                match self.relationship_types.get_mut(rel_type) {
                    Some(entry) => &mut entry.properties,
                    None => return Err(GraphStoreError::UnknownRelationshipType(rel_type.clone())),
                }
            }
            PropertyOwner::Graph => &mut self.graph_properties,
        };
        if properties.contains_key(key) {
            return Ok(false);
        }
        properties.insert(key.to_string(), schema);
        Ok(true)
    }

    /// Whether `key` is declared on `owner` with exactly `value_type`
    pub fn validate(&self, owner: &PropertyOwner, key: &str, value_type: ValueType) -> bool {
        self.property(owner, key)
            .is_some_and(|schema| schema.value_type == value_type)
    }

    pub fn property(&self, owner: &PropertyOwner, key: &str) -> Option<&PropertySchema> {
        match owner {
            PropertyOwner::NodeLabel(label) => self.node_labels.get(label)?.get(key),
            PropertyOwner::RelationshipType(rel_type) => {
                self.relationship_types.get(rel_type)?.properties.get(key)
            }
            PropertyOwner::Graph => self.graph_properties.get(key),
        }
    }

    /// Declaration of a node property key on any label
    pub fn node_property(&self, key: &str) -> Option<&PropertySchema> {
        self.node_labels.values().find_map(|props| props.get(key))
    }

    /// Check that a node with `labels` can read `key`: the key must be
    /// declared for all nodes or on one of the labels.
    pub fn check_node_property(&self, labels: &[&NodeLabel], key: &str) -> GraphStoreResult<()> {
        let all_nodes = NodeLabel::all_nodes();
        let declared_on = |label: &NodeLabel| {
            self.node_labels
                .get(label)
                .is_some_and(|props| props.contains_key(key))
        };
        if declared_on(&all_nodes) || labels.iter().any(|&label| declared_on(label)) {
            return Ok(());
        }
        Err(GraphStoreError::UndeclaredProperty {
            owner: PropertyOwner::NodeLabel(labels.first().map_or(all_nodes, |&l| l.clone())),
            key: key.to_string(),
        })
    }

    pub fn remove_property(&mut self, owner: &PropertyOwner, key: &str) -> Option<PropertySchema> {
        match owner {
            PropertyOwner::NodeLabel(label) => self.node_labels.get_mut(label)?.shift_remove(key),
            PropertyOwner::RelationshipType(rel_type) => self
                .relationship_types
                .get_mut(rel_type)?
                .properties
                .shift_remove(key),
            PropertyOwner::Graph => self.graph_properties.shift_remove(key),
        }
    }

    /// Drop a node property key from every label; returns whether it existed
    pub fn remove_node_property(&mut self, key: &str) -> bool {
        let mut removed = false;
        for props in self.node_labels.values_mut() {
            removed |= props.shift_remove(key).is_some();
        }
        removed
    }

    pub fn node_property_keys_for_label(&self, label: &NodeLabel) -> HashSet<String> {
        self.node_labels
            .get(label)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn node_property_keys(&self) -> HashSet<String> {
        self.node_labels
            .values()
            .flat_map(|props| props.keys().cloned())
            .collect()
    }

    pub fn relationship_property_keys_for_type(&self, rel_type: &RelationshipType) -> HashSet<String> {
        self.relationship_types
            .get(rel_type)
            .map(|entry| entry.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn relationship_property_keys(&self) -> HashSet<String> {
        self.relationship_types
            .values()
            .flat_map(|entry| entry.properties.keys().cloned())
            .collect()
    }

    pub fn graph_property_keys(&self) -> HashSet<String> {
        self.graph_properties.keys().cloned().collect()
    }
}
