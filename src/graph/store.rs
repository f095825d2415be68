//! Graph store: id map, schema, property stores and per-type relationships
//!
//! All state lives behind one `Arc<StoreState>`. A mutation clones the state
//! (its fields are shared handles, so this copies pointers, not data),
//! changes the parts it touches through `Arc::make_mut`, and installs the
//! result with one pointer swap. A failed mutation drops its copy, so the
//! store never shows a half-applied change. Readers clone the current `Arc`
//! and only wait for the swap itself, never for a writer's work.
//!
//! Single-node and single-cell writes skip the state copy and mutate the
//! current state under the write lock. Projections still hold their own
//! `Arc`s, so `Arc::make_mut` copies only the id map page or the column a
//! projection shares. Mutations are serialized by a writer mutex; bulk loads
//! should go through [`GraphStore::add_nodes`] or
//! [`GraphStoreBuilder`](super::GraphStoreBuilder).

use super::composite::CompositeRelationshipIterator;
use super::error::{GraphStoreError, GraphStoreResult};
use super::id_map::IdMap;
use super::projection::{Graph, NodeFilter};
use super::property::PropertyValue;
use super::relationships::{RelationshipsBuilder, SingleTypeRelationships};
use super::schema::{GraphSchema, PropertyOwner};
use super::selection::GraphSelection;
use super::storage::{PropertyStore, PropertyValues};
use super::topology::{InverseIndex, TopologyOptions};
use super::types::{Direction, NodeLabel, NodeOrdinal, OriginalNodeId, RelationshipType};
use crate::config::StoreConfig;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of [`GraphStore::delete_relationships`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionResult {
    pub rel_type: RelationshipType,
    pub relationships_deleted: usize,
    /// Relationship property keys dropped with the type
    pub deleted_property_keys: Vec<String>,
    pub had_inverse_index: bool,
    /// Estimated bytes held by the detached topology, inverse index and
    /// columns. Freed once no projection references them.
    pub memory_reclaimed: usize,
}

/// One consistent version of everything a store holds
#[derive(Debug, Clone)]
pub(crate) struct StoreState {
    id_map: Arc<IdMap>,
    schema: Arc<GraphSchema>,
    node_properties: PropertyStore,
    relationships: IndexMap<RelationshipType, Arc<SingleTypeRelationships>>,
    graph_properties: PropertyStore,
    modification_time: DateTime<Utc>,
}

impl StoreState {
    pub(crate) fn new() -> Self {
        StoreState {
            id_map: Arc::new(IdMap::new()),
            schema: Arc::new(GraphSchema::new()),
            node_properties: PropertyStore::new(),
            relationships: IndexMap::new(),
            graph_properties: PropertyStore::new(),
            modification_time: Utc::now(),
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    pub(crate) fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    pub(crate) fn relationship_type_count(&self) -> usize {
        self.relationships.len()
    }

    pub(crate) fn add_node(&mut self, id: OriginalNodeId, labels: Vec<NodeLabel>) -> NodeOrdinal {
        let ordinal = Arc::make_mut(&mut self.id_map).add_node(id, labels);
        let missing: Vec<NodeLabel> = self
            .id_map
            .node_labels(ordinal)
            .into_iter()
            .filter(|label| !self.schema.has_label(label))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let schema = Arc::make_mut(&mut self.schema);
            for label in missing {
                schema.add_label(label);
            }
        }
        ordinal
    }

    pub(crate) fn add_label(&mut self, label: NodeLabel) {
        if !self.schema.has_label(&label) {
            Arc::make_mut(&mut self.schema).add_label(label.clone());
        }
        if !self.id_map.has_label_registered(&label) {
            Arc::make_mut(&mut self.id_map).add_label(label);
        }
    }

    pub(crate) fn install_relationships(&mut self, rels: SingleTypeRelationships) -> GraphStoreResult<()> {
        let rel_type = rels.rel_type().clone();
        if self.relationships.contains_key(&rel_type) {
            return Err(GraphStoreError::DuplicateRelationshipType(rel_type));
        }
        rels.validate(self.node_count())?;

        let schema = Arc::make_mut(&mut self.schema);
        schema.add_relationship_type(rel_type.clone(), rels.direction());
        let owner = PropertyOwner::RelationshipType(rel_type.clone());
        for property in rels.property_schemas() {
            schema.declare_property(&owner, &property.key, property.value_type, property.default_value)?;
        }
        self.relationships.insert(rel_type, Arc::new(rels));
        Ok(())
    }

    pub(crate) fn attach_inverse(
        &mut self,
        rel_type: &RelationshipType,
        inverse: Option<InverseIndex>,
    ) -> GraphStoreResult<()> {
        let node_count = self.node_count();
        let rels = self
            .relationships
            .get_mut(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        let inverse = inverse.unwrap_or_else(|| InverseIndex::from_forward(rels.topology()));
        let mut updated = SingleTypeRelationships::clone(rels);
        updated.set_inverse(Some(Arc::new(inverse)));
        updated.validate(node_count)?;
        *rels = Arc::new(updated);
        Ok(())
    }

    pub(crate) fn remove_relationships(
        &mut self,
        rel_type: &RelationshipType,
    ) -> GraphStoreResult<DeletionResult> {
        let rels = self
            .relationships
            .shift_remove(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        Arc::make_mut(&mut self.schema).remove_relationship_type(rel_type);
        Ok(DeletionResult {
            rel_type: rel_type.clone(),
            relationships_deleted: rels.relationship_count(),
            deleted_property_keys: rels.properties().key_list().map(str::to_string).collect(),
            had_inverse_index: rels.inverse().is_some(),
            memory_reclaimed: rels.memory_usage(),
        })
    }

    pub(crate) fn put_graph_property(&mut self, key: &str, values: PropertyValues) -> GraphStoreResult<()> {
        Arc::make_mut(&mut self.schema).declare_property(
            &PropertyOwner::Graph,
            key,
            values.value_type(),
            values.default_value().clone(),
        )?;
        self.graph_properties.insert(key, Arc::new(values));
        Ok(())
    }

    fn drop_graph_property(&mut self, key: &str) -> GraphStoreResult<()> {
        if self.graph_properties.remove(key).is_none() {
            return Err(GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::Graph,
                key: key.to_string(),
            });
        }
        Arc::make_mut(&mut self.schema).remove_property(&PropertyOwner::Graph, key);
        Ok(())
    }

    /// Declare `key` on `labels` (or on every node when empty) and install
    /// its column, indexed by node ordinal.
    pub(crate) fn put_node_property(
        &mut self,
        labels: Vec<NodeLabel>,
        key: &str,
        values: PropertyValues,
    ) -> GraphStoreResult<()> {
        let node_count = self.node_count();
        if values.len() > node_count {
            return Err(GraphStoreError::ColumnLengthMismatch {
                key: key.to_string(),
                expected: node_count,
                actual: values.len(),
            });
        }
        let column = self.merge_node_column(&labels, key, values)?;
        let labels = if labels.is_empty() {
            vec![NodeLabel::all_nodes()]
        } else {
            labels
        };

        let schema = Arc::make_mut(&mut self.schema);
        for label in &labels {
            schema.declare_property(
                &PropertyOwner::NodeLabel(label.clone()),
                key,
                column.value_type(),
                column.default_value().clone(),
            )?;
        }
        for label in labels {
            if !self.id_map.has_label_registered(&label) {
                Arc::make_mut(&mut self.id_map).add_label(label);
            }
        }
        self.node_properties.insert(key, Arc::new(column));
        Ok(())
    }

    /// Column for `key` after writing `values` to the nodes carrying one of
    /// `labels` (every node when empty).
    ///
    /// Nodes outside `labels` keep what an existing column of the same type
    /// and default holds for them. An incompatible existing column is left
    /// for schema validation to reject.
    fn merge_node_column(
        &self,
        labels: &[NodeLabel],
        key: &str,
        values: PropertyValues,
    ) -> GraphStoreResult<PropertyValues> {
        let applies = |ordinal: NodeOrdinal| {
            labels.is_empty() || labels.iter().any(|label| self.id_map.has_label(ordinal, label))
        };
        let existing = self.node_properties.get(key).filter(|existing| {
            existing.value_type() == values.value_type()
                && existing.default_value().is_identical(values.default_value())
        });
        let mut merged = match existing {
            Some(existing) => (**existing).clone(),
            None if (0..values.len()).all(applies) => return Ok(values),
            None => values.empty_like(),
        };
        let span = values.len().max(merged.len()).min(self.node_count());
        for ordinal in (0..span).filter(|&o| applies(o)) {
            merged
                .set(ordinal, values.get(ordinal))
                .map_err(|e| e.for_key(key))?;
        }
        Ok(merged)
    }

    fn drop_node_property(&mut self, key: &str) -> GraphStoreResult<()> {
        if self.node_properties.remove(key).is_none() {
            return Err(GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::NodeLabel(NodeLabel::all_nodes()),
                key: key.to_string(),
            });
        }
        Arc::make_mut(&mut self.schema).remove_node_property(key);
        Ok(())
    }

    /// Column of `key` if it is declared for one of the node's labels
    fn node_column(&self, ordinal: NodeOrdinal, key: &str) -> GraphStoreResult<&Arc<PropertyValues>> {
        self.schema
            .check_node_property(&self.id_map.node_labels(ordinal), key)?;
        self.node_properties
            .get(key)
            .ok_or_else(|| GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::NodeLabel(NodeLabel::all_nodes()),
                key: key.to_string(),
            })
    }

    fn write_node_value(
        &mut self,
        id: &OriginalNodeId,
        key: &str,
        value: PropertyValue,
    ) -> GraphStoreResult<()> {
        let ordinal = self.id_map.to_ordinal(id)?;
        let expected = self.node_column(ordinal, key)?.value_type();
        if expected != value.value_type() {
            return Err(GraphStoreError::TypeMismatch {
                key: key.to_string(),
                expected,
                actual: value.value_type(),
            });
        }
        if let Some(column) = self.node_properties.get_mut(key) {
            column.set(ordinal, value).map_err(|e| e.for_key(key))?;
        }
        Ok(())
    }

    fn put_relationship_property(
        &mut self,
        rel_type: &RelationshipType,
        key: &str,
        values: PropertyValues,
    ) -> GraphStoreResult<()> {
        let count = self
            .relationships
            .get(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?
            .relationship_count();
        if values.len() > count {
            return Err(GraphStoreError::ColumnLengthMismatch {
                key: key.to_string(),
                expected: count,
                actual: values.len(),
            });
        }
        Arc::make_mut(&mut self.schema).declare_property(
            &PropertyOwner::RelationshipType(rel_type.clone()),
            key,
            values.value_type(),
            values.default_value().clone(),
        )?;
        if let Some(rels) = self.relationships.get_mut(rel_type) {
            Arc::make_mut(rels).properties_mut().insert(key, Arc::new(values));
        }
        Ok(())
    }

    fn drop_relationship_property(&mut self, rel_type: &RelationshipType, key: &str) -> GraphStoreResult<()> {
        let rels = self
            .relationships
            .get_mut(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        if !rels.properties().contains_key(key) {
            return Err(GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::RelationshipType(rel_type.clone()),
                key: key.to_string(),
            });
        }
        Arc::make_mut(rels).properties_mut().remove(key);
        Arc::make_mut(&mut self.schema)
            .remove_property(&PropertyOwner::RelationshipType(rel_type.clone()), key);
        Ok(())
    }

    fn relationships(&self, rel_type: &RelationshipType) -> GraphStoreResult<&Arc<SingleTypeRelationships>> {
        self.relationships
            .get(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))
    }

    fn memory_usage(&self) -> usize {
        self.id_map.memory_usage()
            + self.node_properties.memory_usage()
            + self.graph_properties.memory_usage()
            + self
                .relationships
                .values()
                .map(|rels| rels.memory_usage())
                .sum::<usize>()
    }
}

/// In-memory property graph store.
///
/// Single writer, many readers: every method takes `&self`, mutations are
/// serialized internally, and projections taken before a mutation keep
/// seeing the state they were built from.
#[derive(Debug)]
pub struct GraphStore {
    config: StoreConfig,
    creation_time: DateTime<Utc>,
    state: RwLock<Arc<StoreState>>,
    writer: Mutex<()>,
}

impl GraphStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::from_state(config, StoreState::new())
    }

    pub(crate) fn from_state(config: StoreConfig, state: StoreState) -> Self {
        let creation_time = Utc::now();
        GraphStore {
            config,
            creation_time,
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn snapshot(&self) -> Arc<StoreState> {
        Arc::clone(&self.state.read())
    }

    fn update<T>(&self, op: impl FnOnce(&mut StoreState) -> T) -> T {
        let _writer = self.writer.lock();
        let mut next = StoreState::clone(&self.snapshot());
        let out = op(&mut next);
        next.modification_time = Utc::now();
        *self.state.write() = Arc::new(next);
        out
    }

    fn try_update<T>(&self, op: impl FnOnce(&mut StoreState) -> GraphStoreResult<T>) -> GraphStoreResult<T> {
        let _writer = self.writer.lock();
        let mut next = StoreState::clone(&self.snapshot());
        let out = op(&mut next)?;
        next.modification_time = Utc::now();
        *self.state.write() = Arc::new(next);
        Ok(out)
    }

    /// Run a short infallible op on the current state in place
    fn update_in_place<T>(&self, op: impl FnOnce(&mut StoreState) -> T) -> T {
        let _writer = self.writer.lock();
        let mut current = self.state.write();
        let state = Arc::make_mut(&mut *current);
        let out = op(state);
        state.modification_time = Utc::now();
        out
    }

    /// Run a short op on the current state in place. `op` must check
    /// everything that can fail before it writes.
    fn try_update_in_place<T>(
        &self,
        op: impl FnOnce(&mut StoreState) -> GraphStoreResult<T>,
    ) -> GraphStoreResult<T> {
        let _writer = self.writer.lock();
        let mut current = self.state.write();
        let state = Arc::make_mut(&mut *current);
        let out = op(state)?;
        state.modification_time = Utc::now();
        Ok(out)
    }

    // ---- nodes ----

    /// Add a node or union `labels` into an existing node's labels.
    ///
    /// Returns the node's ordinal. A node without labels carries
    /// [`NodeLabel::all_nodes`].
    pub fn add_node<I, L>(&self, id: impl Into<OriginalNodeId>, labels: I) -> NodeOrdinal
    where
        I: IntoIterator<Item = L>,
        L: Into<NodeLabel>,
    {
        let id = id.into();
        let labels: Vec<NodeLabel> = labels.into_iter().map(Into::into).collect();
        self.update_in_place(|state| state.add_node(id, labels))
    }

    /// Add many nodes in one mutation
    pub fn add_nodes<I>(&self, nodes: I) -> Vec<NodeOrdinal>
    where
        I: IntoIterator<Item = (OriginalNodeId, Vec<NodeLabel>)>,
    {
        let ordinals: Vec<NodeOrdinal> = self.update(|state| {
            nodes
                .into_iter()
                .map(|(id, labels)| state.add_node(id, labels))
                .collect()
        });
        debug!("Added batch of {} nodes", ordinals.len());
        ordinals
    }

    /// Register a label in the schema without assigning it to any node
    pub fn add_node_label(&self, label: impl Into<NodeLabel>) {
        let label = label.into();
        debug!("Adding node label {}", label);
        self.update(|state| state.add_label(label));
    }

    pub fn node_count(&self) -> usize {
        self.snapshot().node_count()
    }

    pub fn contains_node(&self, id: &OriginalNodeId) -> bool {
        self.snapshot().id_map.contains(id)
    }

    pub fn to_ordinal(&self, id: &OriginalNodeId) -> GraphStoreResult<NodeOrdinal> {
        self.snapshot().id_map.to_ordinal(id)
    }

    pub fn to_original(&self, ordinal: NodeOrdinal) -> GraphStoreResult<OriginalNodeId> {
        self.snapshot().id_map.to_original(ordinal).cloned()
    }

    pub fn node_labels(&self, ordinal: NodeOrdinal) -> GraphStoreResult<Vec<NodeLabel>> {
        let state = self.snapshot();
        state.id_map.to_original(ordinal)?;
        Ok(state.id_map.node_labels(ordinal).into_iter().cloned().collect())
    }

    pub fn has_label(&self, ordinal: NodeOrdinal, label: &NodeLabel) -> bool {
        self.snapshot().id_map.has_label(ordinal, label)
    }

    /// Every label known to the store, including labels without nodes
    pub fn labels(&self) -> HashSet<NodeLabel> {
        self.snapshot().id_map.label_set()
    }

    pub fn nodes_with_label(&self, label: &NodeLabel) -> Vec<NodeOrdinal> {
        self.snapshot().id_map.nodes_with_label(label).collect()
    }

    pub fn node_count_for_label(&self, label: &NodeLabel) -> usize {
        self.snapshot().id_map.node_count_for_label(label)
    }

    // ---- relationships ----

    /// Builder sized for the current node count, using the configured
    /// dedup and sort options.
    pub fn relationships_builder(&self, rel_type: impl Into<RelationshipType>) -> RelationshipsBuilder {
        RelationshipsBuilder::new(rel_type, self.node_count())
            .with_capacity(self.config.batch_size)
            .options(TopologyOptions {
                deduplicate: self.config.deduplicate_relationships,
                sort_targets: self.config.sort_adjacency,
            })
    }

    /// Install a new relationship type with its topology and properties.
    ///
    /// Fails with `DuplicateRelationshipType` if the type exists; the
    /// existing installation is left untouched.
    pub fn add_relationship_type(&self, relationships: SingleTypeRelationships) -> GraphStoreResult<()> {
        let rel_type = relationships.rel_type().clone();
        let count = relationships.relationship_count();
        self.try_update(|state| state.install_relationships(relationships))?;
        info!("Installed relationship type {} with {} relationships", rel_type, count);
        Ok(())
    }

    /// Attach or replace the inverse index of `rel_type`.
    ///
    /// With `None` the index is derived from the forward topology.
    pub fn add_inverse_index(
        &self,
        rel_type: &RelationshipType,
        inverse: Option<InverseIndex>,
    ) -> GraphStoreResult<()> {
        self.try_update(|state| state.attach_inverse(rel_type, inverse))?;
        info!("Attached inverse index to {}", rel_type);
        Ok(())
    }

    /// Remove a relationship type with its properties and inverse index.
    ///
    /// Projections taken earlier keep their view of the type.
    pub fn delete_relationships(&self, rel_type: &RelationshipType) -> GraphStoreResult<DeletionResult> {
        let result = self.try_update(|state| state.remove_relationships(rel_type))?;
        info!(
            "Deleted relationship type {}: {} relationships, ~{} bytes",
            rel_type, result.relationships_deleted, result.memory_reclaimed
        );
        Ok(result)
    }

    pub fn relationship_types(&self) -> Vec<RelationshipType> {
        self.snapshot().relationships.keys().cloned().collect()
    }

    pub fn has_relationship_type(&self, rel_type: &RelationshipType) -> bool {
        self.snapshot().relationships.contains_key(rel_type)
    }

    pub fn inverse_indexed_relationship_types(&self) -> HashSet<RelationshipType> {
        self.snapshot()
            .relationships
            .iter()
            .filter(|(_, rels)| rels.inverse().is_some())
            .map(|(rel_type, _)| rel_type.clone())
            .collect()
    }

    pub fn direction(&self, rel_type: &RelationshipType) -> Option<Direction> {
        self.snapshot().relationships.get(rel_type).map(|r| r.direction())
    }

    /// Relationships over all types
    pub fn relationship_count(&self) -> usize {
        self.snapshot()
            .relationships
            .values()
            .map(|rels| rels.relationship_count())
            .sum()
    }

    /// Relationships of one type; 0 for unknown types
    pub fn relationship_count_for_type(&self, rel_type: &RelationshipType) -> usize {
        self.snapshot()
            .relationships
            .get(rel_type)
            .map_or(0, |rels| rels.relationship_count())
    }

    pub fn has_parallel_relationships(&self, rel_type: &RelationshipType) -> bool {
        self.snapshot()
            .relationships
            .get(rel_type)
            .is_some_and(|rels| rels.topology().has_parallel_edges())
    }

    // ---- properties ----

    pub fn add_graph_property(&self, key: &str, values: PropertyValues) -> GraphStoreResult<()> {
        self.try_update(|state| state.put_graph_property(key, values))?;
        info!("Added graph property '{}'", key);
        Ok(())
    }

    pub fn remove_graph_property(&self, key: &str) -> GraphStoreResult<()> {
        self.try_update(|state| state.drop_graph_property(key))?;
        info!("Removed graph property '{}'", key);
        Ok(())
    }

    pub fn graph_property(&self, key: &str) -> GraphStoreResult<Arc<PropertyValues>> {
        self.snapshot()
            .graph_properties
            .get(key)
            .cloned()
            .ok_or_else(|| GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::Graph,
                key: key.to_string(),
            })
    }

    pub fn graph_property_keys(&self) -> HashSet<String> {
        self.snapshot().graph_properties.keys()
    }

    /// Declare `key` for `labels` and install its column.
    ///
    /// The column is indexed by node ordinal; ordinals past its end read
    /// the declared default. An empty label set declares the key for every
    /// node.
    pub fn add_node_property<I, L>(&self, labels: I, key: &str, values: PropertyValues) -> GraphStoreResult<()>
    where
        I: IntoIterator<Item = L>,
        L: Into<NodeLabel>,
    {
        let labels: Vec<NodeLabel> = labels.into_iter().map(Into::into).collect();
        self.try_update(|state| state.put_node_property(labels, key, values))?;
        info!("Added node property '{}'", key);
        Ok(())
    }

    /// Drop the column and its declaration on every label
    pub fn remove_node_property(&self, key: &str) -> GraphStoreResult<()> {
        self.try_update(|state| state.drop_node_property(key))?;
        info!("Removed node property '{}'", key);
        Ok(())
    }

    pub fn node_property(&self, key: &str) -> GraphStoreResult<Arc<PropertyValues>> {
        self.snapshot()
            .node_properties
            .get(key)
            .cloned()
            .ok_or_else(|| GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::NodeLabel(NodeLabel::all_nodes()),
                key: key.to_string(),
            })
    }

    /// Value of `key` on one node; the key must be declared for one of its labels
    pub fn node_property_value(&self, id: &OriginalNodeId, key: &str) -> GraphStoreResult<PropertyValue> {
        let state = self.snapshot();
        let ordinal = state.id_map.to_ordinal(id)?;
        Ok(state.node_column(ordinal, key)?.get(ordinal))
    }

    /// Overwrite one cell of a node property column
    pub fn set_node_property_value(
        &self,
        id: &OriginalNodeId,
        key: &str,
        value: PropertyValue,
    ) -> GraphStoreResult<()> {
        self.try_update_in_place(|state| state.write_node_value(id, key, value))
    }

    pub fn node_property_keys(&self) -> HashSet<String> {
        self.snapshot().node_properties.keys()
    }

    pub fn node_property_keys_for_label(&self, label: &NodeLabel) -> HashSet<String> {
        self.snapshot().schema.node_property_keys_for_label(label)
    }

    /// Declare `key` on `rel_type` and install its column, indexed by edge id
    pub fn add_relationship_property(
        &self,
        rel_type: &RelationshipType,
        key: &str,
        values: PropertyValues,
    ) -> GraphStoreResult<()> {
        self.try_update(|state| state.put_relationship_property(rel_type, key, values))?;
        info!("Added relationship property '{}' to {}", key, rel_type);
        Ok(())
    }

    pub fn remove_relationship_property(&self, rel_type: &RelationshipType, key: &str) -> GraphStoreResult<()> {
        self.try_update(|state| state.drop_relationship_property(rel_type, key))?;
        info!("Removed relationship property '{}' from {}", key, rel_type);
        Ok(())
    }

    pub fn relationship_property_keys(&self) -> HashSet<String> {
        self.snapshot().schema.relationship_property_keys()
    }

    pub fn relationship_property_keys_for_type(&self, rel_type: &RelationshipType) -> HashSet<String> {
        self.snapshot().schema.relationship_property_keys_for_type(rel_type)
    }

    // ---- metadata ----

    /// Schema as of now; later mutations do not show up in the returned value
    pub fn schema(&self) -> Arc<GraphSchema> {
        Arc::clone(&self.snapshot().schema)
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn modification_time(&self) -> DateTime<Utc> {
        self.snapshot().modification_time
    }

    /// Estimated heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        self.snapshot().memory_usage()
    }

    // ---- projections ----

    /// Read-only projection of the current state.
    ///
    /// Unknown labels, types or node ids simply select nothing. With a relationship
    /// property, only types declaring it are included and only that
    /// property is visible.
    pub fn get_graph(&self, selection: impl Into<GraphSelection>) -> Graph {
        let selection = selection.into();
        let state = self.snapshot();

        let label_filter = selection.label_filter();
        let node_properties = match &label_filter {
            None => state.node_properties.clone(),
            Some(labels) => {
                let mut keys = state
                    .schema
                    .node_property_keys_for_label(&NodeLabel::all_nodes());
                for label in labels {
                    keys.extend(state.schema.node_property_keys_for_label(label));
                }
                state.node_properties.filtered(keys.iter().map(String::as_str))
            }
        };
        let node_filter = match selection.node_id_filter() {
            Some(ids) => Some(NodeFilter::from_ordinals(
                state.node_count(),
                ids.iter().filter_map(|id| state.id_map.to_ordinal(id).ok()),
            )),
            None => label_filter.map(|labels| NodeFilter::from_labels(&state.id_map, &labels)),
        };

        let rel_type_filter = selection.rel_type_filter();
        let rel_property = selection.rel_property();
        let relationships = state
            .relationships
            .iter()
            .filter(|(rel_type, _)| rel_type_filter.as_ref().map_or(true, |f| f.contains(*rel_type)))
            .filter(|(_, rels)| rel_property.map_or(true, |key| rels.properties().contains_key(key)))
            .map(|(rel_type, rels)| (rel_type.clone(), Arc::clone(rels)))
            .collect();

        Graph::new(
            self.config.clone(),
            Arc::clone(&state.id_map),
            Arc::clone(&state.schema),
            node_filter,
            node_properties,
            relationships,
            rel_property.map(str::to_string),
        )
    }

    /// Projection induced by `ids`: the listed nodes with their labels and
    /// properties, plus every relationship between two of them. Nodes keep
    /// store order. An empty list, a repeated id or an unknown id is an error.
    pub fn get_induced_subgraph(&self, ids: &[OriginalNodeId]) -> GraphStoreResult<Graph> {
        if ids.is_empty() {
            return Err(GraphStoreError::EmptyNodeSelection);
        }
        let state = self.snapshot();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            state.id_map.to_ordinal(id)?;
            if !seen.insert(id) {
                return Err(GraphStoreError::DuplicateNodeId(id.clone()));
            }
        }
        debug!("Inducing subgraph over {} nodes", ids.len());
        Ok(self.get_graph(GraphSelection::ByNodeIds(ids.to_vec())))
    }

    /// Projection over every label and relationship type
    pub fn get_union(&self) -> Graph {
        self.get_graph(GraphSelection::All)
    }

    /// Stream `(source, target, values)` of `rel_type` for `property_keys`
    pub fn get_composite_relationship_iterator(
        &self,
        rel_type: &RelationshipType,
        property_keys: &[&str],
    ) -> GraphStoreResult<CompositeRelationshipIterator> {
        let state = self.snapshot();
        let iter = CompositeRelationshipIterator::new(state.relationships(rel_type)?, property_keys)?;
        debug!(
            "Composite iterator over {} with {} properties",
            rel_type,
            property_keys.len()
        );
        Ok(iter)
    }

    /// New store whose topologies hold every relationship in both
    /// directions, sorted and deduplicated. Relationship properties and
    /// inverse indexes are not carried over.
    pub fn to_undirected(&self) -> GraphStoreResult<GraphStore> {
        let state = self.snapshot();
        let entries: Vec<(&RelationshipType, &Arc<SingleTypeRelationships>)> =
            state.relationships.iter().collect();
        type Converted = (RelationshipType, Arc<SingleTypeRelationships>);
        let convert = |(rel_type, rels): &(&RelationshipType, &Arc<SingleTypeRelationships>)|
         -> GraphStoreResult<Converted> {
            let topology = rels.topology().to_undirected()?;
            let undirected = SingleTypeRelationships::new((*rel_type).clone(), topology)
                .with_direction(Direction::Undirected);
            Ok(((*rel_type).clone(), Arc::new(undirected)))
        };
        let converted: Vec<Converted> = if self.config.effective_write_concurrency() > 1 {
            entries.par_iter().map(convert).collect::<GraphStoreResult<_>>()?
        } else {
            entries.iter().map(convert).collect::<GraphStoreResult<_>>()?
        };

        let mut schema = GraphSchema::clone(&state.schema);
        for (rel_type, rels) in &state.relationships {
            let owner = PropertyOwner::RelationshipType(rel_type.clone());
            for key in rels.properties().key_list() {
                schema.remove_property(&owner, key);
            }
        }
        schema.make_undirected();

        info!("Converted {} relationship types to undirected", converted.len());
        let next = StoreState {
            id_map: Arc::clone(&state.id_map),
            schema: Arc::new(schema),
            node_properties: state.node_properties.clone(),
            relationships: converted.into_iter().collect(),
            graph_properties: state.graph_properties.clone(),
            modification_time: Utc::now(),
        };
        Ok(GraphStore::from_state(self.config.clone(), next))
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::ValueType;
    use std::ops::ControlFlow;

    fn store_with_people() -> GraphStore {
        let store = GraphStore::new(StoreConfig::sequential());
        store.add_node(1, ["Person"]);
        store.add_node(2, ["Person"]);
        store.add_node(3, ["Company"]);
        store
    }

    fn knows(store: &GraphStore) -> SingleTypeRelationships {
        let mut builder = store.relationships_builder("KNOWS");
        builder
            .declare_property("since", ValueType::Long, PropertyValue::Long(0))
            .unwrap();
        builder
            .add_with_properties(0, 1, &[("since", 2015i64.into())])
            .unwrap();
        builder.add(1, 0).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_add_node_is_idempotent_and_unions_labels() {
        let store = store_with_people();
        let ordinal = store.add_node(1, ["Employee"]);
        assert_eq!(ordinal, 0);
        assert_eq!(store.node_count(), 3);
        let labels = store.node_labels(0).unwrap();
        assert!(labels.contains(&NodeLabel::new("Person")));
        assert!(labels.contains(&NodeLabel::new("Employee")));
        assert!(store.schema().has_label(&NodeLabel::new("Employee")));
    }

    #[test]
    fn test_unlabeled_node_gets_all_nodes_label() {
        let store = GraphStore::default();
        store.add_node("x", Vec::<NodeLabel>::new());
        assert!(store.has_label(0, &NodeLabel::all_nodes()));
    }

    #[test]
    fn test_add_node_label_registers_empty_label() {
        let store = store_with_people();
        store.add_node_label("Robot");
        assert!(store.labels().contains(&NodeLabel::new("Robot")));
        assert!(store.nodes_with_label(&NodeLabel::new("Robot")).is_empty());
        assert!(!store.has_label(0, &NodeLabel::new("Robot")));
    }

    #[test]
    fn test_relationship_type_installs_schema() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let rel_type = RelationshipType::new("KNOWS");
        assert_eq!(store.relationship_count_for_type(&rel_type), 2);
        assert!(store.schema().validate(
            &PropertyOwner::RelationshipType(rel_type.clone()),
            "since",
            ValueType::Long
        ));
        assert_eq!(
            store.relationship_property_keys_for_type(&rel_type),
            HashSet::from(["since".to_string()])
        );
    }

    #[test]
    fn test_failed_mutation_leaves_state_untouched() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let before = store.modification_time();

        let out_of_range = SingleTypeRelationships::new(
            "BAD",
            crate::graph::topology::Topology::from_edges(10, &[0], &[9], TopologyOptions::default())
                .unwrap()
                .topology,
        );
        assert!(matches!(
            store.add_relationship_type(out_of_range),
            Err(GraphStoreError::OrdinalOutOfBounds { ordinal: 9, .. })
        ));
        assert!(!store.has_relationship_type(&RelationshipType::new("BAD")));
        assert_eq!(store.modification_time(), before);
    }

    #[test]
    fn test_inverse_index_from_forward() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let rel_type = RelationshipType::new("KNOWS");
        store.add_inverse_index(&rel_type, None).unwrap();
        assert!(store.inverse_indexed_relationship_types().contains(&rel_type));

        let err = store
            .add_inverse_index(&RelationshipType::new("NOPE"), None)
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::UnknownRelationshipType(_)));
    }

    #[test]
    fn test_inverse_index_count_must_match() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let wrong = InverseIndex::from_topology(
            crate::graph::topology::Topology::from_edges(3, &[0], &[1], TopologyOptions::default())
                .unwrap()
                .topology,
            None,
        );
        let err = store
            .add_inverse_index(&RelationshipType::new("KNOWS"), Some(wrong))
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::InverseIndexMismatch { forward: 2, inverse: 1, .. }));
        assert!(store.inverse_indexed_relationship_types().is_empty());
    }

    #[test]
    fn test_delete_relationships_reports_and_removes() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let rel_type = RelationshipType::new("KNOWS");

        let result = store.delete_relationships(&rel_type).unwrap();
        assert_eq!(result.relationships_deleted, 2);
        assert_eq!(result.deleted_property_keys, vec!["since".to_string()]);
        assert!(result.memory_reclaimed > 0);
        assert_eq!(store.relationship_count_for_type(&rel_type), 0);
        assert!(!store.schema().has_relationship_type(&rel_type));

        assert!(matches!(
            store.delete_relationships(&rel_type),
            Err(GraphStoreError::UnknownRelationshipType(_))
        ));
    }

    #[test]
    fn test_node_property_declare_then_write() {
        let store = store_with_people();
        store
            .add_node_property(["Person"], "age", PropertyValues::from_longs(vec![30], -1))
            .unwrap();

        assert_eq!(
            store.node_property_value(&1.into(), "age").unwrap(),
            PropertyValue::Long(30)
        );
        assert_eq!(
            store.node_property_value(&2.into(), "age").unwrap(),
            PropertyValue::Long(-1)
        );
        assert!(matches!(
            store.node_property_value(&3.into(), "age"),
            Err(GraphStoreError::UndeclaredProperty { .. })
        ));

        store
            .set_node_property_value(&2.into(), "age", PropertyValue::Long(41))
            .unwrap();
        assert_eq!(
            store.node_property_value(&2.into(), "age").unwrap(),
            PropertyValue::Long(41)
        );
        assert!(matches!(
            store.set_node_property_value(&2.into(), "age", PropertyValue::Double(4.0)),
            Err(GraphStoreError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.set_node_property_value(&99.into(), "age", PropertyValue::Long(4)),
            Err(GraphStoreError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_node_property_conflicts_and_removal() {
        let store = store_with_people();
        store
            .add_node_property(["Person"], "score", PropertyValues::from_doubles(vec![], 0.0))
            .unwrap();
        let err = store
            .add_node_property(["Company"], "score", PropertyValues::from_longs(vec![], 0))
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::SchemaConflict { .. }));

        let err = store
            .add_node_property(["Person"], "big", PropertyValues::from_longs(vec![0; 5], 0))
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::ColumnLengthMismatch { expected: 3, actual: 5, .. }));

        store.remove_node_property("score").unwrap();
        assert!(store.node_property_keys().is_empty());
        assert!(store.node_property_keys_for_label(&NodeLabel::new("Person")).is_empty());
        assert!(store.remove_node_property("score").is_err());
    }

    #[test]
    fn test_graph_properties() {
        let store = GraphStore::default();
        store
            .add_graph_property("density", PropertyValues::from_doubles(vec![0.25], 0.0))
            .unwrap();
        assert_eq!(store.graph_property("density").unwrap().double_value(0), Some(0.25));
        assert_eq!(store.graph_property_keys(), HashSet::from(["density".to_string()]));

        store.remove_graph_property("density").unwrap();
        assert!(store.graph_property("density").is_err());
        assert!(store.schema().graph_property_keys().is_empty());
    }

    #[test]
    fn test_relationship_property_add_remove() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let rel_type = RelationshipType::new("KNOWS");

        store
            .add_relationship_property(&rel_type, "weight", PropertyValues::from_doubles(vec![0.5, 2.0], 1.0))
            .unwrap();
        let graph = store.get_union();
        assert_eq!(
            graph.relationship_property(&rel_type, "weight").unwrap().double_value(1),
            Some(2.0)
        );

        let err = store
            .add_relationship_property(&rel_type, "long", PropertyValues::from_doubles(vec![0.0; 3], 1.0))
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::ColumnLengthMismatch { .. }));

        store.remove_relationship_property(&rel_type, "weight").unwrap();
        assert!(!store.relationship_property_keys_for_type(&rel_type).contains("weight"));
        assert!(matches!(
            store.remove_relationship_property(&rel_type, "weight"),
            Err(GraphStoreError::UndeclaredProperty { .. })
        ));
        // the earlier projection still sees the column
        assert!(graph.has_relationship_property(&rel_type, "weight"));
    }

    #[test]
    fn test_get_graph_by_property() {
        let store = store_with_people();
        store.add_relationship_type(knows(&store)).unwrap();
        let mut builder = store.relationships_builder("WORKS_AT");
        builder.add(0, 2).unwrap();
        store.add_relationship_type(builder.build().unwrap()).unwrap();

        let graph = store.get_graph(GraphSelection::ByProperty("since".to_string()));
        let types: Vec<_> = graph.relationship_types().cloned().collect();
        assert_eq!(types, vec![RelationshipType::new("KNOWS")]);
        assert_eq!(graph.relationship_count(None), 2);
    }

    #[test]
    fn test_to_undirected() {
        let store = store_with_people();
        let mut builder = store.relationships_builder("LINK");
        builder.add(0, 1).unwrap();
        builder.add(0, 1).unwrap();
        builder.add(2, 2).unwrap();
        store.add_relationship_type(builder.build().unwrap()).unwrap();
        let rel_type = RelationshipType::new("LINK");
        assert!(store.has_parallel_relationships(&rel_type));

        let undirected = store.to_undirected().unwrap();
        assert_eq!(undirected.direction(&rel_type), Some(Direction::Undirected));
        assert_eq!(undirected.relationship_count_for_type(&rel_type), 3);
        assert!(!undirected.has_parallel_relationships(&rel_type));

        let graph = undirected.get_union();
        let mut targets = Vec::new();
        assert!(graph
            .for_each_relationship(1, &rel_type, |_, t| {
                targets.push(t);
                ControlFlow::Continue(())
            })
            .is_continue());
        assert_eq!(targets, vec![0]);
        // the source store is unchanged
        assert_eq!(store.direction(&rel_type), Some(Direction::Directed));
    }

    #[test]
    fn test_timestamps() {
        let store = GraphStore::default();
        let created = store.creation_time();
        store.add_node(1, ["A"]);
        assert!(store.modification_time() >= created);
    }
}
