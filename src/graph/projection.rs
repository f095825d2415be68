//! Read-only projections over a graph store
//!
//! A [`Graph`] shares the store's id map, topologies and property columns
//! through `Arc`s; building one never copies adjacency or property data. The
//! store installs new state by swapping whole `Arc`s, so a projection keeps
//! observing the state it was built from until it is dropped.

use super::error::{GraphStoreError, GraphStoreResult};
use super::id_map::IdMap;
use super::property::{PropertyValue, ValueType};
use super::relationships::SingleTypeRelationships;
use super::schema::{GraphSchema, PropertyOwner};
use super::storage::{PropertyStore, PropertyValues};
use super::types::{NodeLabel, NodeOrdinal, OriginalNodeId, RelationshipType};
use crate::config::StoreConfig;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const NOT_MAPPED: usize = usize::MAX;

/// Dense renumbering of the nodes selected by a label or node id filter
#[derive(Debug)]
pub struct NodeFilter {
    /// mapped ordinal -> root ordinal (ascending)
    mapped_to_root: Vec<NodeOrdinal>,
    /// root ordinal -> mapped ordinal, `NOT_MAPPED` when filtered out
    root_to_mapped: Vec<usize>,
}

impl NodeFilter {
    /// Nodes carrying any of `labels`, in root ordinal order
    pub fn from_labels(id_map: &IdMap, labels: &HashSet<NodeLabel>) -> Self {
        Self::from_ordinals(id_map.node_count(), id_map.nodes_with_any_label(labels))
    }

    /// The given root ordinals, renumbered in root order. Repeats and
    /// ordinals past `root_count` are ignored.
    pub fn from_ordinals(root_count: usize, roots: impl IntoIterator<Item = NodeOrdinal>) -> Self {
        let mut root_to_mapped = vec![NOT_MAPPED; root_count];
        for root in roots {
            if let Some(slot) = root_to_mapped.get_mut(root) {
                *slot = 0;
            }
        }
        let mut mapped_to_root = Vec::new();
        for (root, slot) in root_to_mapped.iter_mut().enumerate() {
            if *slot != NOT_MAPPED {
                *slot = mapped_to_root.len();
                mapped_to_root.push(root);
            }
        }
        NodeFilter {
            mapped_to_root,
            root_to_mapped,
        }
    }

    pub fn node_count(&self) -> usize {
        self.mapped_to_root.len()
    }

    #[inline]
    pub fn to_root(&self, mapped: NodeOrdinal) -> Option<NodeOrdinal> {
        self.mapped_to_root.get(mapped).copied()
    }

    #[inline]
    pub fn to_mapped(&self, root: NodeOrdinal) -> Option<NodeOrdinal> {
        match self.root_to_mapped.get(root) {
            Some(&mapped) if mapped != NOT_MAPPED => Some(mapped),
            _ => None,
        }
    }
}

/// Immutable, filtered view over a graph store.
///
/// Ordinals passed to and returned from a projection are "mapped" ordinals in
/// `0..node_count()`. Without a label filter they equal the store's ordinals.
#[derive(Debug)]
pub struct Graph {
    config: StoreConfig,
    id_map: Arc<IdMap>,
    schema: Arc<GraphSchema>,
    node_filter: Option<NodeFilter>,
    node_count: usize,
    node_properties: PropertyStore,
    relationships: IndexMap<RelationshipType, Arc<SingleTypeRelationships>>,
    rel_property: Option<String>,
    filtered_counts: OnceLock<Vec<usize>>,
}

impl Graph {
    pub(crate) fn new(
        config: StoreConfig,
        id_map: Arc<IdMap>,
        schema: Arc<GraphSchema>,
        node_filter: Option<NodeFilter>,
        node_properties: PropertyStore,
        relationships: IndexMap<RelationshipType, Arc<SingleTypeRelationships>>,
        rel_property: Option<String>,
    ) -> Self {
        let node_count = node_filter
            .as_ref()
            .map_or(id_map.node_count(), NodeFilter::node_count);
        debug!(
            "Built projection: {} nodes, {} relationship types",
            node_count,
            relationships.len()
        );
        Graph {
            config,
            id_map,
            schema,
            node_filter,
            node_count,
            node_properties,
            relationships,
            rel_property,
            filtered_counts: OnceLock::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    #[inline]
    pub fn to_root_ordinal(&self, mapped: NodeOrdinal) -> Option<NodeOrdinal> {
        match &self.node_filter {
            Some(filter) => filter.to_root(mapped),
            None => (mapped < self.node_count).then_some(mapped),
        }
    }

    #[inline]
    pub fn to_mapped_ordinal(&self, root: NodeOrdinal) -> Option<NodeOrdinal> {
        match &self.node_filter {
            Some(filter) => filter.to_mapped(root),
            None => (root < self.node_count).then_some(root),
        }
    }

    fn root(&self, mapped: NodeOrdinal) -> GraphStoreResult<NodeOrdinal> {
        self.to_root_ordinal(mapped)
            .ok_or(GraphStoreError::OrdinalOutOfBounds {
                ordinal: mapped,
                node_count: self.node_count,
            })
    }

    pub fn to_original_id(&self, mapped: NodeOrdinal) -> GraphStoreResult<&OriginalNodeId> {
        self.id_map.to_original(self.root(mapped)?)
    }

    /// Mapped ordinal of an original id; ids outside the projection are not found.
    pub fn to_mapped_by_original(&self, id: &OriginalNodeId) -> GraphStoreResult<NodeOrdinal> {
        let root = self.id_map.to_ordinal(id)?;
        self.to_mapped_ordinal(root)
            .ok_or_else(|| GraphStoreError::NodeNotFound(id.clone()))
    }

    pub fn node_labels(&self, mapped: NodeOrdinal) -> GraphStoreResult<Vec<&NodeLabel>> {
        Ok(self.id_map.node_labels(self.root(mapped)?))
    }

    pub fn relationship_types(&self) -> impl Iterator<Item = &RelationshipType> {
        self.relationships.keys()
    }

    pub fn has_relationship_type(&self, rel_type: &RelationshipType) -> bool {
        self.relationships.contains_key(rel_type)
    }

    pub fn is_inverse_indexed(&self, rel_type: &RelationshipType) -> bool {
        self.relationships
            .get(rel_type)
            .is_some_and(|rels| rels.inverse().is_some())
    }

    /// Relationship count of one type, or of all projected types for `None`.
    ///
    /// Only relationships whose endpoints are both projected are counted.
    pub fn relationship_count(&self, rel_type: Option<&RelationshipType>) -> usize {
        match rel_type {
            Some(rel_type) => match self.relationships.get_index_of(rel_type) {
                Some(index) => self.count_at(index),
                None => 0,
            },
            None => (0..self.relationships.len()).map(|i| self.count_at(i)).sum(),
        }
    }

    fn count_at(&self, index: usize) -> usize {
        match &self.node_filter {
            None => self.relationships[index].relationship_count(),
            Some(_) => self.filtered_counts.get_or_init(|| self.count_filtered())[index],
        }
    }

    fn count_filtered(&self) -> Vec<usize> {
        let parallel = self.config.effective_read_concurrency() > 1;
        let min_len = self.config.batch_size.max(1);
        self.relationships
            .keys()
            .map(|rel_type| {
                if parallel {
                    (0..self.node_count)
                        .into_par_iter()
                        .with_min_len(min_len)
                        .map(|mapped| self.degree(mapped, Some(rel_type)))
                        .sum::<usize>()
                } else {
                    (0..self.node_count)
                        .map(|mapped| self.degree(mapped, Some(rel_type)))
                        .sum::<usize>()
                }
            })
            .collect()
    }

    /// Out-degree within the projection; `None` sums over projected types.
    pub fn degree(&self, mapped: NodeOrdinal, rel_type: Option<&RelationshipType>) -> usize {
        let Some(root) = self.to_root_ordinal(mapped) else {
            return 0;
        };
        let degree_of = |rels: &SingleTypeRelationships| match &self.node_filter {
            None => rels.topology().degree(root),
            Some(filter) => rels
                .topology()
                .targets(root)
                .iter()
                .filter(|&&t| filter.to_mapped(t).is_some())
                .count(),
        };
        match rel_type {
            Some(rel_type) => self.relationships.get(rel_type).map_or(0, |r| degree_of(&**r)),
            None => self.relationships.values().map(|r| degree_of(&**r)).sum(),
        }
    }

    /// In-degree of one type; requires an inverse index.
    pub fn degree_inverse(
        &self,
        mapped: NodeOrdinal,
        rel_type: &RelationshipType,
    ) -> GraphStoreResult<usize> {
        let rels = self
            .relationships
            .get(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        let inverse = rels
            .inverse()
            .ok_or_else(|| GraphStoreError::MissingInverseIndex(rel_type.clone()))?;
        let Some(root) = self.to_root_ordinal(mapped) else {
            return Ok(0);
        };
        let sources = inverse.sources(root);
        Ok(match &self.node_filter {
            None => sources.len(),
            Some(filter) => sources.iter().filter(|&&s| filter.to_mapped(s).is_some()).count(),
        })
    }

    /// Visit `(source, target)` of each outgoing relationship of `rel_type`.
    ///
    /// Stops as soon as the visitor breaks. Types outside the projection
    /// have no relationships.
    pub fn for_each_relationship<F>(
        &self,
        mapped: NodeOrdinal,
        rel_type: &RelationshipType,
        mut visitor: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(NodeOrdinal, NodeOrdinal) -> ControlFlow<()>,
    {
        let (Some(root), Some(rels)) = (self.to_root_ordinal(mapped), self.relationships.get(rel_type))
        else {
            return ControlFlow::Continue(());
        };
        for &target in rels.topology().targets(root) {
            if let Some(mapped_target) = self.to_mapped_ordinal(target) {
                visitor(mapped, mapped_target)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// Visit outgoing relationships of every projected type
    pub fn for_each_relationship_all<F>(&self, mapped: NodeOrdinal, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(&RelationshipType, NodeOrdinal, NodeOrdinal) -> ControlFlow<()>,
    {
        for rel_type in self.relationships.keys() {
            self.for_each_relationship(mapped, rel_type, |s, t| visitor(rel_type, s, t))?;
        }
        ControlFlow::Continue(())
    }

    /// Visit `(source, target, value)` with one relationship property read as `f64`
    pub fn for_each_relationship_with_property<F>(
        &self,
        mapped: NodeOrdinal,
        rel_type: &RelationshipType,
        key: &str,
        mut visitor: F,
    ) -> GraphStoreResult<ControlFlow<()>>
    where
        F: FnMut(NodeOrdinal, NodeOrdinal, f64) -> ControlFlow<()>,
    {
        let values = self.relationship_property(rel_type, key)?;
        if !values.value_type().is_numeric_scalar() {
            return Err(GraphStoreError::TypeMismatch {
                key: key.to_string(),
                expected: ValueType::Double,
                actual: values.value_type(),
            });
        }
        let Some(root) = self.to_root_ordinal(mapped) else {
            return Ok(ControlFlow::Continue(()));
        };
        let rels = &self.relationships[rel_type];
        let topology = rels.topology();
        for edge_id in topology.edge_range(root) {
            if let Some(mapped_target) = self.to_mapped_ordinal(topology.target_at(edge_id)) {
                let value = values.f64_value(edge_id).unwrap_or(f64::NAN);
                if visitor(mapped, mapped_target, value).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Visit `(target, source)` of each incoming relationship of `rel_type`.
    pub fn for_each_inverse_relationship<F>(
        &self,
        mapped: NodeOrdinal,
        rel_type: &RelationshipType,
        mut visitor: F,
    ) -> GraphStoreResult<ControlFlow<()>>
    where
        F: FnMut(NodeOrdinal, NodeOrdinal) -> ControlFlow<()>,
    {
        let rels = self
            .relationships
            .get(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        let inverse = rels
            .inverse()
            .ok_or_else(|| GraphStoreError::MissingInverseIndex(rel_type.clone()))?;
        let Some(root) = self.to_root_ordinal(mapped) else {
            return Ok(ControlFlow::Continue(()));
        };
        for &source in inverse.sources(root) {
            if let Some(mapped_source) = self.to_mapped_ordinal(source) {
                if visitor(mapped, mapped_source).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Lazy `(source, target)` sequence; call again to restart.
    pub fn stream_relationships<'a>(
        &'a self,
        mapped: NodeOrdinal,
        rel_type: &RelationshipType,
    ) -> impl Iterator<Item = (NodeOrdinal, NodeOrdinal)> + 'a {
        let targets: &'a [NodeOrdinal] = match (
            self.to_root_ordinal(mapped),
            self.relationships.get(rel_type),
        ) {
            (Some(root), Some(rels)) => rels.topology().targets(root),
            _ => &[],
        };
        targets
            .iter()
            .filter_map(move |&t| self.to_mapped_ordinal(t).map(|mt| (mapped, mt)))
    }

    /// Relationship property keys visible for a projected type
    pub fn relationship_property_keys(&self, rel_type: &RelationshipType) -> HashSet<String> {
        let Some(rels) = self.relationships.get(rel_type) else {
            return HashSet::new();
        };
        rels.properties()
            .key_list()
            .filter(|k| self.rel_property.as_deref().map_or(true, |p| p == *k))
            .map(str::to_string)
            .collect()
    }

    pub fn has_relationship_property(&self, rel_type: &RelationshipType, key: &str) -> bool {
        self.relationship_property(rel_type, key).is_ok()
    }

    /// Read-only column of a relationship property, indexed by edge id
    pub fn relationship_property(
        &self,
        rel_type: &RelationshipType,
        key: &str,
    ) -> GraphStoreResult<&PropertyValues> {
        let rels = self
            .relationships
            .get(rel_type)
            .ok_or_else(|| GraphStoreError::UnknownRelationshipType(rel_type.clone()))?;
        let selected = self.rel_property.as_deref().map_or(true, |p| p == key);
        match rels.properties().get(key) {
            Some(values) if selected => Ok(&**values),
            _ => Err(GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::RelationshipType(rel_type.clone()),
                key: key.to_string(),
            }),
        }
    }

    pub fn node_property_keys(&self) -> HashSet<String> {
        self.node_properties.keys()
    }

    /// Read-only node property column, indexed by **root** ordinal
    pub fn node_property(&self, key: &str) -> GraphStoreResult<&PropertyValues> {
        self.node_properties
            .get(key)
            .map(|values| &**values)
            .ok_or_else(|| GraphStoreError::UndeclaredProperty {
                owner: PropertyOwner::NodeLabel(NodeLabel::all_nodes()),
                key: key.to_string(),
            })
    }

    /// Node property value of a mapped ordinal; the key must be declared for
    /// one of the node's labels.
    pub fn node_property_value(&self, mapped: NodeOrdinal, key: &str) -> GraphStoreResult<PropertyValue> {
        let root = self.root(mapped)?;
        self.schema
            .check_node_property(&self.id_map.node_labels(root), key)?;
        Ok(self.node_property(key)?.get(root))
    }
}
