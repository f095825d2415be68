//! Bidirectional mapping between original node ids and dense ordinals
//!
//! Ordinals are handed out append-only in insertion order. Once assigned an
//! ordinal never changes and is never reused, which keeps every topology and
//! property column built against it valid for the lifetime of the store.

use super::error::{GraphStoreError, GraphStoreResult};
use super::storage::{LayeredIndex, PagedVec};
use super::types::{NodeLabel, NodeOrdinal, OriginalNodeId};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Node id mapping plus per-label membership.
///
/// Every part is paged or layered, so the clone a store mutation starts from
/// shares all but the pages the mutation writes.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    /// ordinal -> original id
    original_ids: PagedVec<OriginalNodeId>,
    /// original id -> ordinal
    ordinals: LayeredIndex<OriginalNodeId>,
    /// ordinal -> labels, as positions into `label_counts`
    node_labels: PagedVec<Vec<u32>>,
    /// label -> member count
    label_counts: IndexMap<NodeLabel, usize>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.original_ids.len()
    }

    pub fn contains(&self, id: &OriginalNodeId) -> bool {
        self.ordinals.contains_key(id)
    }

    /// Translate an original id; unknown ids are an error, never a sentinel.
    pub fn to_ordinal(&self, id: &OriginalNodeId) -> GraphStoreResult<NodeOrdinal> {
        self.ordinals
            .get(id)
            .ok_or_else(|| GraphStoreError::NodeNotFound(id.clone()))
    }

    pub fn to_original(&self, ordinal: NodeOrdinal) -> GraphStoreResult<&OriginalNodeId> {
        self.original_ids
            .get(ordinal)
            .ok_or(GraphStoreError::OrdinalOutOfBounds {
                ordinal,
                node_count: self.node_count(),
            })
    }

    /// Register a label without assigning it to any node
    pub fn add_label(&mut self, label: NodeLabel) {
        self.label_counts.entry(label).or_default();
    }

    /// Add a node, or union `labels` into an existing node's label set.
    ///
    /// A node added without labels carries [`NodeLabel::all_nodes`].
    pub fn add_node(
        &mut self,
        id: OriginalNodeId,
        labels: impl IntoIterator<Item = NodeLabel>,
    ) -> NodeOrdinal {
        let ordinal = match self.ordinals.get(&id) {
            Some(ordinal) => ordinal,
            None => {
                let ordinal = self.original_ids.len();
                self.original_ids.push(id.clone());
                self.ordinals.insert(id, ordinal);
                self.node_labels.push(Vec::new());
                ordinal
            }
        };

        for label in labels {
            self.assign_label(ordinal, label);
        }
        if self.node_labels.get(ordinal).is_some_and(Vec::is_empty) {
            self.assign_label(ordinal, NodeLabel::all_nodes());
        }
        ordinal
    }

    fn assign_label(&mut self, ordinal: NodeOrdinal, label: NodeLabel) {
        let entry = self.label_counts.entry(label);
        let token = entry.index() as u32;
        let count = entry.or_default();
        if let Some(labels) = self.node_labels.get_mut(ordinal) {
            if !labels.contains(&token) {
                labels.push(token);
                *count += 1;
            }
        }
    }

    /// All known labels, including those without members
    pub fn label_set(&self) -> HashSet<NodeLabel> {
        self.label_counts.keys().cloned().collect()
    }

    pub fn has_label_registered(&self, label: &NodeLabel) -> bool {
        self.label_counts.contains_key(label)
    }

    pub fn has_label(&self, ordinal: NodeOrdinal, label: &NodeLabel) -> bool {
        match self.label_counts.get_index_of(label) {
            Some(token) => self
                .node_labels
                .get(ordinal)
                .is_some_and(|labels| labels.contains(&(token as u32))),
            None => false,
        }
    }

    pub fn node_labels(&self, ordinal: NodeOrdinal) -> Vec<&NodeLabel> {
        self.node_labels
            .get(ordinal)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|&t| self.label_counts.get_index(t as usize).map(|(l, _)| l))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes carrying any of `labels`, in ascending ordinal order
    pub fn nodes_with_any_label<'a, I>(&'a self, labels: I) -> impl Iterator<Item = NodeOrdinal> + 'a
    where
        I: IntoIterator<Item = &'a NodeLabel>,
    {
        let tokens: Vec<u32> = labels
            .into_iter()
            .filter_map(|label| self.label_counts.get_index_of(label))
            .map(|token| token as u32)
            .collect();
        let limit = if tokens.is_empty() { 0 } else { self.node_count() };
        self.node_labels
            .iter()
            .take(limit)
            .enumerate()
            .filter(move |(_, labels)| labels.iter().any(|t| tokens.contains(t)))
            .map(|(ordinal, _)| ordinal)
    }

    /// Members of a label in ascending ordinal order; empty for unknown labels.
    pub fn nodes_with_label<'a>(
        &'a self,
        label: &'a NodeLabel,
    ) -> impl Iterator<Item = NodeOrdinal> + 'a {
        self.nodes_with_any_label([label])
    }

    pub fn node_count_for_label(&self, label: &NodeLabel) -> usize {
        self.label_counts.get(label).copied().unwrap_or(0)
    }

    /// Whether both maps hold the same allocation for id page `page`
    pub fn shares_id_page(&self, other: &IdMap, page: usize) -> bool {
        self.original_ids.shares_page(&other.original_ids, page)
    }

    /// Estimated heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        let ids = self.original_ids.len() * std::mem::size_of::<OriginalNodeId>() * 2;
        let labels: usize = self.node_labels.iter().map(|l| 24 + l.len() * 4).sum();
        ids + labels + self.label_counts.len() * std::mem::size_of::<(NodeLabel, usize)>()
    }
}
