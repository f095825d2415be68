//! Streams relationships of one type together with several property values
//!
//! All requested columns are indexed by the same edge id, so walking the CSR
//! in order reads every column sequentially instead of doing one random
//! lookup per (relationship, property) pair.

use super::error::{GraphStoreError, GraphStoreResult};
use super::relationships::SingleTypeRelationships;
use super::schema::PropertyOwner;
use super::storage::PropertyValues;
use super::topology::Topology;
use super::types::{NodeOrdinal, RelationshipType};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Cursor over `(source, target, values[])` for one relationship type.
///
/// Holds its own references to the topology and columns, so it keeps
/// iterating the state it was created from even if the type is deleted
/// from the store meanwhile.
#[derive(Debug, Clone)]
pub struct CompositeRelationshipIterator {
    rel_type: RelationshipType,
    topology: Arc<Topology>,
    property_keys: Vec<String>,
    columns: Vec<Arc<PropertyValues>>,
}

impl CompositeRelationshipIterator {
    pub(crate) fn new(rels: &SingleTypeRelationships, property_keys: &[&str]) -> GraphStoreResult<Self> {
        let mut columns = Vec::with_capacity(property_keys.len());
        for key in property_keys {
            let values = rels.properties().get(key).ok_or_else(|| {
                GraphStoreError::UndeclaredProperty {
                    owner: PropertyOwner::RelationshipType(rels.rel_type().clone()),
                    key: key.to_string(),
                }
            })?;
            if !values.value_type().is_numeric_scalar() {
                return Err(GraphStoreError::TypeMismatch {
                    key: key.to_string(),
                    expected: super::property::ValueType::Double,
                    actual: values.value_type(),
                });
            }
            columns.push(Arc::clone(values));
        }

        Ok(CompositeRelationshipIterator {
            rel_type: rels.rel_type().clone(),
            topology: Arc::clone(rels.topology()),
            property_keys: property_keys.iter().map(|k| k.to_string()).collect(),
            columns,
        })
    }

    pub fn rel_type(&self) -> &RelationshipType {
        &self.rel_type
    }

    pub fn property_keys(&self) -> &[String] {
        &self.property_keys
    }

    pub fn property_count(&self) -> usize {
        self.columns.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.topology.relationship_count()
    }

    pub fn degree(&self, source: NodeOrdinal) -> usize {
        self.topology.degree(source)
    }

    #[inline]
    fn fill(&self, edge_id: usize, buffer: &mut [f64]) {
        for (slot, column) in buffer.iter_mut().zip(&self.columns) {
            *slot = column.f64_value(edge_id).unwrap_or(f64::NAN);
        }
    }

    /// Visit the outgoing relationships of `source`, stopping when the
    /// visitor breaks.
    pub fn for_each_relationship<F>(&self, source: NodeOrdinal, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(NodeOrdinal, NodeOrdinal, &[f64]) -> ControlFlow<()>,
    {
        let mut buffer = vec![0.0; self.columns.len()];
        for edge_id in self.topology.edge_range(source) {
            self.fill(edge_id, &mut buffer);
            visitor(source, self.topology.target_at(edge_id), &buffer)?;
        }
        ControlFlow::Continue(())
    }

    /// Visit every relationship of the type in edge-id order
    pub fn for_each<F>(&self, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(NodeOrdinal, NodeOrdinal, &[f64]) -> ControlFlow<()>,
    {
        let mut buffer = vec![0.0; self.columns.len()];
        for source in 0..self.topology.node_count() {
            for edge_id in self.topology.edge_range(source) {
                self.fill(edge_id, &mut buffer);
                visitor(source, self.topology.target_at(edge_id), &buffer)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// Restartable cursor that reuses one value buffer across relationships
    pub fn cursor(&self) -> CompositeCursor<'_> {
        CompositeCursor {
            iter: self,
            source: 0,
            edge_id: 0,
            buffer: vec![0.0; self.columns.len()],
        }
    }

    /// Owned tuples; allocates one value vector per relationship
    pub fn iter(&self) -> impl Iterator<Item = (NodeOrdinal, NodeOrdinal, Vec<f64>)> + '_ {
        let topology = &self.topology;
        (0..topology.node_count()).flat_map(move |source| {
            topology.edge_range(source).map(move |edge_id| {
                let mut values = vec![0.0; self.columns.len()];
                self.fill(edge_id, &mut values);
                (source, topology.target_at(edge_id), values)
            })
        })
    }
}

/// Lending cursor over a [`CompositeRelationshipIterator`]
#[derive(Debug)]
pub struct CompositeCursor<'a> {
    iter: &'a CompositeRelationshipIterator,
    source: NodeOrdinal,
    edge_id: usize,
    buffer: Vec<f64>,
}

impl<'a> CompositeCursor<'a> {
    /// Advance to the next relationship; the returned slice is valid until
    /// the following call.
    pub fn next_relationship(&mut self) -> Option<(NodeOrdinal, NodeOrdinal, &[f64])> {
        let topology = &self.iter.topology;
        if self.edge_id >= topology.relationship_count() {
            return None;
        }
        while self.edge_id >= topology.edge_range(self.source).end {
            self.source += 1;
        }
        let edge_id = self.edge_id;
        self.edge_id += 1;
        self.iter.fill(edge_id, &mut self.buffer);
        Some((self.source, topology.target_at(edge_id), &self.buffer))
    }

    /// Start over from the first relationship
    pub fn reset(&mut self) {
        self.source = 0;
        self.edge_id = 0;
    }
}
