//! Relationships of a single type: topology, optional inverse index and
//! property columns, plus a builder that lays them out in CSR order.

use super::error::{GraphStoreError, GraphStoreResult};
use super::property::{PropertyValue, ValueType};
use super::schema::{PropertyOwner, PropertySchema};
use super::storage::{PropertyStore, PropertyValues};
use super::topology::{InverseIndex, Topology, TopologyOptions};
use super::types::{Direction, NodeOrdinal, RelationshipType};
use indexmap::IndexMap;
use std::sync::Arc;

/// Everything stored for one relationship type.
///
/// Property columns are indexed by edge id (CSR position in the topology).
#[derive(Debug, Clone)]
pub struct SingleTypeRelationships {
    rel_type: RelationshipType,
    direction: Direction,
    topology: Arc<Topology>,
    inverse: Option<Arc<InverseIndex>>,
    properties: PropertyStore,
}

impl SingleTypeRelationships {
    pub fn new(rel_type: impl Into<RelationshipType>, topology: Topology) -> Self {
        SingleTypeRelationships {
            rel_type: rel_type.into(),
            direction: Direction::Directed,
            topology: Arc::new(topology),
            inverse: None,
            properties: PropertyStore::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, values: PropertyValues) -> Self {
        self.properties.insert(key, Arc::new(values));
        self
    }

    pub fn with_inverse_index(mut self, inverse: InverseIndex) -> Self {
        self.inverse = Some(Arc::new(inverse));
        self
    }

    pub fn rel_type(&self) -> &RelationshipType {
        &self.rel_type
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn inverse(&self) -> Option<&Arc<InverseIndex>> {
        self.inverse.as_ref()
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn relationship_count(&self) -> usize {
        self.topology.relationship_count()
    }

    /// Schema declarations implied by the property columns
    pub fn property_schemas(&self) -> Vec<PropertySchema> {
        self.properties
            .iter()
            .map(|(key, values)| {
                PropertySchema::new(key, values.value_type(), values.default_value().clone())
            })
            .collect()
    }

    pub(crate) fn set_inverse(&mut self, inverse: Option<Arc<InverseIndex>>) {
        self.inverse = inverse;
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }

    /// Check that the relationships fit a store with `node_count` nodes
    pub(crate) fn validate(&self, node_count: usize) -> GraphStoreResult<()> {
        let topology = &self.topology;
        check_bounds(topology, node_count)?;
        if let Some(inverse) = &self.inverse {
            check_bounds(inverse.topology(), node_count)?;
        }
        for (key, values) in self.properties.iter() {
            if values.len() > topology.relationship_count() {
                return Err(GraphStoreError::ColumnLengthMismatch {
                    key: key.to_string(),
                    expected: topology.relationship_count(),
                    actual: values.len(),
                });
            }
        }
        if let Some(inverse) = &self.inverse {
            if inverse.relationship_count() != topology.relationship_count() {
                return Err(GraphStoreError::InverseIndexMismatch {
                    rel_type: self.rel_type.clone(),
                    forward: topology.relationship_count(),
                    inverse: inverse.relationship_count(),
                });
            }
        }
        Ok(())
    }

    /// Estimated heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        self.topology.memory_usage()
            + self.inverse.as_ref().map_or(0, |i| i.memory_usage())
            + self.properties.memory_usage()
    }
}

fn check_bounds(topology: &Topology, node_count: usize) -> GraphStoreResult<()> {
    if topology.node_count() <= node_count {
        return Ok(());
    }
    for (source, target) in topology.edges() {
        let ordinal = source.max(target);
        if ordinal >= node_count {
            return Err(GraphStoreError::OrdinalOutOfBounds {
                ordinal,
                node_count,
            });
        }
    }
    Ok(())
}

/// Collects relationships of one type and builds them in CSR order.
///
/// Sources and targets are node ordinals of the store the result will be
/// installed into.
#[derive(Debug)]
pub struct RelationshipsBuilder {
    rel_type: RelationshipType,
    node_count: usize,
    direction: Direction,
    options: TopologyOptions,
    build_inverse: bool,
    sources: Vec<NodeOrdinal>,
    targets: Vec<NodeOrdinal>,
    properties: IndexMap<String, PropertyValues>,
}

impl RelationshipsBuilder {
    pub fn new(rel_type: impl Into<RelationshipType>, node_count: usize) -> Self {
        RelationshipsBuilder {
            rel_type: rel_type.into(),
            node_count,
            direction: Direction::Directed,
            options: TopologyOptions::default(),
            build_inverse: false,
            sources: Vec::new(),
            targets: Vec::new(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.sources.reserve(capacity);
        self.targets.reserve(capacity);
        self
    }

    pub fn options(mut self, options: TopologyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Also build the inverse index while building the topology
    pub fn inverse_indexed(mut self, build_inverse: bool) -> Self {
        self.build_inverse = build_inverse;
        self
    }

    pub fn rel_type(&self) -> &RelationshipType {
        &self.rel_type
    }

    pub fn relationship_count(&self) -> usize {
        self.sources.len()
    }

    /// Declare a property column; relationships added before it read the default.
    pub fn declare_property(
        &mut self,
        key: &str,
        value_type: ValueType,
        default_value: PropertyValue,
    ) -> GraphStoreResult<()> {
        if let Some(existing) = self.properties.get(key) {
            if existing.value_type() == value_type
                && existing.default_value().is_identical(&default_value)
            {
                return Ok(());
            }
            return Err(GraphStoreError::SchemaConflict {
                owner: PropertyOwner::RelationshipType(self.rel_type.clone()),
                key: key.to_string(),
                existing: PropertySchema::new(
                    key,
                    existing.value_type(),
                    existing.default_value().clone(),
                )
                .to_string(),
                requested: PropertySchema::new(key, value_type, default_value).to_string(),
            });
        }
        let values = PropertyValues::with_default(value_type, default_value)
            .map_err(|e| e.for_key(key))?;
        self.properties.insert(key.to_string(), values);
        Ok(())
    }

    /// Add one relationship without properties
    pub fn add(&mut self, source: NodeOrdinal, target: NodeOrdinal) -> GraphStoreResult<usize> {
        self.add_with_properties(source, target, &[])
    }

    /// Add one relationship; all checks run before anything is written.
    pub fn add_with_properties(
        &mut self,
        source: NodeOrdinal,
        target: NodeOrdinal,
        values: &[(&str, PropertyValue)],
    ) -> GraphStoreResult<usize> {
        for ordinal in [source, target] {
            if ordinal >= self.node_count {
                return Err(GraphStoreError::OrdinalOutOfBounds {
                    ordinal,
                    node_count: self.node_count,
                });
            }
        }
        for (key, value) in values {
            let column = self.properties.get(*key).ok_or_else(|| {
                GraphStoreError::UndeclaredProperty {
                    owner: PropertyOwner::RelationshipType(self.rel_type.clone()),
                    key: key.to_string(),
                }
            })?;
            if column.value_type() != value.value_type() {
                return Err(GraphStoreError::TypeMismatch {
                    key: key.to_string(),
                    expected: column.value_type(),
                    actual: value.value_type(),
                });
            }
        }

        let index = self.sources.len();
        self.sources.push(source);
        self.targets.push(target);
        for (key, value) in values {
            if let Some(column) = self.properties.get_mut(*key) {
                column.set(index, value.clone()).map_err(|e| e.for_key(key))?;
            }
        }
        Ok(index)
    }

    /// Lay the collected relationships out as CSR and permute the property
    /// columns into edge-id order.
    pub fn build(self) -> GraphStoreResult<SingleTypeRelationships> {
        let build = Topology::from_edges(self.node_count, &self.sources, &self.targets, self.options)?;

        let mut properties = PropertyStore::new();
        for (key, input) in self.properties {
            let mut column = PropertyValues::with_default(input.value_type(), input.default_value().clone())
                .map_err(|e| e.for_key(&key))?;
            for (edge_id, &input_index) in build.edge_order.iter().enumerate() {
                if input_index < input.len() {
                    column.set(edge_id, input.get(input_index)).map_err(|e| e.for_key(&key))?;
                }
            }
            properties.insert(key, Arc::new(column));
        }

        let inverse = self
            .build_inverse
            .then(|| Arc::new(InverseIndex::from_forward(&build.topology)));

        Ok(SingleTypeRelationships {
            rel_type: self.rel_type,
            direction: self.direction,
            topology: Arc::new(build.topology),
            inverse,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_orders_properties_by_edge_id() {
        let mut builder = RelationshipsBuilder::new("KNOWS", 3);
        builder
            .declare_property("weight", ValueType::Double, PropertyValue::Double(1.0))
            .unwrap();
        builder
            .add_with_properties(1, 2, &[("weight", PropertyValue::Double(12.0))])
            .unwrap();
        builder
            .add_with_properties(0, 1, &[("weight", PropertyValue::Double(1.5))])
            .unwrap();
        builder.add(0, 2).unwrap();

        let rels = builder.build().unwrap();
        assert_eq!(rels.relationship_count(), 3);
        assert_eq!(rels.topology().targets(0), &[1, 2]);
        let weight = rels.properties().get("weight").unwrap();
        assert_eq!(weight.double_value(0), Some(1.5));
        assert_eq!(weight.double_value(1), Some(1.0));
        assert_eq!(weight.double_value(2), Some(12.0));
    }

    #[test]
    fn test_builder_rejects_bad_input_without_side_effects() {
        let mut builder = RelationshipsBuilder::new("KNOWS", 2);
        builder
            .declare_property("since", ValueType::Long, PropertyValue::Long(0))
            .unwrap();

        let err = builder.add(0, 7).unwrap_err();
        assert!(matches!(err, GraphStoreError::OrdinalOutOfBounds { ordinal: 7, .. }));

        let err = builder
            .add_with_properties(0, 1, &[("since", PropertyValue::Double(1.0))])
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::TypeMismatch { .. }));

        let err = builder
            .add_with_properties(0, 1, &[("nope", PropertyValue::Long(1))])
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::UndeclaredProperty { .. }));

        assert_eq!(builder.relationship_count(), 0);
    }

    #[test]
    fn test_builder_dedup_keeps_first_values() {
        let mut builder = RelationshipsBuilder::new("LINK", 2).options(TopologyOptions {
            deduplicate: true,
            sort_targets: false,
        });
        builder
            .declare_property("w", ValueType::Long, PropertyValue::Long(0))
            .unwrap();
        builder.add_with_properties(0, 1, &[("w", 5i64.into())]).unwrap();
        builder.add_with_properties(0, 1, &[("w", 9i64.into())]).unwrap();

        let rels = builder.build().unwrap();
        assert_eq!(rels.relationship_count(), 1);
        assert_eq!(rels.properties().get("w").unwrap().long_value(0), Some(5));
    }

    #[test]
    fn test_builder_with_inverse() {
        let mut builder = RelationshipsBuilder::new("KNOWS", 3).inverse_indexed(true);
        builder.add(0, 2).unwrap();
        builder.add(1, 2).unwrap();
        let rels = builder.build().unwrap();
        assert_eq!(rels.inverse().unwrap().sources(2), &[0, 1]);
    }

    #[test]
    fn test_validate_against_store() {
        let rels = SingleTypeRelationships::new(
            "KNOWS",
            Topology::from_edges(5, &[0], &[4], TopologyOptions::default())
                .unwrap()
                .topology,
        );
        assert!(rels.validate(5).is_ok());
        assert!(matches!(
            rels.validate(3),
            Err(GraphStoreError::OrdinalOutOfBounds { ordinal: 4, node_count: 3 })
        ));

        let too_long = rels
            .clone()
            .with_property("w", PropertyValues::from_doubles(vec![1.0, 2.0], 0.0));
        assert!(matches!(
            too_long.validate(5),
            Err(GraphStoreError::ColumnLengthMismatch { .. })
        ));
    }
}
