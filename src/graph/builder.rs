//! Single-owner bulk loading
//!
//! Nothing is shared while loading, so every step mutates in place. The
//! finished state is handed to a [`GraphStore`] in one piece.

use super::error::GraphStoreResult;
use super::relationships::{RelationshipsBuilder, SingleTypeRelationships};
use super::store::{GraphStore, StoreState};
use super::storage::PropertyValues;
use super::topology::TopologyOptions;
use super::types::{NodeLabel, NodeOrdinal, OriginalNodeId, RelationshipType};
use crate::config::StoreConfig;
use tracing::info;

/// Loads nodes, properties and relationship types, then builds a store.
///
/// Load nodes first: relationship builders are sized by the node count at
/// the time they are created.
#[derive(Debug)]
pub struct GraphStoreBuilder {
    config: StoreConfig,
    state: StoreState,
}

impl GraphStoreBuilder {
    pub fn new(config: StoreConfig) -> Self {
        GraphStoreBuilder {
            config,
            state: StoreState::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.state.node_count()
    }

    pub fn add_node<I, L>(&mut self, id: impl Into<OriginalNodeId>, labels: I) -> NodeOrdinal
    where
        I: IntoIterator<Item = L>,
        L: Into<NodeLabel>,
    {
        self.state
            .add_node(id.into(), labels.into_iter().map(Into::into).collect())
    }

    pub fn add_label(&mut self, label: impl Into<NodeLabel>) -> &mut Self {
        self.state.add_label(label.into());
        self
    }

    pub fn add_node_property<I, L>(&mut self, labels: I, key: &str, values: PropertyValues) -> GraphStoreResult<&mut Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<NodeLabel>,
    {
        self.state
            .put_node_property(labels.into_iter().map(Into::into).collect(), key, values)?;
        Ok(self)
    }

    pub fn add_graph_property(&mut self, key: &str, values: PropertyValues) -> GraphStoreResult<&mut Self> {
        self.state.put_graph_property(key, values)?;
        Ok(self)
    }

    /// Builder over the nodes loaded so far, with the configured options
    pub fn relationships_builder(&self, rel_type: impl Into<RelationshipType>) -> RelationshipsBuilder {
        RelationshipsBuilder::new(rel_type, self.node_count())
            .with_capacity(self.config.batch_size)
            .options(TopologyOptions {
                deduplicate: self.config.deduplicate_relationships,
                sort_targets: self.config.sort_adjacency,
            })
    }

    pub fn add_relationships(&mut self, relationships: SingleTypeRelationships) -> GraphStoreResult<&mut Self> {
        self.state.install_relationships(relationships)?;
        Ok(self)
    }

    /// Add relationships given as original ids, without properties.
    ///
    /// Fails with `NodeNotFound` if an endpoint was never loaded.
    pub fn add_relationships_by_id<I>(
        &mut self,
        rel_type: impl Into<RelationshipType>,
        pairs: I,
        build_inverse: bool,
    ) -> GraphStoreResult<&mut Self>
    where
        I: IntoIterator<Item = (OriginalNodeId, OriginalNodeId)>,
    {
        let mut builder = self
            .relationships_builder(rel_type)
            .inverse_indexed(build_inverse);
        let id_map = self.state.id_map();
        for (source, target) in pairs {
            builder.add(id_map.to_ordinal(&source)?, id_map.to_ordinal(&target)?)?;
        }
        let relationships = builder.build()?;
        self.add_relationships(relationships)
    }

    pub fn build(self) -> GraphStore {
        info!(
            "Built graph store with {} nodes and {} relationship types",
            self.state.node_count(),
            self.state.relationship_type_count()
        );
        GraphStore::from_state(self.config, self.state)
    }
}

impl Default for GraphStoreBuilder {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
