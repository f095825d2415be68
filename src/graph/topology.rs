//! Adjacency storage for one relationship type
//!
//! A [`Topology`] is a Compressed Sparse Row structure: `offsets[u]..offsets[u + 1]`
//! is the slice of `targets` holding the outgoing neighbours of ordinal `u`.
//! The position of a relationship inside `targets` is its edge id, and every
//! relationship property column of the type is indexed by that edge id.

use super::error::{GraphStoreError, GraphStoreResult};
use super::storage::PropertyStore;
use super::types::NodeOrdinal;
use rustc_hash::FxHashSet;
use std::ops::{ControlFlow, Range};

/// Construction options for a topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyOptions {
    /// Drop repeated (source, target) pairs, keeping the first occurrence.
    pub deduplicate: bool,
    /// Sort every adjacency list ascending. Otherwise insertion order is kept.
    pub sort_targets: bool,
}

/// Result of building a CSR from an edge list
#[derive(Debug, Clone)]
pub struct CsrBuild {
    pub topology: Topology,
    /// `edge_order[edge_id]` is the index of that relationship in the input
    /// list; used to lay property columns out in CSR order.
    pub edge_order: Vec<usize>,
}

/// Forward adjacency for one relationship type (CSR)
#[derive(Debug, Clone)]
pub struct Topology {
    offsets: Vec<usize>,
    targets: Vec<NodeOrdinal>,
    has_parallel_edges: bool,
    sorted: bool,
}

impl Topology {
    /// Topology without relationships over `node_count` nodes
    pub fn empty(node_count: usize) -> Self {
        Topology {
            offsets: vec![0; node_count + 1],
            targets: Vec::new(),
            has_parallel_edges: false,
            sorted: true,
        }
    }

    /// Build from parallel source/target arrays with a counting pass.
    ///
    /// Runs in O(N + E); sorting, when requested, is per adjacency list.
    /// Self-loops and multi-edges are kept unless `deduplicate` is set.
    pub fn from_edges(
        node_count: usize,
        sources: &[NodeOrdinal],
        targets: &[NodeOrdinal],
        options: TopologyOptions,
    ) -> GraphStoreResult<CsrBuild> {
        if sources.len() != targets.len() {
            return Err(GraphStoreError::EdgeListLengthMismatch {
                sources: sources.len(),
                targets: targets.len(),
            });
        }
        for &ordinal in sources.iter().chain(targets) {
            if ordinal >= node_count {
                return Err(GraphStoreError::OrdinalOutOfBounds {
                    ordinal,
                    node_count,
                });
            }
        }

        let mut offsets = vec![0usize; node_count + 1];
        for &s in sources {
            offsets[s + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let edge_count = sources.len();
        let mut cursor = offsets.clone();
        let mut csr_targets = vec![0 as NodeOrdinal; edge_count];
        let mut edge_order = vec![0usize; edge_count];
        for (i, (&s, &t)) in sources.iter().zip(targets).enumerate() {
            let pos = cursor[s];
            csr_targets[pos] = t;
            edge_order[pos] = i;
            cursor[s] += 1;
        }

        let mut topology = Topology {
            offsets,
            targets: csr_targets,
            has_parallel_edges: false,
            sorted: options.sort_targets,
        };

        if options.sort_targets {
            topology.sort_adjacency(&mut edge_order);
        }
        if options.deduplicate {
            topology.deduplicate(&mut edge_order);
        } else {
            topology.has_parallel_edges = topology.detect_parallel_edges();
        }

        Ok(CsrBuild {
            topology,
            edge_order,
        })
    }

    fn sort_adjacency(&mut self, edge_order: &mut [usize]) {
        let mut pairs: Vec<(NodeOrdinal, usize)> = Vec::new();
        for u in 0..self.node_count() {
            let range = self.edge_range(u);
            if range.len() < 2 {
                continue;
            }
            pairs.clear();
            pairs.extend(
                self.targets[range.clone()]
                    .iter()
                    .copied()
                    .zip(edge_order[range.clone()].iter().copied()),
            );
            // stable: equal targets stay in input order
            pairs.sort_by_key(|&(t, _)| t);
            for (offset, (t, e)) in pairs.iter().enumerate() {
                self.targets[range.start + offset] = *t;
                edge_order[range.start + offset] = *e;
            }
        }
    }

    fn deduplicate(&mut self, edge_order: &mut Vec<usize>) {
        let mut seen = FxHashSet::default();
        let mut write = 0;
        let mut new_offsets = Vec::with_capacity(self.offsets.len());
        new_offsets.push(0);
        for u in 0..self.node_count() {
            seen.clear();
            for pos in self.edge_range(u) {
                let t = self.targets[pos];
                if seen.insert(t) {
                    self.targets[write] = t;
                    edge_order[write] = edge_order[pos];
                    write += 1;
                }
            }
            new_offsets.push(write);
        }
        self.targets.truncate(write);
        edge_order.truncate(write);
        self.offsets = new_offsets;
        self.has_parallel_edges = false;
    }

    fn detect_parallel_edges(&self) -> bool {
        let mut seen = FxHashSet::default();
        (0..self.node_count()).any(|u| {
            let targets = self.targets(u);
            if self.sorted {
                targets.windows(2).any(|w| w[0] == w[1])
            } else {
                seen.clear();
                targets.iter().any(|t| !seen.insert(*t))
            }
        })
    }

    /// Number of nodes this topology was built over
    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn relationship_count(&self) -> usize {
        self.targets.len()
    }

    pub fn has_parallel_edges(&self) -> bool {
        self.has_parallel_edges
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Edge ids of `ordinal`'s outgoing relationships.
    ///
    /// Ordinals added after the topology was built have no relationships.
    pub fn edge_range(&self, ordinal: NodeOrdinal) -> Range<usize> {
        if ordinal >= self.node_count() {
            return 0..0;
        }
        self.offsets[ordinal]..self.offsets[ordinal + 1]
    }

    pub fn degree(&self, ordinal: NodeOrdinal) -> usize {
        self.edge_range(ordinal).len()
    }

    pub fn targets(&self, ordinal: NodeOrdinal) -> &[NodeOrdinal] {
        &self.targets[self.edge_range(ordinal)]
    }

    pub fn target_at(&self, edge_id: usize) -> NodeOrdinal {
        self.targets[edge_id]
    }

    /// Visit targets in adjacency order until the visitor breaks
    pub fn for_each_target<F>(&self, ordinal: NodeOrdinal, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(NodeOrdinal) -> ControlFlow<()>,
    {
        for &target in self.targets(ordinal) {
            visitor(target)?;
        }
        ControlFlow::Continue(())
    }

    /// All (source, target) pairs in edge-id order
    pub fn edges(&self) -> impl Iterator<Item = (NodeOrdinal, NodeOrdinal)> + '_ {
        (0..self.node_count()).flat_map(move |u| self.targets(u).iter().map(move |&v| (u, v)))
    }

    /// Both directions of every relationship, sorted and without duplicates
    pub fn to_undirected(&self) -> GraphStoreResult<Topology> {
        let n = self.node_count();
        let mut sources = Vec::with_capacity(self.relationship_count() * 2);
        let mut targets = Vec::with_capacity(self.relationship_count() * 2);
        for (u, v) in self.edges() {
            sources.push(u);
            targets.push(v);
            sources.push(v);
            targets.push(u);
        }
        let options = TopologyOptions {
            deduplicate: true,
            sort_targets: true,
        };
        Ok(Topology::from_edges(n, &sources, &targets, options)?.topology)
    }

    /// Estimated heap footprint in bytes
    pub fn memory_usage(&self) -> usize {
        (self.offsets.len() + self.targets.len()) * std::mem::size_of::<usize>()
    }
}

/// Reverse adjacency (target -> sources) for one relationship type
#[derive(Debug, Clone)]
pub struct InverseIndex {
    topology: Topology,
    /// inverse position -> forward edge id, when derived from the forward CSR
    edge_ids: Option<Vec<usize>>,
    /// relationship properties laid out in inverse order, when supplied
    properties: PropertyStore,
}

impl InverseIndex {
    /// Build the reverse adjacency with one counting-bucket pass, O(N + E).
    ///
    /// Multiplicity is preserved exactly; within a bucket sources ascend.
    pub fn from_forward(forward: &Topology) -> Self {
        let n = forward.node_count();
        let mut offsets = vec![0usize; n + 1];
        for &t in &forward.targets {
            offsets[t + 1] += 1;
        }
        for i in 0..n {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut sources = vec![0 as NodeOrdinal; forward.relationship_count()];
        let mut edge_ids = vec![0usize; forward.relationship_count()];
        for u in 0..n {
            for edge_id in forward.edge_range(u) {
                let t = forward.targets[edge_id];
                let pos = cursor[t];
                sources[pos] = u;
                edge_ids[pos] = edge_id;
                cursor[t] += 1;
            }
        }

        let mut topology = Topology {
            offsets,
            targets: sources,
            has_parallel_edges: forward.has_parallel_edges,
            sorted: true,
        };
        topology.has_parallel_edges = topology.detect_parallel_edges();

        InverseIndex {
            topology,
            edge_ids: Some(edge_ids),
            properties: PropertyStore::new(),
        }
    }

    /// Wrap an inverse topology built elsewhere, with optional inverse-ordered
    /// property columns.
    pub fn from_topology(topology: Topology, properties: Option<PropertyStore>) -> Self {
        InverseIndex {
            topology,
            edge_ids: None,
            properties: properties.unwrap_or_default(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn relationship_count(&self) -> usize {
        self.topology.relationship_count()
    }

    pub fn degree(&self, ordinal: NodeOrdinal) -> usize {
        self.topology.degree(ordinal)
    }

    pub fn sources(&self, ordinal: NodeOrdinal) -> &[NodeOrdinal] {
        self.topology.targets(ordinal)
    }

    /// Forward edge id of an inverse position, if derived from the forward CSR
    pub fn forward_edge_id(&self, inverse_position: usize) -> Option<usize> {
        self.edge_ids.as_ref().map(|ids| ids[inverse_position])
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn memory_usage(&self) -> usize {
        self.topology.memory_usage()
            + self
                .edge_ids
                .as_ref()
                .map_or(0, |ids| ids.len() * std::mem::size_of::<usize>())
            + self.properties.memory_usage()
    }
}
