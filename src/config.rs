//! Construction-time configuration for a graph store
//!
//! Values arrive already validated by whoever assembles the configuration.
//! The store only maps non-positive concurrency hints to 1.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration consumed when a [`GraphStore`](crate::GraphStore) is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Threads available to read-side passes (filtered counts)
    pub read_concurrency: i64,
    /// Threads available to bulk writers
    pub write_concurrency: i64,
    /// Minimum parallel work unit, also the pre-allocation hint for builders
    pub batch_size: usize,
    /// Drop repeated (source, target) pairs when building topologies
    pub deduplicate_relationships: bool,
    /// Sort every adjacency list ascending
    pub sort_adjacency: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            read_concurrency: 4,
            write_concurrency: 1,
            batch_size: 10_000,
            deduplicate_relationships: false,
            sort_adjacency: false,
        }
    }
}

impl StoreConfig {
    /// Single-threaded configuration
    pub fn sequential() -> Self {
        Self {
            read_concurrency: 1,
            write_concurrency: 1,
            ..Self::default()
        }
    }

    pub fn effective_read_concurrency(&self) -> usize {
        coerce_concurrency("read_concurrency", self.read_concurrency)
    }

    pub fn effective_write_concurrency(&self) -> usize {
        coerce_concurrency("write_concurrency", self.write_concurrency)
    }
}

fn coerce_concurrency(name: &str, value: i64) -> usize {
    if value < 1 {
        warn!("{} = {} is not positive, using 1", name, value);
        return 1;
    }
    usize::try_from(value).unwrap_or(usize::MAX)
}
