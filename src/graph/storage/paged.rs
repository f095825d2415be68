//! Append-friendly containers shared between store versions
//!
//! Both containers split their data into `Arc`-held pieces. Cloning one
//! copies the piece table, and a write copies only the piece it touches when
//! an older version still references it. Appending a node to a store that
//! readers are looking at therefore costs a page, not the whole map.

use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Elements per page of a [`PagedVec`]
pub const PAGE_SIZE: usize = 1024;

/// Inserts land in a top layer of at most this many entries
const TOP_LAYER_SIZE: usize = 256;

/// Vector stored as fixed-size `Arc` pages
#[derive(Debug, Clone)]
pub struct PagedVec<T> {
    pages: Vec<Arc<Vec<T>>>,
    len: usize,
}

impl<T> Default for PagedVec<T> {
    fn default() -> Self {
        PagedVec {
            pages: Vec::new(),
            len: 0,
        }
    }
}

impl<T: Clone> PagedVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn push(&mut self, value: T) {
        match self.pages.last_mut() {
            Some(page) if page.len() < PAGE_SIZE => Arc::make_mut(page).push(value),
            _ => {
                let mut page = Vec::with_capacity(PAGE_SIZE);
                page.push(value);
                self.pages.push(Arc::new(page));
            }
        }
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.pages.get(index / PAGE_SIZE)?.get(index % PAGE_SIZE)
    }

    /// Mutable access, copying the page first if another version shares it
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        Arc::make_mut(&mut self.pages[index / PAGE_SIZE]).get_mut(index % PAGE_SIZE)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.pages.iter().flat_map(|page| page.iter())
    }

    /// Whether page `page` is the same allocation in both vectors
    pub fn shares_page(&self, other: &PagedVec<T>, page: usize) -> bool {
        match (self.pages.get(page), other.pages.get(page)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Hash index split into layers of growing size.
///
/// A new key goes into a small top layer. Once a layer holds as many entries
/// as the one below it, the two are merged, so there are O(log n) layers and
/// each entry is rewritten O(log n) times over its lifetime. Versions share
/// every layer they did not touch.
#[derive(Debug, Clone)]
pub struct LayeredIndex<K> {
    layers: Vec<Arc<FxHashMap<K, usize>>>,
    len: usize,
}

impl<K> Default for LayeredIndex<K> {
    fn default() -> Self {
        LayeredIndex {
            layers: Vec::new(),
            len: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> LayeredIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn get(&self, key: &K) -> Option<usize> {
        self.layers.iter().rev().find_map(|layer| layer.get(key).copied())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert a key that is not yet present
    pub fn insert(&mut self, key: K, value: usize) {
        debug_assert!(!self.contains_key(&key));
        match self.layers.last_mut() {
            Some(top) if top.len() < TOP_LAYER_SIZE => {
                Arc::make_mut(top).insert(key, value);
            }
            _ => {
                let mut top = FxHashMap::default();
                top.insert(key, value);
                self.layers.push(Arc::new(top));
            }
        }
        self.len += 1;

        while self.layers.len() >= 2 {
            let n = self.layers.len();
            if self.layers[n - 1].len() < self.layers[n - 2].len() {
                break;
            }
            let Some(top) = self.layers.pop() else { break };
            if let Some(below) = self.layers.last_mut() {
                Arc::make_mut(below).extend(top.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }
    }
}
