//! Columnar property storage and paged containers

pub mod columnar;
pub mod paged;
pub mod property_store;

pub use columnar::{ArrayColumn, ArrayLayout, Column, ColumnError, PropertyValues};
pub use paged::{LayeredIndex, PagedVec};
pub use property_store::PropertyStore;
