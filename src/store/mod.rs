//! Reference tables: items with base-year weights, the observation series,
//! and the classification hierarchy. Owned by external loaders, validated
//! and read (never written) by the engine.

pub mod registry;
pub mod types;

pub use registry::{ReferenceTables, TablesBuilder};
pub use types::{
    DefinitionId, Geography, HierarchyCode, HierarchyLevel, HierarchyNode, Item, ItemId, Month,
    SeriesPoint,
};
