//! The computation core: missing-data resolution, weighted aggregation,
//! hierarchy rollups, inflation rates and the batch engine.

pub mod aggregator;
pub mod engine;
pub mod inflation;
pub mod resolver;

pub use aggregator::{aggregate, rollup, HierarchyIndexes};
pub use engine::{Engine, MonthFailure, MonthRecord, SeriesResult};
pub use inflation::IndexSeries;
pub use resolver::{
    resolve_month, CoverageRecord, MissingDataPolicy, MonthResolution, QualityFlag, ResolvedItem,
};
