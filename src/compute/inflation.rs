//! Month-on-month and year-on-year rates over an index series.

use crate::error::EngineError;
use crate::store::Month;
use serde::Serialize;
use std::collections::BTreeMap;

pub const MOM_LAG: u32 = 1;
pub const YOY_LAG: u32 = 12;

/// Index levels of one (definition, geography), keyed by month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSeries {
    points: BTreeMap<Month, f64>,
}

impl IndexSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, month: Month, level: f64) {
        self.points.insert(month, level);
    }

    pub fn level(&self, month: Month) -> Option<f64> {
        self.points.get(&month).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.points.iter().map(|(&m, &l)| (m, l))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// π = (I(t) / I(t − lag) − 1) × 100.
    ///
    /// A missing base month means the rate is not yet computable; callers
    /// must not read the error as zero inflation.
    pub fn rate(&self, month: Month, lag: u32) -> Result<f64, EngineError> {
        let current = self.level(month).ok_or(EngineError::InsufficientHistory {
            month,
            needed: month,
        })?;
        let base_month = month
            .minus(lag)
            .ok_or(EngineError::InsufficientHistory {
                month,
                needed: month,
            })?;
        let base = self
            .level(base_month)
            .ok_or(EngineError::InsufficientHistory {
                month,
                needed: base_month,
            })?;
        Ok((current / base - 1.0) * 100.0)
    }

    pub fn mom(&self, month: Month) -> Result<f64, EngineError> {
        self.rate(month, MOM_LAG)
    }

    pub fn yoy(&self, month: Month) -> Result<f64, EngineError> {
        self.rate(month, YOY_LAG)
    }
}
