//! The immutable reference-table snapshot the engine computes from.
//!
//! Tables are assembled once through `TablesBuilder` (the external loader's
//! entry point) and then only read. Every computation output is a fresh
//! value object; nothing here is ever mutated after `finish()`.

use super::types::*;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesBuilder {
    base_month: Option<Month>,
    items: Vec<Item>,
    series: HashMap<(ItemId, Geography), BTreeMap<Month, SeriesPoint>>,
    nodes: BTreeMap<(HierarchyLevel, HierarchyCode), HierarchyNode>,
}

impl TablesBuilder {
    pub fn new(base_month: Month) -> Self {
        Self {
            base_month: Some(base_month),
            ..Self::default()
        }
    }

    pub fn add_item(&mut self, item: Item) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Records one observation. A `None` level is the explicit missing
    /// marker; duplicates and non-positive levels are rejected.
    pub fn add_point(
        &mut self,
        item: ItemId,
        geography: Geography,
        month: Month,
        point: SeriesPoint,
    ) -> Result<&mut Self, EngineError> {
        if let Some(level) = point.level {
            if !(level > 0.0) || !level.is_finite() {
                return Err(EngineError::InvalidLevel {
                    item,
                    month,
                    level,
                });
            }
        }
        let per_month = self.series.entry((item.clone(), geography.clone())).or_default();
        if per_month.insert(month, point).is_some() {
            return Err(EngineError::DuplicateSeriesPoint {
                item,
                geography,
                month,
            });
        }
        Ok(self)
    }

    pub fn add_node(&mut self, node: HierarchyNode) -> &mut Self {
        self.nodes.insert((node.level, node.code.clone()), node);
        self
    }

    /// Seals the snapshot. Duplicate item ids are a load defect, not a QA
    /// degradation, and are rejected here.
    pub fn finish(self) -> Result<ReferenceTables, EngineError> {
        let mut items = self.items;
        items.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(EngineError::DuplicateItem {
                    item: item.id.clone(),
                });
            }
        }

        Ok(ReferenceTables {
            base_month: self.base_month.unwrap_or(Month(0)),
            items,
            index,
            series: self.series,
            nodes: self.nodes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTables {
    base_month: Month,
    /// Items sorted by id; iteration order is the crate-wide deterministic
    /// order (aggregation sums depend on it for bit-identical replays).
    items: Vec<Item>,
    #[serde(skip)]
    index: HashMap<ItemId, usize>,
    series: HashMap<(ItemId, Geography), BTreeMap<Month, SeriesPoint>>,
    nodes: BTreeMap<(HierarchyLevel, HierarchyCode), HierarchyNode>,
}

impl ReferenceTables {
    pub fn base_month(&self) -> Month {
        self.base_month
    }

    /// All items, sorted by id.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Rebuilds the id index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id.clone(), pos))
            .collect();
    }

    pub fn point(&self, item: &ItemId, geography: &Geography, month: Month) -> Option<&SeriesPoint> {
        self.series
            .get(&(item.clone(), geography.clone()))?
            .get(&month)
    }

    /// The observed (non-missing) level at exactly this month.
    pub fn level(&self, item: &ItemId, geography: &Geography, month: Month) -> Option<f64> {
        self.point(item, geography, month)?.level
    }

    /// The most recent non-missing observation strictly before `month`,
    /// used by the carry-forward policy.
    pub fn latest_level_before(
        &self,
        item: &ItemId,
        geography: &Geography,
        month: Month,
    ) -> Option<(Month, SeriesPoint)> {
        let per_month = self.series.get(&(item.clone(), geography.clone()))?;
        per_month
            .range(..month)
            .rev()
            .find(|(_, p)| p.level.is_some())
            .map(|(&m, &p)| (m, p))
    }

    /// All observation series, unordered (callers needing determinism
    /// sort their own output).
    pub fn series_entries(
        &self,
    ) -> impl Iterator<Item = (&ItemId, &Geography, &BTreeMap<Month, SeriesPoint>)> {
        self.series.iter().map(|((id, geo), points)| (id, geo, points))
    }

    pub fn node(&self, level: HierarchyLevel, code: &HierarchyCode) -> Option<&HierarchyNode> {
        self.nodes.get(&(level, code.clone()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.values()
    }

    /// Geographies that carry at least one item weight.
    pub fn geographies(&self) -> Vec<Geography> {
        let mut geos: Vec<Geography> = self
            .items
            .iter()
            .flat_map(|i| i.weights.keys().cloned())
            .collect();
        geos.sort();
        geos.dedup();
        geos
    }
}
