//! Additive decomposition of a year-on-year rate into item contributions.
//!
//! Contributions use the current month's renormalized weights. When the
//! availability sets at t and t−12 differ, the unexplained part of the
//! rate is carried as an explicit residual; it is never smeared across
//! the items that did have both observations.

use crate::compute::aggregator;
use crate::compute::resolver::MonthResolution;
use crate::store::{
    DefinitionId, Geography, HierarchyCode, HierarchyLevel, ItemId, Month, ReferenceTables,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Reconstruction tolerance for the contribution-sum identity, in
/// percentage points.
pub const CONTRIBUTION_TOLERANCE_PP: f64 = 0.01;

/// Signed percentage-point contribution of one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRecord {
    pub item: ItemId,
    pub contribution: f64,
}

/// The full decomposition of one (definition, geography, month) YoY rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionSet {
    pub definition: DefinitionId,
    pub geography: Geography,
    pub month: Month,
    pub yoy: f64,
    /// Sorted by item id; items lacking a t−12 level produce no record.
    pub items: Vec<ContributionRecord>,
    /// yoy − Σ contributions. Non-zero exactly when availability at t and
    /// t−12 is not identical.
    pub residual: f64,
}

impl ContributionSet {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|r| r.contribution).sum()
    }
}

/// Decomposes the YoY rate implied by the two resolutions.
///
/// C_i = ŵ_i(t) · (I_{i,t} − I_{i,t−12}) / I(d,g,t−12) × 100, with ŵ the
/// current-month renormalized weight. Under full availability parity the
/// records sum to the rate exactly; any gap lands in `residual`.
pub fn decompose_yoy(current: &MonthResolution, prior: &MonthResolution) -> ContributionSet {
    let index_current = aggregator::aggregate(current);
    let index_prior = aggregator::aggregate(prior);
    let yoy = (index_current / index_prior - 1.0) * 100.0;

    let prior_levels: BTreeMap<&ItemId, f64> = prior
        .items
        .iter()
        .map(|row| (&row.id, row.level))
        .collect();

    let mut items = Vec::with_capacity(current.items.len());
    for row in &current.items {
        let Some(prior_level) = prior_levels.get(&row.id) else {
            continue;
        };
        let delta = row.weight * (row.level - prior_level);
        items.push(ContributionRecord {
            item: row.id.clone(),
            contribution: delta / index_prior * 100.0,
        });
    }

    let explained: f64 = items.iter().map(|r| r.contribution).sum();
    ContributionSet {
        definition: current.coverage.definition.clone(),
        geography: current.coverage.geography.clone(),
        month: current.month,
        yoy,
        items,
        residual: yoy - explained,
    }
}

/// One hierarchy node's share of the decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupContribution {
    pub code: HierarchyCode,
    pub name: Option<String>,
    pub contribution: f64,
}

/// Group-level contributions are the exact sum of member-item records,
/// never a recomputation at group level.
pub fn group_contributions(
    tables: &ReferenceTables,
    set: &ContributionSet,
    level: HierarchyLevel,
) -> Vec<GroupContribution> {
    let mut sums: BTreeMap<HierarchyCode, f64> = BTreeMap::new();
    for record in &set.items {
        let Some(item) = tables.item(&record.item) else {
            continue;
        };
        let code = item.hierarchy.truncate(level);
        *sums.entry(code).or_insert(0.0) += record.contribution;
    }
    sums.into_iter()
        .map(|(code, contribution)| GroupContribution {
            name: tables.node(level, &code).map(|n| n.name.clone()),
            code,
            contribution,
        })
        .collect()
}
