//! Headline-versus-core wedge attribution.
//!
//! The wedge is the YoY gap between two definitions on the same geography
//! and month. Per-group attribution reuses the two contribution sets as
//! they stand (pure composition), so the reconciliation gap between the
//! wedge and the group rows is reported, never redistributed.

use super::contributions::{group_contributions, ContributionSet};
use crate::store::{DefinitionId, Geography, HierarchyCode, HierarchyLevel, Month, ReferenceTables};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WedgeGroup {
    pub code: HierarchyCode,
    pub name: Option<String>,
    pub headline_contribution: f64,
    pub core_contribution: f64,
    /// headline − core for this node.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WedgeReport {
    pub geography: Geography,
    pub month: Month,
    pub headline: DefinitionId,
    pub core: DefinitionId,
    pub headline_yoy: f64,
    pub core_yoy: f64,
    /// π_YoY(headline) − π_YoY(core).
    pub wedge: f64,
    pub groups: Vec<WedgeGroup>,
    /// wedge − Σ group contributions; zero only under identical
    /// availability across both definitions at t and t−12.
    pub residual: f64,
}

/// Attributes the inflation gap between two definitions to hierarchy
/// nodes at the given level.
pub fn analyze(
    tables: &ReferenceTables,
    headline: &ContributionSet,
    core: &ContributionSet,
    level: HierarchyLevel,
) -> WedgeReport {
    let wedge = headline.yoy - core.yoy;

    let mut rows: BTreeMap<HierarchyCode, (f64, f64)> = BTreeMap::new();
    for group in group_contributions(tables, headline, level) {
        rows.entry(group.code).or_insert((0.0, 0.0)).0 = group.contribution;
    }
    for group in group_contributions(tables, core, level) {
        rows.entry(group.code).or_insert((0.0, 0.0)).1 = group.contribution;
    }

    let groups: Vec<WedgeGroup> = rows
        .into_iter()
        .map(|(code, (h, c))| WedgeGroup {
            name: tables.node(level, &code).map(|n| n.name.clone()),
            code,
            headline_contribution: h,
            core_contribution: c,
            contribution: h - c,
        })
        .collect();

    let attributed: f64 = groups.iter().map(|g| g.contribution).sum();
    WedgeReport {
        geography: headline.geography.clone(),
        month: headline.month,
        headline: headline.definition.clone(),
        core: core.definition.clone(),
        headline_yoy: headline.yoy,
        core_yoy: core.yoy,
        wedge,
        groups,
        residual: wedge - attributed,
    }
}
