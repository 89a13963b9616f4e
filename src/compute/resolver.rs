//! Missing-data resolution: availability, renormalized weights, coverage.
//!
//! The policies form a closed set selected by configuration; dispatch is a
//! single match with one branch per policy. Whatever the policy, the
//! renormalized weights over the availability set sum to 1 within 1e-8 and
//! every month produces a fresh `CoverageRecord`.

use super::aggregator::{self, HierarchyIndexes};
use crate::error::EngineError;
use crate::store::{
    DefinitionId, Geography, HierarchyLevel, ItemId, Month, ReferenceTables,
};
use crate::universe::{Definition, ResolvedUniverse};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingDataPolicy {
    /// Drop missing items and renormalize the remainder (the default).
    #[default]
    DropAndRenormalize,
    /// Fill a gap with the item's most recent prior observation; items
    /// with no prior observation fall back to the drop policy.
    CarryForward,
    /// Fill a gap with the enclosing class index, else group, else
    /// division. No ancestor level at all is `ImputationExhausted`.
    ImputeParent,
}

/// Coverage quality bands. The thresholds are fixed; only the fatal floor
/// can be tightened per definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFlag {
    Pass,
    Caution,
    WeakSignal,
    /// Set by QA review when a data check fails for the record.
    Error,
}

impl QualityFlag {
    pub fn from_coverage(coverage: f64) -> QualityFlag {
        if coverage >= 0.95 {
            QualityFlag::Pass
        } else if coverage >= 0.85 {
            QualityFlag::Caution
        } else {
            QualityFlag::WeakSignal
        }
    }
}

/// Per (definition, geography, month) coverage facts. Immutable once
/// produced; a recomputation supersedes the record rather than editing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRecord {
    pub definition: DefinitionId,
    pub geography: Geography,
    pub month: Month,
    pub selected_weight: f64,
    /// Weight of the availability set after policy application.
    pub available_weight: f64,
    pub coverage: f64,
    /// Items whose level was carried forward or imputed rather than
    /// observed.
    pub filled_items: usize,
    /// True when any contributing observation is provisional.
    pub provisional: bool,
    pub flag: QualityFlag,
}

/// One member of the availability set A(d,g,t).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedItem {
    pub id: ItemId,
    /// Renormalized weight ŵ_i; the set sums to 1 within 1e-8.
    pub weight: f64,
    pub level: f64,
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthResolution {
    pub month: Month,
    /// Sorted by item id (inherited from the universe).
    pub items: Vec<ResolvedItem>,
    pub coverage: CoverageRecord,
}

struct Row {
    id: ItemId,
    weight: f64,
    level: f64,
    filled: bool,
    provisional: bool,
}

/// Resolves one month of one definition/geography: availability set,
/// renormalized weights and the coverage record.
///
/// Coverage below the floor (or a zero available weight) aborts this
/// triple only; the caller computes neighboring months independently.
pub fn resolve_month(
    tables: &ReferenceTables,
    definition: &Definition,
    universe: &ResolvedUniverse,
    month: Month,
) -> Result<MonthResolution, EngineError> {
    let geography = &universe.geography;

    // Node indexes are only needed by ImputeParent and only when a gap
    // actually occurs, so they are built lazily at most once.
    let mut node_indexes: Option<HierarchyIndexes> = None;

    let mut rows: Vec<Row> = Vec::with_capacity(universe.items.len());
    for id in &universe.items {
        let Some(item) = tables.item(id) else {
            continue;
        };
        let Some(weight) = item.weight(geography) else {
            continue;
        };

        let point = tables.point(id, geography, month);
        let observed = point.and_then(|p| p.level.map(|level| (level, p.provisional)));

        let resolved = match (observed, definition.policy) {
            (Some((level, provisional)), _) => Some((level, false, provisional)),
            (None, MissingDataPolicy::DropAndRenormalize) => None,
            (None, MissingDataPolicy::CarryForward) => tables
                .latest_level_before(id, geography, month)
                .and_then(|(_, p)| p.level.map(|level| (level, true, p.provisional))),
            (None, MissingDataPolicy::ImputeParent) => {
                let indexes = node_indexes
                    .get_or_insert_with(|| aggregator::rollup(tables, universe, month));
                let ancestors: SmallVec<[_; 3]> = [
                    HierarchyLevel::Class,
                    HierarchyLevel::Group,
                    HierarchyLevel::Division,
                ]
                .iter()
                .map(|&level| item.hierarchy.truncate(level))
                .collect();
                let level = ancestors.iter().find_map(|code| indexes.get(code));
                match level {
                    Some(level) => Some((level, true, false)),
                    None => {
                        return Err(EngineError::ImputationExhausted {
                            item: id.clone(),
                            month,
                        })
                    }
                }
            }
        };

        if let Some((level, filled, provisional)) = resolved {
            rows.push(Row {
                id: id.clone(),
                weight,
                level,
                filled,
                provisional,
            });
        }
    }

    let available_weight: f64 = rows.iter().map(|r| r.weight).sum();
    let coverage = if universe.selected_weight > 0.0 {
        available_weight / universe.selected_weight
    } else {
        0.0
    };

    let floor = definition.coverage_floor();
    if !(available_weight > 0.0) || coverage < floor {
        return Err(EngineError::InsufficientCoverage {
            definition: definition.id.clone(),
            geography: geography.clone(),
            month,
            coverage,
            floor,
        });
    }

    let filled_items = rows.iter().filter(|r| r.filled).count();
    let provisional = rows.iter().any(|r| r.provisional);
    let items = rows
        .into_iter()
        .map(|r| ResolvedItem {
            id: r.id,
            weight: r.weight / available_weight,
            level: r.level,
            filled: r.filled,
        })
        .collect();

    Ok(MonthResolution {
        month,
        items,
        coverage: CoverageRecord {
            definition: definition.id.clone(),
            geography: geography.clone(),
            month,
            selected_weight: universe.selected_weight,
            available_weight,
            coverage,
            filled_items,
            provisional,
            flag: QualityFlag::from_coverage(coverage),
        },
    })
}
