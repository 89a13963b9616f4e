//! Weighted-mean index aggregation and hierarchical rollup.
//!
//! Aggregation is a pure function of its inputs: items enter the sum in
//! sorted-id order, so identical snapshots reproduce bit-identical levels.

use super::resolver::MonthResolution;
use crate::store::{HierarchyCode, HierarchyLevel, Month, ReferenceTables};
use crate::universe::ResolvedUniverse;
use serde::Serialize;
use std::collections::BTreeMap;

/// I(d,g,t) = Σ ŵ_i · I_{i,t} over the availability set.
pub fn aggregate(resolution: &MonthResolution) -> f64 {
    resolution
        .items
        .iter()
        .map(|row| row.weight * row.level)
        .sum()
}

/// Node index levels for one (universe, month), keyed by dotted code.
/// Segment counts make codes unique across levels, so one map holds all
/// three levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyIndexes {
    levels: BTreeMap<HierarchyCode, f64>,
}

impl HierarchyIndexes {
    pub fn get(&self, code: &HierarchyCode) -> Option<f64> {
        self.levels.get(code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HierarchyCode, f64)> {
        self.levels.iter().map(|(c, &l)| (c, l))
    }
}

/// Rolls the universe's observed levels up the classification tree.
///
/// The weighted-mean formula is applied recursively, strictly children
/// before parents: class indexes from observed member items, group indexes
/// from class indexes, division indexes from group indexes. Each level
/// renormalizes over its own available children only: a child enters its
/// parent's mean with its full selected weight once it has an index at
/// all, so a missing grandchild affects only its immediate parent's
/// renormalization, never siblings on other branches.
pub fn rollup(
    tables: &ReferenceTables,
    universe: &ResolvedUniverse,
    month: Month,
) -> HierarchyIndexes {
    // Leaf pass: per-class weighted sums over observed items, plus each
    // class's full selected weight (availability-independent).
    let mut observed: BTreeMap<HierarchyCode, (f64, f64)> = BTreeMap::new();
    let mut selected: BTreeMap<HierarchyCode, f64> = BTreeMap::new();

    for id in &universe.items {
        let Some(item) = tables.item(id) else {
            continue;
        };
        let Some(weight) = item.weight(&universe.geography) else {
            continue;
        };
        let class = item.hierarchy.truncate(HierarchyLevel::Class);
        *selected.entry(class.clone()).or_insert(0.0) += weight;
        if let Some(level) = tables.level(id, &universe.geography, month) {
            let acc = observed.entry(class).or_insert((0.0, 0.0));
            acc.0 += weight;
            acc.1 += weight * level;
        }
    }

    let mut levels: BTreeMap<HierarchyCode, f64> = BTreeMap::new();
    for (code, (w, wl)) in &observed {
        if *w > 0.0 {
            levels.insert(code.clone(), wl / w);
        }
    }

    // Upward passes: group from class, division from group.
    for parent_level in [HierarchyLevel::Group, HierarchyLevel::Division] {
        let child_level = match parent_level {
            HierarchyLevel::Group => HierarchyLevel::Class,
            HierarchyLevel::Division => HierarchyLevel::Group,
            HierarchyLevel::Class => unreachable!(),
        };
        let mut acc: BTreeMap<HierarchyCode, (f64, f64)> = BTreeMap::new();
        let mut parent_selected: BTreeMap<HierarchyCode, f64> = BTreeMap::new();

        let child_codes: Vec<HierarchyCode> = selected
            .keys()
            .filter(|c| HierarchyLevel::of_code(c) == Some(child_level))
            .cloned()
            .collect();
        for child in child_codes {
            let parent = child.truncate(parent_level);
            let child_weight = selected[&child];
            *parent_selected.entry(parent.clone()).or_insert(0.0) += child_weight;
            if let Some(index) = levels.get(&child).copied() {
                let slot = acc.entry(parent).or_insert((0.0, 0.0));
                slot.0 += child_weight;
                slot.1 += child_weight * index;
            }
        }
        for (code, (w, wl)) in acc {
            if w > 0.0 {
                levels.insert(code, wl / w);
            }
        }
        selected.extend(parent_selected);
    }

    HierarchyIndexes { levels }
}
