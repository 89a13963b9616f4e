//! Definitions and universe resolution.
//!
//! A `Definition` is immutable configuration created by an external loader.
//! Its item set is derived on every call, never stored, so weight or
//! hierarchy revisions are always picked up.

pub mod rules;

pub use rules::RulePattern;

use crate::compute::resolver::MissingDataPolicy;
use crate::error::EngineError;
use crate::store::{DefinitionId, Geography, ItemId, ReferenceTables};
use serde::{Deserialize, Serialize};

/// Hard coverage floor below which a month's computation aborts.
pub const COVERAGE_FLOOR: f64 = 0.70;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InclusionRule {
    /// Every item with the availability flag set.
    All,
    /// Union of items matching any listed pattern (still restricted to
    /// flagged items; unflagged items carry no publishable weight).
    AnyOf(Vec<RulePattern>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    pub name: String,
    pub include: InclusionRule,
    /// OR semantics across patterns; commutative set removal.
    pub exclude: Vec<RulePattern>,
    /// Geographies this definition is published for. Empty = all.
    pub geographies: Vec<Geography>,
    pub policy: MissingDataPolicy,
    /// Optional tightening of the fixed coverage floor. A value below
    /// `COVERAGE_FLOOR` has no effect; the floor never loosens.
    pub min_coverage: Option<f64>,
}

impl Definition {
    pub fn applies_to(&self, geography: &Geography) -> bool {
        self.geographies.is_empty() || self.geographies.contains(geography)
    }

    pub fn coverage_floor(&self) -> f64 {
        match self.min_coverage {
            Some(floor) => floor.max(COVERAGE_FLOOR),
            None => COVERAGE_FLOOR,
        }
    }
}

/// The derived item set S(d,g) of a definition in one geography.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedUniverse {
    pub definition: DefinitionId,
    pub geography: Geography,
    /// Sorted item ids; the deterministic iteration order for all
    /// downstream sums.
    pub items: Vec<ItemId>,
    /// Total selected weight W_S.
    pub selected_weight: f64,
}

/// Resolves a definition's item set against the current tables.
///
/// Selecting nothing is a configuration defect, not a runtime condition:
/// a zero selected weight fails with `EmptyUniverse`.
pub fn resolve(
    tables: &ReferenceTables,
    definition: &Definition,
    geography: &Geography,
) -> Result<ResolvedUniverse, EngineError> {
    if !definition.applies_to(geography) {
        return Err(EngineError::GeographyNotApplicable {
            definition: definition.id.clone(),
            geography: geography.clone(),
        });
    }

    let mut items = Vec::new();
    let mut selected_weight = 0.0;

    // Items are stored sorted by id, so the resolved set is sorted too.
    for item in tables.items() {
        if !item.available {
            continue;
        }
        let included = match &definition.include {
            InclusionRule::All => true,
            InclusionRule::AnyOf(patterns) => rules::any_matches(patterns, item),
        };
        if !included || rules::any_matches(&definition.exclude, item) {
            continue;
        }
        // An item without a weight in this geography is not part of this
        // geography's basket.
        let Some(weight) = item.weight(geography) else {
            continue;
        };
        selected_weight += weight;
        items.push(item.id.clone());
    }

    if !(selected_weight > 0.0) {
        return Err(EngineError::EmptyUniverse {
            definition: definition.id.clone(),
            geography: geography.clone(),
        });
    }

    Ok(ResolvedUniverse {
        definition: definition.id.clone(),
        geography: geography.clone(),
        items,
        selected_weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{HierarchyCode, Item, Month, TablesBuilder};
    use std::collections::{BTreeMap, BTreeSet};

    fn item(id: &str, code: &str, tags: &[&str], weight: f64, available: bool) -> Item {
        let mut weights = BTreeMap::new();
        weights.insert(Geography("Combined".into()), weight);
        Item {
            id: ItemId(id.into()),
            name: id.into(),
            hierarchy: HierarchyCode(code.into()),
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            priority: 1,
            available,
            weights,
        }
    }

    fn tables() -> ReferenceTables {
        let mut builder = TablesBuilder::new(Month::new(2024, 1).unwrap());
        builder.add_item(item("01.1.1.1", "01.1.1", &["food"], 40.0, true));
        builder.add_item(item("04.1.1.1", "04.1.1", &[], 30.0, true));
        builder.add_item(item("07.2.2.1", "07.2.2", &["fuel"], 20.0, true));
        builder.add_item(item("07.2.2.2", "07.2.2", &["fuel"], 10.0, true));
        builder.add_item(item("99.9.9.9", "99.9.9", &[], 5.0, false));
        builder.finish().unwrap()
    }

    fn headline() -> Definition {
        Definition {
            id: DefinitionId("headline".into()),
            name: "Headline".into(),
            include: InclusionRule::All,
            exclude: vec![],
            geographies: vec![],
            policy: MissingDataPolicy::DropAndRenormalize,
            min_coverage: None,
        }
    }

    #[test]
    fn test_headline_resolves_full_flagged_universe() {
        let tables = tables();
        let geo = Geography("Combined".into());
        let resolved = resolve(&tables, &headline(), &geo).unwrap();
        // The unflagged item is not part of the universe.
        assert_eq!(resolved.items.len(), 4);
        assert!((resolved.selected_weight - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_exclusions_compose_with_or_semantics() {
        let tables = tables();
        let geo = Geography("Combined".into());
        let mut def = headline();
        def.exclude = vec![
            RulePattern::Tag("fuel".into()),
            RulePattern::Id(ItemId("04.1.1.1".into())),
        ];
        let resolved = resolve(&tables, &def, &geo).unwrap();
        assert_eq!(resolved.items, vec![ItemId("01.1.1.1".into())]);
        assert!((resolved.selected_weight - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_exclusion_order_is_irrelevant() {
        let tables = tables();
        let geo = Geography("Combined".into());
        let mut forward = headline();
        forward.exclude = vec![
            RulePattern::Tag("fuel".into()),
            RulePattern::Hierarchy(HierarchyCode("07".into())),
        ];
        let mut reversed = headline();
        reversed.exclude = forward.exclude.iter().rev().cloned().collect();

        let a = resolve(&tables, &forward, &geo).unwrap();
        let b = resolve(&tables, &reversed, &geo).unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(a.selected_weight, b.selected_weight);
    }

    #[test]
    fn test_empty_universe_is_a_configuration_error() {
        let tables = tables();
        let geo = Geography("Combined".into());
        let mut def = headline();
        def.exclude = vec![
            RulePattern::Hierarchy(HierarchyCode("01".into())),
            RulePattern::Hierarchy(HierarchyCode("04".into())),
            RulePattern::Hierarchy(HierarchyCode("07".into())),
        ];
        let err = resolve(&tables, &def, &geo).unwrap_err();
        assert!(matches!(err, EngineError::EmptyUniverse { .. }));
    }

    #[test]
    fn test_inapplicable_geography_rejected() {
        let tables = tables();
        let mut def = headline();
        def.geographies = vec![Geography("Rural".into())];
        let err = resolve(&tables, &def, &Geography("Combined".into())).unwrap_err();
        assert!(matches!(err, EngineError::GeographyNotApplicable { .. }));
    }

    #[test]
    fn test_allow_list_inclusion() {
        let tables = tables();
        let geo = Geography("Combined".into());
        let mut def = headline();
        def.include = InclusionRule::AnyOf(vec![RulePattern::Hierarchy(HierarchyCode(
            "07.2".into(),
        ))]);
        let resolved = resolve(&tables, &def, &geo).unwrap();
        assert_eq!(resolved.items.len(), 2);
        assert!((resolved.selected_weight - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_coverage_floor_only_tightens() {
        let mut def = headline();
        def.min_coverage = Some(0.5);
        assert_eq!(def.coverage_floor(), COVERAGE_FLOOR);
        def.min_coverage = Some(0.9);
        assert_eq!(def.coverage_floor(), 0.9);
    }
}
