//! Weight-table rules: per-geography sums, weight ranges, id uniqueness.

use crate::store::ReferenceTables;
use crate::validation::finding::{FindingKind, QaFinding, Severity};
use std::collections::BTreeMap;

/// The weight-sum invariant tolerance: flagged weights per geography must
/// total 100 within 0.01.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

pub(crate) fn check(tables: &ReferenceTables) -> Vec<QaFinding> {
    let mut findings = Vec::new();

    let mut sums: BTreeMap<_, f64> = BTreeMap::new();
    for item in tables.items() {
        for (geography, &weight) in &item.weights {
            if !(0.0..=100.0).contains(&weight) {
                findings.push(QaFinding {
                    severity: Severity::Data,
                    kind: FindingKind::WeightRange,
                    subject: format!("{}/{}", item.id, geography),
                    message: format!("weight {weight} outside 0..=100"),
                });
            }
            if item.available {
                *sums.entry(geography.clone()).or_insert(0.0) += weight;
            }
        }
    }
    for (geography, sum) in sums {
        if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            findings.push(QaFinding {
                severity: Severity::Data,
                kind: FindingKind::WeightSum,
                subject: geography.to_string(),
                message: format!("flagged weights sum to {sum:.4}, expected 100 ± {WEIGHT_SUM_TOLERANCE}"),
            });
        }
    }

    // Items arrive sorted; duplicates would sit adjacent. The builder
    // rejects them, but deserialized snapshots bypass the builder.
    for pair in tables.items().windows(2) {
        if pair[0].id == pair[1].id {
            findings.push(QaFinding {
                severity: Severity::Data,
                kind: FindingKind::DuplicateItemId,
                subject: pair[0].id.to_string(),
                message: "item id appears more than once".to_string(),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Geography, HierarchyCode, Item, ItemId, Month, TablesBuilder};
    use std::collections::{BTreeMap, BTreeSet};

    fn item(id: &str, weight: f64, available: bool) -> Item {
        let mut weights = BTreeMap::new();
        weights.insert(Geography("Combined".into()), weight);
        Item {
            id: ItemId(id.into()),
            name: id.into(),
            hierarchy: HierarchyCode("01.1.1".into()),
            tags: BTreeSet::new(),
            priority: 1,
            available,
            weights,
        }
    }

    #[test]
    fn test_weight_sum_within_tolerance_passes() {
        let mut builder = TablesBuilder::new(Month::new(2024, 1).unwrap());
        builder.add_item(item("a", 60.004, true));
        builder.add_item(item("b", 40.0, true));
        // Unflagged weight does not count toward the sum.
        builder.add_item(item("c", 7.0, false));
        let findings = check(&builder.finish().unwrap());
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_weight_sum_violation_is_flagged() {
        let mut builder = TablesBuilder::new(Month::new(2024, 1).unwrap());
        builder.add_item(item("a", 60.0, true));
        builder.add_item(item("b", 39.5, true));
        let findings = check(&builder.finish().unwrap());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::WeightSum);
        assert_eq!(findings[0].severity, Severity::Data);
    }

    #[test]
    fn test_out_of_range_weight_is_flagged() {
        let mut builder = TablesBuilder::new(Month::new(2024, 1).unwrap());
        builder.add_item(item("a", 101.0, true));
        let findings = check(&builder.finish().unwrap());
        assert!(findings
            .iter()
            .any(|f| f.kind == FindingKind::WeightRange));
    }
}
