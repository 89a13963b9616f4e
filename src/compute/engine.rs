//! The batch engine.
//!
//! (definition × geography) series are independent and run on rayon
//! workers; months inside one series stay sequential because rates and
//! contributions read neighboring months of the same series. Everything
//! is a pure function of the table snapshot; a re-run reproduces every
//! record bit for bit.

use super::aggregator;
use super::inflation::{IndexSeries, YOY_LAG};
use super::resolver::{self, CoverageRecord, MonthResolution};
use crate::analysis::contributions::{decompose_yoy, ContributionSet};
use crate::error::EngineError;
use crate::store::{DefinitionId, Geography, Month, ReferenceTables};
use crate::universe::{self, Definition};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// One published (definition, geography, month) output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRecord {
    pub definition: DefinitionId,
    pub geography: Geography,
    pub month: Month,
    pub index: f64,
    /// None while the series lacks the t−1 / t−12 base month.
    pub mom: Option<f64>,
    pub yoy: Option<f64>,
    pub coverage: CoverageRecord,
    /// Present exactly when the YoY rate is.
    pub contributions: Option<ContributionSet>,
}

/// A month that aborted (coverage or imputation) while its siblings
/// proceeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthFailure {
    pub month: Month,
    pub error: EngineError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesResult {
    pub definition: DefinitionId,
    pub geography: Geography,
    /// Set when the definition itself failed (empty universe); no months
    /// are computed then.
    pub fatal: Option<EngineError>,
    pub months: Vec<MonthRecord>,
    pub failures: Vec<MonthFailure>,
    pub series: IndexSeries,
}

pub struct Engine<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> Engine<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    /// Computes every applicable (definition, geography) series over the
    /// requested months. Output order follows the input order of
    /// definitions and geographies regardless of worker scheduling.
    pub fn run(
        &self,
        definitions: &[Definition],
        geographies: &[Geography],
        months: &[Month],
    ) -> Vec<SeriesResult> {
        let mut months = months.to_vec();
        months.sort();
        months.dedup();

        let pairs: Vec<(&Definition, &Geography)> = definitions
            .iter()
            .flat_map(|def| {
                geographies
                    .iter()
                    .filter(|geo| def.applies_to(geo))
                    .map(move |geo| (def, geo))
            })
            .collect();

        pairs
            .into_par_iter()
            .map(|(def, geo)| self.run_series(def, geo, &months))
            .collect()
    }

    fn run_series(
        &self,
        definition: &Definition,
        geography: &Geography,
        months: &[Month],
    ) -> SeriesResult {
        let universe = match universe::resolve(self.tables, definition, geography) {
            Ok(universe) => universe,
            Err(error) => {
                return SeriesResult {
                    definition: definition.id.clone(),
                    geography: geography.clone(),
                    fatal: Some(error),
                    months: Vec::new(),
                    failures: Vec::new(),
                    series: IndexSeries::new(),
                }
            }
        };

        let mut resolutions: BTreeMap<Month, MonthResolution> = BTreeMap::new();
        let mut failures = Vec::new();
        for &month in months {
            match resolver::resolve_month(self.tables, definition, &universe, month) {
                Ok(resolution) => {
                    resolutions.insert(month, resolution);
                }
                Err(error) => failures.push(MonthFailure { month, error }),
            }
        }

        let mut series = IndexSeries::new();
        for (&month, resolution) in &resolutions {
            series.insert(month, aggregator::aggregate(resolution));
        }

        let records = resolutions
            .iter()
            .map(|(&month, resolution)| {
                let yoy = series.yoy(month).ok();
                let contributions = yoy.and_then(|_| {
                    let prior = month.minus(YOY_LAG)?;
                    let prior_res = resolutions.get(&prior)?;
                    Some(decompose_yoy(resolution, prior_res))
                });
                MonthRecord {
                    definition: definition.id.clone(),
                    geography: geography.clone(),
                    month,
                    index: series.level(month).unwrap_or_default(),
                    mom: series.mom(month).ok(),
                    yoy,
                    coverage: resolution.coverage.clone(),
                    contributions,
                }
            })
            .collect();

        SeriesResult {
            definition: definition.id.clone(),
            geography: geography.clone(),
            fatal: None,
            months: records,
            failures,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::resolver::MissingDataPolicy;
    use crate::store::{HierarchyCode, Item, ItemId, SeriesPoint, TablesBuilder};
    use crate::universe::{InclusionRule, RulePattern};
    use std::collections::{BTreeMap, BTreeSet};

    fn item(id: &str, code: &str, weight: f64) -> Item {
        let mut weights = BTreeMap::new();
        weights.insert(Geography("Combined".into()), weight);
        Item {
            id: ItemId(id.into()),
            name: id.into(),
            hierarchy: HierarchyCode(code.into()),
            tags: BTreeSet::new(),
            priority: 1,
            available: true,
            weights,
        }
    }

    fn definition(id: &str) -> Definition {
        Definition {
            id: DefinitionId(id.into()),
            name: id.into(),
            include: InclusionRule::All,
            exclude: vec![],
            geographies: vec![],
            policy: MissingDataPolicy::DropAndRenormalize,
            min_coverage: None,
        }
    }

    /// Two items over 14 months; one month loses all observations and must
    /// fail alone while its neighbors produce records and rates.
    fn tables_with_gap() -> crate::store::ReferenceTables {
        let base = Month::new(2024, 1).unwrap();
        let geo = Geography("Combined".into());
        let gap = Month::new(2024, 7).unwrap();
        let mut builder = TablesBuilder::new(base);
        builder.add_item(item("01.1.1.1", "01.1.1", 60.0));
        builder.add_item(item("02.1.1.1", "02.1.1", 40.0));
        let mut month = base;
        let mut level = 100.0;
        for _ in 0..14 {
            for id in ["01.1.1.1", "02.1.1.1"] {
                let point = if month == gap {
                    SeriesPoint {
                        level: None,
                        provisional: false,
                    }
                } else {
                    SeriesPoint {
                        level: Some(level),
                        provisional: false,
                    }
                };
                builder
                    .add_point(ItemId(id.into()), geo.clone(), month, point)
                    .unwrap();
            }
            level *= 1.01;
            month = month.next();
        }
        builder.finish().unwrap()
    }

    fn all_months(from: Month, count: u32) -> Vec<Month> {
        (0..count).map(|i| Month(from.0 + i)).collect()
    }

    #[test]
    fn test_gap_month_fails_alone() {
        let tables = tables_with_gap();
        let engine = Engine::new(&tables);
        let months = all_months(Month::new(2024, 1).unwrap(), 14);
        let results = engine.run(
            &[definition("headline")],
            &[Geography("Combined".into())],
            &months,
        );
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.fatal.is_none());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].month, Month::new(2024, 7).unwrap());
        assert!(matches!(
            result.failures[0].error,
            EngineError::InsufficientCoverage { .. }
        ));
        assert_eq!(result.months.len(), 13);

        // MoM exists from the second month on, except across the gap.
        let august = result
            .months
            .iter()
            .find(|r| r.month == Month::new(2024, 8).unwrap())
            .unwrap();
        assert!(august.mom.is_none());
        let june = result
            .months
            .iter()
            .find(|r| r.month == Month::new(2024, 6).unwrap())
            .unwrap();
        assert!((june.mom.unwrap() - 1.0).abs() < 1e-9);

        // YoY and contributions appear exactly at month 13.
        let feb25 = result
            .months
            .iter()
            .find(|r| r.month == Month::new(2025, 2).unwrap())
            .unwrap();
        let yoy = feb25.yoy.unwrap();
        assert!((yoy - ((1.01f64.powi(12) - 1.0) * 100.0)).abs() < 1e-9);
        let set = feb25.contributions.as_ref().unwrap();
        assert!((set.yoy - yoy).abs() < 1e-12);
        assert!(set.residual.abs() < 1e-9);
    }

    #[test]
    fn test_fatal_definition_does_not_stop_siblings() {
        let tables = tables_with_gap();
        let engine = Engine::new(&tables);
        let months = all_months(Month::new(2024, 1).unwrap(), 3);
        let mut broken = definition("core-ex-everything");
        broken.exclude = vec![RulePattern::Hierarchy(HierarchyCode("01".into()))];
        broken.include = InclusionRule::AnyOf(vec![RulePattern::Hierarchy(HierarchyCode(
            "01".into(),
        ))]);
        let results = engine.run(
            &[broken, definition("headline")],
            &[Geography("Combined".into())],
            &months,
        );
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0].fatal,
            Some(EngineError::EmptyUniverse { .. })
        ));
        assert!(results[0].months.is_empty());
        assert!(results[1].fatal.is_none());
        assert_eq!(results[1].months.len(), 3);
    }

    /// Idempotence across the parallel path: two runs are bit-identical.
    #[test]
    fn test_parallel_runs_are_deterministic() {
        let tables = tables_with_gap();
        let engine = Engine::new(&tables);
        let months = all_months(Month::new(2024, 1).unwrap(), 14);
        let defs = [definition("headline"), definition("all-items")];
        let geos = [Geography("Combined".into())];
        let first = engine.run(&defs, &geos, &months);
        let second = engine.run(&defs, &geos, &months);
        assert_eq!(first, second);
        for (a, b) in first[0].months.iter().zip(&second[0].months) {
            assert_eq!(a.index.to_bits(), b.index.to_bits());
        }
    }
}
