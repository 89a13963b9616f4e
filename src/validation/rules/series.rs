//! Time-series rules: base-month levels, level bounds, MoM outliers.

use crate::store::ReferenceTables;
use crate::validation::finding::{FindingKind, QaFinding, Severity};

/// Base-month levels must equal 100 within this tolerance.
pub const BASE_LEVEL_TOLERANCE: f64 = 0.01;

/// A month-on-month move beyond this many percent flags the observation.
pub const MOM_OUTLIER_PCT: f64 = 25.0;

pub(crate) fn check(tables: &ReferenceTables) -> Vec<QaFinding> {
    let mut findings = Vec::new();
    let base = tables.base_month();

    for (item, geography, points) in tables.series_entries() {
        let subject = |month: &dyn std::fmt::Display| format!("{item}/{geography}/{month}");

        if let Some(level) = points.get(&base).and_then(|p| p.level) {
            if (level - 100.0).abs() > BASE_LEVEL_TOLERANCE {
                findings.push(QaFinding {
                    severity: Severity::Data,
                    kind: FindingKind::BaseMonthLevel,
                    subject: subject(&base),
                    message: format!("base-month level {level} differs from 100"),
                });
            }
        }

        let mut prior: Option<(crate::store::Month, f64)> = None;
        for (&month, point) in points {
            let Some(level) = point.level else {
                prior = None;
                continue;
            };
            if !level.is_finite() || level <= 0.0 {
                findings.push(QaFinding {
                    severity: Severity::Data,
                    kind: FindingKind::IndexBounds,
                    subject: subject(&month),
                    message: format!("level {level} outside the valid range"),
                });
            }
            if let Some((prev_month, prev_level)) = prior {
                // Outlier check only over adjacent observed months.
                if month == prev_month.next() && prev_level > 0.0 {
                    let mom = (level / prev_level - 1.0) * 100.0;
                    if mom.abs() > MOM_OUTLIER_PCT {
                        findings.push(QaFinding {
                            severity: Severity::Data,
                            kind: FindingKind::MomOutlier,
                            subject: subject(&month),
                            message: format!("month-on-month move of {mom:.1}%"),
                        });
                    }
                }
            }
            prior = Some((month, level));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Geography, ItemId, Month, SeriesPoint, TablesBuilder};

    fn add(builder: &mut TablesBuilder, month: Month, level: f64) {
        builder
            .add_point(
                ItemId("01.1.1.1".into()),
                Geography("Combined".into()),
                month,
                SeriesPoint {
                    level: Some(level),
                    provisional: false,
                },
            )
            .unwrap();
    }

    #[test]
    fn test_base_month_level_checked() {
        let base = Month::new(2024, 1).unwrap();
        let mut builder = TablesBuilder::new(base);
        add(&mut builder, base, 101.5);
        let findings = check(&builder.finish().unwrap());
        assert!(findings
            .iter()
            .any(|f| f.kind == FindingKind::BaseMonthLevel));
    }

    #[test]
    fn test_mom_outlier_flagged() {
        let base = Month::new(2024, 1).unwrap();
        let mut builder = TablesBuilder::new(base);
        add(&mut builder, base, 100.0);
        add(&mut builder, base.next(), 140.0);
        let findings = check(&builder.finish().unwrap());
        assert!(findings.iter().any(|f| f.kind == FindingKind::MomOutlier));
    }

    #[test]
    fn test_calm_series_passes() {
        let base = Month::new(2024, 1).unwrap();
        let mut builder = TablesBuilder::new(base);
        let mut level = 100.0;
        let mut month = base;
        for _ in 0..6 {
            add(&mut builder, month, level);
            level *= 1.01;
            month = month.next();
        }
        let findings = check(&builder.finish().unwrap());
        assert!(findings.is_empty(), "{findings:?}");
    }
}
