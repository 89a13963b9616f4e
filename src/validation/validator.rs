//! The central validator that orchestrates the execution of all QA rules.

use super::finding::{QaFinding, QaReport, Severity};
use super::rules::{hierarchy, identity, series, weights};
use crate::compute::engine::SeriesResult;
use crate::compute::resolver::QualityFlag;
use crate::store::ReferenceTables;

/// Runs invariant checks over the reference tables and computed records.
///
/// The validator never mutates underlying data: table checks read only,
/// and record review degrades quality flags on the fresh records being
/// prepared for publication; it never rewrites a published record.
pub struct QaValidator<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> QaValidator<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    /// Static checks over the reference tables alone.
    pub fn validate_tables(&self) -> QaReport {
        let mut findings = Vec::new();
        findings.extend(weights::check(self.tables));
        findings.extend(hierarchy::check(self.tables));
        findings.extend(series::check(self.tables));
        sort(&mut findings);
        QaReport { findings }
    }

    /// Per-record checks over one computed series. Data findings degrade
    /// the affected month's quality flag; nothing is blocked or removed.
    pub fn review_series(&self, result: &mut SeriesResult) -> Vec<QaFinding> {
        let mut findings = Vec::new();
        for record in &mut result.months {
            let mut month_findings = Vec::new();

            if !record.index.is_finite() || record.index <= 0.0 {
                month_findings.push(QaFinding {
                    severity: Severity::Data,
                    kind: super::finding::FindingKind::IndexBounds,
                    subject: triple(record),
                    message: format!("index level {} outside the valid range", record.index),
                });
            }
            if let Some(mom) = record.mom {
                if mom.abs() > series::MOM_OUTLIER_PCT {
                    month_findings.push(QaFinding {
                        severity: Severity::Data,
                        kind: super::finding::FindingKind::MomOutlier,
                        subject: triple(record),
                        message: format!("published month-on-month rate of {mom:.1}%"),
                    });
                }
            }
            if let Some(set) = &record.contributions {
                month_findings.extend(identity::check(set));
            }

            if month_findings.iter().any(|f| f.severity == Severity::Data) {
                record.coverage.flag = QualityFlag::Error;
            }
            findings.extend(month_findings);
        }
        sort(&mut findings);
        findings
    }

    /// Full sweep: table checks plus review of every computed series.
    pub fn review_all(&self, results: &mut [SeriesResult]) -> QaReport {
        let mut report = self.validate_tables();
        for result in results.iter_mut() {
            report.findings.extend(self.review_series(result));
        }
        sort(&mut report.findings);
        report
    }
}

fn triple(record: &crate::compute::engine::MonthRecord) -> String {
    format!("{}/{}/{}", record.definition, record.geography, record.month)
}

/// Deterministic report order regardless of table-iteration order.
fn sort(findings: &mut [QaFinding]) {
    findings.sort_by(|a, b| {
        (a.severity, a.kind, &a.subject, &a.message).cmp(&(b.severity, b.kind, &b.subject, &b.message))
    });
}
