//! Structured QA findings.
//!
//! A finding never interrupts computation by itself: fatal findings mean
//! the affected definition must not be trusted, data findings degrade the
//! affected record's quality flag, consistency findings surface residuals
//! for review. The kind enum allows programmatic inspection, which is more
//! robust than string matching on the message.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Configuration defects: the affected definition must not publish.
    Fatal,
    /// Input-data defects: the affected record's flag degrades, siblings
    /// proceed.
    Data,
    /// Numerical-consistency residuals beyond tolerance: surfaced, never
    /// repaired by adjusting contributions.
    Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FindingKind {
    WeightSum,
    WeightRange,
    DuplicateItemId,
    HierarchyCycle,
    MissingParent,
    UnresolvedItemCode,
    ChildCountMismatch,
    BaseMonthLevel,
    IndexBounds,
    MomOutlier,
    ContributionResidual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaFinding {
    pub severity: Severity,
    pub kind: FindingKind,
    /// The offending entity: item id, geography, node code, or a
    /// definition/geography/month triple.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QaReport {
    pub findings: Vec<QaFinding>,
}

impl QaReport {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn has_fatal(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Fatal)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}
