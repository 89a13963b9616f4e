//! Plain-text rendering of QA reports and computed series.
//!
//! The engine never prints; callers (the dashboard layer) decide where
//! these strings go.

use crate::compute::engine::SeriesResult;
use crate::validation::{QaReport, Severity};
use std::fmt::Write;

pub fn format_report(report: &QaReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QA REPORT: {} finding(s)", report.findings.len());
    let _ = writeln!(out, "--------------------------------------------------");
    if report.findings.is_empty() {
        let _ = writeln!(out, "all checks passed");
        return out;
    }
    for severity in [Severity::Fatal, Severity::Data, Severity::Consistency] {
        let group: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{:?}] {} finding(s)", severity, group.len());
        for finding in group {
            let _ = writeln!(out, "  {:?} {} -> {}", finding.kind, finding.subject, finding.message);
        }
    }
    out
}

pub fn format_series(result: &SeriesResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "SERIES {} / {}",
        result.definition, result.geography
    );
    let _ = writeln!(out, "--------------------------------------------------");
    if let Some(fatal) = &result.fatal {
        let _ = writeln!(out, "FATAL: {fatal}");
        return out;
    }
    let _ = writeln!(out, "{:>8} {:>10} {:>8} {:>8} {:>6} {:>6}", "month", "index", "mom%", "yoy%", "cov", "flag");
    for record in &result.months {
        let fmt_rate = |r: Option<f64>| match r {
            Some(v) => format!("{v:8.2}"),
            None => format!("{:>8}", "-"),
        };
        let _ = writeln!(
            out,
            "{:>8} {:>10.2} {} {} {:6.3} {:>6}",
            record.month.to_string(),
            record.index,
            fmt_rate(record.mom),
            fmt_rate(record.yoy),
            record.coverage.coverage,
            format!("{:?}", record.coverage.flag),
        );
    }
    for failure in &result.failures {
        let _ = writeln!(out, "{:>8}  {}", failure.month.to_string(), failure.error);
    }
    out
}
