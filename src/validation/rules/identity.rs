//! The contribution-sum identity: yoy = Σ contributions + residual, with
//! the residual inside tolerance whenever availability parity holds.

use crate::analysis::contributions::{ContributionSet, CONTRIBUTION_TOLERANCE_PP};
use crate::validation::finding::{FindingKind, QaFinding, Severity};

pub(crate) fn check(set: &ContributionSet) -> Option<QaFinding> {
    // The identity itself holds by construction (residual is defined as
    // the gap); what QA surfaces is a residual beyond tolerance.
    if set.residual.abs() > CONTRIBUTION_TOLERANCE_PP {
        return Some(QaFinding {
            severity: Severity::Consistency,
            kind: FindingKind::ContributionResidual,
            subject: format!("{}/{}/{}", set.definition, set.geography, set.month),
            message: format!(
                "contribution sum misses the rate by {:.4} pp (availability parity broken)",
                set.residual
            ),
        });
    }
    None
}
