//! Emission order and exit codes
//!
//! Findings are emitted in a total, deterministic order; the process exit
//! code is the highest-precedence event observed in the scan.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use verax_types::{Finding, Judgment};

/// Sort findings for emission: promise id ascending, then judgment
/// priority descending, then severity descending, then determinism hash
/// ascending. The order is total.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        (
            &a.promise.id,
            Reverse(a.judgment.priority()),
            Reverse(a.severity),
            &a.determinism_hash,
        )
            .cmp(&(
                &b.promise.id,
                Reverse(b.judgment.priority()),
                Reverse(b.severity),
                &b.determinism_hash,
            ))
    });
}

/// Process exit codes, by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCode {
    Success,
    NeedsReview,
    FailureSilent,
    FailureMisleading,
    Infrastructure,
    EvidenceLaw,
    Usage,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NeedsReview => 10,
            Self::FailureSilent => 20,
            Self::FailureMisleading => 30,
            Self::Infrastructure => 40,
            Self::EvidenceLaw => 50,
            Self::Usage => 64,
        }
    }

    /// Precedence rank; higher wins. Usage errors preempt scan results
    /// entirely and evidence-law violations outrank everything observed.
    fn rank(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NeedsReview => 1,
            Self::FailureSilent => 2,
            Self::FailureMisleading => 3,
            Self::Infrastructure => 4,
            Self::EvidenceLaw => 5,
            Self::Usage => 6,
        }
    }
}

/// Scan-level events that feed the exit code besides the findings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExitEvents {
    pub evidence_law_violated: bool,
    pub infrastructure_failure: bool,
    pub usage_error: bool,
}

/// Determine the exit code from findings and scan-level events.
pub fn exit_code(findings: &[Finding], events: ExitEvents) -> ExitCode {
    let mut best = ExitCode::Success;
    let mut consider = |candidate: ExitCode| {
        if candidate.rank() > best.rank() {
            best = candidate;
        }
    };

    if events.usage_error {
        consider(ExitCode::Usage);
    }
    if events.evidence_law_violated {
        consider(ExitCode::EvidenceLaw);
    }
    if events.infrastructure_failure {
        consider(ExitCode::Infrastructure);
    }
    for finding in findings {
        match finding.judgment {
            Judgment::FailureMisleading => consider(ExitCode::FailureMisleading),
            Judgment::FailureSilent => consider(ExitCode::FailureSilent),
            Judgment::NeedsReview => consider(ExitCode::NeedsReview),
            Judgment::WeakPass | Judgment::Pass => {}
        }
    }
    best
}
