//! Findings - the emitted record of one verified interaction

use crate::{Evidence, Outcome, Promise, SignalKind};
use serde::{Deserialize, Serialize};

/// How the interaction was performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction type: click, submit, input, ...
    pub interaction_type: String,
    pub selector: String,
    /// Path of the page the interaction ran on.
    pub url_path: String,
}

impl Interaction {
    pub fn new(
        interaction_type: impl Into<String>,
        selector: impl Into<String>,
        url_path: impl Into<String>,
    ) -> Self {
        Self {
            interaction_type: interaction_type.into(),
            selector: selector.into(),
            url_path: url_path.into(),
        }
    }
}

/// Confidence grade of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Confirmed,
    Suspected,
    Informational,
}

/// Severity, ascending. Derived ordering follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Final judgment classes, ascending by priority. FailureMisleading
/// outranks FailureSilent outranks NeedsReview outranks WeakPass outranks
/// Pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Pass,
    WeakPass,
    NeedsReview,
    FailureSilent,
    FailureMisleading,
}

impl Judgment {
    /// Numeric priority used in emission ordering.
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailureSilent | Self::FailureMisleading)
    }
}

/// The finding record emitted per (promise, interaction) pair.
///
/// Immutable once emitted. `identity_hash` is stable across runs for a
/// fixed source; `determinism_hash` excludes timestamps and generated ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Generated id; never part of any hash.
    pub id: String,
    /// Stable finding family label.
    pub finding_type: String,
    pub judgment: Judgment,
    pub status: FindingStatus,
    pub severity: Severity,
    /// In [0, 1].
    pub confidence: f64,
    pub promise: Promise,
    /// Signal kinds observed after filtering.
    pub observed: Vec<SignalKind>,
    pub outcome: Outcome,
    pub evidence: Evidence,
    /// What this means for the user journey.
    pub impact: String,
    pub interaction: Option<Interaction>,
    /// Optional extra detail attached by the orchestrator.
    pub enrichment: Option<serde_json::Value>,
    pub determinism_hash: String,
    pub identity_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judgment_priority_order() {
        assert!(Judgment::FailureMisleading.priority() > Judgment::FailureSilent.priority());
        assert!(Judgment::FailureSilent.priority() > Judgment::NeedsReview.priority());
        assert!(Judgment::NeedsReview.priority() > Judgment::WeakPass.priority());
        assert!(Judgment::WeakPass.priority() > Judgment::Pass.priority());
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_failure_judgments() {
        assert!(Judgment::FailureSilent.is_failure());
        assert!(Judgment::FailureMisleading.is_failure());
        assert!(!Judgment::NeedsReview.is_failure());
        assert!(!Judgment::Pass.is_failure());
    }
}
