//! The judgment builder
//!
//! Assembles the immutable finding from the pipeline's pieces, derives
//! severity from the judgment and the promise kind, applies the R5
//! anchor rule, and seals both hashes.

use crate::{determinism_hash, identity_hash};
use serde::{Deserialize, Serialize};
use verax_outcome::{apply_r5, AnchorVerdict};
use verax_types::{
    Acknowledgment, Evidence, Finding, FindingStatus, Interaction, Judgment, Outcome, OutcomeKind,
    Promise, PromiseKind, Severity,
};

/// Stable finding family label. Identity varies only with the interaction
/// coordinates and target path, never with the verdict.
pub const FINDING_TYPE: &str = "promise-verification";

/// Map an outcome to its judgment class.
pub fn judgment_of(outcome: OutcomeKind) -> Judgment {
    match outcome {
        OutcomeKind::Success => Judgment::Pass,
        OutcomeKind::PartialSuccess => Judgment::WeakPass,
        OutcomeKind::Ambiguous => Judgment::NeedsReview,
        OutcomeKind::SilentFailure => Judgment::FailureSilent,
        OutcomeKind::Misleading => Judgment::FailureMisleading,
    }
}

/// Severity from (judgment, promise kind). Failures on journeys that move
/// money or users are critical; cosmetic promises degrade gracefully.
pub fn severity_of(judgment: Judgment, kind: PromiseKind) -> Severity {
    match judgment {
        Judgment::FailureSilent | Judgment::FailureMisleading => match kind {
            PromiseKind::Submission | PromiseKind::Navigation | PromiseKind::Network(_) => {
                Severity::Critical
            }
            PromiseKind::Feedback(_) => Severity::High,
            PromiseKind::StateChange => Severity::Medium,
        },
        Judgment::NeedsReview => Severity::Medium,
        Judgment::WeakPass | Judgment::Pass => Severity::Low,
    }
}

fn status_of(judgment: Judgment) -> FindingStatus {
    match judgment {
        Judgment::FailureSilent | Judgment::FailureMisleading => FindingStatus::Confirmed,
        Judgment::NeedsReview => FindingStatus::Suspected,
        Judgment::WeakPass | Judgment::Pass => FindingStatus::Informational,
    }
}

fn impact_of(judgment: Judgment, kind: PromiseKind) -> String {
    match judgment {
        Judgment::FailureSilent => format!(
            "the {kind} promise failed with no feedback; users are left waiting"
        ),
        Judgment::FailureMisleading => format!(
            "the {kind} promise showed success while the operation failed"
        ),
        Judgment::NeedsReview => format!("the {kind} promise could not be verified either way"),
        Judgment::WeakPass => format!("the {kind} promise was only partially acknowledged"),
        Judgment::Pass => format!("the {kind} promise was kept"),
    }
}

/// What the builder produced, including the R5 bookkeeping the
/// enforcement artifact records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltJudgment {
    /// `None` when R5 dropped the finding.
    pub finding: Option<Finding>,
    pub r5: R5Disposition,
}

/// R5 disposition of one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum R5Disposition {
    Kept,
    Downgraded,
    Dropped,
}

/// Build the finding for one judged interaction.
pub fn build_finding(
    promise: &Promise,
    interaction: Option<&Interaction>,
    outcome: &Outcome,
    ack: &Acknowledgment,
    evidence: Evidence,
    enrichment: Option<serde_json::Value>,
) -> BuiltJudgment {
    let judgment = judgment_of(outcome.kind);
    let severity = severity_of(judgment, promise.kind);
    let initial_status = status_of(judgment);

    let (status, r5) = match apply_r5(initial_status, &evidence) {
        AnchorVerdict::Keep => (initial_status, R5Disposition::Kept),
        AnchorVerdict::Downgrade => {
            tracing::warn!(
                promise = %promise.id,
                "confirmed finding missing an anchor, downgraded to suspected"
            );
            (FindingStatus::Suspected, R5Disposition::Downgraded)
        }
        AnchorVerdict::Drop => {
            tracing::warn!(
                promise = %promise.id,
                "confirmed finding missing both anchors, dropped"
            );
            return BuiltJudgment {
                finding: None,
                r5: R5Disposition::Dropped,
            };
        }
    };

    let identity = identity_hash(FINDING_TYPE, interaction, promise.target_path());
    let determinism = determinism_hash(&identity, judgment, severity, &outcome.signals_present);

    let finding = Finding {
        id: uuid::Uuid::new_v4().to_string(),
        finding_type: FINDING_TYPE.to_string(),
        judgment,
        status,
        severity,
        confidence: outcome.confidence,
        promise: promise.clone(),
        observed: ack.detected.clone(),
        outcome: outcome.clone(),
        evidence,
        impact: impact_of(judgment, promise.kind),
        interaction: interaction.cloned(),
        enrichment,
        determinism_hash: determinism,
        identity_hash: identity,
    };

    BuiltJudgment {
        finding: Some(finding),
        r5,
    }
}
