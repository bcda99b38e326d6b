//! The evidence law
//!
//! The closed rule set that governs when a failure may be reported. R1-R4
//! are hard: a violation aborts the offending judgment. R5 is a downgrade
//! path for the Confirmed status.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verax_types::{
    Acknowledgment, AckLevel, Evidence, FindingStatus, Outcome, OutcomeKind, SignalKind,
    SilenceKind,
};

/// Violation of a hard evidence rule. Maps to exit code 50.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum EvidenceLawViolation {
    #[error("R1: {outcome:?} reported without strong evidence")]
    MissingStrongEvidence { outcome: OutcomeKind },

    #[error("R2: misleading outcome without a success/error contradiction")]
    MissingContradiction,

    #[error("R3: recoverable silence {silence:?} cannot be a silent failure")]
    RecoverableSilence { silence: SilenceKind },

    #[error("R4: failure outcome carries no evidence references")]
    EmptyEvidenceReferences,
}

impl EvidenceLawViolation {
    /// The rule identifier, for artifacts and logs.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::MissingStrongEvidence { .. } => "R1",
            Self::MissingContradiction => "R2",
            Self::RecoverableSilence { .. } => "R3",
            Self::EmptyEvidenceReferences => "R4",
        }
    }
}

/// Everything the law consults when gating an outcome.
#[derive(Debug, Clone)]
pub struct LawContext<'a> {
    pub outcome: &'a Outcome,
    pub ack: &'a Acknowledgment,
    pub evidence: &'a Evidence,
    pub silence: Option<SilenceKind>,
    pub last_response_status: Option<u16>,
    pub network_failure: bool,
    pub console_error_count: u32,
    pub api_error_flag: bool,
}

impl LawContext<'_> {
    /// R1's strong-evidence bar. An error-indicative silence counts: the
    /// expiry of the grace window with zero acknowledgment is itself the
    /// observable fact backing the failure.
    fn has_strong_evidence(&self) -> bool {
        if matches!(self.last_response_status, Some(s) if s >= 500 || s == 401 || s == 403) {
            return true;
        }
        if self.console_error_count > 0 || self.network_failure {
            return true;
        }
        if self.ack.level == AckLevel::Strong {
            return true;
        }
        if self
            .outcome
            .signals_present
            .iter()
            .any(|s| *s == SignalKind::ErrorMessageAppeared)
        {
            return true;
        }
        matches!(self.silence, Some(s) if s.is_error_indicative())
    }

    fn has_success_shaped_signal(&self) -> bool {
        self.outcome
            .signals_present
            .iter()
            .any(|s| s.is_success_feedback())
    }

    fn has_error_indicator(&self) -> bool {
        matches!(self.last_response_status, Some(s) if s >= 400)
            || self.console_error_count > 0
            || self.api_error_flag
            || self.network_failure
            || self
                .outcome
                .signals_present
                .iter()
                .any(|s| s.is_error_shaped())
    }
}

/// Silences the law refuses to turn into silent failures. Narrower than
/// the classifier's recoverable set: an auth block carries hard 401/403
/// evidence and the matrix mandates a silent failure for it.
fn law_recoverable(silence: SilenceKind) -> bool {
    matches!(
        silence,
        SilenceKind::SlowAcknowledgment | SilenceKind::UserNavigation
    )
}

/// Enforce R1-R4 against an outcome. `Ok(())` means the outcome may
/// proceed to judgment.
pub fn enforce(ctx: &LawContext<'_>) -> Result<(), EvidenceLawViolation> {
    let kind = ctx.outcome.kind;
    if !kind.is_failure() {
        return Ok(());
    }

    // R3 before R1: a recoverable silence invalidates the verdict shape
    // itself, not merely its backing.
    if kind == OutcomeKind::SilentFailure {
        if let Some(silence) = ctx.silence {
            if law_recoverable(silence) {
                return Err(EvidenceLawViolation::RecoverableSilence { silence });
            }
        }
    }

    if !ctx.has_strong_evidence() {
        return Err(EvidenceLawViolation::MissingStrongEvidence { outcome: kind });
    }

    if kind == OutcomeKind::Misleading
        && !(ctx.has_success_shaped_signal() && ctx.has_error_indicator())
    {
        return Err(EvidenceLawViolation::MissingContradiction);
    }

    if ctx.evidence.references.is_empty() {
        return Err(EvidenceLawViolation::EmptyEvidenceReferences);
    }

    Ok(())
}

/// R5 verdict for a finding that wants Confirmed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorVerdict {
    /// Both anchors present; Confirmed stands.
    Keep,
    /// One anchor missing; downgrade to Suspected.
    Downgrade,
    /// Both anchors missing; the finding is dropped, not downgraded.
    Drop,
}

/// R5: Confirmed requires a context anchor (before-state) and effect
/// evidence (after-state, change flag, or a quantitative indicator).
pub fn apply_r5(status: FindingStatus, evidence: &Evidence) -> AnchorVerdict {
    if status != FindingStatus::Confirmed {
        return AnchorVerdict::Keep;
    }
    match (evidence.has_context_anchor(), evidence.has_effect_evidence()) {
        (true, true) => AnchorVerdict::Keep,
        (false, false) => AnchorVerdict::Drop,
        _ => AnchorVerdict::Downgrade,
    }
}
