//! Silence - absence of expected signals, classified rather than ignored

use serde::{Deserialize, Serialize};

/// Why the expected acknowledgment never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilenceKind {
    /// Nothing at all happened within the grace window.
    TrueSilence,
    /// A 401/403 response or auth challenge blocked the interaction.
    BlockedByAuth,
    /// Requests went out, no response came back in time.
    NetworkTimeout,
    /// The server answered 2xx but the UI never reflected it.
    ServerSideOnly,
    /// Acknowledgment signals exist but arrived past the grace window.
    SlowAcknowledgment,
    /// The UI failed to render.
    UiRenderFailure,
    /// The user navigated away mid-interaction.
    UserNavigation,
    /// The sensor itself failed to observe.
    SensorFailure,
    /// The interaction was abandoned on cancellation.
    InteractionTimeout,
    /// The item was never evaluated (budget exhaustion).
    CoverageGap,
}

impl SilenceKind {
    /// Recoverable silences can resolve on retry or with user input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SlowAcknowledgment
                | Self::BlockedByAuth
                | Self::UserNavigation
                | Self::SensorFailure
                | Self::InteractionTimeout
                | Self::CoverageGap
        )
    }

    /// Silences that are themselves indicative of error.
    pub fn is_error_indicative(&self) -> bool {
        matches!(
            self,
            Self::TrueSilence | Self::NetworkTimeout | Self::UiRenderFailure
        )
    }
}

/// Evaluation status of a silenced item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Blocked,
    Ambiguous,
    Skipped,
    TimedOut,
    Incomplete,
}

/// Quantified confidence impact of a silence, per axis. Values are
/// negative percentages; aggregation clamps each axis to [-100, 0].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceImpact {
    pub coverage: f64,
    pub promise_verification: f64,
    pub overall: f64,
}

impl ConfidenceImpact {
    pub fn new(coverage: f64, promise_verification: f64, overall: f64) -> Self {
        Self {
            coverage: coverage.clamp(-100.0, 0.0),
            promise_verification: promise_verification.clamp(-100.0, 0.0),
            overall: overall.clamp(-100.0, 0.0),
        }
    }
}

/// One entry in the silence ledger: an unobserved or skipped item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceEntry {
    /// What area of the scan the silence belongs to.
    pub scope: String,
    /// Why it was silent, in one machine-stable word or phrase.
    pub reason: String,
    pub description: String,
    pub context: String,
    /// Effect on the verification result, in prose.
    pub impact: String,
    pub silence_type: SilenceKind,
    /// What caused the entry to be written.
    pub trigger: String,
    pub evaluation_status: EvaluationStatus,
    /// The promise this silence relates to. Explicitly `None` when the
    /// silence is not promise-scoped; the `reason` field must say why.
    pub related_promise: Option<String>,
    pub confidence_impact: ConfidenceImpact,
    /// What the evaluation concluded, when anything was concluded at all.
    /// Success-shaped labels are malformed here and the ledger rejects
    /// them.
    pub outcome: Option<String>,
}

impl SilenceEntry {
    pub fn new(
        scope: impl Into<String>,
        reason: impl Into<String>,
        description: impl Into<String>,
        silence_type: SilenceKind,
        trigger: impl Into<String>,
        evaluation_status: EvaluationStatus,
    ) -> Self {
        Self {
            scope: scope.into(),
            reason: reason.into(),
            description: description.into(),
            context: String::new(),
            impact: String::new(),
            silence_type,
            trigger: trigger.into(),
            evaluation_status,
            related_promise: None,
            confidence_impact: ConfidenceImpact::default(),
            outcome: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    pub fn for_promise(mut self, promise_id: impl Into<String>) -> Self {
        self.related_promise = Some(promise_id.into());
        self
    }

    pub fn with_confidence_impact(mut self, impact: ConfidenceImpact) -> Self {
        self.confidence_impact = impact;
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }
}

/// Whether an outcome label claims success. Silences may never carry one.
pub fn is_success_shaped(label: &str) -> bool {
    matches!(
        label.trim().to_ascii_lowercase().as_str(),
        "success" | "verified" | "pass" | "confirmed"
    )
}
