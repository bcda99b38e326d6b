//! The outcome truth matrix
//!
//! A pure precedence function: rules are applied top-down and the first
//! match returns. Confidences below are calibrated contract values.

use serde::{Deserialize, Serialize};
use verax_types::{
    Acknowledgment, AckLevel, Outcome, OutcomeKind, Policy, PromiseKind, SignalKind, SilenceKind,
};

const HARD_ERROR_CONFIDENCE: f64 = 0.95;
const MISLEADING_CONFIDENCE: f64 = 0.80;
const TRANSIENT_AMBIGUOUS_CONFIDENCE: f64 = 0.50;
const PARTIAL_AMBIGUOUS_CONFIDENCE: f64 = 0.30;
const WEAK_AMBIGUOUS_CONFIDENCE: f64 = 0.20;
const SERVER_SIDE_PARTIAL_CONFIDENCE: f64 = 0.70;
const AUTH_SILENT_CONFIDENCE: f64 = 0.85;
const TIMEOUT_SILENT_CONFIDENCE: f64 = 0.85;
const RENDER_SILENT_CONFIDENCE: f64 = 0.80;
const TRUE_SILENCE_CONFIDENCE: f64 = 0.80;
const OTHER_SILENCE_CONFIDENCE: f64 = 0.50;

/// Everything the matrix consults. A snapshot at decision time; the
/// matrix itself holds no state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixInput {
    pub ack: Acknowledgment,
    pub promise_kind: PromiseKind,
    pub stability_met: bool,
    /// Classified silence, when the classifier ran.
    pub silence: Option<SilenceKind>,
    pub last_response_status: Option<u16>,
    /// Network-level failure string reported by the sensor, if any.
    pub network_failure: Option<String>,
    /// Count of console error messages.
    pub console_error_count: u32,
    /// Uncaught page exception observed.
    pub js_exception: bool,
    /// The application surfaced an API-level error flag.
    pub api_error_flag: bool,
    /// The observation window expired without settling.
    pub timed_out: bool,
    /// Filtered signal kinds present in the window.
    pub signals: Vec<SignalKind>,
}

impl MatrixInput {
    fn has_success_feedback(&self) -> bool {
        self.signals.iter().any(|s| s.is_success_feedback())
    }

    fn hard_error(&self) -> bool {
        self.network_failure.is_some()
            || matches!(self.last_response_status, Some(s) if s >= 500)
            || self.js_exception
            || self.timed_out
    }

    fn misleading_pattern(&self) -> bool {
        self.has_success_feedback()
            && (matches!(self.last_response_status, Some(s) if s >= 400)
                || self.console_error_count > 0
                || self.api_error_flag)
    }

    fn loading_only(&self) -> bool {
        !self.signals.is_empty() && self.signals.iter().all(|s| s.is_loading_class())
    }
}

/// Derive the outcome. Pure; total; first matching rule returns.
pub fn evaluate(input: &MatrixInput, policy: &Policy) -> Outcome {
    let signals = input.signals.clone();

    // Hard errors dominate, unless success feedback turns the same
    // evidence into a contradiction handled by the misleading rule.
    if input.hard_error() && !input.has_success_feedback() {
        let detail = if let Some(f) = &input.network_failure {
            format!("network failure: {f}")
        } else if let Some(s) = input.last_response_status.filter(|s| *s >= 500) {
            format!("server responded {s}")
        } else if input.js_exception {
            "uncaught page exception".to_string()
        } else {
            "observation window timed out".to_string()
        };
        return Outcome::new(OutcomeKind::SilentFailure, HARD_ERROR_CONFIDENCE, detail, signals);
    }

    if input.ack.level == AckLevel::Strong && input.stability_met && input.misleading_pattern() {
        return Outcome::new(
            OutcomeKind::Misleading,
            MISLEADING_CONFIDENCE,
            "success feedback shown while an error indicator was present",
            signals,
        );
    }

    if input.ack.level == AckLevel::Strong && input.stability_met {
        return Outcome::new(
            OutcomeKind::Success,
            policy.strong_confidence,
            format!(
                "all {} required signals acknowledged and stable",
                input.ack.required_total
            ),
            signals,
        );
    }

    if input.ack.level == AckLevel::Strong {
        return Outcome::new(
            OutcomeKind::Ambiguous,
            TRANSIENT_AMBIGUOUS_CONFIDENCE,
            "required signals present but transient",
            signals,
        )
        .with_warning("stability window never met");
    }

    if input.ack.level == AckLevel::Partial {
        let meaningful = input.ack.required_ratio() >= policy.meaningful_partial_ratio;
        if input.stability_met && meaningful {
            return Outcome::new(
                OutcomeKind::PartialSuccess,
                policy.transient_partial_confidence,
                format!(
                    "{} of {} required signals acknowledged",
                    input.ack.required_satisfied, input.ack.required_total
                ),
                signals,
            );
        }
        return Outcome::new(
            OutcomeKind::Ambiguous,
            PARTIAL_AMBIGUOUS_CONFIDENCE,
            "partial acknowledgment below the meaningful threshold",
            signals,
        );
    }

    if input.ack.level == AckLevel::Weak {
        let reasoning = if input.loading_only() {
            "only loading-class signals detected"
        } else {
            "signals detected but none satisfy the profile"
        };
        return Outcome::new(
            OutcomeKind::Ambiguous,
            WEAK_AMBIGUOUS_CONFIDENCE,
            reasoning,
            signals,
        );
    }

    // Level is None: the silence classification decides.
    match input.silence {
        Some(SilenceKind::ServerSideOnly)
            if matches!(input.last_response_status, Some(s) if (200..300).contains(&s)) =>
        {
            Outcome::new(
                OutcomeKind::PartialSuccess,
                SERVER_SIDE_PARTIAL_CONFIDENCE,
                "server acknowledged but the page never reflected it",
                signals,
            )
            .with_warning("effect is server-side only")
        }
        Some(SilenceKind::BlockedByAuth) => Outcome::new(
            OutcomeKind::SilentFailure,
            AUTH_SILENT_CONFIDENCE,
            "interaction blocked by an authentication challenge",
            signals,
        ),
        Some(SilenceKind::NetworkTimeout) => Outcome::new(
            OutcomeKind::SilentFailure,
            TIMEOUT_SILENT_CONFIDENCE,
            "requests sent with no response inside the grace window",
            signals,
        ),
        Some(SilenceKind::UiRenderFailure) => Outcome::new(
            OutcomeKind::SilentFailure,
            RENDER_SILENT_CONFIDENCE,
            "the interface failed to render",
            signals,
        ),
        Some(silence) => {
            let confidence = if silence == SilenceKind::TrueSilence {
                TRUE_SILENCE_CONFIDENCE
            } else {
                OTHER_SILENCE_CONFIDENCE
            };
            if input.promise_kind.requires_ui() {
                Outcome::new(
                    OutcomeKind::SilentFailure,
                    confidence,
                    format!("{silence:?}: a UI-promising interaction produced nothing visible"),
                    signals,
                )
            } else {
                Outcome::new(
                    OutcomeKind::Ambiguous,
                    confidence,
                    format!("{silence:?}: no acknowledgment and no UI requirement to judge by"),
                    signals,
                )
            }
        }
        None => Outcome::new(
            OutcomeKind::Ambiguous,
            0.0,
            "no acknowledgment and no silence classification",
            signals,
        ),
    }
}
