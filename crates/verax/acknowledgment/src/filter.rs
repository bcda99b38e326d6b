//! Anti-false-green filter
//!
//! Acknowledgment of a button click by a spinner that never resolves is
//! the canonical false-green pattern. The filter removes that class of
//! evidence before grading: loading-class signals are stripped unless a
//! substantive signal accompanies them, and DOM churn only counts above
//! the policy thresholds.

use serde::{Deserialize, Serialize};
use verax_types::{
    Acknowledgment, AckLevel, FeedbackKind, NetworkKind, Policy, PromiseKind, Signal, SignalKind,
};

/// Diagnostic emitted when the retained set carries nothing substantive
/// for the promise kind.
pub const NO_SUBSTANTIVE_SIGNALS: &str = "no-substantive-signals";

/// Result of filtering one observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredSignals {
    /// Signals that survived the filter, in arrival order.
    pub retained: Vec<Signal>,
    /// Kinds that were stripped as loading-class noise.
    pub stripped: Vec<SignalKind>,
    /// Whether a DomChanged signal was demoted below the delta threshold.
    pub dom_demoted: bool,
}

impl FilteredSignals {
    pub fn kinds(&self) -> Vec<SignalKind> {
        self.retained.iter().map(|s| s.kind).collect()
    }
}

/// Whether a single signal counts as substantive under the policy.
fn is_substantive_signal(signal: &Signal, policy: &Policy) -> bool {
    if signal.kind == SignalKind::DomChanged {
        return match signal.dom_deltas() {
            Some((added_bytes, visible_nodes)) => {
                policy.dom_delta_substantive(added_bytes, visible_nodes)
            }
            None => false,
        };
    }
    signal.kind.is_substantive()
}

/// Apply the anti-false-green filter to an observation window.
pub fn filter_signals(signals: &[Signal], policy: &Policy) -> FilteredSignals {
    let any_substantive = signals.iter().any(|s| is_substantive_signal(s, policy));

    let mut retained = Vec::new();
    let mut stripped = Vec::new();
    let mut dom_demoted = false;

    for signal in signals {
        if signal.kind == SignalKind::DomChanged && !is_substantive_signal(signal, policy) {
            dom_demoted = true;
            continue;
        }
        if signal.kind.is_loading_class() && !any_substantive {
            stripped.push(signal.kind);
            continue;
        }
        retained.push(signal.clone());
    }

    if !stripped.is_empty() || dom_demoted {
        tracing::debug!(
            stripped = stripped.len(),
            dom_demoted,
            "anti-false-green filter removed signals"
        );
    }

    FilteredSignals {
        retained,
        stripped,
        dom_demoted,
    }
}

/// Downgrade an acknowledgment whose surviving evidence is loading-only.
///
/// Strong and Partial both fall to Weak; the confidence collapses to the
/// loading-only floor.
pub fn downgrade_if_loading_only(
    ack: Acknowledgment,
    retained: &[Signal],
    policy: &Policy,
) -> Acknowledgment {
    let loading_only =
        !retained.is_empty() && retained.iter().all(|s| s.kind.is_loading_class());
    if !loading_only {
        return ack;
    }
    if matches!(ack.level, AckLevel::Strong | AckLevel::Partial) {
        tracing::debug!(from = ?ack.level, "loading-only evidence, downgrading to weak");
        return Acknowledgment {
            level: AckLevel::Weak,
            confidence: policy.loading_only_confidence,
            ..ack
        };
    }
    ack
}

/// The substantive set a promise kind must show at least one member of.
fn required_substantive(kind: PromiseKind) -> &'static [SignalKind] {
    match kind {
        PromiseKind::Navigation => &[
            SignalKind::RouteChanged,
            SignalKind::NavigationChanged,
            SignalKind::UrlChanged,
        ],
        PromiseKind::Submission => &[
            SignalKind::FeedbackAppeared,
            SignalKind::SuccessMessageAppeared,
            SignalKind::ErrorMessageAppeared,
            SignalKind::NetworkResponseReceived,
        ],
        PromiseKind::StateChange => &[SignalKind::MeaningfulUiChange, SignalKind::DomChanged],
        PromiseKind::Feedback(FeedbackKind::Toast) => &[
            SignalKind::ToastAppeared,
            SignalKind::SuccessMessageAppeared,
            SignalKind::ErrorMessageAppeared,
        ],
        PromiseKind::Feedback(FeedbackKind::Modal) => &[SignalKind::ModalAppeared],
        PromiseKind::Feedback(FeedbackKind::Notification) => &[
            SignalKind::FeedbackAppeared,
            SignalKind::ToastAppeared,
            SignalKind::SuccessMessageAppeared,
        ],
        PromiseKind::Network(NetworkKind::Request | NetworkKind::GraphQl) => {
            &[SignalKind::NetworkResponseReceived]
        }
        PromiseKind::Network(NetworkKind::WebSocket) => &[
            SignalKind::NetworkRequestSent,
            SignalKind::NetworkResponseReceived,
        ],
    }
}

/// Diagnose the retained set against the promise kind's substantive
/// requirements. Returns the `no-substantive-signals` diagnostic when
/// nothing substantive for this kind survived the filter.
pub fn substantive_gap(kind: PromiseKind, retained: &[Signal]) -> Option<&'static str> {
    let wanted = required_substantive(kind);
    let hit = retained
        .iter()
        .any(|s| wanted.iter().any(|w| s.kind.satisfies(*w)));
    if hit {
        None
    } else {
        Some(NO_SUBSTANTIVE_SIGNALS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sig(kind: SignalKind) -> Signal {
        Signal::new(kind, Utc::now())
    }

    #[test]
    fn test_loading_only_is_stripped_to_empty() {
        let policy = Policy::default();
        let out = filter_signals(
            &[sig(SignalKind::LoadingStarted), sig(SignalKind::SkeletonVisible)],
            &policy,
        );
        assert!(out.retained.is_empty());
        assert_eq!(
            out.stripped,
            vec![SignalKind::LoadingStarted, SignalKind::SkeletonVisible]
        );
    }

    #[test]
    fn test_loading_kept_next_to_substantive() {
        let policy = Policy::default();
        let out = filter_signals(
            &[sig(SignalKind::LoadingStarted), sig(SignalKind::RouteChanged)],
            &policy,
        );
        assert_eq!(out.retained.len(), 2);
        assert!(out.stripped.is_empty());
    }

    #[test]
    fn test_micro_dom_churn_is_demoted() {
        let policy = Policy::default();
        let out = filter_signals(&[Signal::dom_delta(40, 1, Utc::now())], &policy);
        assert!(out.retained.is_empty());
        assert!(out.dom_demoted);
    }

    #[test]
    fn test_large_dom_delta_survives() {
        let policy = Policy::default();
        let out = filter_signals(&[Signal::dom_delta(512, 2, Utc::now())], &policy);
        assert_eq!(out.retained.len(), 1);
        assert!(!out.dom_demoted);
    }

    #[test]
    fn test_unsized_dom_change_is_not_substantive() {
        let policy = Policy::default();
        let out = filter_signals(&[sig(SignalKind::DomChanged)], &policy);
        assert!(out.retained.is_empty());
        assert!(out.dom_demoted);
    }

    #[test]
    fn test_downgrade_loading_only_acknowledgment() {
        let policy = Policy::default();
        let retained = vec![sig(SignalKind::LoadingStarted)];
        let ack = Acknowledgment {
            level: AckLevel::Strong,
            detected: vec![SignalKind::LoadingStarted],
            required_satisfied: 2,
            required_total: 2,
            latency_ms: 10,
            confidence: 0.95,
        };
        let out = downgrade_if_loading_only(ack, &retained, &policy);
        assert_eq!(out.level, AckLevel::Weak);
        assert_eq!(out.confidence, policy.loading_only_confidence);
    }

    #[test]
    fn test_no_downgrade_with_substantive_evidence() {
        let policy = Policy::default();
        let retained = vec![sig(SignalKind::RouteChanged)];
        let ack = Acknowledgment {
            level: AckLevel::Strong,
            detected: vec![SignalKind::RouteChanged],
            required_satisfied: 3,
            required_total: 3,
            latency_ms: 10,
            confidence: 0.95,
        };
        let out = downgrade_if_loading_only(ack.clone(), &retained, &policy);
        assert_eq!(out, ack);
    }

    #[test]
    fn test_substantive_gap_diagnostic() {
        let kind = PromiseKind::Feedback(FeedbackKind::Toast);
        assert_eq!(
            substantive_gap(kind, &[sig(SignalKind::DomChanged)]),
            Some(NO_SUBSTANTIVE_SIGNALS)
        );
        assert_eq!(substantive_gap(kind, &[sig(SignalKind::ToastAppeared)]), None);
    }
}
