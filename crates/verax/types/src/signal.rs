//! The closed vocabulary of observable signals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the sensor layer can report about a page.
///
/// The vocabulary is closed: the pipeline matches exhaustively over it and
/// unknown phenomena must be mapped by the sensor before they enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    // Navigation
    RouteChanged,
    NavigationChanged,
    UrlChanged,

    // DOM
    DomChanged,
    MeaningfulUiChange,

    // Network
    NetworkRequestSent,
    NetworkResponseReceived,

    // Feedback
    ToastAppeared,
    ModalAppeared,
    FeedbackAppeared,
    SuccessMessageAppeared,
    ErrorMessageAppeared,

    // Errors and challenges
    ConsoleError,
    AuthChallenge,

    // Loading indicators
    LoadingStarted,
    LoadingResolved,
    SkeletonVisible,
    ProgressIndicator,
}

impl SignalKind {
    /// Loading-class signals acknowledge nothing by themselves; a spinner
    /// that never resolves is the canonical false green.
    pub fn is_loading_class(&self) -> bool {
        matches!(
            self,
            Self::LoadingStarted | Self::SkeletonVisible | Self::ProgressIndicator
        )
    }

    /// Signals that carry acknowledgment weight on their own.
    ///
    /// `DomChanged` is deliberately absent: raw DOM churn is substantive
    /// only above the policy's byte/node thresholds, which the
    /// anti-false-green filter decides per observation.
    pub fn is_substantive(&self) -> bool {
        matches!(
            self,
            Self::RouteChanged
                | Self::NavigationChanged
                | Self::UrlChanged
                | Self::MeaningfulUiChange
                | Self::NetworkResponseReceived
                | Self::ToastAppeared
                | Self::ModalAppeared
                | Self::FeedbackAppeared
                | Self::SuccessMessageAppeared
                | Self::ErrorMessageAppeared
        )
    }

    /// User-visible feedback surface.
    pub fn is_feedback(&self) -> bool {
        matches!(
            self,
            Self::ToastAppeared
                | Self::ModalAppeared
                | Self::FeedbackAppeared
                | Self::SuccessMessageAppeared
                | Self::ErrorMessageAppeared
        )
    }

    /// Success-shaped feedback, used by the misleading-pattern check.
    pub fn is_success_feedback(&self) -> bool {
        matches!(self, Self::SuccessMessageAppeared)
    }

    /// Error-shaped indicators.
    pub fn is_error_shaped(&self) -> bool {
        matches!(self, Self::ErrorMessageAppeared | Self::ConsoleError)
    }

    /// Whether an observed signal satisfies a required one.
    ///
    /// Matching is implication-aware: a route change is a navigation change
    /// and a URL change; a toast is feedback; a modal is feedback and a DOM
    /// change; a meaningful UI change is a DOM change; a received response
    /// implies the request was sent. Exact matches always satisfy.
    pub fn satisfies(&self, required: SignalKind) -> bool {
        if *self == required {
            return true;
        }
        match (self, required) {
            (Self::RouteChanged, Self::NavigationChanged | Self::UrlChanged) => true,
            (Self::NavigationChanged, Self::UrlChanged) => true,
            (Self::ToastAppeared, Self::FeedbackAppeared) => true,
            (Self::ModalAppeared, Self::FeedbackAppeared | Self::DomChanged) => true,
            (Self::SuccessMessageAppeared, Self::FeedbackAppeared) => true,
            (Self::ErrorMessageAppeared, Self::FeedbackAppeared) => true,
            (Self::MeaningfulUiChange, Self::DomChanged) => true,
            (Self::NetworkResponseReceived, Self::NetworkRequestSent) => true,
            _ => false,
        }
    }
}

/// Structured payload attached to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPayload {
    /// Network event detail.
    Network { status: Option<u16> },
    /// Error text captured from the console or the page.
    ErrorText { message: String },
    /// Selector the sensor matched.
    Selector { selector: String },
    /// Byte and node deltas of a DOM mutation.
    DomDelta {
        added_bytes: u64,
        removed_bytes: u64,
        visible_added_nodes: u32,
    },
}

/// One observed signal. Append-only within an interaction window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// When the sensor saw it.
    pub at: DateTime<Utc>,
    pub payload: Option<SignalPayload>,
}

impl Signal {
    pub fn new(kind: SignalKind, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            at,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: SignalPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// A network response signal carrying a status code.
    pub fn response(status: u16, at: DateTime<Utc>) -> Self {
        Self::new(SignalKind::NetworkResponseReceived, at)
            .with_payload(SignalPayload::Network {
                status: Some(status),
            })
    }

    /// A DOM change signal carrying its deltas.
    pub fn dom_delta(added_bytes: u64, visible_added_nodes: u32, at: DateTime<Utc>) -> Self {
        Self::new(SignalKind::DomChanged, at).with_payload(SignalPayload::DomDelta {
            added_bytes,
            removed_bytes: 0,
            visible_added_nodes,
        })
    }

    /// The DOM deltas of this signal, if it carries any.
    pub fn dom_deltas(&self) -> Option<(u64, u32)> {
        match &self.payload {
            Some(SignalPayload::DomDelta {
                added_bytes,
                visible_added_nodes,
                ..
            }) => Some((*added_bytes, *visible_added_nodes)),
            _ => None,
        }
    }

    /// The HTTP status this signal carries, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.payload {
            Some(SignalPayload::Network { status }) => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_class_membership() {
        assert!(SignalKind::LoadingStarted.is_loading_class());
        assert!(SignalKind::SkeletonVisible.is_loading_class());
        assert!(SignalKind::ProgressIndicator.is_loading_class());
        assert!(!SignalKind::LoadingResolved.is_loading_class());
        assert!(!SignalKind::DomChanged.is_loading_class());
    }

    #[test]
    fn test_implication_matching() {
        assert!(SignalKind::RouteChanged.satisfies(SignalKind::NavigationChanged));
        assert!(SignalKind::RouteChanged.satisfies(SignalKind::UrlChanged));
        assert!(SignalKind::ToastAppeared.satisfies(SignalKind::FeedbackAppeared));
        assert!(SignalKind::NetworkResponseReceived.satisfies(SignalKind::NetworkRequestSent));
        assert!(!SignalKind::UrlChanged.satisfies(SignalKind::RouteChanged));
        assert!(!SignalKind::DomChanged.satisfies(SignalKind::MeaningfulUiChange));
    }

    #[test]
    fn test_substantive_excludes_raw_dom_and_loading() {
        assert!(!SignalKind::DomChanged.is_substantive());
        assert!(!SignalKind::LoadingStarted.is_substantive());
        assert!(!SignalKind::NetworkRequestSent.is_substantive());
        assert!(SignalKind::NetworkResponseReceived.is_substantive());
        assert!(SignalKind::RouteChanged.is_substantive());
    }

    #[test]
    fn test_payload_accessors() {
        let at = Utc::now();
        let s = Signal::response(204, at);
        assert_eq!(s.status(), Some(204));
        assert_eq!(s.dom_deltas(), None);

        let d = Signal::dom_delta(512, 3, at);
        assert_eq!(d.dom_deltas(), Some((512, 3)));
    }
}
