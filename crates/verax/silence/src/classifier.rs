//! The silence classifier
//!
//! Invoked when acknowledgment fell short. Classification is a precedence
//! ladder; the first matching rule wins.

use serde::{Deserialize, Serialize};
use verax_types::{Signal, SilenceKind};

/// Ancillary evidence available when classifying a silence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SilenceObservation {
    /// Raw (unfiltered) signals of the window.
    pub signals: Vec<Signal>,
    pub elapsed_ms: u64,
    pub grace_timeout_ms: u64,
    pub requests_sent: u32,
    pub responses_received: u32,
    pub last_response_status: Option<u16>,
    /// Whether the DOM changed at all during the window.
    pub dom_delta_present: bool,
    pub auth_challenge: bool,
    pub user_navigated: bool,
    pub ui_render_error: bool,
}

impl SilenceObservation {
    fn auth_blocked(&self) -> bool {
        if self.auth_challenge {
            return true;
        }
        if matches!(self.last_response_status, Some(401) | Some(403)) {
            return true;
        }
        self.signals
            .iter()
            .any(|s| matches!(s.status(), Some(401) | Some(403)))
    }

    fn acknowledgment_signals_present(&self) -> bool {
        self.signals
            .iter()
            .any(|s| s.kind.is_substantive() || s.dom_deltas().is_some())
    }

    fn grace_exceeded(&self) -> bool {
        self.elapsed_ms > self.grace_timeout_ms
    }
}

/// Classify a silence. First match wins.
pub fn classify(obs: &SilenceObservation) -> SilenceKind {
    if obs.user_navigated {
        return SilenceKind::UserNavigation;
    }
    if obs.auth_blocked() {
        return SilenceKind::BlockedByAuth;
    }
    if obs.requests_sent > 0 && obs.responses_received == 0 && obs.grace_exceeded() {
        return SilenceKind::NetworkTimeout;
    }
    if matches!(obs.last_response_status, Some(s) if (200..300).contains(&s))
        && !obs.dom_delta_present
    {
        return SilenceKind::ServerSideOnly;
    }
    if obs.acknowledgment_signals_present() && obs.grace_exceeded() {
        return SilenceKind::SlowAcknowledgment;
    }
    if obs.ui_render_error {
        return SilenceKind::UiRenderFailure;
    }
    SilenceKind::TrueSilence
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verax_types::SignalKind;

    #[test]
    fn test_user_navigation_wins_over_everything() {
        let obs = SilenceObservation {
            user_navigated: true,
            auth_challenge: true,
            requests_sent: 3,
            elapsed_ms: 20_000,
            grace_timeout_ms: 5000,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::UserNavigation);
    }

    #[test]
    fn test_auth_blocked_by_status() {
        let obs = SilenceObservation {
            last_response_status: Some(403),
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::BlockedByAuth);
    }

    #[test]
    fn test_auth_blocked_by_challenge_flag() {
        let obs = SilenceObservation {
            auth_challenge: true,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::BlockedByAuth);
    }

    #[test]
    fn test_network_timeout() {
        let obs = SilenceObservation {
            requests_sent: 1,
            responses_received: 0,
            elapsed_ms: 10_500,
            grace_timeout_ms: 10_000,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::NetworkTimeout);
    }

    #[test]
    fn test_no_timeout_within_grace() {
        let obs = SilenceObservation {
            requests_sent: 1,
            responses_received: 0,
            elapsed_ms: 4000,
            grace_timeout_ms: 10_000,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::TrueSilence);
    }

    #[test]
    fn test_server_side_only() {
        let obs = SilenceObservation {
            requests_sent: 1,
            responses_received: 1,
            last_response_status: Some(204),
            dom_delta_present: false,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::ServerSideOnly);
    }

    #[test]
    fn test_slow_acknowledgment() {
        let obs = SilenceObservation {
            signals: vec![Signal::new(SignalKind::FeedbackAppeared, Utc::now())],
            elapsed_ms: 6000,
            grace_timeout_ms: 3000,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::SlowAcknowledgment);
    }

    #[test]
    fn test_ui_render_failure() {
        let obs = SilenceObservation {
            ui_render_error: true,
            ..Default::default()
        };
        assert_eq!(classify(&obs), SilenceKind::UiRenderFailure);
    }

    #[test]
    fn test_true_silence_is_the_floor() {
        assert_eq!(classify(&SilenceObservation::default()), SilenceKind::TrueSilence);
    }
}
