//! Verax Observation Profiles - per-kind observation requirements
//!
//! For every promise kind, a profile declares which signals are required,
//! which are merely welcome, which are forbidden, and how long the page
//! must hold still before the evidence counts. The registry is total:
//! kinds without a calibrated entry resolve to a conservative default.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verax_types::{FeedbackKind, NetworkKind, Policy, PromiseKind, Signal, SignalKind};

/// Observation requirements for one promise kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationProfile {
    pub kind: PromiseKind,
    /// Signals that must be satisfied (implication-aware) for a full
    /// acknowledgment.
    pub required: Vec<SignalKind>,
    /// Signals that strengthen the picture but are not demanded.
    pub optional: Vec<SignalKind>,
    /// Signals whose presence invalidates the observation outright.
    pub forbidden: Vec<SignalKind>,
    /// Minimum quiet period before signals count as stable.
    pub min_stability_ms: u64,
    /// How long to wait for acknowledgment before classifying silence.
    pub grace_timeout_ms: u64,
}

/// Profile invariant violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("required and forbidden overlap: {0:?}")]
    RequiredForbiddenOverlap(Vec<SignalKind>),

    #[error("min_stability_ms {min_stability_ms} exceeds grace_timeout_ms {grace_timeout_ms}")]
    StabilityExceedsGrace {
        min_stability_ms: u64,
        grace_timeout_ms: u64,
    },
}

impl ObservationProfile {
    /// Check the structural invariants of a profile.
    pub fn check(&self) -> Result<(), ProfileError> {
        let overlap: Vec<SignalKind> = self
            .required
            .iter()
            .filter(|k| self.forbidden.contains(k))
            .copied()
            .collect();
        if !overlap.is_empty() {
            return Err(ProfileError::RequiredForbiddenOverlap(overlap));
        }
        if self.min_stability_ms > self.grace_timeout_ms {
            return Err(ProfileError::StabilityExceedsGrace {
                min_stability_ms: self.min_stability_ms,
                grace_timeout_ms: self.grace_timeout_ms,
            });
        }
        Ok(())
    }
}

/// Result of validating observed signals against a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileValidation {
    pub satisfied: bool,
    /// Required kinds that were satisfied.
    pub matched_required: Vec<SignalKind>,
    /// Optional kinds that were satisfied, listed separately.
    pub matched_optional: Vec<SignalKind>,
    pub reason: Option<String>,
}

/// The total registry of observation profiles.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    policy: Policy,
}

impl ProfileRegistry {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The conservative fallback for kinds without a calibrated entry.
    fn default_profile(&self, kind: PromiseKind) -> ObservationProfile {
        ObservationProfile {
            kind,
            required: vec![SignalKind::DomChanged, SignalKind::FeedbackAppeared],
            optional: vec![SignalKind::LoadingResolved],
            forbidden: vec![],
            min_stability_ms: self.policy.default_min_stability_ms,
            grace_timeout_ms: self.policy.default_grace_timeout_ms,
        }
    }

    /// Resolve the profile for a promise kind. Total over the kind space.
    pub fn profile_for(&self, kind: PromiseKind) -> ObservationProfile {
        let grace = self.policy.default_grace_timeout_ms;
        match kind {
            PromiseKind::Navigation => ObservationProfile {
                kind,
                required: vec![
                    SignalKind::RouteChanged,
                    SignalKind::NavigationChanged,
                    SignalKind::UrlChanged,
                ],
                optional: vec![SignalKind::DomChanged, SignalKind::LoadingResolved],
                forbidden: vec![],
                min_stability_ms: 500,
                grace_timeout_ms: 5000,
            },
            PromiseKind::Submission => ObservationProfile {
                kind,
                required: vec![SignalKind::FeedbackAppeared],
                optional: vec![SignalKind::NetworkResponseReceived, SignalKind::DomChanged],
                forbidden: vec![],
                min_stability_ms: 400,
                grace_timeout_ms: 8000,
            },
            PromiseKind::StateChange => ObservationProfile {
                kind,
                required: vec![SignalKind::DomChanged, SignalKind::MeaningfulUiChange],
                optional: vec![SignalKind::LoadingResolved],
                forbidden: vec![],
                min_stability_ms: 400,
                grace_timeout_ms: grace,
            },
            PromiseKind::Feedback(FeedbackKind::Toast) => ObservationProfile {
                kind,
                required: vec![SignalKind::ToastAppeared, SignalKind::FeedbackAppeared],
                optional: vec![SignalKind::DomChanged],
                forbidden: vec![SignalKind::LoadingStarted],
                min_stability_ms: 400,
                grace_timeout_ms: 3000,
            },
            PromiseKind::Feedback(FeedbackKind::Modal) => ObservationProfile {
                kind,
                required: vec![SignalKind::ModalAppeared, SignalKind::DomChanged],
                optional: vec![SignalKind::FeedbackAppeared],
                forbidden: vec![SignalKind::LoadingStarted],
                min_stability_ms: 500,
                grace_timeout_ms: grace,
            },
            PromiseKind::Network(NetworkKind::Request) => ObservationProfile {
                kind,
                required: vec![
                    SignalKind::NetworkRequestSent,
                    SignalKind::NetworkResponseReceived,
                ],
                optional: vec![SignalKind::DomChanged],
                forbidden: vec![],
                min_stability_ms: self.policy.default_min_stability_ms,
                grace_timeout_ms: 10000,
            },
            PromiseKind::Network(NetworkKind::GraphQl) => ObservationProfile {
                kind,
                required: vec![
                    SignalKind::NetworkRequestSent,
                    SignalKind::NetworkResponseReceived,
                ],
                optional: vec![SignalKind::DomChanged],
                forbidden: vec![],
                min_stability_ms: self.policy.default_min_stability_ms,
                grace_timeout_ms: 15000,
            },
            PromiseKind::Network(NetworkKind::WebSocket) => ObservationProfile {
                kind,
                required: vec![SignalKind::NetworkRequestSent],
                optional: vec![SignalKind::NetworkResponseReceived],
                forbidden: vec![],
                min_stability_ms: self.policy.default_min_stability_ms,
                grace_timeout_ms: 5000,
            },
            other => self.default_profile(other),
        }
    }

    /// All calibrated profiles, for diagnostics and registry tests.
    pub fn all(&self) -> Vec<ObservationProfile> {
        [
            PromiseKind::Navigation,
            PromiseKind::Submission,
            PromiseKind::StateChange,
            PromiseKind::Feedback(FeedbackKind::Toast),
            PromiseKind::Feedback(FeedbackKind::Modal),
            PromiseKind::Feedback(FeedbackKind::Notification),
            PromiseKind::Network(NetworkKind::Request),
            PromiseKind::Network(NetworkKind::GraphQl),
            PromiseKind::Network(NetworkKind::WebSocket),
        ]
        .into_iter()
        .map(|k| self.profile_for(k))
        .collect()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

/// Validate observed signals against a profile.
///
/// Forbidden signals invalidate the observation first; then the absence of
/// every required signal. Otherwise the validation is satisfied and lists
/// matched required and matched optional kinds separately.
pub fn validate(signals: &[Signal], profile: &ObservationProfile) -> ProfileValidation {
    let present: Vec<SignalKind> = signals.iter().map(|s| s.kind).collect();

    let forbidden_hits: Vec<SignalKind> = profile
        .forbidden
        .iter()
        .filter(|f| present.contains(f))
        .copied()
        .collect();
    if !forbidden_hits.is_empty() {
        let names = forbidden_hits
            .iter()
            .map(|k| format!("{k:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        return ProfileValidation {
            satisfied: false,
            matched_required: vec![],
            matched_optional: vec![],
            reason: Some(format!("forbidden signals present: {names}")),
        };
    }

    let matched_required: Vec<SignalKind> = profile
        .required
        .iter()
        .filter(|req| present.iter().any(|p| p.satisfies(**req)))
        .copied()
        .collect();
    let matched_optional: Vec<SignalKind> = profile
        .optional
        .iter()
        .filter(|opt| present.iter().any(|p| p.satisfies(**opt)))
        .copied()
        .collect();

    if matched_required.is_empty() {
        return ProfileValidation {
            satisfied: false,
            matched_required: vec![],
            matched_optional,
            reason: Some("no required signal present".to_string()),
        };
    }

    ProfileValidation {
        satisfied: true,
        matched_required,
        matched_optional,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signals(kinds: &[SignalKind]) -> Vec<Signal> {
        let at = Utc::now();
        kinds.iter().map(|k| Signal::new(*k, at)).collect()
    }

    #[test]
    fn test_calibrated_navigation_profile() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Navigation);
        assert_eq!(
            p.required,
            vec![
                SignalKind::RouteChanged,
                SignalKind::NavigationChanged,
                SignalKind::UrlChanged
            ]
        );
        assert_eq!(p.min_stability_ms, 500);
        assert_eq!(p.grace_timeout_ms, 5000);
    }

    #[test]
    fn test_calibrated_network_graces() {
        let reg = ProfileRegistry::default();
        assert_eq!(
            reg.profile_for(PromiseKind::Network(NetworkKind::Request))
                .grace_timeout_ms,
            10000
        );
        assert_eq!(
            reg.profile_for(PromiseKind::Network(NetworkKind::GraphQl))
                .grace_timeout_ms,
            15000
        );
        assert_eq!(
            reg.profile_for(PromiseKind::Network(NetworkKind::WebSocket))
                .grace_timeout_ms,
            5000
        );
    }

    #[test]
    fn test_toast_profile_forbids_loading() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Feedback(FeedbackKind::Toast));
        assert!(p.forbidden.contains(&SignalKind::LoadingStarted));
        assert_eq!(p.min_stability_ms, 400);
        assert_eq!(p.grace_timeout_ms, 3000);
    }

    #[test]
    fn test_uncalibrated_kind_gets_conservative_default() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Feedback(FeedbackKind::Notification));
        assert!(p.required.contains(&SignalKind::DomChanged));
        assert!(p.required.contains(&SignalKind::FeedbackAppeared));
        assert!(p.optional.contains(&SignalKind::LoadingResolved));
        assert!(p.forbidden.is_empty());
        assert_eq!(p.min_stability_ms, 300);
        assert_eq!(p.grace_timeout_ms, 5000);
    }

    #[test]
    fn test_all_profiles_satisfy_invariants() {
        for profile in ProfileRegistry::default().all() {
            profile.check().unwrap();
        }
    }

    #[test]
    fn test_validate_forbidden_wins() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Feedback(FeedbackKind::Toast));
        let v = validate(
            &signals(&[SignalKind::ToastAppeared, SignalKind::LoadingStarted]),
            &p,
        );
        assert!(!v.satisfied);
        assert!(v.reason.unwrap().contains("LoadingStarted"));
    }

    #[test]
    fn test_validate_no_required() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Navigation);
        let v = validate(&signals(&[SignalKind::DomChanged]), &p);
        assert!(!v.satisfied);
        assert_eq!(v.reason.as_deref(), Some("no required signal present"));
        // DomChanged is in navigation's optional list.
        assert_eq!(v.matched_optional, vec![SignalKind::DomChanged]);
    }

    #[test]
    fn test_validate_satisfied_with_implication() {
        let reg = ProfileRegistry::default();
        let p = reg.profile_for(PromiseKind::Navigation);
        let v = validate(&signals(&[SignalKind::RouteChanged]), &p);
        assert!(v.satisfied);
        // One route change satisfies all three navigation requirements.
        assert_eq!(v.matched_required.len(), 3);
        assert!(v.reason.is_none());
    }
}
