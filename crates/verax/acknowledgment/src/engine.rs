//! The acknowledgment engine
//!
//! A fixed grading ladder over filtered signals. The ordering is total and
//! deterministic; the function never fails.

use verax_profiles::ObservationProfile;
use verax_types::{round2, Acknowledgment, AckLevel, Policy, ProofLevel, Signal, SignalKind};

/// Grade filtered signals against a profile.
///
/// `latency_ms` is the time from interaction to the first retained signal;
/// `stability_met` is whether the page held still for the profile's
/// stability window. The promise's proof level caps the confidence.
pub fn acknowledge(
    signals: &[Signal],
    profile: &ObservationProfile,
    latency_ms: u64,
    stability_met: bool,
    proof: ProofLevel,
    policy: &Policy,
) -> Acknowledgment {
    let mut detected: Vec<SignalKind> = Vec::new();
    for signal in signals {
        if !detected.contains(&signal.kind) {
            detected.push(signal.kind);
        }
    }

    let required_total = profile.required.len();
    let detected_required: Vec<SignalKind> = profile
        .required
        .iter()
        .filter(|req| detected.iter().any(|d| d.satisfies(**req)))
        .copied()
        .collect();

    if detected.is_empty() {
        return Acknowledgment::none(required_total, latency_ms);
    }

    let cap = policy.proof_cap(proof);
    let (level, confidence) = if detected_required.is_empty() {
        (AckLevel::Weak, policy.weak_confidence)
    } else if detected_required.len() < required_total {
        (
            AckLevel::Partial,
            detected_required.len() as f64 / required_total as f64,
        )
    } else if stability_met {
        (AckLevel::Strong, policy.strong_confidence)
    } else {
        // All required signals present but transient.
        (AckLevel::Partial, policy.transient_partial_confidence)
    };

    Acknowledgment {
        level,
        detected,
        required_satisfied: detected_required.len(),
        required_total,
        latency_ms,
        confidence: round2(confidence.min(cap)),
    }
}
