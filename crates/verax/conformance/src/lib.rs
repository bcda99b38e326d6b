//! Conformance Test Suite for the Verax verification engine
//!
//! This module validates that the pipeline enforces its core invariants:
//!
//! 1. **Confirmed requires evidence** - no confirmed finding without a
//!    context anchor and effect evidence
//! 2. **Failures require strong evidence** - silent and misleading
//!    failures are gated by the evidence law
//! 3. **Misleading requires contradiction** - success and error signals
//!    must both be present
//! 4. **Silences never succeed** - the ledger rejects success-shaped
//!    entries
//! 5. **Adaptive behavior breaks determinism** - one adaptive event flips
//!    the verdict
//! 6. **Normalization is idempotent** - `normalize(normalize(x)) =
//!    normalize(x)`
//! 7. **Identity is structural** - identity hashes survive outcome and
//!    volatile-field changes
//! 8. **Emission order is total** - sorting is deterministic
//! 9. **Exit codes are monotonic** - worse scans never exit lower
//!
//! plus the calibrated end-to-end scenarios of the outcome matrix.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use verax_acknowledgment::{acknowledge, downgrade_if_loading_only, filter_signals};
use verax_decisions::{normalize, verdict, DecisionRecorder, DeterminismVerdict};
use verax_judgment::{build_finding, exit_code, sort_findings, ExitEvents};
use verax_outcome::{enforce, evaluate, LawContext, MatrixInput};
use verax_profiles::ProfileRegistry;
use verax_silence::{classify, SilenceLedger, SilenceObservation};
use verax_types::{
    Acknowledgment, DecisionCategory, DecisionRecord, EvaluationStatus, Evidence, Finding,
    Interaction, Judgment, Outcome, Policy, Promise, PromiseContext, PromiseKind, PromiseSource,
    Signal, SignalKind, SilenceEntry, SilenceKind,
};

/// The verified invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Invariant {
    ConfirmedRequiresEvidence,
    FailuresRequireStrongEvidence,
    MisleadingRequiresContradiction,
    SilencesNeverSucceed,
    AdaptiveBreaksDeterminism,
    NormalizationIdempotent,
    IdentityIsStructural,
    EmissionOrderTotal,
    ExitCodesMonotonic,
}

impl Invariant {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConfirmedRequiresEvidence => {
                "a confirmed finding carries an anchor and effect evidence"
            }
            Self::FailuresRequireStrongEvidence => {
                "failure outcomes pass the evidence law or are aborted"
            }
            Self::MisleadingRequiresContradiction => {
                "misleading requires success and error indicators together"
            }
            Self::SilencesNeverSucceed => "the ledger rejects success-shaped silences",
            Self::AdaptiveBreaksDeterminism => "one adaptive event makes the run non-deterministic",
            Self::NormalizationIdempotent => "normalize is a fixpoint after one application",
            Self::IdentityIsStructural => "identity hashes ignore verdicts and volatile fields",
            Self::EmissionOrderTotal => "finding emission order is total and deterministic",
            Self::ExitCodesMonotonic => "exit codes never decrease as scans get worse",
        }
    }
}

/// Result of one invariant check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheck {
    pub invariant: Invariant,
    pub passed: bool,
    pub detail: String,
}

/// Report over all checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub checks: Vec<InvariantCheck>,
}

impl ConformanceReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed(&self) -> Vec<&InvariantCheck> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            writeln!(
                f,
                "[{}] {:?}: {}",
                if check.passed { "PASS" } else { "FAIL" },
                check.invariant,
                check.detail
            )?;
        }
        Ok(())
    }
}

/// Runs every invariant check against the assembled pure pipeline.
pub struct ConformanceSuite {
    policy: Policy,
    registry: ProfileRegistry,
}

impl Default for ConformanceSuite {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl ConformanceSuite {
    pub fn new(policy: Policy) -> Self {
        let registry = ProfileRegistry::new(policy.clone());
        Self { policy, registry }
    }

    pub fn run_all(&self) -> ConformanceReport {
        ConformanceReport {
            checks: vec![
                self.check_confirmed_requires_evidence(),
                self.check_failures_require_strong_evidence(),
                self.check_misleading_requires_contradiction(),
                self.check_silences_never_succeed(),
                self.check_adaptive_breaks_determinism(),
                self.check_normalization_idempotent(),
                self.check_identity_is_structural(),
                self.check_emission_order_total(),
                self.check_exit_codes_monotonic(),
            ],
        }
    }

    fn check(invariant: Invariant, passed: bool, detail: impl Into<String>) -> InvariantCheck {
        InvariantCheck {
            invariant,
            passed,
            detail: detail.into(),
        }
    }

    fn check_confirmed_requires_evidence(&self) -> InvariantCheck {
        let promise = sample_promise(PromiseKind::Navigation);
        let outcome = Outcome::new(
            verax_types::OutcomeKind::SilentFailure,
            0.85,
            "silence",
            vec![],
        );
        let ack = Acknowledgment::none(3, 0);
        // No anchors at all: the builder must drop, never confirm.
        let built = build_finding(&promise, None, &outcome, &ack, Evidence::default(), None);
        let passed = built.finding.is_none();
        Self::check(
            Invariant::ConfirmedRequiresEvidence,
            passed,
            "anchor-less confirmed finding was dropped",
        )
    }

    fn check_failures_require_strong_evidence(&self) -> InvariantCheck {
        let outcome = Outcome::new(
            verax_types::OutcomeKind::SilentFailure,
            0.85,
            "unbacked",
            vec![],
        );
        let ack = Acknowledgment::none(2, 0);
        let evidence = sample_evidence();
        let ctx = LawContext {
            outcome: &outcome,
            ack: &ack,
            evidence: &evidence,
            silence: Some(SilenceKind::ServerSideOnly),
            last_response_status: Some(204),
            network_failure: false,
            console_error_count: 0,
            api_error_flag: false,
        };
        let passed = enforce(&ctx).is_err();
        Self::check(
            Invariant::FailuresRequireStrongEvidence,
            passed,
            "a silent failure over a healthy 2xx window was refused",
        )
    }

    fn check_misleading_requires_contradiction(&self) -> InvariantCheck {
        let outcome = Outcome::new(verax_types::OutcomeKind::Misleading, 0.8, "test", vec![]);
        let ack = Acknowledgment::none(1, 0);
        let evidence = sample_evidence();
        let ctx = LawContext {
            outcome: &outcome,
            ack: &ack,
            evidence: &evidence,
            silence: None,
            last_response_status: Some(500),
            network_failure: false,
            console_error_count: 0,
            api_error_flag: false,
        };
        let passed = enforce(&ctx).is_err();
        Self::check(
            Invariant::MisleadingRequiresContradiction,
            passed,
            "misleading without a success signal was refused",
        )
    }

    fn check_silences_never_succeed(&self) -> InvariantCheck {
        let mut ledger = SilenceLedger::new();
        let entry = SilenceEntry::new(
            "interaction",
            "test",
            "test entry",
            SilenceKind::TrueSilence,
            "conformance",
            EvaluationStatus::TimedOut,
        )
        .with_outcome("Verified");
        let passed = ledger.record(entry).is_err() && ledger.is_empty();
        Self::check(
            Invariant::SilencesNeverSucceed,
            passed,
            "a success-shaped silence entry was rejected as malformed",
        )
    }

    fn check_adaptive_breaks_determinism(&self) -> InvariantCheck {
        let mut recorder = DecisionRecorder::new();
        recorder.record(DecisionRecord::new(
            DecisionCategory::Budget,
            serde_json::json!({}),
            serde_json::json!(10),
            "interaction budget applied",
        ));
        let (clean, _) = verdict(&recorder);
        recorder.record(DecisionRecord::new(
            DecisionCategory::AdaptiveStabilization { extended: true },
            serde_json::json!({}),
            serde_json::json!(500),
            "stabilization window extended",
        ));
        let (adapted, reasons) = verdict(&recorder);
        let passed = clean == DeterminismVerdict::Deterministic
            && adapted == DeterminismVerdict::NonDeterministic
            && !reasons.is_empty();
        Self::check(
            Invariant::AdaptiveBreaksDeterminism,
            passed,
            "one extension flipped the verdict with explicit reasons",
        )
    }

    fn check_normalization_idempotent(&self) -> InvariantCheck {
        let value = serde_json::json!({
            "id": "volatile",
            "findings": [
                { "judgment": "pass", "confidence": 0.333333, "path": "/home/ci/out/a.json" },
                { "judgment": "failure_silent", "confidence": 0.85 },
            ],
        });
        let once = normalize(&value);
        let passed = normalize(&once) == once;
        Self::check(
            Invariant::NormalizationIdempotent,
            passed,
            "normalize(normalize(x)) == normalize(x)",
        )
    }

    fn check_identity_is_structural(&self) -> InvariantCheck {
        let promise = sample_promise(PromiseKind::Navigation);
        let interaction = Interaction::new("click", "#go", "/settings");
        let ack = Acknowledgment::none(3, 0);
        let pass = Outcome::new(
            verax_types::OutcomeKind::Success,
            0.95,
            "ok",
            vec![SignalKind::RouteChanged],
        );
        let fail = Outcome::new(verax_types::OutcomeKind::SilentFailure, 0.85, "bad", vec![]);
        let a = build_finding(&promise, Some(&interaction), &pass, &ack, sample_evidence(), None)
            .finding
            .unwrap();
        let b = build_finding(&promise, Some(&interaction), &fail, &ack, sample_evidence(), None)
            .finding
            .unwrap();
        // Same coordinates, different verdicts and generated ids: identity
        // must hold while the content hash must differ.
        let passed =
            a.identity_hash == b.identity_hash && a.determinism_hash != b.determinism_hash && a.id != b.id;
        Self::check(
            Invariant::IdentityIsStructural,
            passed,
            "identity survived a verdict change; content hash did not",
        )
    }

    fn check_emission_order_total(&self) -> InvariantCheck {
        let mut forward = sample_findings();
        let mut backward: Vec<Finding> = forward.iter().rev().cloned().collect();
        sort_findings(&mut forward);
        sort_findings(&mut backward);
        let forward_ids: Vec<_> = forward.iter().map(|f| f.determinism_hash.clone()).collect();
        let backward_ids: Vec<_> = backward.iter().map(|f| f.determinism_hash.clone()).collect();
        let passed = forward_ids == backward_ids;
        Self::check(
            Invariant::EmissionOrderTotal,
            passed,
            "sorting is independent of input order",
        )
    }

    fn check_exit_codes_monotonic(&self) -> InvariantCheck {
        let base = sample_findings();
        let pass_only: Vec<Finding> = base
            .iter()
            .filter(|f| f.judgment == Judgment::Pass)
            .cloned()
            .collect();
        let with_review: Vec<Finding> = base
            .iter()
            .filter(|f| matches!(f.judgment, Judgment::Pass | Judgment::NeedsReview))
            .cloned()
            .collect();
        let with_silent: Vec<Finding> = base
            .iter()
            .filter(|f| {
                matches!(
                    f.judgment,
                    Judgment::Pass | Judgment::NeedsReview | Judgment::FailureSilent
                )
            })
            .cloned()
            .collect();
        let all = base;
        let events = ExitEvents::default();
        let codes = [
            exit_code(&pass_only, events).code(),
            exit_code(&with_review, events).code(),
            exit_code(&with_silent, events).code(),
            exit_code(&all, events).code(),
        ];
        let passed = codes.windows(2).all(|w| w[0] <= w[1]) && codes == [0, 10, 20, 30];
        Self::check(
            Invariant::ExitCodesMonotonic,
            passed,
            format!("exit ladder {codes:?}"),
        )
    }
}

// ============================================================================
// Scenario fixtures
// ============================================================================

fn sample_promise(kind: PromiseKind) -> Promise {
    let context = match kind {
        PromiseKind::Navigation => PromiseContext::Navigation {
            target_path: "/dashboard".into(),
        },
        PromiseKind::Submission => PromiseContext::Submission {
            endpoint: "/api/save".into(),
        },
        PromiseKind::StateChange => PromiseContext::State {
            state_key: "sidebar".into(),
        },
        PromiseKind::Feedback(feedback) => PromiseContext::Feedback {
            feedback_types: vec![feedback],
        },
        PromiseKind::Network(_) => PromiseContext::Network {
            endpoint: Some("/api/save".into()),
        },
    };
    Promise {
        id: format!("conf-{kind}"),
        kind,
        source: PromiseSource::proven("src/pages/settings.tsx"),
        expected_signal: "conformance fixture".into(),
        context,
        reason: None,
    }
}

fn sample_evidence() -> Evidence {
    Evidence {
        before_url: Some("/settings".into()),
        after_url: Some("/dashboard".into()),
        before_snapshot: Some("snap-before".into()),
        after_snapshot: Some("snap-after".into()),
        network_records: 1,
        console_errors: 0,
        change_flag: true,
        references: vec!["snapshot:snap-before".into()],
    }
}

fn sample_findings() -> Vec<Finding> {
    use verax_types::OutcomeKind;
    let interaction = Interaction::new("click", "#go", "/settings");
    let ack = Acknowledgment::none(3, 0);
    [
        (PromiseKind::Navigation, OutcomeKind::Success),
        (PromiseKind::Submission, OutcomeKind::Ambiguous),
        (PromiseKind::StateChange, OutcomeKind::SilentFailure),
        (
            PromiseKind::Feedback(verax_types::FeedbackKind::Toast),
            OutcomeKind::Misleading,
        ),
    ]
    .into_iter()
    .filter_map(|(kind, outcome_kind)| {
        let promise = sample_promise(kind);
        let signals_present = match outcome_kind {
            OutcomeKind::Misleading => vec![SignalKind::SuccessMessageAppeared],
            OutcomeKind::Success => vec![SignalKind::RouteChanged],
            _ => vec![],
        };
        let outcome = Outcome::new(outcome_kind, 0.8, "fixture", signals_present);
        build_finding(
            &promise,
            Some(&interaction),
            &outcome,
            &ack,
            sample_evidence(),
            None,
        )
        .finding
    })
    .collect()
}

/// One scenario run through the pure pipeline stages.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub finding: Option<Finding>,
    pub silence: Option<SilenceKind>,
    pub exit: i32,
}

/// Drive (promise, window) through filter, acknowledgment, silence,
/// matrix, law and judgment, exactly as the orchestrator sequences them.
pub fn run_scenario(
    suite: &ConformanceSuite,
    promise: &Promise,
    interaction: &Interaction,
    window_signals: Vec<Signal>,
    elapsed_ms: u64,
    quiet_period_ms: u64,
    requests_sent: u32,
    responses_received: u32,
    last_response_status: Option<u16>,
) -> ScenarioResult {
    let profile = suite.registry.profile_for(promise.kind);
    let filtered = filter_signals(&window_signals, &suite.policy);
    let stability_met = quiet_period_ms >= profile.min_stability_ms;
    let ack = acknowledge(
        &filtered.retained,
        &profile,
        elapsed_ms.saturating_sub(quiet_period_ms),
        stability_met,
        promise.source.proof,
        &suite.policy,
    );
    let ack = downgrade_if_loading_only(ack, &filtered.retained, &suite.policy);

    let silence = if !ack.is_strong() {
        Some(classify(&SilenceObservation {
            signals: window_signals.clone(),
            elapsed_ms,
            grace_timeout_ms: profile.grace_timeout_ms,
            requests_sent,
            responses_received,
            last_response_status,
            dom_delta_present: window_signals.iter().any(|s| s.dom_deltas().is_some()),
            auth_challenge: false,
            user_navigated: false,
            ui_render_error: false,
        }))
    } else {
        None
    };

    let input = MatrixInput {
        ack: ack.clone(),
        promise_kind: promise.kind,
        stability_met,
        silence,
        last_response_status,
        network_failure: None,
        console_error_count: 0,
        js_exception: false,
        api_error_flag: false,
        timed_out: false,
        signals: filtered.kinds(),
    };
    let outcome = evaluate(&input, &suite.policy);

    let evidence = sample_evidence();
    let ctx = LawContext {
        outcome: &outcome,
        ack: &ack,
        evidence: &evidence,
        silence,
        last_response_status,
        network_failure: false,
        console_error_count: 0,
        api_error_flag: false,
    };
    if enforce(&ctx).is_err() {
        return ScenarioResult {
            finding: None,
            silence,
            exit: 50,
        };
    }

    let built = build_finding(promise, Some(interaction), &outcome, &ack, evidence, None);
    let findings: Vec<Finding> = built.finding.clone().into_iter().collect();
    let exit = exit_code(&findings, ExitEvents::default()).code();
    ScenarioResult {
        finding: built.finding,
        silence,
        exit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verax_decisions::{compare_runs, RunSnapshot};
    use verax_types::{FeedbackKind, NetworkKind, OutcomeKind};

    fn signals(kinds: &[SignalKind]) -> Vec<Signal> {
        let at = Utc::now();
        kinds.iter().map(|k| Signal::new(*k, at)).collect()
    }

    fn suite() -> ConformanceSuite {
        ConformanceSuite::default()
    }

    fn interaction() -> Interaction {
        Interaction::new("click", "#go", "/settings")
    }

    #[test]
    fn test_all_invariants_hold() {
        let report = suite().run_all();
        assert!(report.all_passed(), "failed checks:\n{report}");
    }

    #[test]
    fn test_scenario_navigation_success() {
        let s = suite();
        let promise = sample_promise(PromiseKind::Navigation);
        let result = run_scenario(
            &s,
            &promise,
            &interaction(),
            signals(&[SignalKind::RouteChanged, SignalKind::DomChanged]),
            1200,
            600,
            0,
            0,
            None,
        );
        let finding = result.finding.unwrap();
        assert_eq!(finding.judgment, Judgment::Pass);
        assert_eq!(finding.outcome.kind, OutcomeKind::Success);
        assert_eq!(finding.outcome.confidence, 0.95);
        assert_eq!(result.exit, 0);
    }

    #[test]
    fn test_scenario_toast_spinner_silent_failure() {
        let s = suite();
        let promise = sample_promise(PromiseKind::Feedback(FeedbackKind::Toast));
        let result = run_scenario(
            &s,
            &promise,
            &interaction(),
            signals(&[SignalKind::LoadingStarted]),
            3500,
            100,
            0,
            0,
            None,
        );
        assert_eq!(result.silence, Some(SilenceKind::TrueSilence));
        let finding = result.finding.unwrap();
        assert_eq!(finding.judgment, Judgment::FailureSilent);
        assert_eq!(finding.outcome.confidence, 0.80);
        assert_eq!(result.exit, 20);

        // Identity is stable across repeated evaluation.
        let again = run_scenario(
            &s,
            &promise,
            &interaction(),
            signals(&[SignalKind::LoadingStarted]),
            3500,
            100,
            0,
            0,
            None,
        );
        assert_eq!(
            finding.identity_hash,
            again.finding.unwrap().identity_hash
        );
    }

    #[test]
    fn test_scenario_submission_misleading() {
        let s = suite();
        let promise = sample_promise(PromiseKind::Submission);
        let result = run_scenario(
            &s,
            &promise,
            &interaction(),
            signals(&[SignalKind::SuccessMessageAppeared]),
            1000,
            500,
            1,
            1,
            Some(500),
        );
        let finding = result.finding.unwrap();
        assert_eq!(finding.judgment, Judgment::FailureMisleading);
        assert_eq!(finding.outcome.confidence, 0.80);
        assert_eq!(result.exit, 30);
    }

    #[test]
    fn test_scenario_network_timeout() {
        let s = suite();
        let promise = sample_promise(PromiseKind::Network(NetworkKind::Request));
        let result = run_scenario(&s, &promise, &interaction(), vec![], 10_500, 0, 1, 0, None);
        assert_eq!(result.silence, Some(SilenceKind::NetworkTimeout));
        let finding = result.finding.unwrap();
        assert_eq!(finding.judgment, Judgment::FailureSilent);
        assert_eq!(finding.outcome.confidence, 0.85);
        assert_eq!(result.exit, 20);
    }

    #[test]
    fn test_scenario_server_side_only() {
        let s = suite();
        let promise = sample_promise(PromiseKind::Network(NetworkKind::Request));
        let result = run_scenario(
            &s,
            &promise,
            &interaction(),
            vec![],
            900,
            400,
            1,
            1,
            Some(204),
        );
        assert_eq!(result.silence, Some(SilenceKind::ServerSideOnly));
        let finding = result.finding.unwrap();
        assert_eq!(finding.judgment, Judgment::WeakPass);
        assert_eq!(finding.outcome.confidence, 0.70);
        assert_eq!(result.exit, 0);
    }

    #[test]
    fn test_scenario_two_run_determinism() {
        // Runs differing only in volatile material compare deterministic.
        let artifact_a = serde_json::json!({
            "run_id": "run-a",
            "recorded_at_iso": "2026-08-01T10:00:00.000Z",
            "findings": [{ "judgment": "pass", "path": "/home/alice/scan/out.json" }],
        });
        let artifact_b = serde_json::json!({
            "run_id": "run-b",
            "recorded_at_iso": "2026-08-01T11:30:00.000Z",
            "findings": [{ "judgment": "pass", "path": "/Users/bob/scan/out.json" }],
        });
        let clean = DecisionRecorder::new();
        let a = RunSnapshot {
            artifacts: vec![("findings", &artifact_a)],
            summary: clean.summary(),
        };
        let b = RunSnapshot {
            artifacts: vec![("findings", &artifact_b)],
            summary: clean.summary(),
        };
        assert_eq!(compare_runs(&a, &b).verdict, DeterminismVerdict::Deterministic);

        // The same pair with one adaptive event on run B is disqualified
        // even though the artifacts still match.
        let mut adapted = DecisionRecorder::new();
        adapted.record(DecisionRecord::new(
            DecisionCategory::AdaptiveStabilization { extended: true },
            serde_json::json!({}),
            serde_json::json!(500),
            "stabilization window extended",
        ));
        let b_adapted = RunSnapshot {
            artifacts: vec![("findings", &artifact_b)],
            summary: adapted.summary(),
        };
        let comparison = compare_runs(&a, &b_adapted);
        assert_eq!(comparison.verdict, DeterminismVerdict::NonDeterministic);
        assert!(comparison.diffs.is_empty());
    }
}
