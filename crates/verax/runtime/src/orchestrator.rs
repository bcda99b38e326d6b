//! The scan orchestrator
//!
//! Drives the pipeline per (promise, interaction) pair: observe, filter,
//! acknowledge, classify silence, derive the outcome, enforce the
//! evidence law, emit the judgment. The orchestrator exclusively owns the
//! findings, the silence ledger and the decision recorder; components
//! below it are pure.

use crate::{
    Observation, PromiseManifest, ScanConfig, ScanError, SignalSource, SignalSourceError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use verax_acknowledgment::{
    acknowledge, downgrade_if_loading_only, filter_signals, substantive_gap,
};
use verax_decisions::DecisionRecorder;
use verax_judgment::{build_finding, exit_code, sort_findings, ExitCode, ExitEvents, R5Disposition};
use verax_outcome::{enforce, evaluate, LawContext, MatrixInput};
use verax_profiles::{ObservationProfile, ProfileRegistry};
use verax_silence::{classify, SilenceLedger, SilenceObservation};
use verax_types::{
    Acknowledgment, ConfidenceImpact, DecisionCategory, DecisionRecord, EvaluationStatus,
    Evidence, Finding, Interaction, Outcome, OutcomeKind, Promise, SilenceEntry, SilenceKind,
};

/// One enforcement action, for the findings artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementEvent {
    pub promise_id: String,
    pub rule: String,
    pub detail: String,
}

/// Everything the evidence law did during the scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnforcementLog {
    pub downgrades: Vec<EnforcementEvent>,
    pub drops: Vec<EnforcementEvent>,
    pub violations: Vec<EnforcementEvent>,
}

/// The completed scan.
#[derive(Debug)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub enforcement: EnforcementLog,
    pub ledger: SilenceLedger,
    pub recorder: DecisionRecorder,
    pub exit: ExitCode,
    pub run_id: Option<String>,
}

impl ScanReport {
    pub fn exit_code(&self) -> i32 {
        self.exit.code()
    }
}

enum Observed {
    Window(Observation),
    Cancelled,
    SensorFailed,
    Infrastructure(String),
}

/// Owns all mutable scan state and drives the pipeline.
pub struct Orchestrator {
    config: ScanConfig,
    registry: ProfileRegistry,
    findings: Vec<Finding>,
    ledger: SilenceLedger,
    recorder: DecisionRecorder,
    enforcement: EnforcementLog,
    law_violated: bool,
    infra_failure: Option<String>,
}

impl Orchestrator {
    pub fn new(config: ScanConfig) -> Self {
        let registry = ProfileRegistry::new(config.policy.clone());
        Self {
            config,
            registry,
            findings: Vec::new(),
            ledger: SilenceLedger::new(),
            recorder: DecisionRecorder::new(),
            enforcement: EnforcementLog::default(),
            law_violated: false,
            infra_failure: None,
        }
    }

    /// Run the scan. Serial over pairs; suspension only at sensor awaits.
    pub async fn run(
        mut self,
        source: &mut dyn SignalSource,
        manifest: &PromiseManifest,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ScanReport, ScanError> {
        let pairs = manifest.promises()?;
        tracing::info!(total = pairs.len(), "scan started");
        let started = Instant::now();
        let mut truncated_from: Option<usize> = None;

        for (idx, (promise, interaction)) in pairs.iter().enumerate() {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let over_budget = self
                .config
                .max_interactions
                .map(|max| idx >= max)
                .unwrap_or(false)
                || elapsed_ms >= self.config.max_scan_ms;
            if over_budget {
                truncated_from = Some(idx);
                break;
            }

            self.verify_pair(source, promise, interaction, &mut cancel, started)
                .await;

            if self.infra_failure.is_some() {
                truncated_from = Some(idx + 1);
                break;
            }
        }

        if let Some(idx) = truncated_from {
            self.account_for_unevaluated(&pairs[idx..]);
        }

        sort_findings(&mut self.findings);
        let exit = exit_code(
            &self.findings,
            ExitEvents {
                evidence_law_violated: self.law_violated,
                infrastructure_failure: self.infra_failure.is_some(),
                usage_error: false,
            },
        );
        tracing::info!(
            findings = self.findings.len(),
            silences = self.ledger.len(),
            exit = exit.code(),
            "scan finished"
        );

        Ok(ScanReport {
            findings: self.findings,
            enforcement: self.enforcement,
            ledger: self.ledger,
            recorder: self.recorder,
            exit,
            run_id: self.config.run_id.clone(),
        })
    }

    async fn verify_pair(
        &mut self,
        source: &mut dyn SignalSource,
        promise: &Promise,
        interaction: &Interaction,
        cancel: &mut watch::Receiver<bool>,
        started: Instant,
    ) {
        let profile = self.registry.profile_for(promise.kind);
        let grace_ms = self.effective_grace(&profile, promise, started);

        let mut observation = match self
            .observe_with_retry(source, promise, interaction, cancel, grace_ms)
            .await
        {
            Observed::Window(obs) => obs,
            Observed::Cancelled => {
                self.record_interaction_timeout(promise);
                return;
            }
            Observed::SensorFailed => {
                self.emit_needs_review(promise, interaction, &profile, "sensor failed repeatedly");
                return;
            }
            Observed::Infrastructure(message) => {
                tracing::warn!(%message, "infrastructure failure, scan cannot continue");
                self.infra_failure = Some(message);
                return;
            }
        };

        // Optional adaptive extension: one extra stabilization window when
        // the page was still moving. Always recorded; always breaks the
        // determinism verdict.
        if self.config.adaptive_stabilization
            && observation.quiet_period_ms < profile.min_stability_ms
            && !observation.signals.is_empty()
        {
            self.recorder.record(
                DecisionRecord::new(
                    DecisionCategory::AdaptiveStabilization { extended: true },
                    json!({
                        "quiet_period_ms": observation.quiet_period_ms,
                        "min_stability_ms": profile.min_stability_ms,
                    }),
                    json!(profile.min_stability_ms),
                    "extended stabilization window for a still-moving page",
                )
                .with_context(promise.id.clone()),
            );
            match self
                .observe_once(source, interaction, cancel, profile.min_stability_ms)
                .await
            {
                Observed::Window(extra) => merge_windows(&mut observation, extra),
                Observed::Cancelled => {
                    self.record_interaction_timeout(promise);
                    return;
                }
                Observed::Infrastructure(message) => {
                    self.infra_failure = Some(message);
                    return;
                }
                Observed::SensorFailed => {}
            }
        }

        self.judge(promise, interaction, &profile, observation, grace_ms);
    }

    /// Profile grace clamped by the remaining scan budget. Clamping is a
    /// recorded (non-adaptive) decision.
    fn effective_grace(
        &mut self,
        profile: &ObservationProfile,
        promise: &Promise,
        started: Instant,
    ) -> u64 {
        let elapsed = started.elapsed().as_millis() as u64;
        let remaining = self.config.max_scan_ms.saturating_sub(elapsed).max(1);
        if profile.grace_timeout_ms > remaining {
            self.recorder.record(
                DecisionRecord::new(
                    DecisionCategory::Timeout,
                    json!({
                        "profile_grace_ms": profile.grace_timeout_ms,
                        "remaining_scan_ms": remaining,
                    }),
                    json!(remaining),
                    "grace timeout clamped by the scan duration budget",
                )
                .with_context(promise.id.clone()),
            );
            remaining
        } else {
            profile.grace_timeout_ms
        }
    }

    async fn observe_once(
        &mut self,
        source: &mut dyn SignalSource,
        interaction: &Interaction,
        cancel: &mut watch::Receiver<bool>,
        timeout_ms: u64,
    ) -> Observed {
        if *cancel.borrow() {
            return Observed::Cancelled;
        }
        tokio::select! {
            biased;
            _ = wait_for_cancel(cancel) => Observed::Cancelled,
            result = source.observe(interaction, Duration::from_millis(timeout_ms)) => {
                match result {
                    Ok(obs) => Observed::Window(obs),
                    Err(SignalSourceError::Sensor(message)) => {
                        tracing::warn!(%message, "sensor failure");
                        Observed::SensorFailed
                    }
                    Err(SignalSourceError::Infrastructure(message)) => {
                        Observed::Infrastructure(message)
                    }
                }
            }
        }
    }

    /// First failure is retried once; the retry is adaptive and recorded.
    /// A second failure gives up on the pair.
    async fn observe_with_retry(
        &mut self,
        source: &mut dyn SignalSource,
        promise: &Promise,
        interaction: &Interaction,
        cancel: &mut watch::Receiver<bool>,
        grace_ms: u64,
    ) -> Observed {
        match self.observe_once(source, interaction, cancel, grace_ms).await {
            Observed::SensorFailed => {
                self.record_sensor_failure(promise, "first observation attempt failed");
                self.recorder.record(
                    DecisionRecord::new(
                        DecisionCategory::Retry,
                        json!({ "attempt": 1 }),
                        json!(2),
                        "retrying after sensor failure",
                    )
                    .with_context(promise.id.clone()),
                );
                match self.observe_once(source, interaction, cancel, grace_ms).await {
                    Observed::SensorFailed => {
                        self.record_sensor_failure(promise, "second observation attempt failed");
                        Observed::SensorFailed
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    fn judge(
        &mut self,
        promise: &Promise,
        interaction: &Interaction,
        profile: &ObservationProfile,
        obs: Observation,
        grace_ms: u64,
    ) {
        let policy = self.config.policy.clone();
        let filtered = filter_signals(&obs.signals, &policy);
        let stability_met = obs.quiet_period_ms >= profile.min_stability_ms;
        let latency_ms = obs.elapsed_ms.saturating_sub(obs.quiet_period_ms);

        let ack = acknowledge(
            &filtered.retained,
            profile,
            latency_ms,
            stability_met,
            promise.source.proof,
            &policy,
        );
        let ack = downgrade_if_loading_only(ack, &filtered.retained, &policy);
        tracing::debug!(
            promise = %promise.id,
            level = ?ack.level,
            confidence = ack.confidence,
            "acknowledgment computed"
        );

        let silence = if !ack.is_strong() {
            let classified = classify(&SilenceObservation {
                signals: obs.signals.clone(),
                elapsed_ms: obs.elapsed_ms,
                grace_timeout_ms: grace_ms,
                requests_sent: obs.requests_sent,
                responses_received: obs.responses_received,
                last_response_status: obs.last_response_status,
                dom_delta_present: obs.dom_delta_present(),
                auth_challenge: obs.auth_challenge,
                user_navigated: obs.user_navigated,
                ui_render_error: obs.ui_render_error,
            });
            tracing::debug!(promise = %promise.id, silence = ?classified, "silence classified");
            Some(classified)
        } else {
            None
        };

        let matrix_input = MatrixInput {
            ack: ack.clone(),
            promise_kind: promise.kind,
            stability_met,
            silence,
            last_response_status: obs.last_response_status,
            network_failure: obs.network_failure.clone(),
            console_error_count: obs.console_errors.len() as u32,
            js_exception: !obs.page_errors.is_empty(),
            api_error_flag: obs.api_error_flag,
            timed_out: obs.timed_out,
            signals: filtered.kinds(),
        };
        let mut outcome = evaluate(&matrix_input, &policy);
        if let Some(diagnostic) = substantive_gap(promise.kind, &filtered.retained) {
            outcome = outcome.with_warning(diagnostic);
        }
        let validation = verax_profiles::validate(&filtered.retained, profile);
        if !validation.satisfied {
            if let Some(reason) = validation.reason {
                outcome = outcome.with_warning(reason);
            }
        }

        let evidence = build_evidence(&obs);

        let law = LawContext {
            outcome: &outcome,
            ack: &ack,
            evidence: &evidence,
            silence,
            last_response_status: obs.last_response_status,
            network_failure: obs.network_failure.is_some(),
            console_error_count: obs.console_errors.len() as u32,
            api_error_flag: obs.api_error_flag,
        };
        if let Err(violation) = enforce(&law) {
            tracing::warn!(
                promise = %promise.id,
                rule = violation.rule(),
                %violation,
                "evidence law violation, judgment aborted"
            );
            self.law_violated = true;
            self.enforcement.violations.push(EnforcementEvent {
                promise_id: promise.id.clone(),
                rule: violation.rule().to_string(),
                detail: violation.to_string(),
            });
            return;
        }

        if let Some(kind) = silence {
            self.record_silence(promise, kind, grace_ms);
        }

        let built = build_finding(promise, Some(interaction), &outcome, &ack, evidence, None);
        match built.r5 {
            R5Disposition::Kept => {}
            R5Disposition::Downgraded => self.enforcement.downgrades.push(EnforcementEvent {
                promise_id: promise.id.clone(),
                rule: "R5".to_string(),
                detail: "missing anchor, confirmed downgraded to suspected".to_string(),
            }),
            R5Disposition::Dropped => {
                self.enforcement.drops.push(EnforcementEvent {
                    promise_id: promise.id.clone(),
                    rule: "R5".to_string(),
                    detail: "missing both anchors, finding dropped".to_string(),
                });
                return;
            }
        }
        if let Some(finding) = built.finding {
            tracing::debug!(
                promise = %promise.id,
                judgment = ?finding.judgment,
                "finding emitted"
            );
            self.findings.push(finding);
        }
    }

    fn emit_needs_review(
        &mut self,
        promise: &Promise,
        interaction: &Interaction,
        profile: &ObservationProfile,
        reason: &str,
    ) {
        let ack = Acknowledgment::none(profile.required.len(), 0);
        let outcome = Outcome::new(OutcomeKind::Ambiguous, 0.0, reason, vec![])
            .with_warning("sensor could not observe this interaction");
        let evidence = Evidence {
            before_url: Some(interaction.url_path.clone()),
            ..Default::default()
        }
        .with_reference("sensor-failure");
        let built = build_finding(promise, Some(interaction), &outcome, &ack, evidence, None);
        if let Some(finding) = built.finding {
            self.findings.push(finding);
        }
    }

    fn record_sensor_failure(&mut self, promise: &Promise, detail: &str) {
        let entry = SilenceEntry::new(
            "sensor",
            "signal source error",
            detail,
            SilenceKind::SensorFailure,
            "observe-error",
            EvaluationStatus::Incomplete,
        )
        .for_promise(promise.id.clone())
        .with_impact("the interaction could not be observed")
        .with_confidence_impact(ConfidenceImpact::new(-5.0, -10.0, -5.0));
        if let Err(error) = self.ledger.record(entry) {
            tracing::warn!(%error, "failed to record sensor-failure silence");
        }
    }

    fn record_interaction_timeout(&mut self, promise: &Promise) {
        let entry = SilenceEntry::new(
            "interaction",
            "cancelled mid-interaction",
            "the scan was cancelled while this interaction was in flight",
            SilenceKind::InteractionTimeout,
            "cancellation",
            EvaluationStatus::TimedOut,
        )
        .for_promise(promise.id.clone())
        .with_impact("this promise was never verified")
        .with_confidence_impact(ConfidenceImpact::new(-3.0, -8.0, -3.0));
        if let Err(error) = self.ledger.record(entry) {
            tracing::warn!(%error, "failed to record cancellation silence");
        }
    }

    fn record_silence(&mut self, promise: &Promise, kind: SilenceKind, grace_ms: u64) {
        let status = match kind {
            SilenceKind::BlockedByAuth => EvaluationStatus::Blocked,
            SilenceKind::UserNavigation | SilenceKind::CoverageGap => EvaluationStatus::Skipped,
            SilenceKind::TrueSilence
            | SilenceKind::NetworkTimeout
            | SilenceKind::InteractionTimeout => EvaluationStatus::TimedOut,
            SilenceKind::ServerSideOnly
            | SilenceKind::SlowAcknowledgment
            | SilenceKind::UiRenderFailure
            | SilenceKind::SensorFailure => EvaluationStatus::Incomplete,
        };
        let impact = if kind.is_error_indicative() {
            ConfidenceImpact::new(-5.0, -10.0, -5.0)
        } else {
            ConfidenceImpact::new(-2.0, -5.0, -2.0)
        };
        let entry = SilenceEntry::new(
            "interaction",
            "acknowledgment shortfall",
            format!("{kind:?} within a {grace_ms} ms grace window"),
            kind,
            "acknowledgment-shortfall",
            status,
        )
        .for_promise(promise.id.clone())
        .with_context(format!("{} promise", promise.kind))
        .with_impact("verification confidence reduced")
        .with_confidence_impact(impact);
        if let Err(error) = self.ledger.record(entry) {
            tracing::warn!(%error, "failed to record silence entry");
        }
    }

    /// Budget exhaustion (or an infrastructure stop) leaves pairs
    /// unevaluated; each becomes a coverage gap. Pure budget truncation
    /// is an adaptive decision.
    fn account_for_unevaluated(&mut self, remaining: &[(Promise, Interaction)]) {
        if remaining.is_empty() {
            return;
        }
        let infra = self.infra_failure.is_some();
        if !infra {
            self.recorder.record(DecisionRecord::new(
                DecisionCategory::Truncation,
                json!({ "unevaluated": remaining.len() }),
                json!(remaining.len()),
                "scan budget exhausted before all pairs were evaluated",
            ));
        }
        for (promise, _) in remaining {
            let entry = SilenceEntry::new(
                "coverage",
                if infra {
                    "infrastructure failure"
                } else {
                    "budget exhausted"
                },
                format!("promise {} was never evaluated", promise.id),
                SilenceKind::CoverageGap,
                if infra { "infrastructure" } else { "truncation" },
                EvaluationStatus::Skipped,
            )
            .for_promise(promise.id.clone())
            .with_impact("coverage gap")
            .with_confidence_impact(ConfidenceImpact::new(-5.0, -10.0, -5.0));
            if let Err(error) = self.ledger.record(entry) {
                tracing::warn!(%error, "failed to record coverage gap");
            }
        }
    }
}

/// Build the evidence struct from one observation window.
fn build_evidence(obs: &Observation) -> Evidence {
    let mut evidence = Evidence {
        before_url: obs.before_url.clone(),
        after_url: obs.after_url.clone(),
        before_snapshot: obs.before_snapshot.clone(),
        after_snapshot: obs.after_snapshot.clone(),
        network_records: obs.requests_sent + obs.responses_received,
        console_errors: obs.console_errors.len() as u32,
        change_flag: obs.dom_delta_present() || !obs.signals.is_empty(),
        references: Vec::new(),
    };
    if let Some(handle) = &evidence.before_snapshot {
        evidence.references.push(format!("snapshot:{handle}"));
    }
    if let Some(handle) = &evidence.after_snapshot {
        evidence.references.push(format!("snapshot:{handle}"));
    }
    if evidence.network_records > 0 {
        evidence
            .references
            .push(format!("network-records:{}", evidence.network_records));
    }
    if evidence.console_errors > 0 {
        evidence
            .references
            .push(format!("console-errors:{}", evidence.console_errors));
    }
    evidence
}

/// Fold an extension window into the first observation.
fn merge_windows(base: &mut Observation, extra: Observation) {
    base.signals.extend(extra.signals);
    base.requests_sent += extra.requests_sent;
    base.responses_received += extra.responses_received;
    if extra.last_response_status.is_some() {
        base.last_response_status = extra.last_response_status;
    }
    base.network_failure = base.network_failure.take().or(extra.network_failure);
    base.console_errors.extend(extra.console_errors);
    base.page_errors.extend(extra.page_errors);
    base.dom_delta = base.dom_delta.or(extra.dom_delta);
    base.auth_challenge |= extra.auth_challenge;
    base.user_navigated |= extra.user_navigated;
    base.ui_render_error |= extra.ui_render_error;
    base.api_error_flag |= extra.api_error_flag;
    base.timed_out |= extra.timed_out;
    base.after_url = extra.after_url.or(base.after_url.take());
    base.after_snapshot = extra.after_snapshot.or(base.after_snapshot.take());
    base.quiet_period_ms = extra.quiet_period_ms;
    base.elapsed_ms += extra.elapsed_ms;
}

async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender dropped without cancelling; never resolves.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verax_types::{Signal, SignalKind};

    #[test]
    fn test_build_evidence_references() {
        let obs = Observation {
            before_snapshot: Some("snap-0".into()),
            after_snapshot: Some("snap-1".into()),
            requests_sent: 1,
            responses_received: 1,
            console_errors: vec!["boom".into()],
            ..Default::default()
        };
        let evidence = build_evidence(&obs);
        assert!(evidence.references.contains(&"snapshot:snap-0".to_string()));
        assert!(evidence.references.contains(&"network-records:2".to_string()));
        assert!(evidence.references.contains(&"console-errors:1".to_string()));
        assert!(evidence.has_effect_evidence());
    }

    #[test]
    fn test_merge_windows_keeps_latest_stability() {
        let mut base = Observation {
            signals: vec![Signal::new(SignalKind::LoadingStarted, Utc::now())],
            quiet_period_ms: 50,
            elapsed_ms: 1000,
            ..Default::default()
        };
        let extra = Observation {
            signals: vec![Signal::new(SignalKind::RouteChanged, Utc::now())],
            quiet_period_ms: 600,
            elapsed_ms: 700,
            after_url: Some("/done".into()),
            ..Default::default()
        };
        merge_windows(&mut base, extra);
        assert_eq!(base.signals.len(), 2);
        assert_eq!(base.quiet_period_ms, 600);
        assert_eq!(base.elapsed_ms, 1700);
        assert_eq!(base.after_url.as_deref(), Some("/done"));
    }
}
