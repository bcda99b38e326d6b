//! The determinism lock
//!
//! Hard rule: any adaptive event disqualifies the run. The verdict is
//! binary, the reasons explicit, and artifact normalization can never
//! launder an adaptive run into a deterministic one.

use crate::{normalized_hash, DecisionRecorder, DecisionSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use verax_types::SCHEMA_VERSION;

/// The binary determinism verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminismVerdict {
    Deterministic,
    NonDeterministic,
}

/// The determinism report artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    pub version: u32,
    pub verdict: DeterminismVerdict,
    pub reasons: Vec<String>,
    /// Labels of the adaptive events that broke determinism.
    pub adaptive_events: Vec<String>,
    pub decision_summary: DecisionSummary,
    pub contract: DeterminismContract,
}

/// The published contract: which decision categories break determinism
/// and which audit structures track them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismContract {
    pub deterministic: Vec<String>,
    pub non_deterministic: Vec<String>,
    pub tracking: Vec<String>,
}

impl Default for DeterminismContract {
    fn default() -> Self {
        Self {
            deterministic: vec![
                "budget".into(),
                "timeout".into(),
                "environment".into(),
                "adaptive_stabilization".into(),
            ],
            non_deterministic: vec![
                "retry".into(),
                "truncation".into(),
                "adaptive_stabilization_extended".into(),
            ],
            tracking: vec!["decision-record".into(), "silence-ledger".into()],
        }
    }
}

/// Compute the verdict for one run.
pub fn verdict(recorder: &DecisionRecorder) -> (DeterminismVerdict, Vec<String>) {
    let adaptive = recorder.adaptive_events();
    if adaptive.is_empty() {
        return (DeterminismVerdict::Deterministic, vec![]);
    }
    let reasons = adaptive
        .iter()
        .map(|r| format!("{}: {}", r.category.label(), r.reason))
        .collect();
    (DeterminismVerdict::NonDeterministic, reasons)
}

/// Build the determinism report for one run.
pub fn report(recorder: &DecisionRecorder) -> DeterminismReport {
    let (verdict, reasons) = verdict(recorder);
    DeterminismReport {
        version: SCHEMA_VERSION,
        verdict,
        reasons,
        adaptive_events: recorder
            .adaptive_events()
            .iter()
            .map(|r| r.category.label().to_string())
            .collect(),
        decision_summary: recorder.summary(),
        contract: DeterminismContract::default(),
    }
}

/// Result of comparing two runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunComparison {
    pub verdict: DeterminismVerdict,
    pub reasons: Vec<String>,
    /// Names of artifacts whose normalized hashes differed.
    pub diffs: Vec<String>,
}

/// One run's comparable material: named artifacts plus its decision
/// summary.
#[derive(Debug, Clone)]
pub struct RunSnapshot<'a> {
    pub artifacts: Vec<(&'a str, &'a Value)>,
    pub summary: DecisionSummary,
}

/// Compare two runs: equal normalized artifact hashes and identical
/// decision summaries, with no adaptive events on either side.
pub fn compare_runs(a: &RunSnapshot<'_>, b: &RunSnapshot<'_>) -> RunComparison {
    let mut reasons = Vec::new();
    let mut diffs = Vec::new();

    if a.artifacts.len() != b.artifacts.len() {
        reasons.push(format!(
            "artifact sets differ: {} vs {}",
            a.artifacts.len(),
            b.artifacts.len()
        ));
    } else {
        for ((name, left), (_, right)) in a.artifacts.iter().zip(b.artifacts.iter()) {
            if normalized_hash(left) != normalized_hash(right) {
                diffs.push(name.to_string());
            }
        }
        for name in &diffs {
            reasons.push(format!("artifact {name} differs after normalization"));
        }
    }

    if !a.summary.deterministic {
        reasons.push("run A recorded adaptive events".to_string());
    }
    if !b.summary.deterministic {
        reasons.push("run B recorded adaptive events".to_string());
    }
    if a.summary.by_category != b.summary.by_category {
        reasons.push("decision summaries differ".to_string());
    }

    let verdict = if reasons.is_empty() {
        DeterminismVerdict::Deterministic
    } else {
        DeterminismVerdict::NonDeterministic
    };
    RunComparison {
        verdict,
        reasons,
        diffs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use verax_types::{DecisionCategory, DecisionRecord};

    fn recorder_with(categories: &[DecisionCategory]) -> DecisionRecorder {
        let mut rec = DecisionRecorder::new();
        for c in categories {
            rec.record(DecisionRecord::new(*c, json!({}), json!(null), "test"));
        }
        rec
    }

    #[test]
    fn test_clean_run_is_deterministic() {
        let rec = recorder_with(&[DecisionCategory::Budget, DecisionCategory::Timeout]);
        let (v, reasons) = verdict(&rec);
        assert_eq!(v, DeterminismVerdict::Deterministic);
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_single_adaptive_event_flips_the_verdict() {
        let rec = recorder_with(&[DecisionCategory::Retry]);
        let (v, reasons) = verdict(&rec);
        assert_eq!(v, DeterminismVerdict::NonDeterministic);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].starts_with("retry"));
    }

    #[test]
    fn test_report_shape() {
        let rec = recorder_with(&[DecisionCategory::AdaptiveStabilization { extended: true }]);
        let rep = report(&rec);
        assert_eq!(rep.version, 1);
        assert_eq!(rep.verdict, DeterminismVerdict::NonDeterministic);
        assert_eq!(rep.adaptive_events, vec!["adaptive_stabilization_extended"]);
        assert!(!rep.decision_summary.deterministic);
        assert!(rep
            .contract
            .non_deterministic
            .contains(&"retry".to_string()));
    }

    #[test]
    fn test_equal_runs_compare_deterministic() {
        let a_art = json!({ "findings": [{ "judgment": "pass", "id": "a" }], "run_id": "r1" });
        let b_art = json!({ "findings": [{ "judgment": "pass", "id": "b" }], "run_id": "r2" });
        let clean = recorder_with(&[DecisionCategory::Budget]);
        let a = RunSnapshot {
            artifacts: vec![("findings", &a_art)],
            summary: clean.summary(),
        };
        let b = RunSnapshot {
            artifacts: vec![("findings", &b_art)],
            summary: clean.summary(),
        };
        let cmp = compare_runs(&a, &b);
        assert_eq!(cmp.verdict, DeterminismVerdict::Deterministic);
        assert!(cmp.diffs.is_empty());
    }

    #[test]
    fn test_adaptive_event_breaks_comparison_even_with_equal_artifacts() {
        let art = json!({ "findings": [] });
        let clean = recorder_with(&[]);
        let adapted = recorder_with(&[DecisionCategory::AdaptiveStabilization { extended: true }]);
        let a = RunSnapshot {
            artifacts: vec![("findings", &art)],
            summary: clean.summary(),
        };
        let b = RunSnapshot {
            artifacts: vec![("findings", &art)],
            summary: adapted.summary(),
        };
        let cmp = compare_runs(&a, &b);
        assert_eq!(cmp.verdict, DeterminismVerdict::NonDeterministic);
        assert!(cmp.diffs.is_empty());
        assert!(cmp.reasons.iter().any(|r| r.contains("run B")));
    }

    #[test]
    fn test_content_diff_breaks_comparison() {
        let a_art = json!({ "findings": [{ "judgment": "pass" }] });
        let b_art = json!({ "findings": [{ "judgment": "failure_silent" }] });
        let clean = recorder_with(&[]);
        let a = RunSnapshot {
            artifacts: vec![("findings", &a_art)],
            summary: clean.summary(),
        };
        let b = RunSnapshot {
            artifacts: vec![("findings", &b_art)],
            summary: clean.summary(),
        };
        let cmp = compare_runs(&a, &b);
        assert_eq!(cmp.verdict, DeterminismVerdict::NonDeterministic);
        assert_eq!(cmp.diffs, vec!["findings"]);
    }
}
