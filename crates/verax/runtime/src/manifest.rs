//! Promise manifest intake
//!
//! The static extractor hands the engine a JSON manifest of expectations.
//! Expectation ids are stable across runs for a fixed source; an invalid
//! manifest is a usage error and preempts the scan.

use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use verax_types::{
    Interaction, NetworkKind, Promise, PromiseContext, PromiseKind, PromiseSource, ProofLevel,
};

/// One expectation from the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    pub id: String,
    /// Kind string, e.g. `navigation` or `feedback.toast`.
    pub kind: String,
    pub from_path: String,
    pub target_path: Option<String>,
    pub endpoint: Option<String>,
    pub selector_hint: Option<String>,
    pub proof: ProofLevel,
}

/// The consumed manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromiseManifest {
    pub version: u32,
    pub routes: Vec<String>,
    pub expectations: Vec<Expectation>,
}

impl PromiseManifest {
    pub fn from_json(raw: &str) -> Result<Self, ScanError> {
        let manifest: Self =
            serde_json::from_str(raw).map_err(|e| ScanError::Usage(format!("invalid manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Structural validation: unique non-empty ids, known kinds, the
    /// per-kind required context present.
    pub fn validate(&self) -> Result<(), ScanError> {
        let mut seen = HashSet::new();
        for exp in &self.expectations {
            if exp.id.trim().is_empty() {
                return Err(ScanError::Usage("expectation with empty id".into()));
            }
            if !seen.insert(exp.id.as_str()) {
                return Err(ScanError::Usage(format!("duplicate expectation id {}", exp.id)));
            }
            let kind: PromiseKind = exp
                .kind
                .parse()
                .map_err(|e| ScanError::Usage(format!("expectation {}: {e}", exp.id)))?;
            if kind == PromiseKind::Navigation && exp.target_path.is_none() {
                return Err(ScanError::Usage(format!(
                    "navigation expectation {} has no target_path",
                    exp.id
                )));
            }
        }
        Ok(())
    }

    /// Expand expectations into (promise, interaction) pairs.
    pub fn promises(&self) -> Result<Vec<(Promise, Interaction)>, ScanError> {
        self.expectations.iter().map(expand).collect()
    }
}

fn expand(exp: &Expectation) -> Result<(Promise, Interaction), ScanError> {
    let kind: PromiseKind = exp
        .kind
        .parse()
        .map_err(|e| ScanError::Usage(format!("expectation {}: {e}", exp.id)))?;

    let (context, expected_signal, interaction_type) = match kind {
        PromiseKind::Navigation => {
            let target = exp.target_path.clone().ok_or_else(|| {
                ScanError::Usage(format!("navigation expectation {} has no target_path", exp.id))
            })?;
            (
                PromiseContext::Navigation {
                    target_path: target.clone(),
                },
                format!("route change to {target}"),
                "click",
            )
        }
        PromiseKind::Submission => {
            let endpoint = exp.endpoint.clone().unwrap_or_else(|| exp.from_path.clone());
            (
                PromiseContext::Submission {
                    endpoint: endpoint.clone(),
                },
                format!("submission acknowledged by {endpoint}"),
                "submit",
            )
        }
        PromiseKind::StateChange => {
            let key = exp.selector_hint.clone().unwrap_or_else(|| exp.id.clone());
            (
                PromiseContext::State {
                    state_key: key.clone(),
                },
                format!("visible state change at {key}"),
                "click",
            )
        }
        PromiseKind::Feedback(feedback) => (
            PromiseContext::Feedback {
                feedback_types: vec![feedback],
            },
            format!("{} feedback shown", exp.kind),
            "click",
        ),
        PromiseKind::Network(NetworkKind::WebSocket) => (
            PromiseContext::Network {
                endpoint: exp.endpoint.clone(),
            },
            "websocket request initiated".to_string(),
            "click",
        ),
        PromiseKind::Network(_) => (
            PromiseContext::Network {
                endpoint: exp.endpoint.clone(),
            },
            "network round trip completed".to_string(),
            "click",
        ),
    };

    let mut source = match exp.proof {
        ProofLevel::Proven => PromiseSource::proven(exp.from_path.clone()),
        ProofLevel::Observed => PromiseSource::observed(),
        ProofLevel::Inferred => PromiseSource::inferred(),
    };
    if let Some(hint) = &exp.selector_hint {
        source = source.with_selector(hint.clone());
    }

    let selector = exp
        .selector_hint
        .clone()
        .unwrap_or_else(|| format!("[data-promise='{}']", exp.id));

    let promise = Promise {
        id: exp.id.clone(),
        kind,
        source,
        expected_signal,
        context,
        reason: None,
    };
    let interaction = Interaction::new(interaction_type, selector, exp.from_path.clone());
    Ok((promise, interaction))
}
