//! Policy - the calibrated threshold record
//!
//! Every threshold the pipeline consults lives here, owned by the
//! orchestrator and passed explicitly. The defaults are the published
//! calibration; alternates exist for tuning against new domains.

use crate::ProofLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Confidence of a stable, fully-acknowledged interaction.
    pub strong_confidence: f64,
    /// Confidence when required signals are present but transient.
    pub transient_partial_confidence: f64,
    /// Confidence of acknowledgment without any required signal.
    pub weak_confidence: f64,
    /// Confidence when only loading-class signals remain after filtering.
    pub loading_only_confidence: f64,
    /// Fraction of required signals that makes a partial meaningful.
    pub meaningful_partial_ratio: f64,

    /// DOM delta thresholds below which a change is not substantive.
    pub dom_substantive_min_bytes: u64,
    pub dom_substantive_min_nodes: u32,

    /// Registry fallbacks for unknown promise kinds.
    pub default_min_stability_ms: u64,
    pub default_grace_timeout_ms: u64,

    /// Acknowledgment confidence caps by proof level.
    pub observed_confidence_cap: f64,
    pub inferred_confidence_cap: f64,
}

impl Policy {
    /// The cap a proof level places on acknowledgment confidence.
    pub fn proof_cap(&self, proof: ProofLevel) -> f64 {
        match proof {
            ProofLevel::Proven => 1.0,
            ProofLevel::Observed => self.observed_confidence_cap,
            ProofLevel::Inferred => self.inferred_confidence_cap,
        }
    }

    /// Whether a DOM delta clears the substantive threshold.
    pub fn dom_delta_substantive(&self, added_bytes: u64, visible_added_nodes: u32) -> bool {
        added_bytes > self.dom_substantive_min_bytes
            && visible_added_nodes >= self.dom_substantive_min_nodes
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            strong_confidence: 0.95,
            transient_partial_confidence: 0.6,
            weak_confidence: 0.3,
            loading_only_confidence: 0.2,
            meaningful_partial_ratio: 0.5,
            dom_substantive_min_bytes: 100,
            dom_substantive_min_nodes: 1,
            default_min_stability_ms: 300,
            default_grace_timeout_ms: 5000,
            observed_confidence_cap: 0.9,
            inferred_confidence_cap: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_defaults() {
        let p = Policy::default();
        assert_eq!(p.strong_confidence, 0.95);
        assert_eq!(p.transient_partial_confidence, 0.6);
        assert_eq!(p.weak_confidence, 0.3);
        assert_eq!(p.loading_only_confidence, 0.2);
        assert_eq!(p.default_min_stability_ms, 300);
        assert_eq!(p.default_grace_timeout_ms, 5000);
    }

    #[test]
    fn test_dom_delta_threshold() {
        let p = Policy::default();
        assert!(p.dom_delta_substantive(101, 1));
        assert!(!p.dom_delta_substantive(100, 1));
        assert!(!p.dom_delta_substantive(500, 0));
    }

    #[test]
    fn test_proof_caps() {
        let p = Policy::default();
        assert_eq!(p.proof_cap(ProofLevel::Proven), 1.0);
        assert_eq!(p.proof_cap(ProofLevel::Observed), 0.9);
        assert_eq!(p.proof_cap(ProofLevel::Inferred), 0.6);
    }
}
