//! Outcomes - the verdict of the truth matrix

use crate::SignalKind;
use serde::{Deserialize, Serialize};

/// The five-way outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    PartialSuccess,
    Misleading,
    SilentFailure,
    Ambiguous,
}

impl OutcomeKind {
    /// Failure outcomes are gated by the evidence law.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SilentFailure | Self::Misleading)
    }
}

/// An outcome with its confidence and supporting trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// In [0, 1].
    pub confidence: f64,
    /// Which matrix rule fired, in terms of its evidence.
    pub reasoning: String,
    pub signals_present: Vec<SignalKind>,
    pub warnings: Vec<String>,
}

impl Outcome {
    pub fn new(
        kind: OutcomeKind,
        confidence: f64,
        reasoning: impl Into<String>,
        signals_present: Vec<SignalKind>,
    ) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            signals_present,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(OutcomeKind::SilentFailure.is_failure());
        assert!(OutcomeKind::Misleading.is_failure());
        assert!(!OutcomeKind::Ambiguous.is_failure());
        assert!(!OutcomeKind::PartialSuccess.is_failure());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let o = Outcome::new(OutcomeKind::Success, 1.4, "r", vec![]);
        assert_eq!(o.confidence, 1.0);
        let o = Outcome::new(OutcomeKind::Ambiguous, -0.1, "r", vec![]);
        assert_eq!(o.confidence, 0.0);
    }
}
