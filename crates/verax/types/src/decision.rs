//! Decision records - every adaptive choice the engine makes is written down

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub String);

impl DecisionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// What kind of decision was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    Budget,
    Timeout,
    Retry,
    /// Stabilization wait; `extended` marks an adaptive extension beyond
    /// the configured window.
    AdaptiveStabilization {
        extended: bool,
    },
    Truncation,
    Environment,
}

impl DecisionCategory {
    /// Adaptive categories disqualify the run from being deterministic.
    pub fn is_adaptive(&self) -> bool {
        matches!(
            self,
            Self::Retry | Self::Truncation | Self::AdaptiveStabilization { extended: true }
        )
    }

    /// Stable label used in summaries and artifacts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Timeout => "timeout",
            Self::Retry => "retry",
            Self::AdaptiveStabilization { extended: true } => "adaptive_stabilization_extended",
            Self::AdaptiveStabilization { extended: false } => "adaptive_stabilization",
            Self::Truncation => "truncation",
            Self::Environment => "environment",
        }
    }
}

/// One recorded decision. Append-only once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: DecisionId,
    pub category: DecisionCategory,
    pub timestamp: DateTime<Utc>,
    /// The inputs the decision was made from.
    pub inputs: serde_json::Value,
    /// What was chosen.
    pub chosen_value: serde_json::Value,
    pub reason: String,
    pub context: Option<String>,
}

impl DecisionRecord {
    pub fn new(
        category: DecisionCategory,
        inputs: serde_json::Value,
        chosen_value: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            decision_id: DecisionId::generate(),
            category,
            timestamp: Utc::now(),
            inputs,
            chosen_value,
            reason: reason.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_adaptive(&self) -> bool {
        self.category.is_adaptive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adaptive_categories() {
        assert!(DecisionCategory::Retry.is_adaptive());
        assert!(DecisionCategory::Truncation.is_adaptive());
        assert!(DecisionCategory::AdaptiveStabilization { extended: true }.is_adaptive());
        assert!(!DecisionCategory::AdaptiveStabilization { extended: false }.is_adaptive());
        assert!(!DecisionCategory::Budget.is_adaptive());
        assert!(!DecisionCategory::Timeout.is_adaptive());
        assert!(!DecisionCategory::Environment.is_adaptive());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(DecisionCategory::Retry.label(), "retry");
        assert_eq!(
            DecisionCategory::AdaptiveStabilization { extended: true }.label(),
            "adaptive_stabilization_extended"
        );
    }

    #[test]
    fn test_record_construction() {
        let rec = DecisionRecord::new(
            DecisionCategory::Timeout,
            json!({ "grace_timeout_ms": 5000 }),
            json!(5000),
            "profile grace timeout applied",
        )
        .with_context("promise nav-1");
        assert!(!rec.is_adaptive());
        assert_eq!(rec.context.as_deref(), Some("promise nav-1"));
    }
}
