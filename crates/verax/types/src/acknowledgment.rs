//! Acknowledgment - graded evidence that a promise was met

use crate::SignalKind;
use serde::{Deserialize, Serialize};

/// Round a confidence to two decimals. All acknowledgment confidences are
/// reported at this precision.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Acknowledgment level, from silence to full confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckLevel {
    None,
    Weak,
    Partial,
    Strong,
}

/// Result of grading observed signals against an observation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub level: AckLevel,
    /// Signal kinds detected after filtering, deduplicated.
    pub detected: Vec<SignalKind>,
    pub required_satisfied: usize,
    pub required_total: usize,
    pub latency_ms: u64,
    /// In [0, 1], rounded to two decimals.
    pub confidence: f64,
}

impl Acknowledgment {
    /// The empty acknowledgment: nothing detected, zero confidence.
    pub fn none(required_total: usize, latency_ms: u64) -> Self {
        Self {
            level: AckLevel::None,
            detected: Vec::new(),
            required_satisfied: 0,
            required_total,
            latency_ms,
            confidence: 0.0,
        }
    }

    pub fn is_strong(&self) -> bool {
        self.level == AckLevel::Strong
    }

    /// Fraction of required signals satisfied.
    pub fn required_ratio(&self) -> f64 {
        if self.required_total == 0 {
            0.0
        } else {
            self.required_satisfied as f64 / self.required_total as f64
        }
    }
}
