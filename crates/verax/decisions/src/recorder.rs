//! The decision recorder
//!
//! Append-only record of every adaptive choice. Entries are immutable
//! once written.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use verax_types::{DecisionCategory, DecisionRecord};

/// Append-only store of decision records.
#[derive(Debug, Clone, Default)]
pub struct DecisionRecorder {
    records: Vec<DecisionRecord>,
}

/// Aggregate view of recorded decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    /// False as soon as any adaptive decision exists.
    pub deterministic: bool,
}

impl DecisionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: DecisionRecord) {
        if record.is_adaptive() {
            tracing::warn!(
                category = record.category.label(),
                reason = %record.reason,
                "adaptive decision recorded, run is no longer deterministic"
            );
        } else {
            tracing::debug!(category = record.category.label(), "decision recorded");
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn by_category(&self, category: DecisionCategory) -> Vec<&DecisionRecord> {
        self.records
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// All decisions in adaptive categories.
    pub fn adaptive_events(&self) -> Vec<&DecisionRecord> {
        self.records.iter().filter(|r| r.is_adaptive()).collect()
    }

    pub fn summary(&self) -> DecisionSummary {
        let mut by_category = BTreeMap::new();
        for r in &self.records {
            *by_category.entry(r.category.label().to_string()).or_insert(0) += 1;
        }
        DecisionSummary {
            total: self.records.len(),
            by_category,
            deterministic: self.adaptive_events().is_empty(),
        }
    }

    /// The decisions artifact. Timestamps are ISO-8601 at millisecond
    /// precision.
    pub fn export(&self, run_id: Option<&str>) -> serde_json::Value {
        let decisions: Vec<serde_json::Value> = self
            .records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "decision_id": r.decision_id.0,
                    "category": r.category.label(),
                    "timestamp": r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "inputs": r.inputs,
                    "chosen_value": r.chosen_value,
                    "reason": r.reason,
                    "context": r.context,
                })
            })
            .collect();
        serde_json::json!({
            "run_id": run_id,
            "recorded_at_iso": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "total": decisions.len(),
            "decisions": decisions,
            "summary": self.summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(category: DecisionCategory) -> DecisionRecord {
        DecisionRecord::new(category, json!({}), json!(null), "test decision")
    }

    #[test]
    fn test_record_and_query() {
        let mut rec = DecisionRecorder::new();
        rec.record(record(DecisionCategory::Budget));
        rec.record(record(DecisionCategory::Retry));
        rec.record(record(DecisionCategory::Budget));

        assert_eq!(rec.len(), 3);
        assert_eq!(rec.by_category(DecisionCategory::Budget).len(), 2);
        assert_eq!(rec.by_category(DecisionCategory::Retry).len(), 1);
        assert_eq!(rec.adaptive_events().len(), 1);
    }

    #[test]
    fn test_summary_tracks_determinism() {
        let mut rec = DecisionRecorder::new();
        rec.record(record(DecisionCategory::Timeout));
        assert!(rec.summary().deterministic);

        rec.record(record(DecisionCategory::AdaptiveStabilization { extended: false }));
        assert!(rec.summary().deterministic);

        rec.record(record(DecisionCategory::AdaptiveStabilization { extended: true }));
        assert!(!rec.summary().deterministic);
    }

    #[test]
    fn test_export_shape() {
        let mut rec = DecisionRecorder::new();
        rec.record(record(DecisionCategory::Truncation));
        let exported = rec.export(Some("run-1"));
        assert_eq!(exported["run_id"], "run-1");
        assert_eq!(exported["total"], 1);
        assert_eq!(exported["decisions"][0]["category"], "truncation");
        assert_eq!(exported["summary"]["deterministic"], false);
        // Millisecond-precision ISO timestamps.
        let ts = exported["decisions"][0]["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
