//! The silence ledger
//!
//! Append-only record of everything the scan did not observe. Entries are
//! immutable once recorded; success-shaped entries are malformed and
//! rejected at the door.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use verax_types::{
    is_success_shaped, ConfidenceImpact, EvaluationStatus, SilenceEntry, SilenceKind,
};

/// Ledger errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("malformed silence entry: {0}")]
    MalformedEntry(String),
}

/// The audit trail of unobserved and skipped items.
#[derive(Debug, Clone, Default)]
pub struct SilenceLedger {
    entries: Vec<SilenceEntry>,
}

/// Aggregate view of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub aggregated_impact: ConfidenceImpact,
}

impl SilenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. Silences may never claim success; an entry whose
    /// outcome label is success-shaped is rejected as malformed. An entry
    /// without a related promise must say why in its reason.
    pub fn record(&mut self, entry: SilenceEntry) -> Result<(), LedgerError> {
        if let Some(outcome) = &entry.outcome {
            if is_success_shaped(outcome) {
                return Err(LedgerError::MalformedEntry(format!(
                    "silence carries success-shaped outcome {outcome:?}"
                )));
            }
        }
        if entry.related_promise.is_none() && entry.reason.trim().is_empty() {
            return Err(LedgerError::MalformedEntry(
                "entry without related promise must carry a reason".to_string(),
            ));
        }
        tracing::debug!(
            silence_type = ?entry.silence_type,
            scope = %entry.scope,
            "silence recorded"
        );
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[SilenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in a scan category (the entry scope).
    pub fn by_category(&self, category: &str) -> Vec<&SilenceEntry> {
        self.entries.iter().filter(|e| e.scope == category).collect()
    }

    pub fn by_type(&self, silence_type: SilenceKind) -> Vec<&SilenceEntry> {
        self.entries
            .iter()
            .filter(|e| e.silence_type == silence_type)
            .collect()
    }

    pub fn by_promise(&self, promise_id: &str) -> Vec<&SilenceEntry> {
        self.entries
            .iter()
            .filter(|e| e.related_promise.as_deref() == Some(promise_id))
            .collect()
    }

    pub fn by_status(&self, status: EvaluationStatus) -> Vec<&SilenceEntry> {
        self.entries
            .iter()
            .filter(|e| e.evaluation_status == status)
            .collect()
    }

    /// The clamped sum of per-entry impacts across the three axes.
    pub fn aggregated_confidence_impact(&self) -> ConfidenceImpact {
        let (mut coverage, mut promise, mut overall) = (0.0, 0.0, 0.0);
        for e in &self.entries {
            coverage += e.confidence_impact.coverage;
            promise += e.confidence_impact.promise_verification;
            overall += e.confidence_impact.overall;
        }
        ConfidenceImpact::new(coverage, promise, overall)
    }

    pub fn summary(&self) -> SilenceSummary {
        let mut by_type = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        for e in &self.entries {
            *by_type.entry(format!("{:?}", e.silence_type)).or_insert(0) += 1;
            *by_status
                .entry(format!("{:?}", e.evaluation_status))
                .or_insert(0) += 1;
        }
        SilenceSummary {
            total: self.entries.len(),
            by_type,
            by_status,
            aggregated_impact: self.aggregated_confidence_impact(),
        }
    }

    /// The ledger artifact: entries sorted by (scope, reason, description)
    /// plus the summary.
    pub fn export(&self) -> serde_json::Value {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            (&a.scope, &a.reason, &a.description).cmp(&(&b.scope, &b.reason, &b.description))
        });
        serde_json::json!({
            "total": sorted.len(),
            "entries": sorted,
            "summary": self.summary(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(scope: &str, silence_type: SilenceKind) -> SilenceEntry {
        SilenceEntry::new(
            scope,
            "grace timeout expired",
            "no acknowledgment within grace window",
            silence_type,
            "grace-timeout",
            EvaluationStatus::TimedOut,
        )
    }

    #[test]
    fn test_record_and_query() {
        let mut ledger = SilenceLedger::new();
        ledger
            .record(entry("interaction", SilenceKind::TrueSilence).for_promise("p-1"))
            .unwrap();
        ledger
            .record(entry("coverage", SilenceKind::CoverageGap))
            .unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.by_category("interaction").len(), 1);
        assert_eq!(ledger.by_type(SilenceKind::CoverageGap).len(), 1);
        assert_eq!(ledger.by_promise("p-1").len(), 1);
        assert_eq!(ledger.by_status(EvaluationStatus::TimedOut).len(), 2);
    }

    #[test]
    fn test_success_shaped_entry_is_rejected() {
        let mut ledger = SilenceLedger::new();
        let bad = entry("interaction", SilenceKind::TrueSilence).with_outcome("Success");
        let err = ledger.record(bad).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEntry(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unrelated_entry_needs_a_reason() {
        let mut ledger = SilenceLedger::new();
        let mut bad = entry("interaction", SilenceKind::TrueSilence);
        bad.reason = String::new();
        assert!(ledger.record(bad).is_err());
    }

    #[test]
    fn test_aggregated_impact_is_clamped() {
        let mut ledger = SilenceLedger::new();
        for _ in 0..5 {
            ledger
                .record(
                    entry("coverage", SilenceKind::CoverageGap)
                        .with_confidence_impact(ConfidenceImpact::new(-30.0, -10.0, -20.0)),
                )
                .unwrap();
        }
        let agg = ledger.aggregated_confidence_impact();
        assert_eq!(agg.coverage, -100.0);
        assert_eq!(agg.promise_verification, -50.0);
        assert_eq!(agg.overall, -100.0);
    }

    #[test]
    fn test_export_sorts_entries() {
        let mut ledger = SilenceLedger::new();
        ledger
            .record(entry("interaction", SilenceKind::TrueSilence))
            .unwrap();
        ledger
            .record(entry("coverage", SilenceKind::CoverageGap))
            .unwrap();
        let exported = ledger.export();
        let entries = exported["entries"].as_array().unwrap();
        assert_eq!(entries[0]["scope"], "coverage");
        assert_eq!(entries[1]["scope"], "interaction");
        assert_eq!(exported["total"], 2);
    }

    #[test]
    fn test_summary_counts() {
        let mut ledger = SilenceLedger::new();
        ledger
            .record(entry("interaction", SilenceKind::TrueSilence))
            .unwrap();
        ledger
            .record(entry("interaction", SilenceKind::TrueSilence))
            .unwrap();
        let summary = ledger.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_type.get("TrueSilence"), Some(&2));
    }
}
