//! Artifact assembly
//!
//! The four produced artifacts of a scan, as JSON values. File layout,
//! retention and rendering belong to the embedding application; the
//! engine only guarantees the shapes and their ordering rules.

use crate::ScanReport;
use serde_json::{json, Value};
use verax_decisions::report as determinism_report;
use verax_types::SCHEMA_VERSION;

/// The findings artifact: findings in emission order plus the evidence
/// law's enforcement record. Finding bodies carry no timestamps.
pub fn findings_artifact(scan: &ScanReport) -> Value {
    json!({
        "version": SCHEMA_VERSION,
        "findings": scan.findings,
        "enforcement": {
            "downgrades": scan.enforcement.downgrades,
            "drops": scan.enforcement.drops,
            "violations": scan.enforcement.violations,
        },
    })
}

/// The silence ledger artifact.
pub fn ledger_artifact(scan: &ScanReport) -> Value {
    scan.ledger.export()
}

/// The decisions artifact.
pub fn decisions_artifact(scan: &ScanReport) -> Value {
    scan.recorder.export(scan.run_id.as_deref())
}

/// The determinism report artifact.
pub fn determinism_artifact(scan: &ScanReport) -> Value {
    serde_json::to_value(determinism_report(&scan.recorder)).unwrap_or_else(|_| json!({}))
}

/// All four artifacts, named. Always produced, even for an empty scan.
pub fn assemble(scan: &ScanReport) -> Vec<(&'static str, Value)> {
    vec![
        ("findings", findings_artifact(scan)),
        ("silence-ledger", ledger_artifact(scan)),
        ("decisions", decisions_artifact(scan)),
        ("determinism", determinism_artifact(scan)),
    ]
}
