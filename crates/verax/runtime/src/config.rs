//! Scan configuration

use serde::{Deserialize, Serialize};
use verax_types::Policy;

/// Configuration of one scan. Owned by the orchestrator, established at
/// scan start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub policy: Policy,
    /// Interaction budget; pairs beyond it are truncated into coverage
    /// gaps.
    pub max_interactions: Option<usize>,
    /// Global scan duration budget; clamps every grace timeout.
    pub max_scan_ms: u64,
    /// Allow one adaptive stabilization extension per interaction. Any
    /// extension is recorded and makes the run non-deterministic.
    pub adaptive_stabilization: bool,
    pub run_id: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            max_interactions: None,
            max_scan_ms: 120_000,
            adaptive_stabilization: false,
            run_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_deterministic() {
        let c = ScanConfig::default();
        assert!(!c.adaptive_stabilization);
        assert!(c.max_interactions.is_none());
        assert_eq!(c.max_scan_ms, 120_000);
    }
}
