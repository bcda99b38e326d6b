//! Evidence - what was concretely captured around an interaction

use serde::{Deserialize, Serialize};

/// The concrete material backing a finding. Every field is explicit;
/// absence is data, not an accident.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// URL before the interaction.
    pub before_url: Option<String>,
    /// URL after the interaction settled.
    pub after_url: Option<String>,
    /// Sensor handle of the before-state snapshot.
    pub before_snapshot: Option<String>,
    /// Sensor handle of the after-state snapshot.
    pub after_snapshot: Option<String>,
    /// Count of captured network records.
    pub network_records: u32,
    /// Count of captured console errors.
    pub console_errors: u32,
    /// Whether the sensor flagged any observable change.
    pub change_flag: bool,
    /// Concrete references (snapshot handles, network record ids, trace
    /// ids) a reviewer can follow.
    pub references: Vec<String>,
}

impl Evidence {
    /// A before-state anchor: we know where the interaction started.
    pub fn has_context_anchor(&self) -> bool {
        self.before_url.is_some() || self.before_snapshot.is_some()
    }

    /// Effect evidence: something observable happened, or we counted it.
    pub fn has_effect_evidence(&self) -> bool {
        self.after_url.is_some()
            || self.after_snapshot.is_some()
            || self.change_flag
            || self.network_records > 0
            || self.console_errors > 0
    }

    /// Substantive evidence carries both an anchor and an effect.
    pub fn is_substantive(&self) -> bool {
        self.has_context_anchor() && self.has_effect_evidence()
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }
}
