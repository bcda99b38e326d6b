//! The signal source seam
//!
//! The headless-browser driver lives behind this trait. It observes and
//! reports; it never interprets. The runtime is the only caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use verax_types::{Interaction, Signal};

/// Summary of DOM mutation over an observation window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomDeltaSummary {
    pub added_bytes: u64,
    pub removed_bytes: u64,
    pub visible_added_nodes: u32,
}

/// Everything one observation window produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Signals in arrival order.
    pub signals: Vec<Signal>,
    pub requests_sent: u32,
    pub responses_received: u32,
    pub last_response_status: Option<u16>,
    /// Network-level failure string, e.g. a connection reset.
    pub network_failure: Option<String>,
    /// Console error output.
    pub console_errors: Vec<String>,
    /// Uncaught page exceptions, distinct from console output.
    pub page_errors: Vec<String>,
    pub dom_delta: Option<DomDeltaSummary>,
    pub auth_challenge: bool,
    pub user_navigated: bool,
    pub ui_render_error: bool,
    /// The application surfaced an API-level error state.
    pub api_error_flag: bool,
    /// Hard sensor-level timeout (page never settled at all).
    pub timed_out: bool,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
    pub before_snapshot: Option<String>,
    pub after_snapshot: Option<String>,
    /// Quiet period at window close, for the stability verdict.
    pub quiet_period_ms: u64,
    /// Total window duration.
    pub elapsed_ms: u64,
}

impl Observation {
    /// Whether the DOM visibly changed during the window.
    pub fn dom_delta_present(&self) -> bool {
        self.dom_delta
            .map(|d| d.added_bytes > 0 || d.visible_added_nodes > 0)
            .unwrap_or(false)
            || self.signals.iter().any(|s| s.dom_deltas().is_some())
    }
}

/// Sensor errors.
#[derive(Debug, Error)]
pub enum SignalSourceError {
    /// A local observation failure; the scan continues.
    #[error("sensor failure: {0}")]
    Sensor(String),

    /// The browser or target is gone; the scan cannot continue.
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

/// The consumed browser-driver interface.
#[async_trait]
pub trait SignalSource: Send {
    /// Drive one interaction and observe until `timeout` or stability.
    async fn observe(
        &mut self,
        interaction: &Interaction,
        timeout: Duration,
    ) -> Result<Observation, SignalSourceError>;

    async fn navigate(&mut self, url: &str) -> Result<(), SignalSourceError>;

    async fn close(&mut self) -> Result<(), SignalSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verax_types::SignalKind;

    #[test]
    fn test_dom_delta_presence() {
        let mut obs = Observation::default();
        assert!(!obs.dom_delta_present());

        obs.dom_delta = Some(DomDeltaSummary {
            added_bytes: 12,
            removed_bytes: 0,
            visible_added_nodes: 0,
        });
        assert!(obs.dom_delta_present());

        let mut obs = Observation::default();
        obs.signals.push(Signal::dom_delta(256, 1, Utc::now()));
        assert!(obs.dom_delta_present());

        let mut obs = Observation::default();
        obs.signals
            .push(Signal::new(SignalKind::RouteChanged, Utc::now()));
        assert!(!obs.dom_delta_present());
    }
}
