//! Promises - what an interaction claims will happen

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Feedback surface sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Toast,
    Modal,
    Notification,
}

/// Network sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Request,
    GraphQl,
    WebSocket,
}

/// What kind of observable effect the code promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseKind {
    Navigation,
    Submission,
    StateChange,
    Feedback(FeedbackKind),
    Network(NetworkKind),
}

impl PromiseKind {
    /// Whether keeping this promise requires user-visible UI evidence.
    pub fn requires_ui(&self) -> bool {
        matches!(self, Self::Feedback(_) | Self::StateChange)
    }
}

impl fmt::Display for PromiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Navigation => "navigation",
            Self::Submission => "submission",
            Self::StateChange => "state",
            Self::Feedback(FeedbackKind::Toast) => "feedback.toast",
            Self::Feedback(FeedbackKind::Modal) => "feedback.modal",
            Self::Feedback(FeedbackKind::Notification) => "feedback.notification",
            Self::Network(NetworkKind::Request) => "network.request",
            Self::Network(NetworkKind::GraphQl) => "network.graphql",
            Self::Network(NetworkKind::WebSocket) => "network.ws",
        };
        f.write_str(s)
    }
}

/// Error parsing a manifest kind string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown promise kind: {0}")]
pub struct PromiseKindParseError(pub String);

impl FromStr for PromiseKind {
    type Err = PromiseKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigation" => Ok(Self::Navigation),
            "submission" => Ok(Self::Submission),
            "state" => Ok(Self::StateChange),
            "feedback.toast" => Ok(Self::Feedback(FeedbackKind::Toast)),
            "feedback.modal" => Ok(Self::Feedback(FeedbackKind::Modal)),
            "feedback.notification" => Ok(Self::Feedback(FeedbackKind::Notification)),
            "network.request" => Ok(Self::Network(NetworkKind::Request)),
            "network.graphql" => Ok(Self::Network(NetworkKind::GraphQl)),
            "network.ws" => Ok(Self::Network(NetworkKind::WebSocket)),
            other => Err(PromiseKindParseError(other.to_string())),
        }
    }
}

/// How firmly the promise was established from source evidence.
///
/// A promise proven from explicit source evidence may reach full certainty;
/// generically inferred promises cap the acknowledgment confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofLevel {
    Proven,
    Observed,
    Inferred,
}

/// Where the promise came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromiseSource {
    /// Source file the extractor attributed the promise to.
    pub file: Option<String>,
    /// Selector the extractor attributed the promise to.
    pub selector: Option<String>,
    pub proof: ProofLevel,
}

impl PromiseSource {
    pub fn proven(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            selector: None,
            proof: ProofLevel::Proven,
        }
    }

    pub fn observed() -> Self {
        Self {
            file: None,
            selector: None,
            proof: ProofLevel::Observed,
        }
    }

    pub fn inferred() -> Self {
        Self {
            file: None,
            selector: None,
            proof: ProofLevel::Inferred,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}

/// Per-kind structured context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseContext {
    Navigation { target_path: String },
    Submission { endpoint: String },
    Feedback { feedback_types: Vec<FeedbackKind> },
    State { state_key: String },
    Network { endpoint: Option<String> },
}

impl PromiseContext {
    /// The navigation target path, when this promise has one.
    pub fn target_path(&self) -> Option<&str> {
        match self {
            Self::Navigation { target_path } => Some(target_path),
            _ => None,
        }
    }

    /// The endpoint fingerprint, when this promise has one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Submission { endpoint } => Some(endpoint),
            Self::Network { endpoint } => endpoint.as_deref(),
            _ => None,
        }
    }
}

/// A structured claim that some observable signal will follow an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promise {
    /// Stable identifier, carried from the manifest.
    pub id: String,
    pub kind: PromiseKind,
    pub source: PromiseSource,
    /// Human-readable description of the expected signal.
    pub expected_signal: String,
    pub context: PromiseContext,
    pub reason: Option<String>,
}

impl Promise {
    pub fn target_path(&self) -> Option<&str> {
        self.context.target_path()
    }
}
