//! Session abstraction over the live remote target.
//!
//! Defines the `Session` trait the engine consumes and the error taxonomy
//! for the probe/capture boundary. The engine never talks to a browser
//! directly; everything flows through this narrow interface.

pub mod chromium;

use crate::catalog::TacticId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors crossing the session boundary.
///
/// `Probe` and `Capture` are always recovered locally and surfaced as data
/// on the result or snapshot. `Unreachable` is the sole condition that
/// terminates a run early.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// A tactic's probe failed inside the remote target.
    #[error("probe failed: {0}")]
    Probe(String),
    /// An observable metric could not be read.
    #[error("capture failed: {0}")]
    Capture(String),
    /// Navigation or the session itself is gone.
    #[error("session unreachable: {0}")]
    Unreachable(String),
}

impl SessionError {
    /// True for the one fatal variant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// A probe the engine can ask the session to run.
///
/// Capture probes and tactic probes share one dispatch point so the session
/// implementation resolves every request through a single script table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeRequest {
    /// Read the fixed set of observable page metrics.
    Metrics,
    /// Count interactive elements by selector class.
    ElementCensus,
    /// Execute one catalog tactic.
    Tactic(TacticId),
}

/// Reference to an artifact captured from the session.
///
/// Either a path on disk or, when no artifact directory is writable, the
/// raw bytes inlined as base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// A cookie observed in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieInfo {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Result of a navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationOutcome {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// The external, stateful handle to the live remote target.
///
/// A session is a single shared, order-sensitive mutable resource: exactly
/// one probe is in flight against it at a time.
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<NavigationOutcome, SessionError>;

    /// Run a probe in the page and return its structured result.
    async fn run_probe(&self, request: ProbeRequest)
        -> Result<serde_json::Value, SessionError>;

    /// Capture an artifact (e.g. a screenshot). Returns `None` when the
    /// session does not support artifacts or capture failed; never an error.
    async fn capture_artifact(&self, label: &str) -> Option<ArtifactRef>;

    /// Current URL of the page.
    async fn current_url(&self) -> Result<String, SessionError>;

    /// Current document title.
    async fn current_title(&self) -> Result<String, SessionError>;

    /// Cookies visible to the session.
    async fn cookies(&self) -> Result<Vec<CookieInfo>, SessionError>;

    /// Close the session.
    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unreachable_is_fatal() {
        assert!(!SessionError::Probe("x".into()).is_fatal());
        assert!(!SessionError::Capture("x".into()).is_fatal());
        assert!(SessionError::Unreachable("x".into()).is_fatal());
    }

    #[test]
    fn test_artifact_ref_serializes_sparse() {
        let a = ArtifactRef {
            label: "baseline".into(),
            path: Some("/tmp/baseline.png".into()),
            data_base64: None,
            captured_at: Utc::now(),
        };
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("baseline.png"));
        assert!(!json.contains("data_base64"));
    }
}
