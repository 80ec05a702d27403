//! Point-in-time capture of observable session state.
//!
//! A snapshot is an immutable value. Capture tolerates partial failure:
//! a metric that cannot be read is omitted and noted in `capture_errors`
//! rather than aborting the whole capture. Only a lost session propagates.

use crate::session::{ProbeRequest, Session, SessionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;

/// One observable numeric metric of the page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalElements,
    VisibleElements,
    HiddenElements,
    InteractiveElements,
    Buttons,
    Inputs,
    Links,
    Forms,
    Images,
    Scripts,
    Iframes,
    BodyTextLength,
    Cookies,
    LocalStorageItems,
}

impl Metric {
    /// Human-readable name used in diff summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalElements => "total elements",
            Self::VisibleElements => "visible elements",
            Self::HiddenElements => "hidden elements",
            Self::InteractiveElements => "interactive elements",
            Self::Buttons => "buttons",
            Self::Inputs => "inputs",
            Self::Links => "links",
            Self::Forms => "forms",
            Self::Images => "images",
            Self::Scripts => "scripts",
            Self::Iframes => "iframes",
            Self::BodyTextLength => "body text length",
            Self::Cookies => "cookies",
            Self::LocalStorageItems => "local storage items",
        }
    }
}

/// Observable metrics of the session at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    pub title: Option<String>,
    /// Metrics that could be read. Failed metrics are absent.
    pub metrics: BTreeMap<Metric, u64>,
    /// FNV-1a hash of the page body, when readable.
    pub content_hash: Option<u64>,
    /// Capture-error markers for metrics that could not be read.
    pub capture_errors: Vec<String>,
}

impl StateSnapshot {
    /// Look up one metric, if it was captured.
    pub fn metric(&self, m: Metric) -> Option<u64> {
        self.metrics.get(&m).copied()
    }

    /// An empty snapshot carrying only a timestamp, for fully failed captures.
    pub fn degraded(error: String) -> Self {
        Self {
            timestamp: Utc::now(),
            url: None,
            title: None,
            metrics: BTreeMap::new(),
            content_hash: None,
            capture_errors: vec![error],
        }
    }
}

/// Capture a snapshot from the session.
///
/// `Probe`/`Capture` errors degrade individual fields; only
/// `SessionError::Unreachable` is returned to the caller.
pub async fn capture(session: &dyn Session) -> Result<StateSnapshot, SessionError> {
    let mut snapshot = StateSnapshot {
        timestamp: Utc::now(),
        url: None,
        title: None,
        metrics: BTreeMap::new(),
        content_hash: None,
        capture_errors: Vec::new(),
    };

    match session.run_probe(ProbeRequest::Metrics).await {
        Ok(value) => apply_metrics(&mut snapshot, &value),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => snapshot.capture_errors.push(format!("metrics: {e}")),
    }

    match session.current_url().await {
        Ok(url) => snapshot.url = Some(url),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => snapshot.capture_errors.push(format!("url: {e}")),
    }

    match session.current_title().await {
        Ok(title) => snapshot.title = Some(title),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => snapshot.capture_errors.push(format!("title: {e}")),
    }

    match session.cookies().await {
        Ok(cookies) => {
            snapshot.metrics.insert(Metric::Cookies, cookies.len() as u64);
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => snapshot.capture_errors.push(format!("cookies: {e}")),
    }

    Ok(snapshot)
}

/// Fold the metrics probe payload into the snapshot. Unreadable fields are
/// simply absent.
fn apply_metrics(snapshot: &mut StateSnapshot, value: &serde_json::Value) {
    let pairs = [
        (Metric::TotalElements, "total_elements"),
        (Metric::VisibleElements, "visible_elements"),
        (Metric::HiddenElements, "hidden_elements"),
        (Metric::InteractiveElements, "interactive_elements"),
        (Metric::Buttons, "buttons"),
        (Metric::Inputs, "inputs"),
        (Metric::Links, "links"),
        (Metric::Forms, "forms"),
        (Metric::Images, "images"),
        (Metric::Scripts, "scripts"),
        (Metric::Iframes, "iframes"),
        (Metric::BodyTextLength, "body_text_length"),
        (Metric::LocalStorageItems, "local_storage_items"),
    ];

    for (metric, key) in pairs {
        match value.get(key).and_then(|v| v.as_u64()) {
            Some(n) => {
                snapshot.metrics.insert(metric, n);
            }
            None => snapshot
                .capture_errors
                .push(format!("metric unreadable: {key}")),
        }
    }

    if let Some(html) = value.get("body_html").and_then(|v| v.as_str()) {
        snapshot.content_hash = Some(fnv_hash(html.as_bytes()));
    }
}

/// FNV-1a hash of page content, cheap and stable across captures.
pub fn fnv_hash(data: &[u8]) -> u64 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(data);
    hasher.finish()
}
