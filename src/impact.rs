//! Impact assessment — one effectiveness verdict per tactic.
//!
//! `assess` is a pure function over a diff and the probe's own indicators.
//! Significance is a monotone OR: any sufficient factor fires it, none is
//! required.

use crate::config::Thresholds;
use crate::diff::DiffRecord;
use crate::snapshot::Metric;
use serde::{Deserialize, Serialize};

/// Effectiveness rating of one tactic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    Low,
    Medium,
    High,
}

/// Signals reported by the probe itself, beyond what the diff shows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TacticIndicators {
    /// Features the probe confirmed unlocked, e.g. "unobstructed_view".
    pub features_unlocked: Vec<String>,
}

impl TacticIndicators {
    /// Parse indicators out of a probe result envelope.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let features_unlocked = payload
            .get("features_unlocked")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Self { features_unlocked }
    }
}

/// Combined verdict for one tactic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Signed element-count delta.
    pub elements_changed: i64,
    /// Signed body-text-length delta.
    pub content_change: i64,
    pub content_change_percent: f64,
    /// Elements that became visible.
    pub elements_revealed: u64,
    /// Elements that became hidden.
    pub elements_hidden: u64,
    pub url_changed: bool,
    pub features_unlocked: Vec<String>,
    pub significant_change: bool,
    pub effectiveness: Effectiveness,
    /// Short ordered list of human-readable highlights.
    pub highlights: Vec<String>,
}

/// Assess the impact of one tactic from its before/after diff and the
/// probe's indicators. Deterministic: identical inputs yield identical
/// ratings.
pub fn assess(
    diff: &DiffRecord,
    indicators: &TacticIndicators,
    thresholds: &Thresholds,
) -> ImpactAssessment {
    let elements_changed = diff.change(Metric::TotalElements);
    let content_change = diff.change(Metric::BodyTextLength);
    let content_change_percent = diff
        .change_percent(Metric::BodyTextLength)
        .unwrap_or(0.0);

    let visible_delta = diff.change(Metric::VisibleElements);
    let elements_revealed = visible_delta.max(0) as u64;
    let elements_hidden = (-visible_delta).max(0) as u64;

    // Any single factor is sufficient.
    let significant_change = elements_changed.abs() > thresholds.element_delta
        || content_change_percent.abs() > thresholds.content_percent
        || elements_revealed > thresholds.revealed_count
        || diff.url_changed
        || !indicators.features_unlocked.is_empty();

    let effectiveness = if significant_change && !indicators.features_unlocked.is_empty() {
        Effectiveness::High
    } else if significant_change || content_change_percent > thresholds.content_percent {
        Effectiveness::Medium
    } else {
        Effectiveness::Low
    };

    let mut highlights = Vec::new();
    if elements_changed != 0 {
        highlights.push(format!("{} elements changed", elements_changed.abs()));
    }
    if elements_revealed > 0 {
        highlights.push(format!("{elements_revealed} elements revealed"));
    }
    if content_change > 100 {
        highlights.push(format!("~{content_change} characters of text revealed"));
    }
    if diff.url_changed {
        highlights.push("navigation occurred".to_string());
    }
    for feature in &indicators.features_unlocked {
        highlights.push(format!("unlocked: {feature}"));
    }

    ImpactAssessment {
        elements_changed,
        content_change,
        content_change_percent,
        elements_revealed,
        elements_hidden,
        url_changed: diff.url_changed,
        features_unlocked: indicators.features_unlocked.clone(),
        significant_change,
        effectiveness,
        highlights,
    }
}
