//! Diff engine — deltas between two state snapshots.
//!
//! A `DiffRecord` is computed once per pair of snapshots and never mutated.
//! Numeric metrics get per-metric significance tiers; non-numeric fields
//! (url, title, content hash) are equality-compared only.

use crate::config::Thresholds;
use crate::snapshot::{Metric, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of a metric change's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Minor,
    Moderate,
    Major,
}

/// Delta of one numeric metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricChange {
    pub previous: Option<u64>,
    pub current: Option<u64>,
    pub change: i64,
    /// Absent when the metric exists on only one side.
    pub change_percent: Option<f64>,
    pub significance: Significance,
}

/// A non-numeric field that differs between the snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedField {
    pub field: String,
    pub previous: Option<String>,
    pub current: Option<String>,
}

/// Delta between two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRecord {
    pub details: BTreeMap<Metric, MetricChange>,
    pub modified: Vec<ModifiedField>,
    /// Human-readable one-liners for the changed metrics.
    pub summary: Vec<String>,
    /// True when any metric reached `Major`.
    pub significant_changes: bool,
    pub url_changed: bool,
}

impl DiffRecord {
    /// Signed change of one metric, zero when absent from the diff.
    pub fn change(&self, m: Metric) -> i64 {
        self.details.get(&m).map(|c| c.change).unwrap_or(0)
    }

    /// Percent change of one metric, when defined.
    pub fn change_percent(&self, m: Metric) -> Option<f64> {
        self.details.get(&m).and_then(|c| c.change_percent)
    }
}

/// Compute the delta between two snapshots.
pub fn diff(before: &StateSnapshot, after: &StateSnapshot, thresholds: &Thresholds) -> DiffRecord {
    let mut details = BTreeMap::new();
    let mut summary = Vec::new();
    let mut significant = false;

    let keys: std::collections::BTreeSet<Metric> = before
        .metrics
        .keys()
        .chain(after.metrics.keys())
        .copied()
        .collect();

    for metric in keys {
        let prev = before.metric(metric);
        let curr = after.metric(metric);

        let change = match (prev, curr) {
            (Some(p), Some(c)) => {
                // Both zero means unchanged, whatever else was recorded.
                if p == 0 && c == 0 {
                    metric_change(Some(0), Some(0), 0, Some(0.0))
                } else {
                    let delta = c as i64 - p as i64;
                    let pct = if p == 0 {
                        0.0
                    } else {
                        delta as f64 / p as f64 * 100.0
                    };
                    metric_change_classified(Some(p), Some(c), delta, pct, thresholds)
                }
            }
            // Present on one side only: reported as changed, no percent.
            (Some(p), None) => metric_change(Some(p), None, -(p as i64), None),
            (None, Some(c)) => metric_change(None, Some(c), c as i64, None),
            (None, None) => continue,
        };

        if change.significance == Significance::Major {
            significant = true;
        }
        if change.change > 0 {
            summary.push(format!("Added {} {}", change.change, metric.label()));
        } else if change.change < 0 {
            summary.push(format!("Removed {} {}", -change.change, metric.label()));
        }
        details.insert(metric, change);
    }

    let mut modified = Vec::new();
    push_modified(&mut modified, &mut summary, "url", &before.url, &after.url);
    push_modified(&mut modified, &mut summary, "title", &before.title, &after.title);
    let hash_str = |h: &Option<u64>| h.map(|v| format!("{v:x}"));
    push_modified(
        &mut modified,
        &mut summary,
        "content_hash",
        &hash_str(&before.content_hash),
        &hash_str(&after.content_hash),
    );

    let url_changed = before.url.is_some() && after.url.is_some() && before.url != after.url;

    DiffRecord {
        details,
        modified,
        summary,
        significant_changes: significant,
        url_changed,
    }
}

fn metric_change(
    previous: Option<u64>,
    current: Option<u64>,
    change: i64,
    change_percent: Option<f64>,
) -> MetricChange {
    MetricChange {
        previous,
        current,
        change,
        change_percent,
        significance: Significance::Minor,
    }
}

fn metric_change_classified(
    previous: Option<u64>,
    current: Option<u64>,
    change: i64,
    pct: f64,
    thresholds: &Thresholds,
) -> MetricChange {
    let significance = if pct.abs() > thresholds.major_percent {
        Significance::Major
    } else if pct.abs() > thresholds.moderate_percent {
        Significance::Moderate
    } else {
        Significance::Minor
    };
    MetricChange {
        previous,
        current,
        change,
        change_percent: Some(pct),
        significance,
    }
}

/// Record an equality-compared field when both sides exist and differ.
fn push_modified(
    modified: &mut Vec<ModifiedField>,
    summary: &mut Vec<String>,
    field: &str,
    before: &Option<String>,
    after: &Option<String>,
) {
    if let (Some(b), Some(a)) = (before, after) {
        if b != a {
            summary.push(format!("{field} modified"));
            modified.push(ModifiedField {
                field: field.to_string(),
                previous: Some(b.clone()),
                current: Some(a.clone()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot(metrics: &[(Metric, u64)]) -> StateSnapshot {
        StateSnapshot {
            timestamp: Utc::now(),
            url: Some("https://example.com/".into()),
            title: Some("Example".into()),
            metrics: metrics.iter().copied().collect::<BTreeMap<_, _>>(),
            content_hash: Some(0xdead),
            capture_errors: Vec::new(),
        }
    }

    #[test]
    fn test_diff_with_self_is_all_zero() {
        let s = snapshot(&[
            (Metric::TotalElements, 100),
            (Metric::BodyTextLength, 4000),
            (Metric::Forms, 0),
        ]);
        let d = diff(&s, &s, &Thresholds::default());
        assert!(!d.significant_changes);
        assert!(!d.url_changed);
        assert!(d.modified.is_empty());
        for change in d.details.values() {
            assert_eq!(change.change, 0);
            assert_eq!(change.significance, Significance::Minor);
        }
    }

    #[test]
    fn test_percent_thresholds() {
        let before = snapshot(&[(Metric::TotalElements, 100)]);

        // 15% is minor
        let d = diff(
            &before,
            &snapshot(&[(Metric::TotalElements, 115)]),
            &Thresholds::default(),
        );
        let c = &d.details[&Metric::TotalElements];
        assert_eq!(c.change, 15);
        assert_eq!(c.change_percent, Some(15.0));
        assert_eq!(c.significance, Significance::Minor);
        assert!(!d.significant_changes);

        // 30% is moderate
        let d = diff(
            &before,
            &snapshot(&[(Metric::TotalElements, 130)]),
            &Thresholds::default(),
        );
        assert_eq!(
            d.details[&Metric::TotalElements].significance,
            Significance::Moderate
        );
        assert!(!d.significant_changes);

        // 60% is major and flips the record flag
        let d = diff(
            &before,
            &snapshot(&[(Metric::TotalElements, 160)]),
            &Thresholds::default(),
        );
        assert_eq!(
            d.details[&Metric::TotalElements].significance,
            Significance::Major
        );
        assert!(d.significant_changes);
    }

    #[test]
    fn test_major_shrink_counts_too() {
        let d = diff(
            &snapshot(&[(Metric::HiddenElements, 40)]),
            &snapshot(&[(Metric::HiddenElements, 5)]),
            &Thresholds::default(),
        );
        assert_eq!(
            d.details[&Metric::HiddenElements].significance,
            Significance::Major
        );
        assert!(d.summary.iter().any(|s| s.contains("Removed 35")));
    }

    #[test]
    fn test_zero_baseline_percent_is_zero() {
        let d = diff(
            &snapshot(&[(Metric::Iframes, 0)]),
            &snapshot(&[(Metric::Iframes, 4)]),
            &Thresholds::default(),
        );
        let c = &d.details[&Metric::Iframes];
        assert_eq!(c.change, 4);
        assert_eq!(c.change_percent, Some(0.0));
        assert_eq!(c.significance, Significance::Minor);
    }

    #[test]
    fn test_one_sided_metric_has_no_percent() {
        let mut after = snapshot(&[]);
        after.metrics.insert(Metric::Scripts, 7);
        let d = diff(&snapshot(&[]), &after, &Thresholds::default());
        let c = &d.details[&Metric::Scripts];
        assert_eq!(c.change, 7);
        assert_eq!(c.change_percent, None);
        assert_eq!(c.significance, Significance::Minor);
    }

    #[test]
    fn test_non_numeric_fields_reported_as_modified() {
        let before = snapshot(&[]);
        let mut after = snapshot(&[]);
        after.title = Some("Changed".into());
        after.content_hash = Some(0xbeef);
        let d = diff(&before, &after, &Thresholds::default());
        assert!(d.modified.iter().any(|m| m.field == "title"));
        assert!(d.modified.iter().any(|m| m.field == "content_hash"));
        assert!(d.summary.iter().any(|s| s == "content_hash modified"));
        assert!(!d.url_changed);
    }

    #[test]
    fn test_url_change_detected() {
        let before = snapshot(&[]);
        let mut after = snapshot(&[]);
        after.url = Some("https://example.com/unlocked".into());
        let d = diff(&before, &after, &Thresholds::default());
        assert!(d.url_changed);
    }
}
