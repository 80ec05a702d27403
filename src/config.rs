//! Engine configuration — significance thresholds and pacing.
//!
//! The threshold constants were chosen empirically in field use. They are
//! carried here as named, overridable values rather than re-derived.

use serde::Deserialize;

/// Thresholds for diff significance and impact triggers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Percent magnitude above which a metric change is classified `Major`.
    pub major_percent: f64,
    /// Percent magnitude above which a metric change is classified `Moderate`.
    pub moderate_percent: f64,
    /// Absolute element-count delta that makes an impact significant.
    pub element_delta: i64,
    /// Content-size percent change that makes an impact significant.
    pub content_percent: f64,
    /// Number of newly revealed elements that makes an impact significant.
    pub revealed_count: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            major_percent: 50.0,
            moderate_percent: 20.0,
            element_delta: 10,
            content_percent: 10.0,
            revealed_count: 5,
        }
    }
}

/// Pacing between tactics. Higher invasiveness tiers pause longer so
/// asynchronous page effects can settle and the probe cadence stays
/// unremarkable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after a low-tier tactic, in milliseconds.
    pub low_tier_ms: u64,
    /// Pause after a medium-tier tactic.
    pub medium_tier_ms: u64,
    /// Pause after a high-tier tactic.
    pub high_tier_ms: u64,
    /// Extra pause when entering a new phase.
    pub phase_transition_ms: u64,
    /// Upper bound of random jitter added to every pause.
    pub jitter_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            low_tier_ms: 500,
            medium_tier_ms: 1000,
            high_tier_ms: 2000,
            phase_transition_ms: 1000,
            jitter_ms: 250,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub pacing: Pacing,
    pub timeouts: Timeouts,
    /// Capture screenshot artifacts for significant changes.
    pub artifacts: bool,
}

/// Per-operation timeouts. A timeout is treated exactly like any other
/// probe failure: recorded, not fatal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Budget for a single tactic probe, in milliseconds.
    pub probe_ms: u64,
    /// Budget for a single state capture.
    pub capture_ms: u64,
    /// Budget for initial navigation.
    pub navigate_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_ms: 15_000,
            capture_ms: 10_000,
            navigate_ms: 30_000,
        }
    }
}

impl EngineConfig {
    /// Config with artifact capture enabled (the default for CLI runs).
    pub fn with_artifacts() -> Self {
        Self {
            artifacts: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_match_field_constants() {
        let t = Thresholds::default();
        assert_eq!(t.major_percent, 50.0);
        assert_eq!(t.moderate_percent, 20.0);
        assert_eq!(t.element_delta, 10);
        assert_eq!(t.content_percent, 10.0);
        assert_eq!(t.revealed_count, 5);
    }

    #[test]
    fn test_config_override_from_json() {
        let cfg: EngineConfig = serde_json::from_str(
            r#"{"thresholds": {"major_percent": 75.0}, "pacing": {"jitter_ms": 0}}"#,
        )
        .unwrap();
        assert_eq!(cfg.thresholds.major_percent, 75.0);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.thresholds.moderate_percent, 20.0);
        assert_eq!(cfg.pacing.jitter_ms, 0);
        assert_eq!(cfg.pacing.low_tier_ms, 500);
    }
}
