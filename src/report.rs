//! Discovery report — the aggregate output of a full run.
//!
//! Aggregation is a pure fold over the accumulated results and checkpoints.
//! It never drops a result, never reorders phases, and produces a usable
//! report whether zero, some, or all tactics succeeded.

use crate::catalog::TacticId;
use crate::checkpoint::Checkpoint;
use crate::executor::TacticResult;
use crate::impact::Effectiveness;
use crate::snapshot::StateSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which catalog a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Safe,
    Liberation,
}

/// Success tally for one phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseStats {
    pub total: u32,
    pub successful: u32,
}

/// Derived statistics over a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    /// Tactics actually attempted. Equals the catalog size for a complete
    /// run.
    pub attempted: u32,
    pub succeeded: u32,
    /// Fraction of attempted tactics that completed successfully. Reflects
    /// probe completion, not impact.
    pub success_rate: f64,
    pub per_phase: BTreeMap<u8, PhaseStats>,
    /// First tactic, in execution order, rated `High`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_effective: Option<TacticId>,
}

/// Aggregate output of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub mission_id: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<StateSnapshot>,
    pub tactic_results: Vec<TacticResult>,
    pub checkpoints: Vec<Checkpoint>,
    pub statistics: Statistics,
    /// True when the run ended before every catalog entry was attempted.
    pub incomplete: bool,
    /// True when the run completed the whole catalog and can be trusted by
    /// downstream strategy selection.
    pub reliable: bool,
}

/// Inputs to the aggregation fold.
pub struct ReportInputs {
    pub target: String,
    pub title: Option<String>,
    pub mission_id: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub baseline: Option<StateSnapshot>,
    pub results: Vec<TacticResult>,
    pub checkpoints: Vec<Checkpoint>,
    pub catalog_len: usize,
    pub incomplete: bool,
}

/// Fold results and checkpoints into a report.
pub fn aggregate(inputs: ReportInputs) -> DiscoveryReport {
    let statistics = compute_statistics(&inputs.results);
    let reliable = !inputs.incomplete && statistics.attempted as usize == inputs.catalog_len;

    DiscoveryReport {
        target: inputs.target,
        title: inputs.title,
        mission_id: inputs.mission_id,
        mode: inputs.mode,
        started_at: inputs.started_at,
        finished_at: Utc::now(),
        baseline: inputs.baseline,
        tactic_results: inputs.results,
        checkpoints: inputs.checkpoints,
        statistics,
        incomplete: inputs.incomplete,
        reliable,
    }
}

fn compute_statistics(results: &[TacticResult]) -> Statistics {
    let attempted = results.len() as u32;
    let succeeded = results.iter().filter(|r| r.success).count() as u32;
    let success_rate = if attempted == 0 {
        0.0
    } else {
        succeeded as f64 / attempted as f64
    };

    let mut per_phase: BTreeMap<u8, PhaseStats> = BTreeMap::new();
    for result in results {
        let stats = per_phase.entry(result.phase).or_default();
        stats.total += 1;
        if result.success {
            stats.successful += 1;
        }
    }

    let most_effective = results
        .iter()
        .find(|r| {
            r.impact
                .as_ref()
                .map(|i| i.effectiveness == Effectiveness::High)
                .unwrap_or(false)
        })
        .map(|r| r.tactic);

    Statistics {
        attempted,
        succeeded,
        success_rate,
        per_phase,
        most_effective,
    }
}
