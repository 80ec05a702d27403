//! Tactic executor — runs the catalog against a session.
//!
//! The executor is the only component that mutates session state. Each
//! tactic runs a fixed sub-cycle: before-capture, execute, after-capture,
//! assess, record. Probe failures are recorded as failed results and the
//! run continues; only a lost session ends the run early.

use crate::catalog::{Invasiveness, TacticDefinition, TacticId};
use crate::config::EngineConfig;
use crate::impact::{self, ImpactAssessment, TacticIndicators};
use crate::progress::{self, MissionEventKind, ProgressSender};
use crate::session::{ArtifactRef, ProbeRequest, Session, SessionError};
use crate::{diff, snapshot};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of executing one tactic. Appended to the result list when the
/// tactic finishes, success or failure; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticResult {
    pub tactic: TacticId,
    pub phase: u8,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    /// Structured payload from the probe, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error description, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
}

/// Where the executor is in its run. `Completed` is reached only when
/// every catalog entry produced a result; an early exit (session loss or
/// cancellation) lands in `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    RunningPhase(u8),
    Completed,
    Aborted,
}

/// Cooperative, run-scoped cancellation. Aborting stops the executor before
/// the next tactic starts; the in-flight probe finishes or times out.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a full executor run.
#[derive(Debug)]
pub struct RunOutcome {
    /// One entry per attempted tactic, in execution order.
    pub results: Vec<TacticResult>,
    /// True when the run ended before every catalog entry was attempted.
    pub incomplete: bool,
}

/// Runs a catalog of tactics against one session.
pub struct TacticExecutor {
    config: EngineConfig,
    cancel: CancelHandle,
    state: ExecutorState,
    progress: Option<ProgressSender>,
    mission_id: String,
    seq: u64,
}

impl TacticExecutor {
    pub fn new(config: EngineConfig, mission_id: &str) -> Self {
        Self {
            config,
            cancel: CancelHandle::new(),
            state: ExecutorState::Idle,
            progress: None,
            mission_id: mission_id.to_string(),
            seq: 0,
        }
    }

    /// Attach a progress channel for telemetry.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Use an externally owned cancel handle instead of a fresh one.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle callers can use to abort the run between tactics.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Run every catalog entry in order.
    ///
    /// The returned result list has exactly one entry per attempted tactic.
    /// On `SessionError::Unreachable` the remaining tactics are not
    /// attempted (not recorded as failed) and the outcome is incomplete.
    pub async fn run(
        &mut self,
        session: &mut dyn Session,
        catalog: &[TacticDefinition],
    ) -> RunOutcome {
        let mut results: Vec<TacticResult> = Vec::with_capacity(catalog.len());
        let mut current_phase: Option<u8> = None;

        for def in catalog {
            if self.cancel.is_cancelled() {
                tracing::info!(tactic = %def.id, "run cancelled before tactic");
                break;
            }

            if current_phase != Some(def.phase) {
                self.enter_phase(def.phase).await;
                current_phase = Some(def.phase);
            }

            tracing::info!(tactic = %def.id, phase = def.phase, "executing tactic");
            self.emit(MissionEventKind::TacticStarted {
                tactic: def.id,
                phase: def.phase,
            });

            match self.run_one(session, def).await {
                Ok(result) => {
                    self.emit(MissionEventKind::TacticCompleted {
                        tactic: def.id,
                        phase: def.phase,
                        success: result.success,
                        effectiveness: result.impact.as_ref().map(|i| i.effectiveness),
                        duration_ms: result.duration_ms,
                    });
                    if result.success {
                        tracing::info!(tactic = %def.id, "tactic succeeded");
                    } else {
                        tracing::warn!(
                            tactic = %def.id,
                            error = result.error.as_deref().unwrap_or("unknown"),
                            "tactic failed"
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    // The session is gone. Remaining tactics are not
                    // attempted rather than failed.
                    tracing::error!(tactic = %def.id, error = %e, "session lost, aborting run");
                    self.emit(MissionEventKind::Warning {
                        message: format!("session lost during {}: {e}", def.id),
                    });
                    break;
                }
            }

            self.pace(def.tier).await;
        }

        let incomplete = results.len() < catalog.len();
        self.state = if incomplete {
            ExecutorState::Aborted
        } else {
            ExecutorState::Completed
        };
        self.log_summary(&results, catalog.len());
        RunOutcome { results, incomplete }
    }

    /// One tactic sub-cycle. Returns `Err` only for a lost session.
    async fn run_one(
        &mut self,
        session: &mut dyn Session,
        def: &TacticDefinition,
    ) -> Result<TacticResult, SessionError> {
        let before = self.capture(session).await?;
        let started_at = Utc::now();
        let timer = Instant::now();

        let probe = tokio::time::timeout(
            Duration::from_millis(self.config.timeouts.probe_ms),
            session.run_probe(ProbeRequest::Tactic(def.id)),
        )
        .await;

        let (success, payload, error) = match probe {
            Ok(Ok(value)) => {
                let success = value
                    .get("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let error = value
                    .get("error")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                (success, Some(value), error)
            }
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => (false, None, Some(e.to_string())),
            Err(_) => (
                false,
                None,
                Some(format!(
                    "probe timed out after {}ms",
                    self.config.timeouts.probe_ms
                )),
            ),
        };

        let duration_ms = timer.elapsed().as_millis() as u64;

        // A session lost during the after-capture still yields a recorded
        // result; the payload is already in hand.
        let (impact, fatal_after) = match self.capture(session).await {
            Ok(after) => {
                let record = diff::diff(&before, &after, &self.config.thresholds);
                let indicators = payload
                    .as_ref()
                    .map(TacticIndicators::from_payload)
                    .unwrap_or_default();
                (
                    Some(impact::assess(&record, &indicators, &self.config.thresholds)),
                    None,
                )
            }
            Err(e) => (None, Some(e)),
        };

        let mut result = TacticResult {
            tactic: def.id,
            phase: def.phase,
            started_at,
            duration_ms,
            success,
            payload,
            error,
            impact,
            artifact: None,
        };

        if let Some(e) = fatal_after {
            result.error.get_or_insert_with(|| e.to_string());
            return Ok(result);
        }

        let significant = result
            .impact
            .as_ref()
            .map(|i| i.significant_change)
            .unwrap_or(false);
        if self.config.artifacts && result.success && significant {
            // Artifact failure is logged by the session, never fatal here.
            result.artifact = session
                .capture_artifact(&format!("tactic_{}", def.id))
                .await;
        }

        Ok(result)
    }

    async fn capture(
        &self,
        session: &dyn Session,
    ) -> Result<snapshot::StateSnapshot, SessionError> {
        match tokio::time::timeout(
            Duration::from_millis(self.config.timeouts.capture_ms),
            snapshot::capture(session),
        )
        .await
        {
            Ok(result) => result,
            // A capture timeout degrades the snapshot, like any capture error.
            Err(_) => Ok(snapshot::StateSnapshot::degraded(format!(
                "capture timed out after {}ms",
                self.config.timeouts.capture_ms
            ))),
        }
    }

    async fn enter_phase(&mut self, phase: u8) {
        tracing::info!(phase, "entering phase");
        self.state = ExecutorState::RunningPhase(phase);
        self.emit(MissionEventKind::PhaseStarted { phase });
        self.sleep_with_jitter(self.config.pacing.phase_transition_ms)
            .await;
    }

    /// Pause after a tactic, scaled by invasiveness tier.
    async fn pace(&self, tier: Invasiveness) {
        let base = match tier {
            Invasiveness::Low => self.config.pacing.low_tier_ms,
            Invasiveness::Medium => self.config.pacing.medium_tier_ms,
            Invasiveness::High => self.config.pacing.high_tier_ms,
        };
        self.sleep_with_jitter(base).await;
    }

    async fn sleep_with_jitter(&self, base_ms: u64) {
        let jitter = if self.config.pacing.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.config.pacing.jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
    }

    fn emit(&mut self, event: MissionEventKind) {
        progress::emit(&self.progress, &self.mission_id, &mut self.seq, event);
    }

    fn log_summary(&self, results: &[TacticResult], catalog_len: usize) {
        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            succeeded,
            attempted = results.len(),
            catalog = catalog_len,
            "run complete"
        );

        let mut by_phase: std::collections::BTreeMap<u8, (usize, usize)> = Default::default();
        for r in results {
            let entry = by_phase.entry(r.phase).or_default();
            entry.0 += 1;
            if r.success {
                entry.1 += 1;
            }
        }
        for (phase, (total, ok)) in by_phase {
            tracing::info!(phase, "phase results: {ok}/{total} successful");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle_flips_once() {
        let h = CancelHandle::new();
        assert!(!h.is_cancelled());
        let clone = h.clone();
        clone.cancel();
        assert!(h.is_cancelled());
    }

    #[test]
    fn test_executor_starts_idle() {
        let exec = TacticExecutor::new(EngineConfig::default(), "m-1");
        assert_eq!(exec.state(), ExecutorState::Idle);
    }

    #[test]
    fn test_tactic_result_serializes_sparse() {
        let r = TacticResult {
            tactic: TacticId::DetectAjax,
            phase: 5,
            started_at: Utc::now(),
            duration_ms: 40,
            success: false,
            payload: None,
            error: Some("probe timed out after 15000ms".into()),
            impact: None,
            artifact: None,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("detect_ajax"));
        assert!(json.contains("timed out"));
        assert!(!json.contains("payload"));
        assert!(!json.contains("artifact"));
    }
}
