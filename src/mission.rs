//! Full mission flow: navigate, baseline, run the catalog, checkpoint,
//! aggregate.
//!
//! `run_mission` is the one entry point the CLI uses. It owns the ordering
//! guarantees: the baseline checkpoint precedes every tactic, and the
//! `after_liberation` and `final_state` checkpoints follow the run even when
//! the run ended early.

use crate::catalog::{self, TacticDefinition};
use crate::checkpoint::{self, Checkpoint};
use crate::config::EngineConfig;
use crate::executor::{CancelHandle, TacticExecutor};
use crate::progress::{self, MissionEventKind, ProgressSender};
use crate::report::{self, DiscoveryReport, ReportInputs, RunMode};
use crate::session::{Session, SessionError};
use crate::snapshot;
use chrono::Utc;
use uuid::Uuid;

/// Everything a mission needs beyond the session itself.
pub struct MissionOptions {
    pub target: String,
    pub mode: RunMode,
    pub progress: Option<ProgressSender>,
    pub cancel: Option<CancelHandle>,
}

impl MissionOptions {
    pub fn new(target: impl Into<String>, mode: RunMode) -> Self {
        Self {
            target: target.into(),
            mode,
            progress: None,
            cancel: None,
        }
    }
}

fn catalog_for(mode: RunMode) -> &'static [TacticDefinition] {
    match mode {
        RunMode::Safe => catalog::safe_catalog(),
        RunMode::Liberation => catalog::liberation_catalog(),
    }
}

/// Run a complete mission against an already-launched session.
///
/// Navigation failure and session loss during the baseline capture abort
/// the mission with an error; once the tactic run has started, session loss
/// produces an incomplete report rather than an error.
pub async fn run_mission(
    session: &mut dyn Session,
    config: EngineConfig,
    options: MissionOptions,
) -> Result<DiscoveryReport, SessionError> {
    let mission_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let mut seq: u64 = 0;

    tracing::info!(%mission_id, target = %options.target, mode = ?options.mode, "mission starting");

    let nav = session
        .navigate(&options.target, config.timeouts.navigate_ms)
        .await?;
    tracing::info!(url = %nav.final_url, load_time_ms = nav.load_time_ms, "navigation complete");

    let title = session.current_title().await.ok().filter(|t| !t.is_empty());

    let baseline = snapshot::capture(session).await?;
    let mut checkpoints: Vec<Checkpoint> = Vec::with_capacity(3);
    let baseline_cp = checkpoint::record("baseline", session, None).await?;
    progress::emit(
        &options.progress,
        &mission_id,
        &mut seq,
        MissionEventKind::CheckpointRecorded {
            name: baseline_cp.name.clone(),
        },
    );
    checkpoints.push(baseline_cp);

    let catalog = catalog_for(options.mode);
    let mut executor = TacticExecutor::new(config, &mission_id);
    if let Some(tx) = options.progress.clone() {
        executor = executor.with_progress(tx);
    }
    if let Some(cancel) = options.cancel.clone() {
        executor = executor.with_cancel(cancel);
    }
    let outcome = executor.run(session, catalog).await;

    // Post-run checkpoints are best-effort: the session may already be gone
    // and the report is still due.
    for name in ["after_liberation", "final_state"] {
        match checkpoint::record(name, session, checkpoints.last()).await {
            Ok(cp) => {
                progress::emit(
                    &options.progress,
                    &mission_id,
                    &mut seq,
                    MissionEventKind::CheckpointRecorded {
                        name: cp.name.clone(),
                    },
                );
                checkpoints.push(cp);
            }
            Err(e) => {
                tracing::warn!(checkpoint = name, error = %e, "checkpoint skipped");
                progress::emit(
                    &options.progress,
                    &mission_id,
                    &mut seq,
                    MissionEventKind::Warning {
                        message: format!("checkpoint {name} skipped: {e}"),
                    },
                );
                break;
            }
        }
    }

    let incomplete = outcome.incomplete;
    let report = report::aggregate(ReportInputs {
        target: nav.final_url,
        title,
        mission_id: mission_id.clone(),
        mode: options.mode,
        started_at,
        baseline: Some(baseline),
        results: outcome.results,
        checkpoints,
        catalog_len: catalog.len(),
        incomplete,
    });

    let elapsed_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
    progress::emit(
        &options.progress,
        &mission_id,
        &mut seq,
        MissionEventKind::MissionComplete {
            attempted: report.statistics.attempted,
            succeeded: report.statistics.succeeded,
            incomplete: report.incomplete,
            elapsed_ms,
        },
    );
    tracing::info!(
        %mission_id,
        attempted = report.statistics.attempted,
        succeeded = report.statistics.succeeded,
        incomplete = report.incomplete,
        elapsed_ms,
        "mission complete"
    );

    Ok(report)
}
