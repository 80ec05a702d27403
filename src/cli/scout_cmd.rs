//! `recon scout <url>` — run a full discovery mission against a live page.

use crate::audit::AuditLogger;
use crate::catalog;
use crate::cli::output;
use crate::config::EngineConfig;
use crate::executor::CancelHandle;
use crate::mission::{self, MissionOptions};
use crate::progress::{self, MissionEventKind};
use crate::report::{DiscoveryReport, RunMode};
use crate::session::chromium::ChromiumSession;
use crate::session::Session;
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Run the scout command.
pub async fn run(
    url: &str,
    safe: bool,
    out: Option<&str>,
    timeout: Option<u64>,
    no_artifacts: bool,
) -> Result<()> {
    let mode = if safe { RunMode::Safe } else { RunMode::Liberation };
    let catalog_len = match mode {
        RunMode::Safe => catalog::safe_catalog().len(),
        RunMode::Liberation => catalog::liberation_catalog().len(),
    };

    let mut config = if no_artifacts {
        EngineConfig::default()
    } else {
        EngineConfig::with_artifacts()
    };
    if let Some(ms) = timeout {
        config.timeouts.navigate_ms = ms;
    }

    if !output::is_quiet() && !output::is_json() {
        let mode_label = if safe { "safe" } else { "liberation" };
        eprintln!("  Scouting {url} ({mode_label} catalog, {catalog_len} tactics)");
    }

    let mut session = ChromiumSession::launch()
        .await
        .context("failed to launch browser session")?;

    let (tx, rx) = progress::channel();
    let cancel = CancelHandle::new();

    // Ctrl-C aborts between tactics; the partial report is still written.
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let reporter = tokio::spawn(drive_progress(rx, catalog_len as u64));

    let report = mission::run_mission(
        &mut session,
        config,
        MissionOptions {
            target: url.to_string(),
            mode,
            progress: Some(tx),
            cancel: Some(cancel),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("mission failed: {e}"));

    let _ = Box::new(session).close().await;
    let _ = reporter.await;

    let report = report?;

    let out_path = out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("recon_report_{}.json", Utc::now().format("%Y%m%dT%H%M%S"))));
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&out_path, json)
        .with_context(|| format!("failed to write report to {}", out_path.display()))?;

    if let Ok(mut audit) = AuditLogger::default_logger() {
        let elapsed = (report.finished_at - report.started_at)
            .num_milliseconds()
            .max(0) as u64;
        let status = if report.incomplete { "incomplete" } else { "complete" };
        let _ = audit.log_mission(&report.mission_id, &report.target, elapsed, status);
    }

    if output::is_json() {
        output::print_json(&report);
    } else if !output::is_quiet() {
        print_summary(&report, &out_path);
    }

    Ok(())
}

/// Consume mission events, driving the progress bar and the audit log.
async fn drive_progress(mut rx: progress::ProgressReceiver, total: u64) {
    let show_bar = !output::is_quiet() && !output::is_json();
    let bar = if show_bar {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("  [{bar:40}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
        Some(bar)
    } else {
        None
    };

    let mut audit = AuditLogger::default_logger().ok();

    while let Ok(event) = rx.recv().await {
        match event.event {
            MissionEventKind::PhaseStarted { phase } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("phase {phase}"));
                }
            }
            MissionEventKind::TacticStarted { tactic, .. } => {
                if let Some(bar) = &bar {
                    bar.set_message(tactic.to_string());
                }
            }
            MissionEventKind::TacticCompleted {
                tactic,
                phase,
                success,
                duration_ms,
                ..
            } => {
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
                if let Some(audit) = audit.as_mut() {
                    let status = if success { "success" } else { "failed" };
                    let _ = audit.log_tactic(
                        &event.mission_id,
                        tactic,
                        phase,
                        duration_ms,
                        status,
                    );
                }
            }
            MissionEventKind::Warning { message } => {
                if let Some(bar) = &bar {
                    bar.println(format!("  ! {message}"));
                }
            }
            MissionEventKind::CheckpointRecorded { .. } => {}
            MissionEventKind::MissionComplete { .. } => break,
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

fn print_summary(report: &DiscoveryReport, out_path: &std::path::Path) {
    let stats = &report.statistics;
    println!();
    println!("  Target:    {}", report.target);
    if let Some(title) = &report.title {
        println!("  Title:     {title}");
    }
    println!(
        "  Tactics:   {}/{} succeeded ({:.0}%)",
        stats.succeeded,
        stats.attempted,
        stats.success_rate * 100.0
    );
    for (phase, ps) in &stats.per_phase {
        println!("    phase {phase}: {}/{}", ps.successful, ps.total);
    }
    if let Some(best) = stats.most_effective {
        println!("  Most effective: {best}");
    }
    if report.incomplete {
        println!("  Run ended early: report is incomplete.");
    }
    println!("  Checkpoints: {}", report.checkpoints.len());
    println!("  Report:    {}", out_path.display());
}
