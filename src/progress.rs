//! Progress event types and broadcast channel for mission telemetry.
//!
//! The executor emits `MissionEvent`s as tactics run; they flow through a
//! `tokio::sync::broadcast` channel to all subscribers (CLI progress bar,
//! audit log). When no subscriber exists, events are silently dropped.

use crate::catalog::TacticId;
use crate::impact::Effectiveness;
use serde::{Deserialize, Serialize};

/// A progress event emitted during a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    /// The mission this event belongs to.
    pub mission_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of event.
    pub event: MissionEventKind,
}

/// The specific kind of mission event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MissionEventKind {
    /// The executor entered a new phase.
    PhaseStarted { phase: u8 },
    /// A tactic is about to execute.
    TacticStarted { tactic: TacticId, phase: u8 },
    /// A tactic finished, success or failure.
    TacticCompleted {
        tactic: TacticId,
        phase: u8,
        success: bool,
        effectiveness: Option<Effectiveness>,
        duration_ms: u64,
    },
    /// A checkpoint was recorded.
    CheckpointRecorded { name: String },
    /// The run finished.
    MissionComplete {
        attempted: u32,
        succeeded: u32,
        incomplete: bool,
        elapsed_ms: u64,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Sender handle for emitting mission events.
pub type ProgressSender = tokio::sync::broadcast::Sender<MissionEvent>;

/// Receiver handle for consuming mission events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<MissionEvent>;

/// Create a new progress broadcast channel.
///
/// 256 events covers a full catalog run with per-tactic start/complete
/// pairs plus checkpoints.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit an event, silently ignoring send errors (no receivers listening).
pub fn emit(
    tx: &Option<ProgressSender>,
    mission_id: &str,
    seq: &mut u64,
    event: MissionEventKind,
) {
    if let Some(sender) = tx {
        *seq += 1;
        let _ = sender.send(MissionEvent {
            mission_id: mission_id.to_string(),
            seq: *seq,
            event,
        });
    }
}
