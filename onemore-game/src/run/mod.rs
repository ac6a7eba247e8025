//! Run sequencing: the phase machine, observable snapshots, and the
//! orchestrator that serializes player input against them.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineError;
use crate::settings::ConfigError;

pub mod orchestrator;
pub use orchestrator::RunOrchestrator;

/// Phase of the run state machine. Exactly one phase is active at a time and
/// it is the single source of truth for whether player input is accepted:
/// only `Decision` accepts commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    RunInit,
    RoundStart,
    Decision,
    Spin,
    ResolveSafe,
    ResolveDead,
    Cashout,
    RoundEnd,
    GameOver,
    Result,
}

impl RunPhase {
    /// Whether player commands are accepted in this phase.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Decision)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunPhase::RunInit => "run_init",
            RunPhase::RoundStart => "round_start",
            RunPhase::Decision => "decision",
            RunPhase::Spin => "spin",
            RunPhase::ResolveSafe => "resolve_safe",
            RunPhase::ResolveDead => "resolve_dead",
            RunPhase::Cashout => "cashout",
            RunPhase::RoundEnd => "round_end",
            RunPhase::GameOver => "game_over",
            RunPhase::Result => "result",
        };
        f.write_str(label)
    }
}

/// Read-only view of the run published after every transition. Observers
/// never see a torn intermediate state: engine mutations complete before the
/// snapshot is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub round_index: u32,
    pub dead_count: u32,
    pub bullet_count: u32,
    pub rank: u32,
    pub multiplier: f32,
    pub round_score: u32,
    pub total_score: u32,
    /// Rank a cashout would carry into the next round.
    pub carry_next_rank: u32,
    /// Multiplier at that carried rank, for previewing a stop.
    pub carry_next_multiplier: f32,
}

/// Final accounting for a finished run, available once the phase is
/// [`RunPhase::Result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_score: u32,
    pub dead_count: u32,
    pub rounds_played: u32,
    pub dead_limit_reached: bool,
}

/// Errors that abort a run. Both variants reflect broken configuration or
/// data, never player behavior; the orchestrator stops accepting input once
/// one surfaces.
#[derive(Debug, Error, PartialEq)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decision_accepts_input() {
        for phase in [
            RunPhase::RunInit,
            RunPhase::RoundStart,
            RunPhase::Spin,
            RunPhase::ResolveSafe,
            RunPhase::ResolveDead,
            RunPhase::Cashout,
            RunPhase::RoundEnd,
            RunPhase::GameOver,
            RunPhase::Result,
        ] {
            assert!(!phase.accepts_input(), "{phase} must not accept input");
        }
        assert!(RunPhase::Decision.accepts_input());
    }

    #[test]
    fn phase_serializes_as_snake_case() {
        let encoded = serde_json::to_string(&RunPhase::ResolveSafe).expect("serialize");
        assert_eq!(encoded, "\"resolve_safe\"");
    }
}
