//! One More - run/round rules engine
//!
//! Platform-agnostic core for a push-your-luck roulette mini-game: the
//! player keeps loading chambers for a growing multiplier, or cashes out
//! before the fire event wipes the round. This crate owns every game number
//! and the canonical run state machine; rendering, audio, input widgets, and
//! leaderboards live behind the sink traits below.

pub mod chance;
pub mod engine;
pub mod run;
pub mod settings;

// Re-export commonly used types
pub use chance::{ChanceSource, ScriptedChance, SeededChance};
pub use engine::{EngineError, FireResult, Reward, RunEngine, RunState};
pub use run::{RunError, RunOrchestrator, RunPhase, RunSnapshot, RunSummary};
pub use settings::{ConfigError, GameSettings, RewardBand, RewardEntry, RewardKind};

use async_trait::async_trait;

/// Presentation-layer handshake consumed by the orchestrator.
///
/// Each method is one visual/audio beat; the orchestrator suspends until the
/// sink acknowledges (returns) or the run is cancelled. A failure is logged
/// and treated as acknowledged so a broken view can never deadlock a run.
#[async_trait]
pub trait PresentationSink: Send {
    /// A new round is starting.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn round_started(&mut self, round_index: u32) -> anyhow::Result<()>;

    /// Another chamber was loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn bullet_loaded(&mut self, bullet_count: u32) -> anyhow::Result<()>;

    /// The cylinder is spinning.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn spin_started(&mut self) -> anyhow::Result<()>;

    /// The trigger was pulled.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn fired(&mut self, is_dead: bool) -> anyhow::Result<()>;

    /// A safe resolution drew a reward.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn reward_revealed(
        &mut self,
        kind: RewardKind,
        gained: u32,
        multiplier: f32,
    ) -> anyhow::Result<()>;

    /// The round score was banked.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn cashed_out(
        &mut self,
        added_score: u32,
        previous_rank: u32,
        next_rank: u32,
    ) -> anyhow::Result<()>;

    /// The fire event hit.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn death_shown(&mut self) -> anyhow::Result<()>;

    /// The run is over.
    ///
    /// # Errors
    ///
    /// Returns an error if the beat cannot be played; the run continues.
    async fn game_over_shown(&mut self, dead_limit_reached: bool) -> anyhow::Result<()>;
}

/// External score submission consumed at the final `Result` phase.
///
/// Failures never affect game state and are not retried.
#[async_trait]
pub trait ScoreSink: Send {
    /// Forward the final total to a ranking service.
    ///
    /// # Errors
    ///
    /// Returns an error if submission fails; the orchestrator logs and moves
    /// on.
    async fn submit_total(&mut self, total_score: u32) -> anyhow::Result<()>;
}

/// No-op presentation sink for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

#[async_trait]
impl PresentationSink for NullPresentation {
    async fn round_started(&mut self, _round_index: u32) -> anyhow::Result<()> {
        Ok(())
    }

    async fn bullet_loaded(&mut self, _bullet_count: u32) -> anyhow::Result<()> {
        Ok(())
    }

    async fn spin_started(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn fired(&mut self, _is_dead: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reward_revealed(
        &mut self,
        _kind: RewardKind,
        _gained: u32,
        _multiplier: f32,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cashed_out(
        &mut self,
        _added_score: u32,
        _previous_rank: u32,
        _next_rank: u32,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn death_shown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn game_over_shown(&mut self, _dead_limit_reached: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// No-op score sink for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScoreboard;

#[async_trait]
impl ScoreSink for NullScoreboard {
    async fn submit_total(&mut self, _total_score: u32) -> anyhow::Result<()> {
        Ok(())
    }
}
