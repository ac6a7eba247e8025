//! The run orchestrator: sequences engine calls into the canonical phase
//! machine and awaits presentation acknowledgements between beats.
//!
//! All engine mutations are synchronous and complete before any await, so
//! cancelling a command (dropping its future at a suspension point) never
//! leaves the engine mid-mutation. The orchestrator serializes itself by
//! accepting input only in [`RunPhase::Decision`].
use tokio::sync::watch;

use crate::chance::ChanceSource;
use crate::engine::{RunEngine, RunState};
use crate::run::{RunError, RunPhase, RunSnapshot, RunSummary};
use crate::settings::GameSettings;
use crate::{PresentationSink, ScoreSink};

/// Drives a run from `RunInit` to `Result`, owning the engine, the current
/// phase, and the injected presentation/score sinks.
pub struct RunOrchestrator<P, S> {
    settings: GameSettings,
    engine: Option<RunEngine>,
    phase: RunPhase,
    dead_limit_reached: bool,
    view: P,
    scoreboard: S,
    snapshot_tx: watch::Sender<RunSnapshot>,
}

impl<P, S> RunOrchestrator<P, S>
where
    P: PresentationSink,
    S: ScoreSink,
{
    /// Create an orchestrator for the given settings and sinks. Settings are
    /// validated when a run starts, not here.
    #[must_use]
    pub fn new(settings: GameSettings, view: P, scoreboard: S) -> Self {
        let (snapshot_tx, _) = watch::channel(RunSnapshot::default());
        Self {
            settings,
            engine: None,
            phase: RunPhase::RunInit,
            dead_limit_reached: false,
            view,
            scoreboard,
            snapshot_tx,
        }
    }

    /// Start (or restart) a run, seeding the engine's chance source when a
    /// seed is given. Drives the machine to the first `Decision`.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Config` when the settings are structurally invalid;
    /// no run state is left behind in that case.
    pub async fn start_run(&mut self, seed: Option<u64>) -> Result<(), RunError> {
        self.engine = None;
        self.dead_limit_reached = false;
        self.enter(RunPhase::RunInit);
        self.engine = Some(RunEngine::start_run(self.settings.clone(), seed)?);
        self.enter_round(1, 0).await;
        Ok(())
    }

    /// Start a run drawing from an explicit chance source (scripted runs,
    /// reproducible demos).
    ///
    /// # Errors
    ///
    /// Returns `RunError::Config` when the settings are structurally invalid.
    pub async fn start_run_with(&mut self, chance: Box<dyn ChanceSource>) -> Result<(), RunError> {
        self.engine = None;
        self.dead_limit_reached = false;
        self.enter(RunPhase::RunInit);
        self.engine = Some(RunEngine::start_run_with(self.settings.clone(), chance)?);
        self.enter_round(1, 0).await;
        Ok(())
    }

    /// Player command: load one more chamber, then fire. Ignored outside
    /// `Decision`.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Engine` when a safe resolution finds no reward
    /// band; the run is aborted and accepts no further input.
    pub async fn escalate(&mut self) -> Result<(), RunError> {
        if !self.phase.accepts_input() || self.engine.is_none() {
            log::trace!("escalate ignored in phase {}", self.phase);
            return Ok(());
        }
        self.phase = RunPhase::Spin;
        let bullet_count = {
            let engine = self.engine_mut();
            engine.escalate();
            engine.state().bullet_count
        };
        self.publish();
        self.ack_bullet_loaded(bullet_count).await;
        self.ack_spin_started().await;

        let fired = self.engine_mut().fire();
        self.ack_fired(fired.is_dead).await;
        if fired.is_dead {
            self.resolve_dead().await;
            Ok(())
        } else {
            self.resolve_safe(fired.bullet_count).await
        }
    }

    /// Player command: bank the round. The trigger is still pulled once on
    /// the way out; only a safe outcome reaches the cashout. Ignored outside
    /// `Decision`.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` mirrors [`Self::escalate`] so both
    /// commands share a calling convention.
    pub async fn stop(&mut self) -> Result<(), RunError> {
        if !self.phase.accepts_input() || self.engine.is_none() {
            log::trace!("stop ignored in phase {}", self.phase);
            return Ok(());
        }
        self.enter(RunPhase::Spin);
        self.ack_spin_started().await;

        let fired = self.engine_mut().fire();
        self.ack_fired(fired.is_dead).await;
        if fired.is_dead {
            self.resolve_dead().await;
        } else {
            self.cashout_round().await;
        }
        Ok(())
    }

    /// Current phase of the run machine.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Whether the run has reached its terminal phase.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, RunPhase::Result)
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to the snapshot stream. Any number of observers may watch
    /// without back-pressure on the run.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Borrow the raw engine state, if a run has started.
    #[must_use]
    pub fn state(&self) -> Option<&RunState> {
        self.engine.as_ref().map(RunEngine::state)
    }

    /// Final accounting, available once the run reached `Result`.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        if !self.is_finished() {
            return None;
        }
        let state = self.engine.as_ref()?.state();
        Some(RunSummary {
            total_score: state.total_score,
            dead_count: state.dead_count,
            rounds_played: state.round_index,
            dead_limit_reached: self.dead_limit_reached,
        })
    }

    /// Borrow the presentation sink.
    #[must_use]
    pub const fn view(&self) -> &P {
        &self.view
    }

    async fn enter_round(&mut self, round_index: u32, start_rank: u32) {
        self.engine_mut().start_round(round_index, start_rank);
        self.enter(RunPhase::RoundStart);
        if let Err(err) = self.view.round_started(round_index).await {
            log::warn!("presentation sink failed on round_started: {err:#}");
        }
        self.enter(RunPhase::Decision);
    }

    async fn resolve_safe(&mut self, k: u32) -> Result<(), RunError> {
        self.phase = RunPhase::ResolveSafe;
        let reveal = {
            let engine = self.engine_mut();
            let reward = engine.roll_safe_reward(k)?;
            let gained = engine.calc_gained(reward.base_reward);
            engine.apply_safe_gain(gained);
            (reward.kind, gained, engine.current_multiplier())
        };
        self.publish();
        let (kind, gained, multiplier) = reveal;
        if let Err(err) = self.view.reward_revealed(kind, gained, multiplier).await {
            log::warn!("presentation sink failed on reward_revealed: {err:#}");
        }
        self.enter(RunPhase::Decision);
        Ok(())
    }

    async fn resolve_dead(&mut self) {
        self.phase = RunPhase::ResolveDead;
        self.engine_mut().apply_dead();
        self.publish();
        if let Err(err) = self.view.death_shown().await {
            log::warn!("presentation sink failed on death_shown: {err:#}");
        }
        if self.engine_mut().state().dead_count >= self.settings.dead_limit {
            self.finish(true).await;
        } else {
            self.end_round().await;
        }
    }

    async fn cashout_round(&mut self) {
        self.phase = RunPhase::Cashout;
        let (added, previous_rank, next_rank) = {
            let engine = self.engine_mut();
            let previous_rank = engine.state().rank;
            let added = engine.state().round_score;
            let next_rank = engine.cashout();
            (added, previous_rank, next_rank)
        };
        self.publish();
        if let Err(err) = self.view.cashed_out(added, previous_rank, next_rank).await {
            log::warn!("presentation sink failed on cashed_out: {err:#}");
        }
        self.end_round().await;
    }

    async fn end_round(&mut self) {
        self.enter(RunPhase::RoundEnd);
        let next_round = self.engine_mut().state().round_index + 1;
        if next_round > self.settings.max_rounds {
            self.finish(false).await;
            return;
        }
        let start_rank = self.engine_mut().state().rank;
        self.enter_round(next_round, start_rank).await;
    }

    async fn finish(&mut self, dead_limit_reached: bool) {
        self.dead_limit_reached = dead_limit_reached;
        self.enter(RunPhase::GameOver);
        if let Err(err) = self.view.game_over_shown(dead_limit_reached).await {
            log::warn!("presentation sink failed on game_over_shown: {err:#}");
        }
        self.enter(RunPhase::Result);
        let total = self.engine_mut().state().total_score;
        if total > 0 {
            if let Err(err) = self.scoreboard.submit_total(total).await {
                log::warn!("score submission failed: {err:#}");
            }
        } else {
            log::debug!("skipping score submission for empty total");
        }
    }

    async fn ack_bullet_loaded(&mut self, bullet_count: u32) {
        if let Err(err) = self.view.bullet_loaded(bullet_count).await {
            log::warn!("presentation sink failed on bullet_loaded: {err:#}");
        }
    }

    async fn ack_spin_started(&mut self) {
        if let Err(err) = self.view.spin_started().await {
            log::warn!("presentation sink failed on spin_started: {err:#}");
        }
    }

    async fn ack_fired(&mut self, is_dead: bool) {
        if let Err(err) = self.view.fired(is_dead).await {
            log::warn!("presentation sink failed on fired: {err:#}");
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        let snapshot = match &self.engine {
            Some(engine) => {
                let state = engine.state();
                let carry_next_rank = engine.carry_rank();
                RunSnapshot {
                    phase: self.phase,
                    round_index: state.round_index,
                    dead_count: state.dead_count,
                    bullet_count: state.bullet_count,
                    rank: state.rank,
                    multiplier: engine.current_multiplier(),
                    round_score: state.round_score,
                    total_score: state.total_score,
                    carry_next_rank,
                    carry_next_multiplier: engine.multiplier_for_rank(carry_next_rank),
                }
            }
            None => RunSnapshot {
                phase: self.phase,
                ..RunSnapshot::default()
            },
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    fn engine_mut(&mut self) -> &mut RunEngine {
        self.engine
            .as_mut()
            .expect("engine exists while a run is active")
    }
}
