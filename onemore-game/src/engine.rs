//! The run engine: every game number and its transitions.
//!
//! A passive, synchronous calculator over [`RunState`] and [`GameSettings`].
//! It knows nothing about phases or presentation; the orchestrator sequences
//! its calls.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chance::{ChanceSource, SeededChance};
use crate::settings::{ConfigError, GameSettings, RewardKind};

/// Reward drawn from a band, before the rank multiplier is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub kind: RewardKind,
    pub base_reward: u32,
}

/// Outcome of pulling the trigger: whether the run died and the bullet count
/// at the moment of firing (the risk level `k` for a safe resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireResult {
    pub is_dead: bool,
    pub bullet_count: u32,
}

/// Mutable numbers for one run. Exclusively owned by [`RunEngine`] and
/// discarded when a new run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub round_index: u32,
    pub bullet_count: u32,
    pub rank: u32,
    pub round_score: u32,
    pub total_score: u32,
    pub dead_count: u32,
}

/// Errors raised by engine operations at runtime.
///
/// These indicate configuration/data bugs, not player-facing conditions, and
/// abort the run rather than defaulting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no reward band registered for k={k}")]
    NoRewardBand { k: u32 },
}

/// Pure calculator over run state plus settings, drawing randomness only
/// through the injected [`ChanceSource`].
#[derive(Debug)]
pub struct RunEngine {
    settings: GameSettings,
    state: RunState,
    chance: Box<dyn ChanceSource>,
}

impl RunEngine {
    /// Start a fresh run: validates settings in full and creates zeroed run
    /// state, so a failure leaves nothing partially mutated.
    ///
    /// A seed makes every draw of the run reproducible.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the settings are structurally invalid.
    pub fn start_run(settings: GameSettings, seed: Option<u64>) -> Result<Self, ConfigError> {
        let chance: Box<dyn ChanceSource> = match seed {
            Some(seed) => Box::new(SeededChance::from_user_seed(seed)),
            None => Box::new(SeededChance::from_entropy()),
        };
        Self::start_run_with(settings, chance)
    }

    /// Start a fresh run drawing from an explicit chance source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the settings are structurally invalid.
    pub fn start_run_with(
        settings: GameSettings,
        chance: Box<dyn ChanceSource>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            state: RunState::default(),
            chance,
        })
    }

    /// Begin a round: clears the chamber and round score, carries the
    /// starting rank in (clamped to the rank cap).
    pub fn start_round(&mut self, round_index: u32, start_rank: u32) {
        self.state.round_index = round_index;
        self.state.bullet_count = 0;
        self.state.round_score = 0;
        self.state.rank = start_rank.min(self.settings.rank_cap);
    }

    /// "One more": raise the rank and load another chamber, both clamped.
    /// Loading past a full chamber is legal; the rank can still climb.
    pub fn escalate(&mut self) {
        self.state.rank = (self.state.rank + 1).min(self.settings.rank_cap);
        self.state.bullet_count = (self.state.bullet_count + 1).min(self.settings.chamber_size);
    }

    /// Pull the trigger. Death probability is `bullet_count / chamber_size`:
    /// a uniform slot in `[0, chamber_size)` below the bullet count is fatal.
    /// A full chamber is certain death and skips the draw; an empty chamber
    /// can never kill.
    pub fn fire(&mut self) -> FireResult {
        let is_dead = self.state.bullet_count >= self.settings.chamber_size
            || self.chance.chamber_slot(self.settings.chamber_size) < self.state.bullet_count;
        FireResult {
            is_dead,
            bullet_count: self.state.bullet_count,
        }
    }

    /// Draw a reward from the band for risk level `k`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoRewardBand` when no band is registered for
    /// `k`; validation makes this unreachable for levels escalation can
    /// produce, so hitting it means the reward tables are incomplete.
    pub fn roll_safe_reward(&mut self, k: u32) -> Result<Reward, EngineError> {
        let Some(band) = self.settings.band_for(k) else {
            return Err(EngineError::NoRewardBand { k });
        };
        let roll = self.chance.weight_roll(band.total_weight());
        let entry = band.pick(roll);
        Ok(Reward {
            kind: entry.kind,
            base_reward: entry.base_reward,
        })
    }

    /// Apply the current rank multiplier to a base reward, rounding
    /// half-away-from-zero. The math runs in `f64` so the result is
    /// bit-for-bit reproducible.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn calc_gained(&self, base_reward: u32) -> u32 {
        let gained = f64::from(base_reward) * f64::from(self.current_multiplier());
        gained.round().max(0.0) as u32
    }

    /// Bank a safe gain into the round score.
    pub fn apply_safe_gain(&mut self, gained: u32) {
        self.state.round_score += gained;
    }

    /// Death: the round score and rank are wiped, the death count ticks up.
    pub fn apply_dead(&mut self) {
        self.state.round_score = 0;
        self.state.rank = 0;
        self.state.dead_count += 1;
    }

    /// Cash out: bank the round score into the total and carry a fraction of
    /// the rank into the next round. Returns the carried rank.
    pub fn cashout(&mut self) -> u32 {
        self.state.total_score += self.state.round_score;
        self.state.round_score = 0;
        let next_rank = self.carry_rank();
        self.state.rank = next_rank;
        next_rank
    }

    /// Preview of the rank a cashout would carry: `floor(rank * carry_rate)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn carry_rank(&self) -> u32 {
        (f64::from(self.state.rank) * f64::from(self.settings.carry_rate)).floor() as u32
    }

    /// Multiplier at the current rank.
    #[must_use]
    pub fn current_multiplier(&self) -> f32 {
        self.settings.multiplier_for_rank(self.state.rank)
    }

    /// Multiplier at an arbitrary rank (used to preview the post-cashout
    /// multiplier before committing).
    #[must_use]
    pub fn multiplier_for_rank(&self, rank: u32) -> f32 {
        self.settings.multiplier_for_rank(rank)
    }

    /// Borrow the run numbers.
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    /// Borrow the run settings.
    #[must_use]
    pub const fn settings(&self) -> &GameSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::ScriptedChance;

    fn engine_with(chance: ScriptedChance) -> RunEngine {
        RunEngine::start_run_with(GameSettings::default_config(), Box::new(chance))
            .expect("default config is valid")
    }

    #[test]
    fn start_run_rejects_invalid_settings() {
        let mut settings = GameSettings::default_config();
        settings.rank_to_multiplier.truncate(9);
        let result = RunEngine::start_run(settings, Some(1));
        assert!(matches!(
            result,
            Err(ConfigError::MultiplierTableLength { .. })
        ));
    }

    #[test]
    fn escalation_never_exceeds_caps() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        for _ in 0..40 {
            engine.escalate();
            assert!(engine.state().bullet_count <= 6);
            assert!(engine.state().rank <= 10);
        }
        assert_eq!(engine.state().bullet_count, 6);
        assert_eq!(engine.state().rank, 10);
    }

    #[test]
    fn escalate_at_full_chamber_still_raises_rank() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        for _ in 0..6 {
            engine.escalate();
        }
        assert_eq!(engine.state().bullet_count, 6);
        assert_eq!(engine.state().rank, 6);
        engine.escalate();
        assert_eq!(engine.state().bullet_count, 6);
        assert_eq!(engine.state().rank, 7);
    }

    #[test]
    fn fire_with_empty_chamber_is_always_safe() {
        let mut engine = engine_with(ScriptedChance::always_dead());
        engine.start_round(1, 0);
        let result = engine.fire();
        assert!(!result.is_dead);
        assert_eq!(result.bullet_count, 0);
    }

    #[test]
    fn fire_with_full_chamber_is_certain_death() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        for _ in 0..6 {
            engine.escalate();
        }
        let result = engine.fire();
        assert!(result.is_dead, "full chamber must fire dead");
        assert_eq!(result.bullet_count, 6);
    }

    #[test]
    fn fire_slot_below_bullet_count_is_fatal() {
        let mut engine = engine_with(ScriptedChance::never_dead().with_slots([2, 3]));
        engine.start_round(1, 0);
        engine.escalate();
        engine.escalate();
        engine.escalate();
        // bullet_count = 3: slot 2 is fatal, slot 3 is safe.
        assert!(engine.fire().is_dead);
        assert!(!engine.fire().is_dead);
    }

    #[test]
    fn roll_safe_reward_reports_missing_band() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        assert_eq!(
            engine.roll_safe_reward(0),
            Err(EngineError::NoRewardBand { k: 0 })
        );
    }

    #[test]
    fn roll_safe_reward_at_zero_selects_first_entry() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        let reward = engine.roll_safe_reward(1).expect("band exists");
        assert_eq!(reward.kind, RewardKind::Small);
        assert_eq!(reward.base_reward, 20);
    }

    #[test]
    fn roll_safe_reward_falls_back_to_last_entry() {
        // Band 1 totals 100; a scripted roll past the cumulative sum must
        // still resolve deterministically.
        let mut engine = engine_with(ScriptedChance::never_dead().with_rolls([101.0]));
        engine.start_round(1, 0);
        let reward = engine.roll_safe_reward(1).expect("band exists");
        assert_eq!(reward.kind, RewardKind::Jackpot);
        assert_eq!(reward.base_reward, 120);
    }

    #[test]
    fn calc_gained_rounds_half_away_from_zero() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 1);
        assert!((engine.current_multiplier() - 1.15).abs() < f32::EPSILON);
        assert_eq!(engine.calc_gained(20), 23);

        engine.start_round(1, 0);
        assert_eq!(engine.calc_gained(50), 50);

        // Rank 5 multiplier is 2.25; 2 * 2.25 = 4.5 rounds up, not to even.
        engine.start_round(1, 5);
        assert_eq!(engine.calc_gained(2), 5);
    }

    #[test]
    fn apply_dead_wipes_round_and_rank() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 4);
        engine.apply_safe_gain(120);
        engine.apply_dead();
        assert_eq!(engine.state().round_score, 0);
        assert_eq!(engine.state().rank, 0);
        assert_eq!(engine.state().dead_count, 1);
    }

    #[test]
    fn cashout_banks_round_score_and_carries_half_rank() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 0);
        for _ in 0..5 {
            engine.escalate();
        }
        engine.apply_safe_gain(200);
        let next_rank = engine.cashout();
        assert_eq!(next_rank, 2, "floor(5 * 0.5)");
        assert_eq!(engine.state().rank, 2);
        assert_eq!(engine.state().round_score, 0);
        assert_eq!(engine.state().total_score, 200);
    }

    #[test]
    fn cashout_with_empty_round_score_leaves_total_unchanged() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(1, 3);
        let next_rank = engine.cashout();
        assert_eq!(next_rank, 1, "floor(3 * 0.5)");
        assert_eq!(engine.state().total_score, 0);
    }

    #[test]
    fn start_round_clamps_start_rank() {
        let mut engine = engine_with(ScriptedChance::never_dead());
        engine.start_round(2, 99);
        assert_eq!(engine.state().rank, 10);
        assert_eq!(engine.state().round_index, 2);
        assert_eq!(engine.state().bullet_count, 0);
        assert_eq!(engine.state().round_score, 0);
    }

    #[test]
    fn seeded_runs_reproduce_fire_sequences() {
        let settings = GameSettings::default_config();
        let mut results = Vec::new();
        for _ in 0..2 {
            let mut engine =
                RunEngine::start_run(settings.clone(), Some(0xD1CE)).expect("valid settings");
            engine.start_round(1, 0);
            let mut sequence = Vec::new();
            for _ in 0..10 {
                engine.escalate();
                sequence.push(engine.fire().is_dead);
            }
            results.push(sequence);
        }
        assert_eq!(results[0], results[1]);
    }
}
