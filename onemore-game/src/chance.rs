//! Injected randomness for the run engine.
//!
//! The engine never touches an RNG directly; it draws through [`ChanceSource`]
//! so tests can script exact chamber slots and reward rolls.
use std::collections::VecDeque;

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;

/// Source of the two uniform draws the rules engine needs.
///
/// The source is exclusively owned by the engine; no other component draws
/// from it.
pub trait ChanceSource: std::fmt::Debug + Send {
    /// Uniform integer in `[0, chamber_size)`.
    fn chamber_slot(&mut self, chamber_size: u32) -> u32;

    /// Uniform real in `[0, total_weight)`.
    fn weight_roll(&mut self, total_weight: f64) -> f64;
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Production chance source: two deterministic `SmallRng` streams segregated
/// by domain so fire draws never perturb reward draws.
#[derive(Debug, Clone)]
pub struct SeededChance {
    fire: CountingRng<SmallRng>,
    reward: CountingRng<SmallRng>,
}

impl SeededChance {
    /// Construct both streams from a user-visible seed; the same seed always
    /// reproduces the same run.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            fire: CountingRng::new(derive_stream_seed(seed, b"fire")),
            reward: CountingRng::new(derive_stream_seed(seed, b"reward")),
        }
    }

    /// Construct from OS entropy for unseeded play.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::from_user_seed(rand::random())
    }

    /// Draw counts per stream, `(fire, reward)`.
    #[must_use]
    pub const fn draws(&self) -> (u64, u64) {
        (self.fire.draws(), self.reward.draws())
    }
}

impl ChanceSource for SeededChance {
    fn chamber_slot(&mut self, chamber_size: u32) -> u32 {
        self.fire.gen_range(0..chamber_size)
    }

    fn weight_roll(&mut self, total_weight: f64) -> f64 {
        self.reward.r#gen::<f64>() * total_weight
    }
}

/// Scripted chance source for tests and demos.
///
/// Queued values are consumed first; fallbacks apply once a queue is empty.
/// Chamber slots are clamped into range, so a fallback of `u32::MAX` means
/// "always the safest slot".
#[derive(Debug, Clone)]
pub struct ScriptedChance {
    pub slots: VecDeque<u32>,
    pub rolls: VecDeque<f64>,
    pub fallback_slot: u32,
    pub fallback_roll: f64,
}

impl ScriptedChance {
    /// Every chamber draw lands on the safest slot; reward rolls select the
    /// first entry of each band.
    #[must_use]
    pub fn never_dead() -> Self {
        Self {
            slots: VecDeque::new(),
            rolls: VecDeque::new(),
            fallback_slot: u32::MAX,
            fallback_roll: 0.0,
        }
    }

    /// Every chamber draw lands on slot 0, which is fatal for any loaded
    /// chamber (and still safe at bullet count 0).
    #[must_use]
    pub fn always_dead() -> Self {
        Self {
            fallback_slot: 0,
            ..Self::never_dead()
        }
    }

    /// Queue explicit chamber slots ahead of the fallback.
    #[must_use]
    pub fn with_slots(mut self, slots: impl IntoIterator<Item = u32>) -> Self {
        self.slots.extend(slots);
        self
    }

    /// Queue explicit reward rolls ahead of the fallback.
    #[must_use]
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = f64>) -> Self {
        self.rolls.extend(rolls);
        self
    }
}

impl ChanceSource for ScriptedChance {
    fn chamber_slot(&mut self, chamber_size: u32) -> u32 {
        let slot = self.slots.pop_front().unwrap_or(self.fallback_slot);
        slot.min(chamber_size.saturating_sub(1))
    }

    fn weight_roll(&mut self, _total_weight: f64) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback_roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_chance_is_deterministic() {
        let mut a = SeededChance::from_user_seed(0xFEED_CAFE);
        let mut b = SeededChance::from_user_seed(0xFEED_CAFE);
        for _ in 0..32 {
            assert_eq!(a.chamber_slot(6), b.chamber_slot(6));
            assert!((a.weight_roll(100.0) - b.weight_roll(100.0)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn domain_tags_derive_distinct_streams() {
        assert_ne!(
            derive_stream_seed(42, b"fire"),
            derive_stream_seed(42, b"reward"),
            "domain tags must derive distinct seeds"
        );
    }

    #[test]
    fn chamber_slot_stays_in_range_and_counts_draws() {
        let mut chance = SeededChance::from_user_seed(7);
        for _ in 0..64 {
            assert!(chance.chamber_slot(6) < 6);
        }
        let (fire_draws, reward_draws) = chance.draws();
        assert!(fire_draws >= 64);
        assert_eq!(reward_draws, 0);
    }

    #[test]
    fn weight_roll_stays_below_total() {
        let mut chance = SeededChance::from_user_seed(7);
        for _ in 0..64 {
            let roll = chance.weight_roll(100.0);
            assert!((0.0..100.0).contains(&roll));
        }
    }

    #[test]
    fn scripted_chance_consumes_queue_then_fallback() {
        let mut chance = ScriptedChance::never_dead().with_slots([0, 3]);
        assert_eq!(chance.chamber_slot(6), 0);
        assert_eq!(chance.chamber_slot(6), 3);
        assert_eq!(chance.chamber_slot(6), 5, "fallback clamps to safest slot");

        let mut chance = ScriptedChance::never_dead().with_rolls([99.5]);
        assert!((chance.weight_roll(100.0) - 99.5).abs() < f64::EPSILON);
        assert!(chance.weight_roll(100.0).abs() < f64::EPSILON);
    }
}
