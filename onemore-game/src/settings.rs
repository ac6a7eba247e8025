//! Immutable run configuration: rounds, chamber, rank curve, reward bands.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a drawn reward, used by the presentation layer to pick a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Small,
    Medium,
    Jackpot,
}

impl std::fmt::Display for RewardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardKind::Small => write!(f, "small"),
            RewardKind::Medium => write!(f, "medium"),
            RewardKind::Jackpot => write!(f, "jackpot"),
        }
    }
}

/// One weighted entry inside a reward band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub kind: RewardKind,
    pub base_reward: u32,
    pub weight: f32,
}

/// Weighted reward table for one risk level `k` (the bullet count at the
/// moment of a safe resolution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardBand {
    pub k: u32,
    pub entries: Vec<RewardEntry>,
}

impl RewardBand {
    /// Sum of entry weights. Validation guarantees this is positive.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| f64::from(e.weight)).sum()
    }

    /// Select the entry for a roll in `[0, total_weight)` by walking the
    /// cumulative weights in declaration order.
    ///
    /// A roll at or past the cumulative sum (floating-point edge) falls back
    /// to the last entry deterministically.
    ///
    /// # Panics
    ///
    /// Panics when the band has no entries; validation rejects empty bands
    /// before an engine can exist.
    #[must_use]
    pub fn pick(&self, roll: f64) -> &RewardEntry {
        let mut cumulative = 0.0_f64;
        for entry in &self.entries {
            cumulative += f64::from(entry.weight);
            if roll <= cumulative {
                return entry;
            }
        }
        self.entries.last().expect("validated band is non-empty")
    }
}

/// Errors raised when run settings violate structural invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u32,
        value: u32,
    },
    #[error("carry_rate must be between 0.0 and 1.0 (got {value:.3})")]
    CarryRateRange { value: f32 },
    #[error("rank_to_multiplier must have rank_cap + 1 entries (expected {expected}, got {actual})")]
    MultiplierTableLength { expected: usize, actual: usize },
    #[error("no reward band registered for k={k}")]
    MissingRewardBand { k: u32 },
    #[error("duplicate reward band registered for k={k}")]
    DuplicateRewardBand { k: u32 },
    #[error("reward band for k={k} has no entries")]
    EmptyRewardBand { k: u32 },
    #[error("reward band for k={k} entry {index} has invalid weight {weight:.3}")]
    InvalidWeight { k: u32, index: usize, weight: f32 },
}

/// Immutable configuration for a whole run, constructed once before
/// `start_run` and never reloaded mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub max_rounds: u32,
    pub dead_limit: u32,
    pub chamber_size: u32,
    pub carry_rate: f32,
    pub rank_cap: u32,
    /// Score multiplier per rank; index = rank, length = `rank_cap + 1`.
    pub rank_to_multiplier: Vec<f32>,
    /// Reward bands for every reachable risk level, k in `1..chamber_size`.
    /// k = chamber_size never resolves safe (a full chamber always fires
    /// dead), so no band is required there.
    pub reward_bands: Vec<RewardBand>,
}

impl GameSettings {
    /// Validate structural invariants before a run may start.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds,
    /// the multiplier table length does not match the rank cap, or a
    /// reachable risk level lacks a usable reward band.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_rounds", self.max_rounds),
            ("dead_limit", self.dead_limit),
            ("chamber_size", self.chamber_size),
        ] {
            if value < 1 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 1,
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.carry_rate) {
            return Err(ConfigError::CarryRateRange {
                value: self.carry_rate,
            });
        }
        let expected = self.rank_cap as usize + 1;
        if self.rank_to_multiplier.len() != expected {
            return Err(ConfigError::MultiplierTableLength {
                expected,
                actual: self.rank_to_multiplier.len(),
            });
        }
        self.validate_bands()
    }

    fn validate_bands(&self) -> Result<(), ConfigError> {
        for k in 1..self.chamber_size {
            let mut found = false;
            for band in &self.reward_bands {
                if band.k != k {
                    continue;
                }
                if found {
                    return Err(ConfigError::DuplicateRewardBand { k });
                }
                found = true;
                if band.entries.is_empty() {
                    return Err(ConfigError::EmptyRewardBand { k });
                }
                for (index, entry) in band.entries.iter().enumerate() {
                    if !entry.weight.is_finite() || entry.weight <= 0.0 {
                        return Err(ConfigError::InvalidWeight {
                            k,
                            index,
                            weight: entry.weight,
                        });
                    }
                }
            }
            if !found {
                return Err(ConfigError::MissingRewardBand { k });
            }
        }
        Ok(())
    }

    /// Look up the reward band for risk level `k`.
    #[must_use]
    pub fn band_for(&self, k: u32) -> Option<&RewardBand> {
        self.reward_bands.iter().find(|band| band.k == k)
    }

    /// Multiplier for an arbitrary rank, clamped to the rank cap.
    ///
    /// # Panics
    ///
    /// Panics when the multiplier table is shorter than `rank_cap + 1`;
    /// validation rejects such tables before an engine can exist.
    #[must_use]
    pub fn multiplier_for_rank(&self, rank: u32) -> f32 {
        let index = rank.min(self.rank_cap) as usize;
        self.rank_to_multiplier[index]
    }

    /// Shipping tuning for the mini-game.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            max_rounds: 5,
            dead_limit: 2,
            chamber_size: 6,
            carry_rate: 0.5,
            rank_cap: 10,
            rank_to_multiplier: vec![
                1.0, 1.15, 1.35, 1.60, 1.90, 2.25, 2.70, 3.25, 3.95, 4.80, 5.80,
            ],
            reward_bands: vec![
                RewardBand {
                    k: 1,
                    entries: vec![
                        entry(RewardKind::Small, 20, 65.0),
                        entry(RewardKind::Medium, 50, 30.0),
                        entry(RewardKind::Jackpot, 120, 5.0),
                    ],
                },
                RewardBand {
                    k: 2,
                    entries: vec![
                        entry(RewardKind::Small, 40, 60.0),
                        entry(RewardKind::Medium, 90, 32.0),
                        entry(RewardKind::Jackpot, 200, 8.0),
                    ],
                },
                RewardBand {
                    k: 3,
                    entries: vec![
                        entry(RewardKind::Small, 60, 55.0),
                        entry(RewardKind::Medium, 140, 35.0),
                        entry(RewardKind::Jackpot, 320, 10.0),
                    ],
                },
                RewardBand {
                    k: 4,
                    entries: vec![
                        entry(RewardKind::Small, 90, 50.0),
                        entry(RewardKind::Medium, 200, 37.0),
                        entry(RewardKind::Jackpot, 480, 13.0),
                    ],
                },
                RewardBand {
                    k: 5,
                    entries: vec![
                        entry(RewardKind::Small, 120, 45.0),
                        entry(RewardKind::Medium, 280, 40.0),
                        entry(RewardKind::Jackpot, 650, 15.0),
                    ],
                },
            ],
        }
    }
}

const fn entry(kind: RewardKind, base_reward: u32, weight: f32) -> RewardEntry {
    RewardEntry {
        kind,
        base_reward,
        weight,
    }
}
