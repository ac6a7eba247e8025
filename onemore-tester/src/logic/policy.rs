//! Risk policies: scripted players that look at the published snapshot and
//! pick the next command.
use onemore_game::RunSnapshot;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// The two commands a player can issue in the decision phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCall {
    OneMore,
    CashOut,
}

/// A scripted player: decides the next command from the latest snapshot.
pub trait RiskPolicy: Send {
    fn name(&self) -> &'static str;
    fn decide(&mut self, snapshot: &RunSnapshot) -> RiskCall;
}

/// Named play style used to label records and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameplayStrategy {
    /// Bank after the first safe chamber of every round.
    Cautious,
    /// Push to two chambers, then bank.
    Steady,
    /// Push to four chambers before banking.
    Greedy,
    /// Flip a seeded coin every decision, leaning safer as chambers load.
    Coinflip,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Cautious, Self::Steady, Self::Greedy, Self::Coinflip];

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "cautious" => Some(Self::Cautious),
            "steady" => Some(Self::Steady),
            "greedy" => Some(Self::Greedy),
            "coinflip" => Some(Self::Coinflip),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::Steady => "steady",
            Self::Greedy => "greedy",
            Self::Coinflip => "coinflip",
        }
    }

    /// Build the decision function for this strategy. The coinflip stream is
    /// seeded so a sweep is reproducible end to end.
    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn RiskPolicy> {
        match self {
            Self::Cautious => Box::new(ThresholdPolicy {
                name: self.name(),
                stop_at: 1,
            }),
            Self::Steady => Box::new(ThresholdPolicy {
                name: self.name(),
                stop_at: 2,
            }),
            Self::Greedy => Box::new(ThresholdPolicy {
                name: self.name(),
                stop_at: 4,
            }),
            Self::Coinflip => Box::new(CoinflipPolicy {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
        }
    }
}

impl std::fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Push until a fixed bullet count, then bank. Never cashes out an empty
/// round; there is nothing to bank before the first safe chamber.
struct ThresholdPolicy {
    name: &'static str,
    stop_at: u32,
}

impl RiskPolicy for ThresholdPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decide(&mut self, snapshot: &RunSnapshot) -> RiskCall {
        if snapshot.bullet_count >= self.stop_at && snapshot.round_score > 0 {
            RiskCall::CashOut
        } else {
            RiskCall::OneMore
        }
    }
}

/// Random caller whose cash-out chance grows with the loaded chambers.
struct CoinflipPolicy {
    rng: ChaCha20Rng,
}

impl RiskPolicy for CoinflipPolicy {
    fn name(&self) -> &'static str {
        "coinflip"
    }

    fn decide(&mut self, snapshot: &RunSnapshot) -> RiskCall {
        if snapshot.round_score == 0 {
            return RiskCall::OneMore;
        }
        let cash_out_chance = (f64::from(snapshot.bullet_count) * 0.15).min(0.9);
        if self.rng.gen_bool(cash_out_chance) {
            RiskCall::CashOut
        } else {
            RiskCall::OneMore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bullet_count: u32, round_score: u32) -> RunSnapshot {
        RunSnapshot {
            bullet_count,
            round_score,
            ..RunSnapshot::default()
        }
    }

    #[test]
    fn threshold_policies_push_then_bank() {
        let mut cautious = GameplayStrategy::Cautious.create_policy(0);
        assert_eq!(cautious.decide(&snapshot(0, 0)), RiskCall::OneMore);
        assert_eq!(cautious.decide(&snapshot(1, 23)), RiskCall::CashOut);

        let mut greedy = GameplayStrategy::Greedy.create_policy(0);
        assert_eq!(greedy.decide(&snapshot(3, 170)), RiskCall::OneMore);
        assert_eq!(greedy.decide(&snapshot(4, 260)), RiskCall::CashOut);
    }

    #[test]
    fn threshold_policies_never_bank_an_empty_round() {
        // A death mid-round wipes the score; the policy keeps pushing.
        let mut steady = GameplayStrategy::Steady.create_policy(0);
        assert_eq!(steady.decide(&snapshot(2, 0)), RiskCall::OneMore);
    }

    #[test]
    fn coinflip_is_reproducible_per_seed() {
        let calls = |seed: u64| {
            let mut policy = GameplayStrategy::Coinflip.create_policy(seed);
            (0..16)
                .map(|_| policy.decide(&snapshot(2, 50)))
                .collect::<Vec<_>>()
        };
        assert_eq!(calls(9), calls(9));
    }

    #[test]
    fn coinflip_never_banks_an_empty_round() {
        let mut policy = GameplayStrategy::Coinflip.create_policy(5);
        for _ in 0..32 {
            assert_eq!(policy.decide(&snapshot(5, 0)), RiskCall::OneMore);
        }
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in GameplayStrategy::ALL {
            assert_eq!(GameplayStrategy::parse(strategy.name()), Some(strategy));
            assert_eq!(strategy.create_policy(0).name(), strategy.name());
        }
        assert!(GameplayStrategy::parse("reckless").is_none());
    }
}
