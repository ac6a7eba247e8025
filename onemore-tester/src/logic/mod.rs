pub mod policy;
pub mod reports;
pub mod simulation;

pub use policy::{GameplayStrategy, RiskCall};
pub use reports::{StrategyAggregate, aggregate_runs};
pub use simulation::{RunRecord, SimulationSession};
