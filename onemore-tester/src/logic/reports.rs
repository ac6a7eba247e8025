//! Report generation for simulation sweeps.
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::RunRecord;

/// Per-strategy rollup across every seed and iteration.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAggregate {
    pub strategy: GameplayStrategy,
    pub runs: usize,
    pub mean_total: f64,
    pub max_total: u32,
    pub mean_deaths: f64,
    pub bust_rate: f64,
}

/// Roll records up by strategy, in a stable order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate_runs(records: &[RunRecord]) -> Vec<StrategyAggregate> {
    let mut buckets: BTreeMap<&'static str, Vec<&RunRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.strategy.name()).or_default().push(record);
    }

    buckets
        .into_values()
        .map(|bucket| {
            let runs = bucket.len();
            let total_sum: u64 = bucket.iter().map(|r| u64::from(r.total_score)).sum();
            let death_sum: u64 = bucket.iter().map(|r| u64::from(r.dead_count)).sum();
            let busts = bucket.iter().filter(|r| r.busted).count();
            StrategyAggregate {
                strategy: bucket[0].strategy,
                runs,
                mean_total: total_sum as f64 / runs as f64,
                max_total: bucket.iter().map(|r| r.total_score).max().unwrap_or(0),
                mean_deaths: death_sum as f64 / runs as f64,
                bust_rate: busts as f64 / runs as f64,
            }
        })
        .collect()
}

/// Human-readable summary table.
///
/// # Errors
///
/// Propagates write failures on the output target.
pub fn generate_console_report(
    out: &mut dyn Write,
    aggregates: &[StrategyAggregate],
    total_duration: Duration,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Sweep Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "================".cyan())?;

    for agg in aggregates {
        writeln!(out, "{}", agg.strategy.name().bold())?;
        writeln!(out, "   Runs: {}", agg.runs)?;
        writeln!(
            out,
            "   Mean total: {:.1} (best {})",
            agg.mean_total,
            agg.max_total.to_string().green()
        )?;
        writeln!(
            out,
            "   Deaths/run: {:.2}, bust rate {}",
            agg.mean_deaths,
            format!("{:.1}%", agg.bust_rate * 100.0).red()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "🏁 Total time: {total_duration:?}")?;
    Ok(())
}

/// Machine-readable report: per-run records plus the aggregates.
///
/// # Errors
///
/// Propagates serialization and write failures.
pub fn generate_json_report(
    out: &mut dyn Write,
    records: &[RunRecord],
    aggregates: &[StrategyAggregate],
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Report<'a> {
        records: &'a [RunRecord],
        aggregates: &'a [StrategyAggregate],
    }
    serde_json::to_writer_pretty(
        &mut *out,
        &Report {
            records,
            aggregates,
        },
    )?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(strategy: GameplayStrategy, total: u32, deaths: u32, busted: bool) -> RunRecord {
        RunRecord {
            strategy,
            seed: 1,
            total_score: total,
            dead_count: deaths,
            rounds_played: 3,
            busted,
        }
    }

    #[test]
    fn aggregate_groups_by_strategy() {
        let records = vec![
            record(GameplayStrategy::Steady, 100, 0, false),
            record(GameplayStrategy::Steady, 300, 2, true),
            record(GameplayStrategy::Cautious, 50, 1, false),
        ];
        let aggregates = aggregate_runs(&records);
        assert_eq!(aggregates.len(), 2);

        let steady = aggregates
            .iter()
            .find(|a| a.strategy == GameplayStrategy::Steady)
            .expect("steady bucket");
        assert_eq!(steady.runs, 2);
        assert!((steady.mean_total - 200.0).abs() < f64::EPSILON);
        assert_eq!(steady.max_total, 300);
        assert!((steady.bust_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn console_report_lists_each_strategy() {
        let aggregates = aggregate_runs(&[record(GameplayStrategy::Greedy, 640, 1, false)]);
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &aggregates, Duration::from_millis(5)).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("greedy"));
        assert!(text.contains("Runs: 1"));
    }

    #[test]
    fn json_report_contains_records_and_aggregates() {
        let records = vec![record(GameplayStrategy::Coinflip, 42, 0, false)];
        let aggregates = aggregate_runs(&records);
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &records, &aggregates).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("valid json");
        assert_eq!(value["records"][0]["total_score"], 42);
        assert_eq!(value["aggregates"][0]["strategy"], "coinflip");
    }
}
