mod logic;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use onemore_game::GameSettings;

use logic::{GameplayStrategy, RunRecord, SimulationSession, aggregate_runs};

#[derive(Debug, Parser)]
#[command(name = "onemore-tester", version)]
#[command(about = "Headless QA sweeps for One More - plays full runs against the rules engine")]
struct Args {
    /// Strategies to sweep (comma-separated), or "all"
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Engine seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per strategy and seed
    #[arg(long, default_value_t = 10)]
    iterations: u64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    report: String,

    /// Optional path to a settings JSON overriding the built-in tuning
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Narrate every presentation beat
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("{}", "🎰 One More Headless Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());

    let settings = load_settings(args.settings.as_deref())?;
    let strategies = parse_strategies(&args.strategies)?;
    let seeds = parse_seeds(&args.seeds)?;

    let start_time = Instant::now();
    let session = SimulationSession::new(settings, args.verbose);
    let mut records: Vec<RunRecord> = Vec::new();
    for &strategy in &strategies {
        for &seed in &seeds {
            for iteration in 0..args.iterations {
                let run_seed = seed.wrapping_add(iteration);
                let record = session
                    .play(strategy, run_seed)
                    .await
                    .with_context(|| format!("strategy {strategy} seed {run_seed}"))?;
                records.push(record);
            }
        }
    }

    write_report(&args, &records, start_time)?;
    Ok(())
}

fn load_settings(path: Option<&std::path::Path>) -> Result<GameSettings> {
    let Some(path) = path else {
        return Ok(GameSettings::default_config());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let settings: GameSettings = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

fn parse_strategies(arg: &str) -> Result<Vec<GameplayStrategy>> {
    if arg.trim() == "all" {
        return Ok(GameplayStrategy::ALL.to_vec());
    }
    split_csv(arg)
        .iter()
        .map(|name| {
            GameplayStrategy::parse(name)
                .ok_or_else(|| anyhow::anyhow!("unknown strategy: {name}"))
        })
        .collect()
}

fn parse_seeds(arg: &str) -> Result<Vec<u64>> {
    split_csv(arg)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed: {token}"))
        })
        .collect()
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn write_report(args: &Args, records: &[RunRecord], start_time: Instant) -> Result<()> {
    let aggregates = aggregate_runs(records);
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, records, &aggregates)?;
        }
        _ => {
            logic::reports::generate_console_report(
                &mut output_target,
                &aggregates,
                start_time.elapsed(),
            )?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
