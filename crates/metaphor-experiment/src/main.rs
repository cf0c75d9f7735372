//! Metaphor Experiment CLI.
//!
//! Commands:
//! - run: Run one participant session in the terminal
//! - sequence: Print the main-block order a seed produces, without running it

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use metaphor_experiment::console::ConsolePresenter;
use metaphor_experiment::data_log::DataLog;
use metaphor_experiment::experiment::{Experiment, main_order};
use metaphor_experiment::results::timestamped_path;
use metaphor_experiment::stimuli::{load_stimuli, practice_stimuli};
use reading_kernel::{ExperimentConfig, ScoringRule, SequenceReport};

#[derive(Parser)]
#[command(name = "metaphor-experiment")]
#[command(version)]
#[command(about = "Word-by-word metaphor comprehension experiment")]
struct Cli {
    /// Experiment config (JSON); defaults are used for missing fields
    #[arg(long, env = "METAPHOR_CONFIG")]
    config: Option<PathBuf>,

    /// Random seed for key mapping, trial order and jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum fillers between members of a pair
    #[arg(long)]
    buffer_min: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a participant session
    Run {
        /// Stimulus file (.csv or .json)
        #[arg(long, env = "METAPHOR_STIMULI")]
        stimuli: PathBuf,

        /// Data log to append to
        #[arg(long, env = "METAPHOR_DATA", default_value = "experiment_data.csv")]
        data: PathBuf,

        /// Skip the practice block
        #[arg(long)]
        no_practice: bool,

        /// Scoring rule: legacy, normalized_type, condition
        #[arg(long)]
        scoring: Option<String>,

        /// Save a session summary (a timestamp is added to the file name)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Print the main-block order and pair spacing for a stimulus file
    Sequence {
        /// Stimulus file (.csv or .json)
        #[arg(long, env = "METAPHOR_STIMULI")]
        stimuli: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Participant screens go to stdout, so logs stay on stderr
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(buffer_min) = cli.buffer_min {
        config.sequencer.buffer_min = buffer_min;
    }

    match cli.command {
        Commands::Run {
            stimuli,
            data,
            no_practice,
            scoring,
            summary,
        } => {
            if no_practice {
                config.practice = false;
            }
            if let Some(rule) = scoring {
                config.scoring = rule.parse::<ScoringRule>()?;
            }
            config.validate()?;

            let main_stimuli = load_stimuli(&stimuli)?;
            let log = DataLog::open(&data)?;
            info!(
                stimuli = %stimuli.display(),
                data = %log.path().display(),
                scoring = config.scoring.name(),
                "Starting experiment"
            );

            let mut experiment = Experiment::new(config, ConsolePresenter::stdio(), log);
            info!(seed = experiment.seed(), "Seed (pass --seed to reproduce)");

            let run = experiment.run(&practice_stimuli(), main_stimuli).await?;

            if let Some(path) = summary {
                let output_path = timestamped_path(&path);
                run.summary
                    .save(&output_path)
                    .with_context(|| format!("saving summary {}", output_path.display()))?;
                info!(path = %output_path.display(), "Summary saved");
            }
        }

        Commands::Sequence { stimuli } => {
            config.validate()?;
            let seed = config.seed.unwrap_or_else(rand::random);
            let ordered = main_order(&config, seed, load_stimuli(&stimuli)?, &practice_stimuli());
            let report = SequenceReport::from_order(&ordered);

            println!("\n=== Main Block Order (seed {}) ===", seed);
            println!("  {:>4} {:<24} {:<12} Stimulus", "#", "Type", "Condition");
            for (i, record) in ordered.iter().enumerate() {
                println!(
                    "  {:>4} {:<24} {:<12} {}",
                    i + 1,
                    record.stimulus_type,
                    record.condition,
                    record.stimulus
                );
            }

            println!("\nSpacing:");
            println!("  Trials: {}", report.total);
            println!("  Fillers: {}", report.fillers);
            println!("  Single-member keys: {}", report.singles);
            for pair in &report.pairs {
                println!(
                    "  '{}' at {:?}, gaps {:?}",
                    pair.key,
                    pair.positions.iter().map(|p| p + 1).collect::<Vec<_>>(),
                    pair.gaps
                );
            }
            let buffer_min = config.sequencer.buffer_min;
            let short = report.short_pairs(buffer_min);
            if !short.is_empty() {
                println!("  {} pair(s) closer than {} fillers", short.len(), buffer_min);
            }
        }
    }

    Ok(())
}
