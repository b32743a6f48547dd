//! organ-rl: reward fine-tuning of a pretrained SMILES generator.
//!
//! Subcommands:
//!
//! - `train`   -- Fine-tune from the pretrained checkpoint and save the artifacts
//! - `score`   -- Score a CSV of generated SMILES with the rollout reward
//! - `vocab`   -- Build the character vocabulary from the training corpus
//! - `config`  -- Show the merged run configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use organ_rl::chem::HeuristicChemistry;
use organ_rl::config::OrganRlConfig;
use organ_rl::data::{read_smiles_csv, CharVocab};
use organ_rl::device::parse_device_id;
use organ_rl::pool::WorkerPool;
use organ_rl::reward::{GroupBreakdown, RewardAggregator};
use organ_rl::training::{DryRunTrainer, TrainingRun};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Reward fine-tuning of a pretrained SMILES generator.
#[derive(Parser)]
#[command(name = "organ-rl", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device selector: "cpu" or "cuda:<index>".
    #[arg(long, global = true)]
    device: Option<String>,

    /// CSV with a SMILES column used for training and reference sampling.
    #[arg(long, global = true)]
    train_load: Option<PathBuf>,

    /// Number of reference molecules sampled from the training data.
    #[arg(long, global = true)]
    n_ref: Option<usize>,

    /// Number of worker threads used by the metrics.
    #[arg(long, global = true)]
    n_jobs: Option<usize>,

    /// Rollouts per generated prefix.
    #[arg(long, global = true)]
    rollouts: Option<usize>,

    /// Seed for every random source of the run.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fine-tune from the pretrained checkpoint (dry-run trainer) and save
    /// model, config and vocabulary.
    Train,

    /// Score generated SMILES with the rollout reward.
    Score {
        /// CSV of generated molecules (SMILES column). Its length should be a
        /// multiple of the rollout count.
        #[arg(long)]
        generated: PathBuf,

        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build the character vocabulary from the training corpus.
    Vocab {
        /// Destination (defaults to the configured vocab path).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the configuration a `train` run would use.
    Config {
        /// Write the merged configuration here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ScoreReport {
    rollouts: usize,
    rewards: Vec<f64>,
    groups: Vec<GroupBreakdown>,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Train => cmd_train(config),
        Commands::Score { generated, output } => cmd_score(&config, &generated, output.as_deref()),
        Commands::Vocab { output } => cmd_vocab(&config, output.as_deref()),
        Commands::Config { output } => cmd_config(config, output.as_deref()),
    }
}

/// The config file (or defaults) with command-line options on top.
fn load_config(cli: &Cli) -> Result<OrganRlConfig> {
    let mut config = match &cli.config {
        Some(path) => OrganRlConfig::load_from_file(path)?,
        None => OrganRlConfig::default(),
    };

    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(path) = &cli.train_load {
        config.paths.train_load = path.clone();
    }
    if let Some(n_ref) = cli.n_ref {
        config.reward.n_ref = n_ref;
    }
    if let Some(n_jobs) = cli.n_jobs {
        config.reward.n_jobs = n_jobs;
    }
    if let Some(rollouts) = cli.rollouts {
        config.reward.rollouts = rollouts;
    }
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_train(config: OrganRlConfig) -> Result<()> {
    let run = TrainingRun::new(config);
    let mut trainer = DryRunTrainer::new();
    let summary = run.run(HeuristicChemistry::new(), &mut trainer)?;

    tracing::info!(
        iterations = summary.iterations,
        final_reward = format!("{:.4}", summary.final_reward),
        "Training finished"
    );
    Ok(())
}

fn cmd_score(config: &OrganRlConfig, generated: &Path, output: Option<&Path>) -> Result<()> {
    let corpus = read_smiles_csv(&config.paths.train_load)?;
    let batch = read_smiles_csv(generated)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.training.seed);
    let pool = Arc::new(WorkerPool::new(config.reward.n_jobs)?);
    let reward = RewardAggregator::build(
        HeuristicChemistry::new(),
        &corpus,
        config.reward.n_ref,
        config.reward.rollouts,
        pool,
        parse_device_id(&config.device)?,
        &mut rng,
    )?;

    let groups = reward.evaluate_detailed(&batch)?;
    let rewards = groups
        .iter()
        .flat_map(|g| std::iter::repeat(g.reward).take(config.reward.rollouts))
        .collect();
    let report = ScoreReport {
        rollouts: config.reward.rollouts,
        rewards,
        groups,
    };

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), groups = report.groups.len(), "Saved reward report");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_vocab(config: &OrganRlConfig, output: Option<&Path>) -> Result<()> {
    let corpus = read_smiles_csv(&config.paths.train_load)?;
    let vocab = CharVocab::from_data(&corpus);
    vocab.save_to_file(output.unwrap_or(config.paths.vocab_save.as_path()))
}

fn cmd_config(config: OrganRlConfig, output: Option<&Path>) -> Result<()> {
    let merged = TrainingRun::new(config).resolve_config()?;
    match output {
        Some(path) => merged.save_to_file(path),
        None => {
            println!("{}", serde_json::to_string_pretty(&merged)?);
            Ok(())
        }
    }
}
