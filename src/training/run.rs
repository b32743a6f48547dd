//! End-to-end fine-tuning run.
//!
//! ```text
//! 1. Seed the run RNG
//! 2. Read the SMILES corpus
//! 3. Merge the pretrained checkpoint config with the CLI config and overrides
//! 4. Load the pretrained vocabulary (or build one from the corpus)
//! 5. Create the metric worker pool and build the rollout reward
//! 6. Load pretrained weights, fine-tune, release the pool
//! 7. Save weights, config and vocabulary
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use super::trainer::{PolicyTrainer, TrainingContext, TrainingSummary};
use crate::chem::MetricSuite;
use crate::config::{OrganRlConfig, TrainingOverrides};
use crate::data::{read_smiles_csv, CharVocab};
use crate::device::parse_device_id;
use crate::pool::WorkerPool;
use crate::reward::RewardAggregator;

/// Orchestrates one fine-tuning run from a CLI-level configuration.
pub struct TrainingRun {
    cli: OrganRlConfig,
    overrides: TrainingOverrides,
}

impl TrainingRun {
    pub fn new(cli: OrganRlConfig) -> Self {
        Self {
            cli,
            overrides: TrainingOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: TrainingOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// The immutable configuration of the run: the pretrained checkpoint's
    /// config merged with the CLI config and the overrides.
    pub fn resolve_config(&self) -> Result<OrganRlConfig> {
        let path = self.cli.pretrained_config_path();
        let checkpoint = OrganRlConfig::load_from_file(&path)
            .with_context(|| format!("Failed to load pretrained config {}", path.display()))?;
        Ok(OrganRlConfig::merge_checkpoint(
            &self.cli,
            &checkpoint,
            &self.overrides,
        ))
    }

    /// The pretrained vocabulary, or one built from `corpus` when the
    /// checkpoint has none.
    pub fn load_vocab(&self, corpus: &[String]) -> Result<CharVocab> {
        let path = self.cli.pretrained_vocab_path();
        if path.exists() {
            return CharVocab::load_from_file(&path);
        }
        warn!(path = %path.display(), "No pretrained vocabulary, building one from the corpus");
        Ok(CharVocab::from_data(corpus))
    }

    /// Execute the run and persist every artifact.
    pub fn run<C, T>(&self, chemistry: C, trainer: &mut T) -> Result<TrainingSummary>
    where
        C: MetricSuite,
        T: PolicyTrainer,
    {
        info!(seed = self.cli.training.seed, "Starting ORGAN reward fine-tuning");
        let mut rng = ChaCha8Rng::seed_from_u64(self.cli.training.seed);

        let corpus = read_smiles_csv(&self.cli.paths.train_load)?;
        let config = self.resolve_config()?;
        let vocab = self.load_vocab(&corpus)?;
        let device = parse_device_id(&config.device)?;

        let summary = {
            let pool = Arc::new(WorkerPool::new(config.reward.n_jobs)?);
            let reward = RewardAggregator::build(
                chemistry,
                &corpus,
                config.reward.n_ref,
                config.reward.rollouts,
                Arc::clone(&pool),
                device,
                &mut rng,
            )?;

            trainer.load_weights(&config.pretrained_model_path())?;
            trainer.fit(&TrainingContext {
                config: &config,
                vocab: &vocab,
                corpus: &corpus,
                reward: &reward,
            })?
        };

        trainer.save_weights(&config.paths.model_save)?;
        config.save_to_file(&config.paths.config_save)?;
        vocab.save_to_file(&config.paths.vocab_save)?;

        info!(
            iterations = summary.iterations,
            mean_reward = summary.mean_reward,
            "Fine-tuning run finished"
        );
        Ok(summary)
    }
}
