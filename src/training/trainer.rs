//! Generator trainer seam.
//!
//! The generator network and its adversarial training loop live outside this
//! crate. A trainer is handed the merged configuration, the vocabulary, the
//! corpus and the reward function, and owns its weights.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OrganRlConfig;
use crate::data::CharVocab;
use crate::reward::SequenceReward;

/// Everything a trainer sees during [`PolicyTrainer::fit`].
pub struct TrainingContext<'a> {
    pub config: &'a OrganRlConfig,
    pub vocab: &'a CharVocab,
    pub corpus: &'a [String],
    pub reward: &'a dyn SequenceReward,
}

/// Outcome of a policy-gradient run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    /// Mean reward over all iterations.
    pub mean_reward: f64,
    /// Mean reward of the last iteration.
    pub final_reward: f64,
}

/// A generator trainer driven by a sequence reward.
pub trait PolicyTrainer {
    /// Load pretrained weights.
    fn load_weights(&mut self, path: &Path) -> Result<()>;

    /// Run policy-gradient fine-tuning.
    fn fit(&mut self, ctx: &TrainingContext<'_>) -> Result<TrainingSummary>;

    /// Persist the fine-tuned weights.
    fn save_weights(&self, path: &Path) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Trainer without a generator: every iteration scores a batch drawn from
/// the corpus. Weights are passed through unchanged.
///
/// Useful to profile the reward on real data before wiring up a model.
#[derive(Debug, Default)]
pub struct DryRunTrainer {
    weights: Vec<u8>,
}

impl DryRunTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> &[u8] {
        &self.weights
    }
}

impl PolicyTrainer for DryRunTrainer {
    fn load_weights(&mut self, path: &Path) -> Result<()> {
        self.weights = std::fs::read(path)
            .with_context(|| format!("Failed to read model weights from {}", path.display()))?;
        info!(path = %path.display(), bytes = self.weights.len(), "Loaded model weights");
        Ok(())
    }

    fn fit(&mut self, ctx: &TrainingContext<'_>) -> Result<TrainingSummary> {
        if ctx.corpus.is_empty() {
            bail!("Cannot draw rollouts from an empty corpus");
        }

        let rollouts = ctx.config.reward.rollouts.max(1);
        let batch_len = (ctx.config.training.batch_size / rollouts).max(1) * rollouts;
        let iterations = ctx.config.training.pg_iters;
        let mut rng = ChaCha8Rng::seed_from_u64(ctx.config.training.seed);

        info!(iterations, batch_len, rollouts, "Starting dry-run policy gradient");

        let mut summary = TrainingSummary {
            iterations,
            ..TrainingSummary::default()
        };
        let mut reward_sum = 0.0;

        for iter in 0..iterations {
            let batch: Vec<String> = (0..batch_len)
                .filter_map(|_| ctx.corpus.choose(&mut rng).cloned())
                .collect();
            let rewards = ctx.reward.rewards(&batch)?;
            let mean = if rewards.is_empty() {
                0.0
            } else {
                rewards.iter().sum::<f64>() / rewards.len() as f64
            };

            debug!(iter, mean_reward = mean, "Dry-run iteration");
            reward_sum += mean;
            summary.final_reward = mean;
        }

        if iterations > 0 {
            summary.mean_reward = reward_sum / iterations as f64;
        }

        info!(
            iterations,
            mean_reward = summary.mean_reward,
            final_reward = summary.final_reward,
            "Dry-run policy gradient finished"
        );
        Ok(summary)
    }

    fn save_weights(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.weights)
            .with_context(|| format!("Failed to write model weights to {}", path.display()))?;
        info!(path = %path.display(), bytes = self.weights.len(), "Saved model weights");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pg_iters: usize) -> OrganRlConfig {
        let mut config = OrganRlConfig::default();
        config.reward.rollouts = 2;
        config.training.batch_size = 5;
        config.training.pg_iters = pg_iters;
        config
    }

    #[test]
    fn test_fit_scores_every_iteration() {
        let corpus = vec!["CCO".to_string(), "CCN".to_string()];
        let vocab = CharVocab::from_data(&corpus);
        let config = config(3);
        let calls = std::cell::Cell::new(0usize);
        let reward = |batch: &[String]| -> Result<Vec<f64>> {
            calls.set(calls.get() + 1);
            assert_eq!(batch.len(), 4);
            Ok(vec![0.5; batch.len()])
        };

        let ctx = TrainingContext {
            config: &config,
            vocab: &vocab,
            corpus: &corpus,
            reward: &reward,
        };
        let summary = DryRunTrainer::new().fit(&ctx).unwrap();

        assert_eq!(calls.get(), 3);
        assert_eq!(summary.iterations, 3);
        assert!((summary.mean_reward - 0.5).abs() < 1e-12);
        assert!((summary.final_reward - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fit_rejects_empty_corpus() {
        let vocab = CharVocab::from_data::<String>(&[]);
        let config = config(1);
        let reward = |batch: &[String]| -> Result<Vec<f64>> { Ok(vec![0.0; batch.len()]) };
        let ctx = TrainingContext {
            config: &config,
            vocab: &vocab,
            corpus: &[],
            reward: &reward,
        };
        assert!(DryRunTrainer::new().fit(&ctx).is_err());
    }

    #[test]
    fn test_weights_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("pmodel.pt");
        let dst = dir.path().join("out").join("model.pt");
        std::fs::write(&src, [1u8, 2, 3]).unwrap();

        let mut trainer = DryRunTrainer::new();
        trainer.load_weights(&src).unwrap();
        trainer.save_weights(&dst).unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), vec![1, 2, 3]);
    }
}
