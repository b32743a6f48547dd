use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File names of the pretrained checkpoint, resolved against
/// [`PathsConfig::checkpoint_dir`].
pub const PRETRAINED_CONFIG_FILE: &str = "pconfig.json";
pub const PRETRAINED_VOCAB_FILE: &str = "pvocab.json";
pub const PRETRAINED_MODEL_FILE: &str = "pmodel.pt";

/// Complete configuration for an ORGAN reward fine-tuning run.
///
/// A run configuration is assembled once (see [`OrganRlConfig::merge_checkpoint`])
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganRlConfig {
    /// Device selector, `"cpu"` or `"cuda:<index>"`.
    pub device: String,
    pub reward: RewardConfig,
    pub training: TrainingConfig,
    pub paths: PathsConfig,
    /// Generator hyperparameters, passed through untouched to the trainer.
    pub model: serde_json::Map<String, serde_json::Value>,
}

/// Options of the rollout reward function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Number of reference molecules sampled from the training data (default: 500).
    pub n_ref: usize,
    /// Number of worker threads used by the metrics (default: 1).
    pub n_jobs: usize,
    /// Rollouts per generated prefix; every rollout group shares one reward (default: 16).
    pub rollouts: usize,
}

/// Policy-gradient schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for every random source of the run (default: 0).
    pub seed: u64,
    /// Sequences generated per policy-gradient iteration (default: 64).
    pub batch_size: usize,
    pub generator_pretrain_epochs: usize,
    pub discriminator_pretrain_epochs: usize,
    pub pg_iters: usize,
    pub discriminator_updates: usize,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// CSV with a `SMILES` column.
    pub train_load: PathBuf,
    pub model_save: PathBuf,
    pub config_save: PathBuf,
    pub vocab_save: PathBuf,
    /// Directory holding `pconfig.json`, `pvocab.json` and `pmodel.pt`.
    pub checkpoint_dir: PathBuf,
}

/// Fields forced on top of the pretrained checkpoint: pretraining is skipped
/// and the adversarial phase gets its own schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOverrides {
    pub generator_pretrain_epochs: usize,
    pub discriminator_pretrain_epochs: usize,
    pub pg_iters: usize,
    pub discriminator_updates: usize,
}

impl Default for OrganRlConfig {
    fn default() -> Self {
        Self {
            device: "cpu".into(),
            reward: RewardConfig::default(),
            training: TrainingConfig::default(),
            paths: PathsConfig::default(),
            model: serde_json::Map::new(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            n_ref: 500,
            n_jobs: 1,
            rollouts: 16,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            batch_size: 64,
            generator_pretrain_epochs: 50,
            discriminator_pretrain_epochs: 50,
            pg_iters: 1000,
            discriminator_updates: 1,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            train_load: "data/train.csv".into(),
            model_save: "model.pt".into(),
            config_save: "config.json".into(),
            vocab_save: "vocab.json".into(),
            checkpoint_dir: ".".into(),
        }
    }
}

impl Default for TrainingOverrides {
    fn default() -> Self {
        Self {
            generator_pretrain_epochs: 0,
            discriminator_pretrain_epochs: 0,
            pg_iters: 1000,
            discriminator_updates: 500,
        }
    }
}

impl OrganRlConfig {
    /// Assemble the run configuration from three sources.
    ///
    /// - `cli`: device, reward options, seed, batch size and paths.
    /// - `checkpoint`: the pretrained generator's hyperparameters (`model`).
    /// - `overrides`: the pretraining/adversarial schedule.
    pub fn merge_checkpoint(
        cli: &OrganRlConfig,
        checkpoint: &OrganRlConfig,
        overrides: &TrainingOverrides,
    ) -> Self {
        Self {
            device: cli.device.clone(),
            reward: cli.reward.clone(),
            training: TrainingConfig {
                seed: cli.training.seed,
                batch_size: cli.training.batch_size,
                generator_pretrain_epochs: overrides.generator_pretrain_epochs,
                discriminator_pretrain_epochs: overrides.discriminator_pretrain_epochs,
                pg_iters: overrides.pg_iters,
                discriminator_updates: overrides.discriminator_updates,
            },
            paths: cli.paths.clone(),
            model: checkpoint.model.clone(),
        }
    }

    pub fn pretrained_config_path(&self) -> PathBuf {
        self.paths.checkpoint_dir.join(PRETRAINED_CONFIG_FILE)
    }

    pub fn pretrained_vocab_path(&self) -> PathBuf {
        self.paths.checkpoint_dir.join(PRETRAINED_VOCAB_FILE)
    }

    pub fn pretrained_model_path(&self) -> PathBuf {
        self.paths.checkpoint_dir.join(PRETRAINED_MODEL_FILE)
    }

    /// Read a configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {}", path.as_ref().display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.as_ref().display()))
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Saved run configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint() -> OrganRlConfig {
        let mut model = serde_json::Map::new();
        model.insert("hidden".into(), serde_json::json!(512));
        OrganRlConfig {
            device: "cuda:1".into(),
            reward: RewardConfig {
                n_ref: 7,
                n_jobs: 9,
                rollouts: 3,
            },
            training: TrainingConfig {
                seed: 99,
                batch_size: 8,
                generator_pretrain_epochs: 50,
                discriminator_pretrain_epochs: 50,
                pg_iters: 10,
                discriminator_updates: 1,
            },
            paths: PathsConfig {
                model_save: "pretrain_model.pt".into(),
                ..PathsConfig::default()
            },
            model,
        }
    }

    #[test]
    fn test_merge_keeps_cli_fields() {
        let cli = OrganRlConfig {
            device: "cpu".into(),
            ..OrganRlConfig::default()
        };
        let merged =
            OrganRlConfig::merge_checkpoint(&cli, &checkpoint(), &TrainingOverrides::default());

        assert_eq!(merged.device, "cpu");
        assert_eq!(merged.reward, cli.reward);
        assert_eq!(merged.paths, cli.paths);
        assert_eq!(merged.training.seed, cli.training.seed);
        assert_eq!(merged.model["hidden"], serde_json::json!(512));
    }

    #[test]
    fn test_merge_applies_overrides() {
        let merged = OrganRlConfig::merge_checkpoint(
            &OrganRlConfig::default(),
            &checkpoint(),
            &TrainingOverrides::default(),
        );

        assert_eq!(merged.training.generator_pretrain_epochs, 0);
        assert_eq!(merged.training.discriminator_pretrain_epochs, 0);
        assert_eq!(merged.training.pg_iters, 1000);
        assert_eq!(merged.training.discriminator_updates, 500);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OrganRlConfig =
            serde_json::from_str(r#"{"reward": {"rollouts": 4}}"#).unwrap();
        assert_eq!(config.reward.rollouts, 4);
        assert_eq!(config.reward.n_ref, 500);
        assert_eq!(config.device, "cpu");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = checkpoint();
        config.save_to_file(&path).unwrap();
        let loaded = OrganRlConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_pretrained_paths() {
        let config = OrganRlConfig {
            paths: PathsConfig {
                checkpoint_dir: "ckpt".into(),
                ..PathsConfig::default()
            },
            ..OrganRlConfig::default()
        };
        assert_eq!(config.pretrained_config_path(), Path::new("ckpt/pconfig.json"));
        assert_eq!(config.pretrained_vocab_path(), Path::new("ckpt/pvocab.json"));
        assert_eq!(config.pretrained_model_path(), Path::new("ckpt/pmodel.pt"));
    }
}
