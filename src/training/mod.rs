//! Fine-tuning orchestration.
//!
//! - [`trainer`] -- the [`PolicyTrainer`] seam to the external generator
//!   trainer, and [`DryRunTrainer`], which exercises the reward on corpus
//!   batches without a model.
//! - [`run`] -- [`TrainingRun`], which assembles config, vocabulary, worker
//!   pool and reward, drives the trainer, and saves the artifacts.

pub mod run;
pub mod trainer;

pub use run::TrainingRun;
pub use trainer::{DryRunTrainer, PolicyTrainer, TrainingContext, TrainingSummary};
