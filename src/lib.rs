//! ORGAN reward fine-tuning.
//!
//! Builds the composite chemistry reward used to fine-tune a pretrained
//! SMILES generator with policy gradients: generated batches are split into
//! rollout groups, each group is scored with seven validity, uniqueness,
//! similarity and filter metrics against a fixed reference sample, and every
//! member of a group receives the group's reward.

pub mod chem;
pub mod config;
pub mod data;
pub mod device;
pub mod pool;
pub mod reward;
pub mod training;
