//! Rollout reward for policy-gradient fine-tuning.
//!
//! - [`rollout`] -- interleaved partitioning of a generated batch into
//!   rollout groups.
//! - [`aggregator`] -- [`RewardAggregator`], which samples the reference set
//!   once and scores each rollout group with the seven chemistry metrics.
//!
//! The trainer only sees the [`SequenceReward`] trait.

pub mod aggregator;
pub mod rollout;

use anyhow::Result;

pub use aggregator::{nan_to_zero, GroupBreakdown, RewardAggregator, N_METRICS};
pub use rollout::{group_count, group_indices, rollout_group};

/// Maps a batch of generated sequences to one reward per grouped sequence.
pub trait SequenceReward {
    fn rewards(&self, batch: &[String]) -> Result<Vec<f64>>;
}

impl<F> SequenceReward for F
where
    F: Fn(&[String]) -> Result<Vec<f64>>,
{
    fn rewards(&self, batch: &[String]) -> Result<Vec<f64>> {
        self(batch)
    }
}
