//! Composite rollout reward.
//!
//! For every rollout group the aggregator sums up to seven metric terms and
//! divides by seven:
//!
//! ```text
//! validity                                   (always)
//! + uniqueness + scaffold + fragment
//! + diversity + morgan                       (more than one valid sequence)
//! + filters                                  (at least one valid sequence)
//! ─────────────────────────────────────────
//!                     7
//! ```
//!
//! Diversity and Morgan similarity can be NaN for degenerate sets; they are
//! counted as 0. Every member of a group receives the group's reward.

use std::sync::Arc;

use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::rollout::{group_count, rollout_group};
use super::SequenceReward;
use crate::chem::{parse_all, remove_invalid, MetricSuite};
use crate::pool::WorkerPool;

/// Fixed normalizer: the number of metric terms a group can contribute.
pub const N_METRICS: f64 = 7.0;

/// Replace NaN with 0.
pub fn nan_to_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Per-group breakdown
// ---------------------------------------------------------------------------

/// Every term computed for one rollout group. Terms that were skipped are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBreakdown {
    /// Group index within the batch.
    pub group: usize,
    /// Number of valid (canonicalized) sequences in the group.
    pub n_valid: usize,
    pub validity: f64,
    pub uniqueness: Option<f64>,
    pub scaffold_similarity: Option<f64>,
    pub fragment_similarity: Option<f64>,
    pub internal_diversity: Option<f64>,
    pub morgan_similarity: Option<f64>,
    pub filters: Option<f64>,
    /// Sum of the computed terms divided by [`N_METRICS`].
    pub reward: f64,
}

impl GroupBreakdown {
    /// Sum of every computed term.
    pub fn total(&self) -> f64 {
        self.validity
            + [
                self.uniqueness,
                self.scaffold_similarity,
                self.fragment_similarity,
                self.internal_diversity,
                self.morgan_similarity,
                self.filters,
            ]
            .iter()
            .flatten()
            .sum::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Reward function state: the reference set and everything a metric call needs.
///
/// The reference structures are sampled and parsed once in
/// [`RewardAggregator::build`] and shared by every evaluation.
pub struct RewardAggregator<C: MetricSuite> {
    chemistry: C,
    reference: Vec<C::Structure>,
    pool: Arc<WorkerPool>,
    rollouts: usize,
    device: i32,
}

impl<C: MetricSuite> RewardAggregator<C> {
    /// Build an aggregator from already parsed reference structures.
    pub fn new(
        chemistry: C,
        reference: Vec<C::Structure>,
        rollouts: usize,
        pool: Arc<WorkerPool>,
        device: i32,
    ) -> Result<Self> {
        if rollouts == 0 {
            bail!("Rollout count must be positive");
        }
        Ok(Self {
            chemistry,
            reference,
            pool,
            rollouts,
            device,
        })
    }

    /// Sample `n_ref` reference molecules from `corpus` without replacement,
    /// keep the valid ones in canonical form, and parse them.
    pub fn build<R: Rng + ?Sized>(
        chemistry: C,
        corpus: &[String],
        n_ref: usize,
        rollouts: usize,
        pool: Arc<WorkerPool>,
        device: i32,
        rng: &mut R,
    ) -> Result<Self> {
        if n_ref > corpus.len() {
            bail!(
                "Cannot sample {n_ref} reference molecules from a corpus of {}",
                corpus.len()
            );
        }

        let sample: Vec<String> = rand::seq::index::sample(rng, corpus.len(), n_ref)
            .into_iter()
            .map(|i| corpus[i].clone())
            .collect();

        let canonical = remove_invalid(&chemistry, &sample, &pool);
        if canonical.len() < sample.len() {
            warn!(
                sampled = sample.len(),
                valid = canonical.len(),
                "Dropped invalid reference molecules"
            );
        }
        let reference = parse_all(&chemistry, &canonical, &pool)?;

        info!(
            n_ref,
            reference = reference.len(),
            rollouts,
            device,
            "Built rollout reward"
        );

        Self::new(chemistry, reference, rollouts, pool, device)
    }

    pub fn chemistry(&self) -> &C {
        &self.chemistry
    }

    pub fn reference(&self) -> &[C::Structure] {
        &self.reference
    }

    pub fn rollouts(&self) -> usize {
        self.rollouts
    }

    pub fn device(&self) -> i32 {
        self.device
    }

    /// One reward per grouped sequence, `len(batch) / rollouts * rollouts` in total.
    ///
    /// Output position `i * rollouts + k` carries the reward of group `i`.
    pub fn evaluate(&self, batch: &[String]) -> Result<Vec<f64>> {
        let breakdowns = self.evaluate_detailed(batch)?;

        let rewards: Vec<f64> = breakdowns
            .iter()
            .flat_map(|b| std::iter::repeat(b.reward).take(self.rollouts))
            .collect();

        let mean = if breakdowns.is_empty() {
            0.0
        } else {
            breakdowns.iter().map(|b| b.reward).sum::<f64>() / breakdowns.len() as f64
        };
        debug!(groups = breakdowns.len(), mean_reward = mean, "Evaluated batch");

        Ok(rewards)
    }

    /// Per-group breakdown of the reward, in group-index order.
    pub fn evaluate_detailed(&self, batch: &[String]) -> Result<Vec<GroupBreakdown>> {
        let n_groups = group_count(batch.len(), self.rollouts);
        if n_groups * self.rollouts != batch.len() {
            warn!(
                batch = batch.len(),
                rollouts = self.rollouts,
                dropped = batch.len() - n_groups * self.rollouts,
                "Batch size is not a multiple of the rollout count"
            );
        }

        (0..n_groups)
            .map(|i| self.score_group(i, &rollout_group(batch, i, self.rollouts)))
            .collect()
    }

    fn score_group(&self, index: usize, group: &[String]) -> Result<GroupBreakdown> {
        let chem = &self.chemistry;
        let pool = self.pool.as_ref();

        let mut breakdown = GroupBreakdown {
            group: index,
            validity: chem.fraction_valid(group, pool)?,
            ..GroupBreakdown::default()
        };

        if breakdown.validity > 0.0 {
            let valid = remove_invalid(chem, group, pool);
            let mols = parse_all(chem, &valid, pool)?;
            breakdown.n_valid = valid.len();

            if valid.len() > 1 {
                breakdown.uniqueness = Some(chem.fraction_unique(&valid, pool)?);
                breakdown.scaffold_similarity =
                    Some(chem.scaffold_similarity(&self.reference, &mols, pool)?);
                breakdown.fragment_similarity =
                    Some(chem.fragment_similarity(&self.reference, &mols, pool)?);
                breakdown.internal_diversity =
                    Some(nan_to_zero(chem.internal_diversity(&mols, pool)?));
                breakdown.morgan_similarity = Some(nan_to_zero(chem.morgan_similarity(
                    &self.reference,
                    &mols,
                    pool,
                    self.device,
                )?));
            }

            breakdown.filters = Some(chem.fraction_passes_filters(&mols, pool)?);
        }

        breakdown.reward = breakdown.total() / N_METRICS;

        debug!(
            group = index,
            n_valid = breakdown.n_valid,
            validity = breakdown.validity,
            reward = breakdown.reward,
            "Scored rollout group"
        );

        Ok(breakdown)
    }
}

impl<C: MetricSuite> SequenceReward for RewardAggregator<C> {
    fn rewards(&self, batch: &[String]) -> Result<Vec<f64>> {
        self.evaluate(batch)
    }
}

impl<C: MetricSuite> std::fmt::Debug for RewardAggregator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardAggregator")
            .field("reference", &self.reference.len())
            .field("rollouts", &self.rollouts)
            .field("device", &self.device)
            .field("pool", &self.pool)
            .finish()
    }
}
