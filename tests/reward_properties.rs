//! Property tests for the rollout reward invariants.

mod common;

use common::{aggregator, MetricValues};
use proptest::prelude::*;

/// Batches mixing valid and invalid (`!`-prefixed) sequences.
fn batch_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,6}",
            "![a-z]{0,5}",
        ],
        0..48,
    )
}

proptest! {
    /// Property: the output holds exactly `len / rollouts * rollouts` rewards.
    #[test]
    fn reward_length_matches_grouped_positions(batch in batch_strategy(), rollouts in 1usize..8) {
        let agg = aggregator(MetricValues::constant(0.5), rollouts);
        let rewards = agg.evaluate(&batch).unwrap();
        prop_assert_eq!(rewards.len(), batch.len() / rollouts * rollouts);
    }

    /// Property: every rollout of a group carries the same reward.
    #[test]
    fn rollouts_share_group_reward(batch in batch_strategy(), rollouts in 1usize..8) {
        let agg = aggregator(MetricValues::constant(0.5), rollouts);
        let rewards = agg.evaluate(&batch).unwrap();
        for block in rewards.chunks(rollouts) {
            prop_assert!(block.iter().all(|r| *r == block[0]));
        }
    }

    /// Property: rewards stay in [0, 1] and are never NaN, even when the
    /// diversity and Morgan metrics return NaN.
    #[test]
    fn rewards_bounded_and_finite(batch in batch_strategy(), rollouts in 1usize..8, value in 0.0f64..=1.0) {
        let values = MetricValues {
            diversity: f64::NAN,
            morgan: f64::NAN,
            ..MetricValues::constant(value)
        };
        let agg = aggregator(values, rollouts);
        for r in agg.evaluate(&batch).unwrap() {
            prop_assert!(!r.is_nan());
            prop_assert!((0.0..=1.0).contains(&r), "reward {} out of range", r);
        }
    }

    /// Property: a group whose members are all invalid scores exactly 0.
    #[test]
    fn invalid_groups_score_zero(n_groups in 1usize..6, rollouts in 1usize..6) {
        let batch: Vec<String> = (0..n_groups * rollouts).map(|i| format!("!{i}")).collect();
        let agg = aggregator(MetricValues::constant(1.0), rollouts);
        let rewards = agg.evaluate(&batch).unwrap();
        prop_assert!(rewards.iter().all(|r| *r == 0.0));
    }
}
