//! Rollout group partitioning.
//!
//! A generated batch of `N` sequences holds `R` rollouts for each of
//! `nb = N / R` prefixes, interleaved: group `i` is positions
//! `i, i + nb, ..., i + (R - 1) * nb`. Positions at or past `nb * R` belong to
//! no group.

/// Number of rollout groups in a batch of `batch_len` sequences.
pub fn group_count(batch_len: usize, rollouts: usize) -> usize {
    if rollouts == 0 {
        return 0;
    }
    batch_len / rollouts
}

/// Batch positions of group `index` out of `n_groups`.
pub fn group_indices(index: usize, n_groups: usize, rollouts: usize) -> Vec<usize> {
    (0..rollouts).map(|k| index + k * n_groups).collect()
}

/// Clone the members of group `index` out of `batch`.
pub fn rollout_group<T: Clone>(batch: &[T], index: usize, rollouts: usize) -> Vec<T> {
    let n_groups = group_count(batch.len(), rollouts);
    group_indices(index, n_groups, rollouts)
        .into_iter()
        .map(|i| batch[i].clone())
        .collect()
}
