//! Chemistry capability traits.
//!
//! The reward function never touches molecules directly: validity checks,
//! canonicalization, parsing and the seven metrics are all reached through
//! [`Chemistry`] and [`MetricSuite`], so a real cheminformatics backend, the
//! built-in heuristic backend, or a test double can be plugged in.

use std::collections::HashSet;

use anyhow::Result;

use crate::pool::WorkerPool;

/// Validity, canonicalization and parsing of generated sequences.
pub trait Chemistry: Send + Sync {
    /// Parsed representation of a valid molecule.
    type Structure: Send + Sync;

    /// Whether the sequence decodes to a valid molecule.
    fn is_valid(&self, smiles: &str) -> bool {
        self.canonicalize(smiles).is_some()
    }

    /// Canonical form of a valid sequence, `None` if it is invalid.
    fn canonicalize(&self, smiles: &str) -> Option<String>;

    /// Parse a canonical sequence into a [`Chemistry::Structure`].
    fn parse(&self, smiles: &str) -> Result<Self::Structure>;
}

/// The seven metrics combined by the rollout reward.
///
/// Every metric receives the shared [`WorkerPool`] and may parallelise its
/// own work on it. Similarity metrics compare a generated set against the
/// reference set; both are given as parsed structures.
pub trait MetricSuite: Chemistry {
    /// Fraction of `gen` that is valid.
    fn fraction_valid(&self, gen: &[String], pool: &WorkerPool) -> Result<f64> {
        if gen.is_empty() {
            return Ok(0.0);
        }
        let valid = pool
            .map(gen, |s| self.is_valid(s))
            .into_iter()
            .filter(|&v| v)
            .count();
        Ok(valid as f64 / gen.len() as f64)
    }

    /// Fraction of distinct sequences in an already canonical set.
    fn fraction_unique(&self, gen: &[String], _pool: &WorkerPool) -> Result<f64> {
        if gen.is_empty() {
            return Ok(0.0);
        }
        let distinct: HashSet<&str> = gen.iter().map(String::as_str).collect();
        Ok(distinct.len() as f64 / gen.len() as f64)
    }

    /// Similarity of the scaffold distributions of `reference` and `gen`.
    fn scaffold_similarity(
        &self,
        reference: &[Self::Structure],
        gen: &[Self::Structure],
        pool: &WorkerPool,
    ) -> Result<f64>;

    /// Similarity of the fragment distributions of `reference` and `gen`.
    fn fragment_similarity(
        &self,
        reference: &[Self::Structure],
        gen: &[Self::Structure],
        pool: &WorkerPool,
    ) -> Result<f64>;

    /// Internal diversity of `gen`. May be NaN for degenerate inputs.
    fn internal_diversity(&self, gen: &[Self::Structure], pool: &WorkerPool) -> Result<f64>;

    /// Nearest-neighbour fingerprint similarity of `gen` to `reference`.
    ///
    /// `device` is a device id as returned by
    /// [`parse_device_id`](crate::device::parse_device_id). May be NaN.
    fn morgan_similarity(
        &self,
        reference: &[Self::Structure],
        gen: &[Self::Structure],
        pool: &WorkerPool,
        device: i32,
    ) -> Result<f64>;

    /// Fraction of `gen` passing the structural filter set.
    fn fraction_passes_filters(&self, gen: &[Self::Structure], pool: &WorkerPool)
        -> Result<f64>;
}

/// Canonicalize `seqs` on the pool and keep only the valid ones, in order.
pub fn remove_invalid<C: Chemistry + ?Sized>(
    chemistry: &C,
    seqs: &[String],
    pool: &WorkerPool,
) -> Vec<String> {
    pool.map(seqs, |s| chemistry.canonicalize(s))
        .into_iter()
        .flatten()
        .collect()
}

/// Parse every sequence in `seqs` on the pool.
pub fn parse_all<C: Chemistry + ?Sized>(
    chemistry: &C,
    seqs: &[String],
    pool: &WorkerPool,
) -> Result<Vec<C::Structure>> {
    pool.try_map(seqs, |s| chemistry.parse(s))
}
