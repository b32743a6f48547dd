//! Test double for the chemistry collaborators.
//!
//! A sequence is valid unless it starts with `!`. Every metric returns a
//! configured constant and records that it was called.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use organ_rl::chem::{Chemistry, MetricSuite};
use organ_rl::pool::WorkerPool;
use organ_rl::reward::RewardAggregator;

#[derive(Debug, Clone, Copy)]
pub struct MetricValues {
    pub uniqueness: f64,
    pub scaffold: f64,
    pub fragment: f64,
    pub diversity: f64,
    pub morgan: f64,
    pub filters: f64,
}

impl MetricValues {
    pub fn constant(value: f64) -> Self {
        Self {
            uniqueness: value,
            scaffold: value,
            fragment: value,
            diversity: value,
            morgan: value,
            filters: value,
        }
    }
}

pub struct MockChemistry {
    pub values: MetricValues,
    pub fail_scaffold: bool,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_device: AtomicI32,
}

impl MockChemistry {
    pub fn new(values: MetricValues) -> Self {
        Self {
            values,
            fail_scaffold: false,
            calls: Mutex::new(HashMap::new()),
            last_device: AtomicI32::new(i32::MIN),
        }
    }

    fn record(&self, metric: &'static str) {
        *self.calls.lock().unwrap().entry(metric).or_default() += 1;
    }

    pub fn calls(&self, metric: &str) -> usize {
        self.calls.lock().unwrap().get(metric).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn last_device(&self) -> i32 {
        self.last_device.load(Ordering::SeqCst)
    }
}

impl Chemistry for MockChemistry {
    type Structure = String;

    fn canonicalize(&self, smiles: &str) -> Option<String> {
        if smiles.starts_with('!') {
            None
        } else {
            Some(smiles.trim().to_string())
        }
    }

    fn parse(&self, smiles: &str) -> Result<String> {
        Ok(smiles.to_string())
    }
}

impl MetricSuite for MockChemistry {
    fn fraction_valid(&self, gen: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("valid");
        let valid = gen.iter().filter(|s| self.is_valid(s)).count();
        Ok(valid as f64 / gen.len() as f64)
    }

    fn fraction_unique(&self, _gen: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("unique");
        Ok(self.values.uniqueness)
    }

    fn scaffold_similarity(&self, _r: &[String], _g: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("scaffold");
        if self.fail_scaffold {
            bail!("scaffold computation failed");
        }
        Ok(self.values.scaffold)
    }

    fn fragment_similarity(&self, _r: &[String], _g: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("fragment");
        Ok(self.values.fragment)
    }

    fn internal_diversity(&self, _g: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("diversity");
        Ok(self.values.diversity)
    }

    fn morgan_similarity(
        &self,
        _r: &[String],
        _g: &[String],
        _pool: &WorkerPool,
        device: i32,
    ) -> Result<f64> {
        self.record("morgan");
        self.last_device.store(device, Ordering::SeqCst);
        Ok(self.values.morgan)
    }

    fn fraction_passes_filters(&self, _g: &[String], _pool: &WorkerPool) -> Result<f64> {
        self.record("filters");
        Ok(self.values.filters)
    }
}

pub fn pool() -> Arc<WorkerPool> {
    Arc::new(WorkerPool::new(2).unwrap())
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Aggregator over the mock with a three-molecule reference set.
pub fn aggregator(values: MetricValues, rollouts: usize) -> RewardAggregator<MockChemistry> {
    RewardAggregator::new(
        MockChemistry::new(values),
        strings(&["R1", "R2", "R3"]),
        rollouts,
        pool(),
        -1,
    )
    .unwrap()
}
