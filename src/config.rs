//! Experiment configuration and the behavioral-paradigm table.
//!
//! [`ExperimentConfig`] is one immutable value passed into the generator,
//! assembler, and controller constructors — built once, never mutated after
//! dataset construction. The enumeration of which drift schedule belongs to
//! which named experiment is configuration data, not an algorithm: it loads
//! from a JSON file as a [`ParadigmTable`] instead of living in code.

use crate::error::{ReverieError, Result};
use crate::pool::PoolOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The immutable experiment-wide parameter aggregate.
#[derive(Clone, Debug)]
pub struct ExperimentConfig {
    /// Components per slot
    pub slot_width: usize,
    /// Target fraction of active components per feature vector
    pub active_fraction: f64,
    /// Pairwise minimum-difference floor for pool generation
    pub min_diff_pct: f64,
    /// Number of temporal-context channels
    pub context_channels: usize,
    /// Fast-scale drift rate (channel 0); slower channels divide by
    /// `decay_base` per channel
    pub drift_rate: f64,
    /// Multiplicative spacing between channel drift rates
    pub decay_base: f64,
    /// Engine cycles per trial phase
    pub cycles_per_phase: usize,
    /// Extra context-blanked encode passes before the four phases
    pub replay_passes: usize,
    /// Pattern-separation pathway scale during training trials
    pub mossy_gain_train: f64,
    /// Pattern-separation pathway scale during testing trials
    pub mossy_gain_test: f64,
    /// Memory-hit rate ceiling for training trials
    pub train_hit_threshold: f64,
    /// Memory-hit rate ceiling for testing trials
    pub test_hit_threshold: f64,
    /// Learning-rate multiplier floor
    pub lrate_floor: f64,
    /// Associative error at or below which the floor applies
    pub lrate_low: f64,
    /// Associative error at or above which the full rate applies
    pub lrate_high: f64,
    /// Global RNG seed
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            slot_width: 49,
            active_fraction: 0.2,
            min_diff_pct: 0.5,
            context_channels: 1,
            drift_rate: 0.25,
            decay_base: 2.0,
            cycles_per_phase: 4,
            replay_passes: 0,
            mossy_gain_train: 0.3,
            mossy_gain_test: 1.0,
            train_hit_threshold: 0.2,
            test_hit_threshold: 0.4,
            lrate_floor: 0.2,
            lrate_low: 0.02,
            lrate_high: 0.2,
            seed: 0,
        }
    }
}

impl ExperimentConfig {
    /// Pool generation options implied by this configuration.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            active_fraction: self.active_fraction,
            min_diff_pct: self.min_diff_pct,
            ..PoolOptions::default()
        }
    }

    /// Active components per slot-width vector.
    pub fn active_count(&self) -> usize {
        (self.slot_width as f64 * self.active_fraction).round() as usize
    }
}

/// One named behavioral paradigm: how context drifts across an experiment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParadigmSpec {
    /// Fast-scale context drift rate
    pub decay_rate: f64,
    /// Extra drift steps advanced between consecutive training epochs
    pub drift_between_epochs: usize,
    /// Per-test-epoch study→test drift gaps; consumed in order, the last
    /// entry repeating for any further test epochs
    pub retention_interval_schedule: Vec<usize>,
}

impl ParadigmSpec {
    /// Chain offsets for each training epoch: epoch e studies context at
    /// offset `e * drift_between_epochs`.
    pub fn epoch_offsets(&self, train_epochs: usize) -> Vec<usize> {
        (0..train_epochs)
            .map(|e| e * self.drift_between_epochs)
            .collect()
    }

    /// Chain offset for test epoch `k`, given the last training offset.
    pub fn test_offset(&self, last_train_offset: usize, k: usize) -> usize {
        let retention = self
            .retention_interval_schedule
            .get(k)
            .or(self.retention_interval_schedule.last())
            .copied()
            .unwrap_or(0);
        last_train_offset + retention
    }
}

/// The experiment-id → paradigm mapping, loaded from a data file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParadigmTable {
    #[serde(flatten)]
    paradigms: HashMap<String, ParadigmSpec>,
}

impl ParadigmTable {
    /// Parse a table from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Look up a paradigm, failing on unknown ids.
    pub fn get(&self, id: &str) -> Result<&ParadigmSpec> {
        self.paradigms
            .get(id)
            .ok_or_else(|| ReverieError::UnknownParadigm(id.to_string()))
    }

    /// All paradigm ids.
    pub fn ids(&self) -> Vec<&str> {
        self.paradigms.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.paradigms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paradigms.is_empty()
    }
}
