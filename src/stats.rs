//! Trial statistics and streaming aggregation.
//!
//! A [`TrialStats`] record is produced exactly once per trial and is
//! read-only afterwards. [`StatsAccumulator`] keeps running sums so that
//! per-condition aggregates never require holding every record in memory;
//! accumulators merge, which also covers aggregating across runs.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The per-trial outcome record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    /// Squared error between reconstruction and target, summed over the
    /// output layer
    pub sum_squared_error: f64,
    /// Binary recall-success statistic
    pub memory_hit: bool,
    /// Fraction of target-OFF components incorrectly turned on
    pub false_alarm_rate: f64,
    /// Fraction of completion-required components the network failed to
    /// turn on
    pub miss_rate: f64,
    /// Early-versus-final associative activation difference; modulates the
    /// learning rate, not a recall-accuracy measure
    pub associative_error: f64,
}

/// Streaming aggregation of trial statistics.
#[derive(Clone, Debug, Default)]
pub struct StatsAccumulator {
    count: usize,
    hits: usize,
    sse_sum: f64,
    miss_sum: f64,
    fa_sum: f64,
    assoc_sum: f64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one trial into the running sums.
    pub fn add(&mut self, stats: &TrialStats) {
        self.count += 1;
        if stats.memory_hit {
            self.hits += 1;
        }
        self.sse_sum += stats.sum_squared_error;
        self.miss_sum += stats.miss_rate;
        self.fa_sum += stats.false_alarm_rate;
        self.assoc_sum += stats.associative_error;
    }

    /// Merge another accumulator into this one.
    pub fn merge(&mut self, other: &StatsAccumulator) {
        self.count += other.count;
        self.hits += other.hits;
        self.sse_sum += other.sse_sum;
        self.miss_sum += other.miss_sum;
        self.fa_sum += other.fa_sum;
        self.assoc_sum += other.assoc_sum;
    }

    /// Clear the accumulator to start fresh.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            sum / self.count as f64
        }
    }

    /// Fraction of trials scored as memory hits.
    pub fn hit_rate(&self) -> f64 {
        self.mean(self.hits as f64)
    }

    pub fn mean_sse(&self) -> f64 {
        self.mean(self.sse_sum)
    }

    pub fn mean_miss_rate(&self) -> f64 {
        self.mean(self.miss_sum)
    }

    pub fn mean_false_alarm_rate(&self) -> f64 {
        self.mean(self.fa_sum)
    }

    pub fn mean_associative_error(&self) -> f64 {
        self.mean(self.assoc_sum)
    }
}

/// One aggregated row of a run summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryRow {
    pub condition: String,
    pub trials: usize,
    pub hit_rate: f64,
    pub mean_sse: f64,
    pub mean_miss_rate: f64,
    pub mean_false_alarm_rate: f64,
}

impl SummaryRow {
    /// Build a row from a condition name and its accumulator.
    pub fn from_accumulator(condition: impl Into<String>, acc: &StatsAccumulator) -> Self {
        Self {
            condition: condition.into(),
            trials: acc.count(),
            hit_rate: acc.hit_rate(),
            mean_sse: acc.mean_sse(),
            mean_miss_rate: acc.mean_miss_rate(),
            mean_false_alarm_rate: acc.mean_false_alarm_rate(),
        }
    }
}

/// The per-run aggregate, one row per named condition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub rows: Vec<SummaryRow>,
}

impl RunSummary {
    /// Render as TSV, header first.
    pub fn to_tsv(&self) -> String {
        let mut out = String::from(
            "condition\ttrials\thit_rate\tmean_sse\tmean_miss_rate\tmean_false_alarm_rate\n",
        );
        for row in &self.rows {
            out.push_str(&format!(
                "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\n",
                row.condition,
                row.trials,
                row.hit_rate,
                row.mean_sse,
                row.mean_miss_rate,
                row.mean_false_alarm_rate
            ));
        }
        out
    }

    /// Write the TSV rendering to a file.
    pub fn save_tsv(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_tsv())?;
        Ok(())
    }
}
