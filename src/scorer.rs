//! Recall scoring: from activation snapshots to a trial outcome.
//!
//! The scorer is a pure function of two activation snapshots plus static
//! layout metadata — no engine calls, no side effects, bit-identical output
//! for identical input. It distinguishes components the cue supplied
//! externally from components the network had to complete on its own, and
//! only the latter count toward the miss rate.
//!
//! # Degenerate statistics
//!
//! A trial with no completion-required components (or no target-OFF
//! components) leaves the corresponding rate undefined; it is treated as
//! trivially satisfied (rate 0.0) rather than producing NaN.

use crate::config::ExperimentConfig;
use crate::stats::TrialStats;
use crate::trial::TrialMode;

/// The monotonic map from associative error to learning-rate multiplier.
///
/// Error at or below `low` yields the `floor` multiplier; at or above
/// `high` yields 1.0; linear in between.
#[derive(Clone, Copy, Debug)]
pub struct LrateModulation {
    /// Multiplier when the associative error sits at or below `low`
    pub floor: f64,
    /// Error threshold below which the floor applies
    pub low: f64,
    /// Error threshold at which the full learning rate applies
    pub high: f64,
}

impl Default for LrateModulation {
    fn default() -> Self {
        Self {
            floor: 0.2,
            low: 0.02,
            high: 0.2,
        }
    }
}

/// Scores a reconstructed output against the pattern target.
#[derive(Clone, Debug)]
pub struct RecallScorer {
    /// Activation threshold counting a component as "on"
    pub act_threshold: f64,
    /// Memory-hit rate ceiling for training trials
    pub train_hit_threshold: f64,
    /// Memory-hit rate ceiling for testing trials
    pub test_hit_threshold: f64,
    /// Learning-rate modulation parameters
    pub modulation: LrateModulation,
}

impl RecallScorer {
    pub fn new(train_hit_threshold: f64, test_hit_threshold: f64) -> Self {
        Self {
            act_threshold: 0.5,
            train_hit_threshold,
            test_hit_threshold,
            modulation: LrateModulation::default(),
        }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            act_threshold: 0.5,
            train_hit_threshold: config.train_hit_threshold,
            test_hit_threshold: config.test_hit_threshold,
            modulation: LrateModulation {
                floor: config.lrate_floor,
                low: config.lrate_low,
                high: config.lrate_high,
            },
        }
    }

    fn hit_threshold(&self, mode: TrialMode) -> f64 {
        match mode {
            TrialMode::Train => self.train_hit_threshold,
            TrialMode::Test => self.test_hit_threshold,
        }
    }

    /// Score one trial.
    ///
    /// `output` is the reconstructed output-layer activation read strictly
    /// between phases 3 and 4; `target` is the pattern's target view;
    /// `cue_mask` marks components the input view supplied externally.
    /// `assoc_early` and `assoc_end` are the associative-layer activations
    /// at the end of phase 1 and at trial end.
    pub fn score(
        &self,
        output: &[f64],
        target: &[f64],
        cue_mask: &[bool],
        mode: TrialMode,
        assoc_early: &[f64],
        assoc_end: &[f64],
    ) -> TrialStats {
        assert_eq!(output.len(), target.len(), "output/target length mismatch");
        assert_eq!(output.len(), cue_mask.len(), "cue mask length mismatch");
        assert_eq!(
            assoc_early.len(),
            assoc_end.len(),
            "associative snapshot length mismatch"
        );

        let mut sse = 0.0f64;
        let mut required = 0usize;
        let mut missed = 0usize;
        let mut target_off = 0usize;
        let mut false_alarms = 0usize;

        for ((&out, &tgt), &cued) in output.iter().zip(target.iter()).zip(cue_mask.iter()) {
            let diff = out - tgt;
            sse += diff * diff;

            if tgt >= self.act_threshold {
                if !cued {
                    required += 1;
                    if out < self.act_threshold {
                        missed += 1;
                    }
                }
            } else {
                target_off += 1;
                if out >= self.act_threshold {
                    false_alarms += 1;
                }
            }
        }

        let miss_rate = if required == 0 {
            0.0
        } else {
            missed as f64 / required as f64
        };
        let false_alarm_rate = if target_off == 0 {
            0.0
        } else {
            false_alarms as f64 / target_off as f64
        };

        let threshold = self.hit_threshold(mode);
        let memory_hit = miss_rate < threshold && false_alarm_rate < threshold;

        let associative_error = if assoc_early.is_empty() {
            0.0
        } else {
            assoc_early
                .iter()
                .zip(assoc_end.iter())
                .map(|(&a, &b)| (a - b).abs())
                .sum::<f64>()
                / assoc_early.len() as f64
        };

        TrialStats {
            sum_squared_error: sse,
            memory_hit,
            false_alarm_rate,
            miss_rate,
            associative_error,
        }
    }

    /// The learning-rate multiplier for a given associative error.
    pub fn lrate_multiplier(&self, associative_error: f64) -> f64 {
        let m = self.modulation;
        if associative_error <= m.low {
            m.floor
        } else if associative_error >= m.high {
            1.0
        } else {
            let t = (associative_error - m.low) / (m.high - m.low);
            m.floor + t * (1.0 - m.floor)
        }
    }
}
