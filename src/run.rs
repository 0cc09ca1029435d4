//! The run loop: epochs of trials against one engine.
//!
//! Scheduling is single-threaded and strictly trial-by-trial: trial N+1
//! never starts before trial N's weight update (if any) has committed,
//! because the engine's weight state is one shared mutable resource. Within
//! an epoch, trials run in pattern-set order — that order determines which
//! drift-chain segment each trial consumes.
//!
//! A run-level stop flag is polled at trial boundaries only; a trial in
//! progress always completes. Between trials the runner invokes an optional
//! courtesy callback (e.g. to let a UI redraw) — a courtesy, not a
//! scheduling dependency.
//!
//! The per-trial TSV log is only created once initial configuration has
//! validated, so a failing run never leaves a half-written log behind.

use crate::engine::{layers, ActivationView, Engine};
use crate::error::Result;
use crate::pattern::CurriculumSchedule;
use crate::stats::{RunSummary, StatsAccumulator, SummaryRow, TrialStats};
use crate::trial::{TrialController, TrialMode};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shape of one run: how many epochs study, how many probe.
#[derive(Clone, Copy, Debug)]
pub struct RunPlan {
    pub run_id: usize,
    pub train_epochs: usize,
    pub test_epochs: usize,
}

impl RunPlan {
    pub fn total_epochs(&self) -> usize {
        self.train_epochs + self.test_epochs
    }

    fn mode_for(&self, epoch: usize) -> TrialMode {
        if epoch < self.train_epochs {
            TrialMode::Train
        } else {
            TrialMode::Test
        }
    }
}

/// Per-trial TSV sink.
pub struct TrialLog {
    out: BufWriter<File>,
}

impl TrialLog {
    /// Create the log file and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "run\tepoch\ttrial\tsse\tmemory_hit\tmean_output_act")?;
        Ok(Self { out })
    }

    /// Append one trial row.
    pub fn record(
        &mut self,
        run: usize,
        epoch: usize,
        trial: &str,
        stats: &TrialStats,
        mean_output_act: f64,
    ) -> Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{:.4}\t{}\t{:.4}",
            run,
            epoch,
            trial,
            stats.sum_squared_error,
            u8::from(stats.memory_hit),
            mean_output_act
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Drives a full run — epochs of trials — and aggregates the outcome.
pub struct Runner {
    controller: TrialController,
    stop: Arc<AtomicBool>,
    log: Option<TrialLog>,
    between_trials: Option<Box<dyn FnMut()>>,
}

impl Runner {
    pub fn new(controller: TrialController) -> Self {
        Self {
            controller,
            stop: Arc::new(AtomicBool::new(false)),
            log: None,
            between_trials: None,
        }
    }

    /// Share a stop flag; setting it ends the run at the next trial boundary.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Attach a per-trial TSV log.
    pub fn with_log(mut self, log: TrialLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Attach a courtesy callback invoked between trials.
    pub fn with_between_trials(mut self, callback: Box<dyn FnMut()>) -> Self {
        self.between_trials = Some(callback);
        self
    }

    /// Execute the plan: train epochs first, then test epochs, each over the
    /// pattern set the curriculum binds to that epoch.
    ///
    /// Returns the per-condition aggregate; conditions are keyed
    /// `set_name/mode`. If the stop flag is raised the summary covers the
    /// trials completed so far.
    pub fn run(
        &mut self,
        engine: &mut dyn Engine,
        curriculum: &CurriculumSchedule,
        plan: &RunPlan,
    ) -> Result<RunSummary> {
        let mut conditions: BTreeMap<String, StatsAccumulator> = BTreeMap::new();
        let mut stopped = false;

        tracing::info!(
            run = plan.run_id,
            train_epochs = plan.train_epochs,
            test_epochs = plan.test_epochs,
            "run started"
        );

        'epochs: for epoch in 0..plan.total_epochs() {
            let mode = plan.mode_for(epoch);
            let set = curriculum.set_for_epoch(epoch)?;
            let condition = format!(
                "{}/{}",
                set.name(),
                match mode {
                    TrialMode::Train => "train",
                    TrialMode::Test => "test",
                }
            );

            tracing::info!(
                run = plan.run_id,
                epoch,
                set = set.name(),
                mode = ?mode,
                trials = set.len(),
                "epoch started"
            );

            for pattern in set.iter() {
                if self.stop.load(Ordering::Relaxed) {
                    tracing::info!(run = plan.run_id, epoch, "stop flag raised, ending run");
                    stopped = true;
                    break 'epochs;
                }

                let stats = self.controller.run_trial(engine, pattern, mode)?;

                tracing::debug!(
                    run = plan.run_id,
                    epoch,
                    trial = pattern.name(),
                    sse = stats.sum_squared_error,
                    hit = stats.memory_hit,
                    "trial complete"
                );

                if let Some(log) = &mut self.log {
                    let out = engine.read_activation(layers::EC_OUT, ActivationView::Current)?;
                    let mean_act = if out.is_empty() {
                        0.0
                    } else {
                        out.iter().sum::<f64>() / out.len() as f64
                    };
                    log.record(plan.run_id, epoch, pattern.name(), &stats, mean_act)?;
                }

                conditions.entry(condition.clone()).or_default().add(&stats);

                if let Some(callback) = &mut self.between_trials {
                    callback();
                }
            }
        }

        if let Some(log) = &mut self.log {
            log.flush()?;
        }

        let rows = conditions
            .iter()
            .map(|(name, acc)| SummaryRow::from_accumulator(name.clone(), acc))
            .collect();
        let summary = RunSummary { rows };

        tracing::info!(run = plan.run_id, stopped, "run finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::drift::DriftFamily;
    use crate::engine::HebbianEngine;
    use crate::pattern::{PatternAssembler, PatternLayout, PatternSet};
    use crate::pool::VectorPool;
    use std::sync::Arc;

    /// Build the canonical no-drift fixture: one cue→target association
    /// stamped with a single context channel.
    fn no_drift_fixture(
        config: &ExperimentConfig,
    ) -> (CurriculumSchedule, HebbianEngine) {
        let layout = Arc::new(PatternLayout::standard(
            config.slot_width,
            config.context_channels,
        ));
        let assembler = PatternAssembler::new(Arc::clone(&layout));

        let mut pool = VectorPool::with_seed(config.slot_width, config.seed);
        let vecs = pool
            .add_permuted("ab", 2, config.pool_options())
            .unwrap()
            .to_vec();
        let cues = vec![vecs[0].clone()];
        let targets = vec![vecs[1].clone()];

        let mut family = DriftFamily::new(
            config.seed,
            config.drift_rate,
            config.decay_base,
            config.context_channels,
        );
        let chains = family.chains(config.slot_width, config.active_count(), 5);

        // Zero drift between epochs: the same set (same chain segment)
        // serves every epoch.
        let set = Arc::new(
            assembler
                .paired_set("ab", &cues, &targets, &chains, 0)
                .unwrap(),
        );
        let schedule = CurriculumSchedule::single(set);
        let engine = HebbianEngine::new(&layout, config.seed);
        (schedule, engine)
    }

    #[test]
    fn test_no_drift_control_recalls_every_test_trial() {
        // Two sparse 49-component vectors (active fraction 0.2, minimum
        // difference 0.5), a 5-step chain at rate 0.25, 4 training epochs
        // and 1 test epoch with the same cue and no target clamp: every
        // test trial must be a memory hit.
        let config = ExperimentConfig::default();
        let (schedule, mut engine) = no_drift_fixture(&config);

        let controller = TrialController::from_config(&config);
        let mut runner = Runner::new(controller);
        let plan = RunPlan {
            run_id: 0,
            train_epochs: 4,
            test_epochs: 1,
        };

        let summary = runner.run(&mut engine, &schedule, &plan).unwrap();

        let test_row = summary
            .rows
            .iter()
            .find(|r| r.condition == "ab/test")
            .expect("test condition missing from summary");
        assert_eq!(test_row.trials, 1);
        assert_eq!(
            test_row.hit_rate, 1.0,
            "no-drift control must recall perfectly: {:?}",
            test_row
        );

        let train_row = summary
            .rows
            .iter()
            .find(|r| r.condition == "ab/train")
            .unwrap();
        assert_eq!(train_row.trials, 4);
    }

    #[test]
    fn test_run_is_deterministic() {
        let config = ExperimentConfig::default();
        let plan = RunPlan {
            run_id: 0,
            train_epochs: 4,
            test_epochs: 1,
        };

        let mut summaries = Vec::new();
        for _ in 0..2 {
            let (schedule, mut engine) = no_drift_fixture(&config);
            let controller = TrialController::from_config(&config);
            let mut runner = Runner::new(controller);
            summaries.push(runner.run(&mut engine, &schedule, &plan).unwrap());
        }

        assert_eq!(summaries[0].to_tsv(), summaries[1].to_tsv());
    }

    #[test]
    fn test_stop_flag_ends_at_trial_boundary() {
        let config = ExperimentConfig::default();
        let (schedule, mut engine) = no_drift_fixture(&config);

        let stop = Arc::new(AtomicBool::new(false));
        let controller = TrialController::from_config(&config);
        let stop_clone = Arc::clone(&stop);
        let mut runner = Runner::new(controller)
            .with_stop_flag(Arc::clone(&stop))
            .with_between_trials(Box::new(move || {
                stop_clone.store(true, Ordering::Relaxed);
            }));

        let plan = RunPlan {
            run_id: 0,
            train_epochs: 4,
            test_epochs: 1,
        };
        let summary = runner.run(&mut engine, &schedule, &plan).unwrap();

        // The flag was raised after the first trial completed; that trial
        // still counts, and nothing after it ran.
        let total: usize = summary.rows.iter().map(|r| r.trials).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_trial_log_rows() {
        let config = ExperimentConfig::default();
        let (schedule, mut engine) = no_drift_fixture(&config);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trials.tsv");
        let log = TrialLog::create(&path).unwrap();

        let controller = TrialController::from_config(&config);
        let mut runner = Runner::new(controller).with_log(log);
        let plan = RunPlan {
            run_id: 3,
            train_epochs: 2,
            test_epochs: 1,
        };
        runner.run(&mut engine, &schedule, &plan).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "run\tepoch\ttrial\tsse\tmemory_hit\tmean_output_act");
        assert_eq!(lines.len(), 1 + 3, "header plus one row per trial");
        assert!(lines[1].starts_with("3\t0\tab_0\t"));
        let hit_field = lines[3].split('\t').nth(4).unwrap();
        assert_eq!(hit_field, "1", "test trial of the no-drift control hits");
    }
}
