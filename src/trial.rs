//! The phase-structured encode/recall trial protocol.
//!
//! Every trial runs four ordered phases against an engine handle:
//!
//! 1. **Cue drive** — the direct pathway at full scale, the associative
//!    pathway silenced: the network is driven purely by the immediate cue.
//! 2. **Early recall** and 3. **Late recall** — the scales invert and
//!    pattern completion takes over. Throughout the trial the
//!    pattern-separation pathway runs at a reduced scale during training
//!    (suppressing overly specific one-shot associations) and is restored
//!    toward normal during testing.
//! 4. **Restore** — the direct pathway returns; in training mode the output
//!    layer is clamped to the engine's own phase-1 reconstruction rather
//!    than the external target.
//!
//! Recall is scored strictly between phases 3 and 4, while the comparison
//! standard is still the full pattern. At trial end, training trials commit
//! the weight update with a learning rate modulated by the associative
//! error signal. Phase order is fixed and never skipped; a trial in
//! progress always completes.

use crate::config::ExperimentConfig;
use crate::engine::{layers, pathways, ActivationView, Engine};
use crate::error::Result;
use crate::pattern::{Pattern, SlotRole};
use crate::scorer::RecallScorer;
use crate::stats::TrialStats;

/// Whether a trial studies (updates weights) or probes recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialMode {
    Train,
    Test,
}

/// One of the four ordered sub-intervals of a trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialPhase {
    CueDrive,
    EarlyRecall,
    LateRecall,
    Restore,
}

impl TrialPhase {
    /// All phases, in protocol order.
    pub const ALL: [TrialPhase; 4] = [
        TrialPhase::CueDrive,
        TrialPhase::EarlyRecall,
        TrialPhase::LateRecall,
        TrialPhase::Restore,
    ];

    /// Zero-based position in the protocol.
    pub fn index(self) -> usize {
        match self {
            TrialPhase::CueDrive => 0,
            TrialPhase::EarlyRecall => 1,
            TrialPhase::LateRecall => 2,
            TrialPhase::Restore => 3,
        }
    }

    /// Whether recall is driven by pattern completion in this phase.
    pub fn is_associative(self) -> bool {
        matches!(self, TrialPhase::EarlyRecall | TrialPhase::LateRecall)
    }
}

/// Per-trial mutable state, owned by the controller for one trial.
///
/// Reset at trial start, never shared across trials.
#[derive(Clone, Debug)]
struct TrialState {
    phase: TrialPhase,
    cycle: usize,
    direct_scale: f64,
    assoc_scale: f64,
    mossy_scale: f64,
    learning: bool,
}

impl TrialState {
    fn begin(mode: TrialMode, mossy_scale: f64) -> Self {
        Self {
            phase: TrialPhase::CueDrive,
            cycle: 0,
            direct_scale: 1.0,
            assoc_scale: 0.0,
            mossy_scale,
            learning: mode == TrialMode::Train,
        }
    }
}

/// Runs encode-or-test trials against an engine handle.
#[derive(Clone, Debug)]
pub struct TrialController {
    /// Engine cycles per phase (>= 1)
    pub cycles_per_phase: usize,
    /// Extra context-blanked encode passes before the four phases
    pub replay_passes: usize,
    /// Pattern-separation scale during training trials
    pub mossy_gain_train: f64,
    /// Pattern-separation scale during testing trials
    pub mossy_gain_test: f64,
    scorer: RecallScorer,
}

impl TrialController {
    pub fn new(scorer: RecallScorer) -> Self {
        Self {
            cycles_per_phase: 4,
            replay_passes: 0,
            mossy_gain_train: 0.3,
            mossy_gain_test: 1.0,
            scorer,
        }
    }

    /// Build a controller (and its scorer) from an experiment configuration.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            cycles_per_phase: config.cycles_per_phase.max(1),
            replay_passes: config.replay_passes,
            mossy_gain_train: config.mossy_gain_train,
            mossy_gain_test: config.mossy_gain_test,
            scorer: RecallScorer::from_config(config),
        }
    }

    /// The scorer this controller scores with.
    pub fn scorer(&self) -> &RecallScorer {
        &self.scorer
    }

    /// The (direct, associative) pathway scales holding throughout `phase`.
    pub fn pathway_scales(phase: TrialPhase) -> (f64, f64) {
        if phase.is_associative() {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        }
    }

    fn mossy_gain(&self, mode: TrialMode) -> f64 {
        match mode {
            TrialMode::Train => self.mossy_gain_train,
            TrialMode::Test => self.mossy_gain_test,
        }
    }

    fn input_slots<'a>(pattern: &'a Pattern, mode: TrialMode) -> Vec<&'a str> {
        match mode {
            // Study trials present the full association.
            TrialMode::Train => pattern
                .layout()
                .slots()
                .iter()
                .map(|s| s.name.as_str())
                .collect(),
            // Test trials leave the target placeholder blank.
            TrialMode::Test => pattern.layout().names_without_role(SlotRole::Target),
        }
    }

    fn run_phase(
        &self,
        engine: &mut dyn Engine,
        state: &mut TrialState,
        phase: TrialPhase,
    ) -> Result<()> {
        let (direct, assoc) = Self::pathway_scales(phase);
        state.phase = phase;
        state.direct_scale = direct;
        state.assoc_scale = assoc;
        engine.set_pathway_scale(pathways::PERFORANT, direct)?;
        engine.set_pathway_scale(pathways::SCHAFFER, assoc)?;
        for cycle in 0..self.cycles_per_phase {
            state.cycle = cycle;
            engine.step_cycle();
        }
        engine.finish_phase(phase);
        tracing::trace!(
            phase = ?state.phase,
            cycles = state.cycle + 1,
            direct = state.direct_scale,
            assoc = state.assoc_scale,
            mossy = state.mossy_scale,
            "phase complete"
        );
        Ok(())
    }

    /// Execute one trial: apply input, run the four phases, score, and (in
    /// training mode) commit the modulated weight update.
    ///
    /// Produces exactly one [`TrialStats`]; the engine's weights change iff
    /// `mode == Train`. Deterministic given a fixed engine and inputs.
    pub fn run_trial(
        &self,
        engine: &mut dyn Engine,
        pattern: &Pattern,
        mode: TrialMode,
    ) -> Result<TrialStats> {
        let mut state = TrialState::begin(mode, self.mossy_gain(mode));
        engine.reset_decay_state();

        let slots = Self::input_slots(pattern, mode);

        // Replay sub-loop: extra cue-drive passes with the context slots
        // blanked, before the canonical four-phase cycle. Not counted as
        // trials.
        if self.replay_passes > 0 {
            let probe_slots: Vec<&str> = pattern
                .layout()
                .slots()
                .iter()
                .filter(|s| s.role != SlotRole::Context && slots.contains(&s.name.as_str()))
                .map(|s| s.name.as_str())
                .collect();
            engine.apply_input(pattern, &probe_slots)?;
            engine.set_pathway_scale(pathways::MOSSY, state.mossy_scale)?;
            engine.set_pathway_scale(pathways::PERFORANT, 1.0)?;
            engine.set_pathway_scale(pathways::SCHAFFER, 0.0)?;
            for _ in 0..self.replay_passes {
                for _ in 0..self.cycles_per_phase {
                    engine.step_cycle();
                }
            }
        }

        engine.apply_input(pattern, &slots)?;
        engine.set_pathway_scale(pathways::MOSSY, state.mossy_scale)?;

        self.run_phase(engine, &mut state, TrialPhase::CueDrive)?;
        let assoc_early = engine.read_activation(layers::CA3, ActivationView::Current)?;

        self.run_phase(engine, &mut state, TrialPhase::EarlyRecall)?;
        self.run_phase(engine, &mut state, TrialPhase::LateRecall)?;

        // The reconstruction must be read here, before phase 4 overwrites
        // the output layer.
        let reconstructed = engine.read_activation(layers::EC_OUT, ActivationView::Current)?;

        if state.learning {
            let own_guess =
                engine.read_activation(layers::EC_OUT, ActivationView::PhaseEnd(TrialPhase::CueDrive))?;
            engine.clamp_layer(layers::EC_OUT, &own_guess)?;
        }
        self.run_phase(engine, &mut state, TrialPhase::Restore)?;

        let assoc_end = engine.read_activation(layers::CA3, ActivationView::Current)?;
        let stats = self.scorer.score(
            &reconstructed,
            &pattern.target_units(),
            &pattern.cue_mask(),
            mode,
            &assoc_early,
            &assoc_end,
        );

        if state.learning {
            let multiplier = self.scorer.lrate_multiplier(stats.associative_error);
            engine.commit_weight_update(multiplier);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReverieError;
    use crate::pattern::{PatternAssembler, PatternLayout};
    use crate::vector::FeatureVector;
    use std::sync::Arc;

    /// A fake engine that records every contract call.
    #[derive(Debug, PartialEq, Clone)]
    enum Call {
        Reset,
        Apply(Vec<String>),
        SetScale(String, f64),
        Step,
        Finish(TrialPhase),
        Clamp(String),
        Commit(f64),
    }

    struct RecordingEngine {
        width: usize,
        calls: Vec<Call>,
    }

    impl RecordingEngine {
        fn new(width: usize) -> Self {
            Self {
                width,
                calls: Vec::new(),
            }
        }

        fn scale_calls(&self) -> Vec<(String, f64)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::SetScale(name, v) => Some((name.clone(), *v)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Engine for RecordingEngine {
        fn apply_input(&mut self, _pattern: &Pattern, slots: &[&str]) -> Result<()> {
            self.calls
                .push(Call::Apply(slots.iter().map(|s| s.to_string()).collect()));
            Ok(())
        }

        fn clamp_layer(&mut self, layer: &str, _values: &[f64]) -> Result<()> {
            self.calls.push(Call::Clamp(layer.to_string()));
            Ok(())
        }

        fn step_cycle(&mut self) {
            self.calls.push(Call::Step);
        }

        fn finish_phase(&mut self, phase: TrialPhase) {
            self.calls.push(Call::Finish(phase));
        }

        fn set_pathway_scale(&mut self, pathway: &str, value: f64) -> Result<()> {
            self.calls
                .push(Call::SetScale(pathway.to_string(), value));
            Ok(())
        }

        fn read_activation(&self, _layer: &str, _view: ActivationView) -> Result<Vec<f64>> {
            Ok(vec![0.0; self.width])
        }

        fn commit_weight_update(&mut self, lrate_multiplier: f64) {
            self.calls.push(Call::Commit(lrate_multiplier));
        }

        fn reset_decay_state(&mut self) {
            self.calls.push(Call::Reset);
        }
    }

    fn pattern() -> Pattern {
        let layout = Arc::new(PatternLayout::standard(4, 1));
        let assembler = PatternAssembler::new(layout);
        assembler
            .pair_pattern(
                "t",
                &FeatureVector::from_active(4, &[0]),
                &FeatureVector::from_active(4, &[1]),
                &[&FeatureVector::from_active(4, &[2])],
            )
            .unwrap()
    }

    fn controller() -> TrialController {
        TrialController::new(RecallScorer::new(0.2, 0.4))
    }

    #[test]
    fn test_phase_scale_invariant() {
        // Holds for every phase regardless of mode.
        assert_eq!(TrialController::pathway_scales(TrialPhase::CueDrive), (1.0, 0.0));
        assert_eq!(
            TrialController::pathway_scales(TrialPhase::EarlyRecall),
            (0.0, 1.0)
        );
        assert_eq!(
            TrialController::pathway_scales(TrialPhase::LateRecall),
            (0.0, 1.0)
        );
        assert_eq!(TrialController::pathway_scales(TrialPhase::Restore), (1.0, 0.0));
    }

    #[test]
    fn test_phase_order_is_fixed() {
        let mut engine = RecordingEngine::new(12);
        controller()
            .run_trial(&mut engine, &pattern(), TrialMode::Test)
            .unwrap();

        let phases: Vec<TrialPhase> = engine
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Finish(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(phases, TrialPhase::ALL);
    }

    #[test]
    fn test_scales_set_once_per_phase_before_cycles() {
        let ctl = controller();
        let mut engine = RecordingEngine::new(12);
        ctl.run_trial(&mut engine, &pattern(), TrialMode::Test).unwrap();

        // After the per-phase scale setting, nothing but step_cycle happens
        // until the phase finishes.
        let mut i = 0;
        let calls = &engine.calls;
        while i < calls.len() {
            if let Call::SetScale(name, _) = &calls[i] {
                if name == pathways::SCHAFFER {
                    for k in 1..=ctl.cycles_per_phase {
                        assert_eq!(
                            calls[i + k],
                            Call::Step,
                            "cycle {} after scale set was not a step",
                            k
                        );
                    }
                }
            }
            i += 1;
        }
    }

    #[test]
    fn test_train_commits_test_does_not() {
        let mut train_engine = RecordingEngine::new(12);
        let mut test_engine = RecordingEngine::new(12);
        let ctl = controller();

        ctl.run_trial(&mut train_engine, &pattern(), TrialMode::Train)
            .unwrap();
        ctl.run_trial(&mut test_engine, &pattern(), TrialMode::Test)
            .unwrap();

        let commits = |e: &RecordingEngine| {
            e.calls
                .iter()
                .filter(|c| matches!(c, Call::Commit(_)))
                .count()
        };
        assert_eq!(commits(&train_engine), 1);
        assert_eq!(commits(&test_engine), 0);

        // The self-supervision clamp is training-only as well.
        let clamps = |e: &RecordingEngine| {
            e.calls
                .iter()
                .filter(|c| matches!(c, Call::Clamp(_)))
                .count()
        };
        assert_eq!(clamps(&train_engine), 1);
        assert_eq!(clamps(&test_engine), 0);
    }

    #[test]
    fn test_mossy_scale_depends_on_mode() {
        let ctl = controller();
        for (mode, want) in [
            (TrialMode::Train, ctl.mossy_gain_train),
            (TrialMode::Test, ctl.mossy_gain_test),
        ] {
            let mut engine = RecordingEngine::new(12);
            ctl.run_trial(&mut engine, &pattern(), mode).unwrap();
            let mossy: Vec<f64> = engine
                .scale_calls()
                .into_iter()
                .filter(|(n, _)| n == pathways::MOSSY)
                .map(|(_, v)| v)
                .collect();
            assert!(!mossy.is_empty());
            assert!(mossy.iter().all(|&v| (v - want).abs() < 1e-12));
        }
    }

    #[test]
    fn test_target_slot_blank_in_test_input() {
        let mut engine = RecordingEngine::new(12);
        controller()
            .run_trial(&mut engine, &pattern(), TrialMode::Test)
            .unwrap();

        let applied = engine
            .calls
            .iter()
            .find_map(|c| match c {
                Call::Apply(slots) => Some(slots.clone()),
                _ => None,
            })
            .unwrap();
        assert!(applied.contains(&"cue".to_string()));
        assert!(applied.contains(&"context0".to_string()));
        assert!(!applied.contains(&"target".to_string()));
    }

    #[test]
    fn test_replay_blanks_context_and_precedes_phases() {
        let mut ctl = controller();
        ctl.replay_passes = 2;
        let mut engine = RecordingEngine::new(12);
        ctl.run_trial(&mut engine, &pattern(), TrialMode::Train)
            .unwrap();

        let applies: Vec<Vec<String>> = engine
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Apply(slots) => Some(slots.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(applies.len(), 2, "probe apply plus canonical apply");
        assert!(
            !applies[0].contains(&"context0".to_string()),
            "replay probes run with context blanked"
        );
        assert!(applies[1].contains(&"context0".to_string()));

        // 2 replay passes + 4 phases, all at cycles_per_phase cycles.
        let steps = engine.calls.iter().filter(|c| matches!(c, Call::Step)).count();
        assert_eq!(steps, (2 + 4) * ctl.cycles_per_phase);
    }

    #[test]
    fn test_engine_errors_abort() {
        struct FailingEngine;
        impl Engine for FailingEngine {
            fn apply_input(&mut self, _: &Pattern, _: &[&str]) -> Result<()> {
                Err(ReverieError::ShapeMismatch {
                    expected: 12,
                    got: 8,
                })
            }
            fn clamp_layer(&mut self, _: &str, _: &[f64]) -> Result<()> {
                Ok(())
            }
            fn step_cycle(&mut self) {}
            fn finish_phase(&mut self, _: TrialPhase) {}
            fn set_pathway_scale(&mut self, _: &str, _: f64) -> Result<()> {
                Ok(())
            }
            fn read_activation(&self, _: &str, _: ActivationView) -> Result<Vec<f64>> {
                Ok(vec![])
            }
            fn commit_weight_update(&mut self, _: f64) {}
            fn reset_decay_state(&mut self) {}
        }

        let result = controller().run_trial(&mut FailingEngine, &pattern(), TrialMode::Train);
        assert!(matches!(result, Err(ReverieError::ShapeMismatch { .. })));
    }
}
