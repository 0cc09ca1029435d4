//! # Reverie: temporal-context drift and phase-structured recall
//!
//! Reverie is a cognitive-modeling harness for studying how temporal
//! context drift and spaced practice affect recall in a hippocampus-like
//! circuit. It synthesizes sparse binary "memory item" stimuli stamped with
//! a slowly drifting temporal-context signal, and drives an associative
//! network engine through a structured encode→recall trial protocol,
//! scoring how well the network reconstructs a studied association.
//!
//! ## Core concepts
//!
//! - **Vector pool**: named vocabularies of sparse feature vectors with a
//!   pairwise minimum-difference floor ([`VectorPool`]).
//! - **Drift chain**: an ordered vector sequence whose pairwise similarity
//!   decays geometrically with chain distance — the temporal-context
//!   signal ([`DriftChain`], [`DriftFamily`]).
//! - **Pattern**: a multi-slot stimulus (cue, target, context channels)
//!   with distinct input and target views ([`Pattern`], [`PatternAssembler`]).
//! - **Trial**: four ordered phases with phase-dependent rescaling of the
//!   direct and associative recall pathways ([`TrialController`]).
//! - **Scoring**: thresholded memory-hit statistics plus the associative
//!   error signal that modulates the learning rate ([`RecallScorer`]).
//!
//! The network engine itself sits behind the [`Engine`] trait;
//! [`HebbianEngine`] is the crate's deterministic reference implementation.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use reverie::{
//!     DriftFamily, ExperimentConfig, HebbianEngine, PatternAssembler, PatternLayout,
//!     TrialController, TrialMode, VectorPool,
//! };
//!
//! let config = ExperimentConfig::default();
//! let layout = Arc::new(PatternLayout::standard(config.slot_width, config.context_channels));
//!
//! // Vocabulary and temporal context
//! let mut pool = VectorPool::with_seed(config.slot_width, config.seed);
//! let items = pool.add_permuted("ab", 2, config.pool_options())?.to_vec();
//! let mut family = DriftFamily::new(config.seed, config.drift_rate, config.decay_base, 1);
//! let chains = family.chains(config.slot_width, config.active_count(), 5);
//!
//! // One studied association, stamped with the chain's first context
//! let assembler = PatternAssembler::new(Arc::clone(&layout));
//! let pattern = assembler.pair_pattern("ab_0", &items[0], &items[1], &[chains[0].get(0)])?;
//!
//! // Study once, then probe recall
//! let mut engine = HebbianEngine::new(&layout, config.seed);
//! let controller = TrialController::from_config(&config);
//! controller.run_trial(&mut engine, &pattern, TrialMode::Train)?;
//! let stats = controller.run_trial(&mut engine, &pattern, TrialMode::Test)?;
//! assert!(stats.memory_hit);
//! # Ok::<(), reverie::ReverieError>(())
//! ```
//!
//! Everything stochastic is keyed off explicit seeds: re-running with the
//! same seed and the same call sequence reproduces identical pools, chains,
//! and trial outcomes.

pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod pool;
pub mod run;
pub mod scorer;
pub mod similarity;
pub mod stats;
pub mod trial;
pub mod vector;

// Re-exports for convenience
pub use config::{ExperimentConfig, ParadigmSpec, ParadigmTable};
pub use drift::{DriftChain, DriftFamily, DriftGenerator};
pub use engine::{ActivationView, Engine, EngineSnapshot, HebbianEngine};
pub use error::{ReverieError, Result};
pub use pattern::{
    CurriculumSchedule, Pattern, PatternAssembler, PatternLayout, PatternSet, SlotRole, SlotSpec,
};
pub use pool::{PoolOptions, VectorPool};
pub use run::{RunPlan, Runner, TrialLog};
pub use scorer::{LrateModulation, RecallScorer};
pub use similarity::{Metric, Similarity};
pub use stats::{RunSummary, StatsAccumulator, SummaryRow, TrialStats};
pub use trial::{TrialController, TrialMode, TrialPhase};
pub use vector::FeatureVector;
