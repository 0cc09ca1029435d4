//! The network-engine contract and a reference Hebbian implementation.
//!
//! The trial controller drives any engine exposing the [`Engine`] trait:
//! clamp inputs, advance cycles, rescale named pathways, read layer
//! activations, commit weight updates. The layer and pathway names are a
//! fixed small set modeled on the hippocampal circuit (entorhinal input,
//! dentate gyrus, CA3, CA1, entorhinal output); any engine resolving the
//! same names satisfies the contract. Failing to resolve a name is a fatal
//! configuration error, never retried.
//!
//! [`HebbianEngine`] is the crate's reference engine: a deterministic
//! one-shot auto-associator over the flat pattern width. It is intentionally
//! minimal — enough dynamics to express cue-driven recall, pattern
//! completion, and mossy-gated pattern separation, with no claim to
//! biophysical realism.

use crate::error::{ReverieError, Result};
use crate::pattern::{Pattern, PatternLayout};
use crate::trial::TrialPhase;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Layer names every engine must resolve.
pub mod layers {
    /// Entorhinal input (the clamped stimulus)
    pub const EC_IN: &str = "ec_in";
    /// Dentate gyrus (sparse separation code)
    pub const DG: &str = "dg";
    /// CA3 (pattern-completion layer)
    pub const CA3: &str = "ca3";
    /// CA1 (readout layer)
    pub const CA1: &str = "ca1";
    /// Entorhinal output (the reconstruction compared against the target)
    pub const EC_OUT: &str = "ec_out";
}

/// Pathway names every engine must resolve.
pub mod pathways {
    /// Direct cue-driven route (EC → CA1)
    pub const PERFORANT: &str = "ec_ca1";
    /// Associative pattern-completion route (CA3 → CA1)
    pub const SCHAFFER: &str = "ca3_ca1";
    /// Sparse high-capacity separation route (DG → CA3)
    pub const MOSSY: &str = "dg_ca3";
}

/// Which activation snapshot to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationView {
    /// The activation as of the latest cycle
    Current,
    /// The activation recorded when the given phase finished
    PhaseEnd(TrialPhase),
}

/// The contract the trial controller requires from a network engine.
///
/// The engine's weight state is a single shared mutable resource: the
/// controller owns the handle exclusively for a trial's duration, and trial
/// N+1 never starts before trial N's `commit_weight_update` has returned.
pub trait Engine {
    /// Clamp the named slots of `pattern` onto the input layer, clearing any
    /// prior clamps first. Slots not listed are left blank.
    fn apply_input(&mut self, pattern: &Pattern, slots: &[&str]) -> Result<()>;

    /// Override a layer's activation with externally supplied values until
    /// the next input application or reset.
    fn clamp_layer(&mut self, layer: &str, values: &[f64]) -> Result<()>;

    /// Advance the network's internal dynamics by one primitive time step.
    fn step_cycle(&mut self);

    /// Record the end-of-phase activation snapshot for later
    /// [`ActivationView::PhaseEnd`] reads.
    fn finish_phase(&mut self, phase: TrialPhase);

    /// Set a named pathway's relative contribution (0..~1, occasionally >1).
    fn set_pathway_scale(&mut self, pathway: &str, value: f64) -> Result<()>;

    /// Read a layer's activation under the given view.
    fn read_activation(&self, layer: &str, view: ActivationView) -> Result<Vec<f64>>;

    /// Apply accumulated weight deltas, scaled by `lrate_multiplier`.
    fn commit_weight_update(&mut self, lrate_multiplier: f64);

    /// Reset transient activation traces at trial start. Weights persist.
    fn reset_decay_state(&mut self);
}

#[derive(Clone, Debug)]
struct PhaseSnapshot {
    ca3: Vec<f64>,
    ca1: Vec<f64>,
    ec_out: Vec<f64>,
}

/// Serializable weight state of a [`HebbianEngine`].
///
/// Saved once per epoch by the runner when snapshotting is enabled; loading
/// reconstructs an engine with identical recall behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSnapshot {
    width: usize,
    seed: u64,
    weights: Vec<f64>,
}

/// A deterministic one-shot Hebbian auto-associator.
///
/// Dynamics per cycle, over the flat pattern width:
///
/// - `dg` is a fixed seeded permutation of the input (the separation code);
/// - CA3 drive is the weight-mediated completion of the input plus the
///   mossy-scaled detonator contribution of `dg`, max-normalized to [0, 1];
/// - CA1 blends the direct input (perforant scale) with CA3 (schaffer
///   scale), clamped to [0, 1];
/// - the output layer mirrors CA1 unless explicitly clamped.
///
/// Learning is one-shot: the last applied input is stored at
/// `commit_weight_update` as an outer product of its separation-blended key
/// with itself.
pub struct HebbianEngine {
    width: usize,
    seed: u64,
    weights: Vec<f64>,
    permutation: Vec<usize>,
    input: Vec<f64>,
    ca3: Vec<f64>,
    ca1: Vec<f64>,
    out_clamp: Option<Vec<f64>>,
    pending: Option<Vec<f64>>,
    snapshots: [Option<PhaseSnapshot>; 4],
    g_direct: f64,
    g_assoc: f64,
    g_sep: f64,
}

impl HebbianEngine {
    /// Build an engine shaped for `layout`.
    pub fn new(layout: &PatternLayout, seed: u64) -> Self {
        let width = layout.width();
        Self {
            width,
            seed,
            weights: vec![0.0; width * width],
            permutation: Self::separation_permutation(width, seed),
            input: vec![0.0; width],
            ca3: vec![0.0; width],
            ca1: vec![0.0; width],
            out_clamp: None,
            pending: None,
            snapshots: [None, None, None, None],
            g_direct: 1.0,
            g_assoc: 0.0,
            g_sep: 1.0,
        }
    }

    /// The flat unit width this engine was built for.
    pub fn width(&self) -> usize {
        self.width
    }

    fn separation_permutation(width: usize, seed: u64) -> Vec<usize> {
        let mut hasher = Sha256::new();
        hasher.update(seed.to_le_bytes());
        hasher.update(b"dg_projection");
        let hash = hasher.finalize();
        let derived = u64::from_le_bytes(hash[0..8].try_into().unwrap());

        let mut rng = ChaCha8Rng::seed_from_u64(derived);
        let mut perm: Vec<usize> = (0..width).collect();
        perm.shuffle(&mut rng);
        perm
    }

    fn separation_code(&self, x: &[f64]) -> Vec<f64> {
        self.permutation.iter().map(|&i| x[i]).collect()
    }

    fn current_out(&self) -> Vec<f64> {
        match &self.out_clamp {
            Some(v) => v.clone(),
            None => self.ca1.clone(),
        }
    }

    /// Capture the current weight state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            width: self.width,
            seed: self.seed,
            weights: self.weights.clone(),
        }
    }

    /// Rebuild an engine from a snapshot.
    pub fn from_snapshot(snap: EngineSnapshot) -> Self {
        let width = snap.width;
        Self {
            width,
            seed: snap.seed,
            weights: snap.weights,
            permutation: Self::separation_permutation(width, snap.seed),
            input: vec![0.0; width],
            ca3: vec![0.0; width],
            ca1: vec![0.0; width],
            out_clamp: None,
            pending: None,
            snapshots: [None, None, None, None],
            g_direct: 1.0,
            g_assoc: 0.0,
            g_sep: 1.0,
        }
    }

    /// Persist the weight state to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(&self.snapshot())?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load an engine from a JSON weight file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let snap: EngineSnapshot = serde_json::from_str(&json)?;
        Ok(Self::from_snapshot(snap))
    }
}

impl Engine for HebbianEngine {
    fn apply_input(&mut self, pattern: &Pattern, slots: &[&str]) -> Result<()> {
        if pattern.layout().width() != self.width {
            return Err(ReverieError::ShapeMismatch {
                expected: self.width,
                got: pattern.layout().width(),
            });
        }

        self.input.fill(0.0);
        self.out_clamp = None;
        for &name in slots {
            let (_, offset) = pattern.layout().slot(name)?;
            let fill = pattern.fill(name)?;
            for (i, &v) in fill.data().iter().enumerate() {
                self.input[offset + i] = v as f64;
            }
        }
        // The most recently applied input is the study trace a later
        // commit_weight_update will store.
        self.pending = Some(self.input.clone());
        Ok(())
    }

    fn clamp_layer(&mut self, layer: &str, values: &[f64]) -> Result<()> {
        if values.len() != self.width {
            return Err(ReverieError::ShapeMismatch {
                expected: self.width,
                got: values.len(),
            });
        }
        match layer {
            layers::EC_IN => {
                self.input = values.to_vec();
                Ok(())
            }
            layers::EC_OUT => {
                self.out_clamp = Some(values.to_vec());
                Ok(())
            }
            other => Err(ReverieError::UnknownLayer(other.to_string())),
        }
    }

    fn step_cycle(&mut self) {
        let w = self.width;
        let dg = self.separation_code(&self.input);

        // CA3 drive: weight-mediated completion of the (separation-blended)
        // input plus the mossy detonator contribution.
        let mut net = vec![0.0f64; w];
        for i in 0..w {
            let u = self.input[i] + self.g_sep * dg[i];
            if u == 0.0 {
                continue;
            }
            let row = &self.weights[i * w..(i + 1) * w];
            for (j, &wij) in row.iter().enumerate() {
                net[j] += u * wij;
            }
        }
        for j in 0..w {
            net[j] += self.g_sep * dg[j];
        }

        let max = net.iter().cloned().fold(0.0f64, f64::max);
        if max > 1e-10 {
            for j in 0..w {
                self.ca3[j] = net[j] / max;
            }
        } else {
            self.ca3.fill(0.0);
        }

        for j in 0..w {
            self.ca1[j] = (self.g_direct * self.input[j] + self.g_assoc * self.ca3[j])
                .clamp(0.0, 1.0);
        }
    }

    fn finish_phase(&mut self, phase: TrialPhase) {
        self.snapshots[phase.index()] = Some(PhaseSnapshot {
            ca3: self.ca3.clone(),
            ca1: self.ca1.clone(),
            ec_out: self.current_out(),
        });
    }

    fn set_pathway_scale(&mut self, pathway: &str, value: f64) -> Result<()> {
        match pathway {
            pathways::PERFORANT => self.g_direct = value,
            pathways::SCHAFFER => self.g_assoc = value,
            pathways::MOSSY => self.g_sep = value,
            other => return Err(ReverieError::UnknownPathway(other.to_string())),
        }
        Ok(())
    }

    fn read_activation(&self, layer: &str, view: ActivationView) -> Result<Vec<f64>> {
        match view {
            ActivationView::Current => match layer {
                layers::EC_IN => Ok(self.input.clone()),
                layers::DG => Ok(self.separation_code(&self.input)),
                layers::CA3 => Ok(self.ca3.clone()),
                layers::CA1 => Ok(self.ca1.clone()),
                layers::EC_OUT => Ok(self.current_out()),
                other => Err(ReverieError::UnknownLayer(other.to_string())),
            },
            ActivationView::PhaseEnd(phase) => {
                let snap = self.snapshots[phase.index()].as_ref().ok_or_else(|| {
                    ReverieError::EmptyInput(format!("no snapshot recorded for {:?}", phase))
                })?;
                match layer {
                    layers::CA3 => Ok(snap.ca3.clone()),
                    layers::CA1 => Ok(snap.ca1.clone()),
                    layers::EC_OUT => Ok(snap.ec_out.clone()),
                    layers::EC_IN | layers::DG => Err(ReverieError::EmptyInput(format!(
                        "layer {} is not snapshotted per phase",
                        layer
                    ))),
                    other => Err(ReverieError::UnknownLayer(other.to_string())),
                }
            }
        }
    }

    fn commit_weight_update(&mut self, lrate_multiplier: f64) {
        let Some(trace) = self.pending.take() else {
            return;
        };
        let w = self.width;
        let dg = self.separation_code(&trace);
        // The stored key blends the trace with its separation code, so the
        // mossy scale at study time shapes how specific the association is.
        let key: Vec<f64> = trace
            .iter()
            .zip(dg.iter())
            .map(|(&x, &d)| (x + self.g_sep * d).clamp(0.0, 1.0))
            .collect();

        for i in 0..w {
            if key[i] == 0.0 {
                continue;
            }
            let row = &mut self.weights[i * w..(i + 1) * w];
            for (j, &xj) in trace.iter().enumerate() {
                if xj > 0.0 {
                    row[j] += lrate_multiplier * key[i] * xj;
                }
            }
        }
    }

    fn reset_decay_state(&mut self) {
        self.input.fill(0.0);
        self.ca3.fill(0.0);
        self.ca1.fill(0.0);
        self.out_clamp = None;
        self.pending = None;
        self.snapshots = [None, None, None, None];
    }
}
