//! Temporal-context drift chains.
//!
//! A [`DriftChain`] is an ordered sequence of sparse feature vectors whose
//! pairwise similarity decays approximately geometrically with chain
//! distance. Each step perturbs the previous vector: every active component
//! is switched off with probability `rate`, and an equal number of inactive
//! components are switched on, so the active count is preserved exactly.
//!
//! # Determinism and resumption
//!
//! Generation is a pure function of (current vector, rate, RNG cursor).
//! Continuing a chain from `chain[o]` with a generator whose RNG cursor sits
//! where the original generator's cursor sat after producing `chain[o]`
//! reproduces the original continuation bit-for-bit — this is what makes
//! derived sub-chains ("resume drifting where the first list left off")
//! exact rather than statistical.
//!
//! # Rate families
//!
//! [`DriftFamily`] builds K independently drifting context channels with
//! multiplicatively spaced rates `r_k = r0 / base^k`, all derived from one
//! seed via ChaCha's independent streams. Smaller rates drift slower; a rate
//! near 1.0 scrambles the chain into statistically independent vectors
//! within a few steps, which is an accepted operating point, not an error.

use crate::vector::FeatureVector;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stateful generator for drift chains.
///
/// Holds the decay rate and the RNG cursor; the current vector is whatever
/// the caller passes to [`DriftGenerator::step`] or [`DriftGenerator::chain`].
pub struct DriftGenerator {
    rng: ChaCha8Rng,
    rate: f64,
}

impl DriftGenerator {
    /// Create a generator on stream 0 of `seed`.
    ///
    /// `rate` is the per-step probability that a given active component is
    /// replaced; it must lie in (0, 1].
    pub fn new(seed: u64, rate: f64) -> Self {
        Self::with_stream(seed, 0, rate)
    }

    /// Create a generator on a specific ChaCha stream of `seed`.
    ///
    /// Different streams of the same seed are statistically decorrelated,
    /// which is how a [`DriftFamily`] shares one seed across channels.
    pub fn with_stream(seed: u64, stream: u64, rate: f64) -> Self {
        assert!(
            rate > 0.0 && rate <= 1.0,
            "drift rate must lie in (0, 1], got {}",
            rate
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng, rate }
    }

    /// The decay rate of this generator.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw a fresh sparse seed vector from this generator's stream.
    pub fn seed_vector(&mut self, dimensions: usize, active_count: usize) -> FeatureVector {
        let indices = sample(&mut self.rng, dimensions, active_count).into_vec();
        FeatureVector::from_active(dimensions, &indices)
    }

    /// Produce the next vector in a chain by perturbing `current`.
    ///
    /// Each active component is dropped with probability `rate`; an equal
    /// number of inactive components are activated, chosen uniformly. The
    /// active count of the result equals that of `current` exactly.
    pub fn step(&mut self, current: &FeatureVector) -> FeatureVector {
        let active = current.active_indices();
        let inactive: Vec<usize> = (0..current.dimensions())
            .filter(|&i| !current.is_active(i))
            .collect();

        let mut kept: Vec<usize> = Vec::with_capacity(active.len());
        let mut dropped = 0usize;
        for &i in &active {
            if self.rng.gen_bool(self.rate) {
                dropped += 1;
            } else {
                kept.push(i);
            }
        }

        let replacements = dropped.min(inactive.len());
        if replacements > 0 {
            for idx in sample(&mut self.rng, inactive.len(), replacements).into_iter() {
                kept.push(inactive[idx]);
            }
        }
        // If the inactive set could not absorb every drop (pathologically
        // dense vectors), keep enough of the dropped components to hold the
        // count invariant.
        let deficit = dropped - replacements;
        if deficit > 0 {
            for &i in active.iter().rev() {
                if kept.len() >= active.len() {
                    break;
                }
                if !kept.contains(&i) {
                    kept.push(i);
                }
            }
        }

        FeatureVector::from_active(current.dimensions(), &kept)
    }

    /// Generate a chain of `len` vectors starting one step after `seed`.
    ///
    /// `chain[0]` is `step(seed)`; the seed itself is not part of the chain.
    pub fn chain(&mut self, seed: &FeatureVector, len: usize) -> DriftChain {
        let mut steps = Vec::with_capacity(len);
        let mut current = seed.clone();
        for _ in 0..len {
            current = self.step(&current);
            steps.push(current.clone());
        }
        DriftChain {
            steps,
            rate: self.rate,
        }
    }
}

/// An immutable ordered sequence of drifting context vectors.
#[derive(Clone, Debug)]
pub struct DriftChain {
    steps: Vec<FeatureVector>,
    rate: f64,
}

impl DriftChain {
    /// The vector at chain index `i`.
    ///
    /// Panics on out-of-range indices; chains are sized at dataset-build
    /// time, so an overrun is a programming error.
    pub fn get(&self, i: usize) -> &FeatureVector {
        &self.steps[i]
    }

    /// Chain length.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The decay rate the chain was generated with.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Iterate over the chain in order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.steps.iter()
    }

    /// Continue drifting from `chain[offset]`, producing `len` further
    /// vectors with `generator`.
    ///
    /// Equivalent to `generator.chain(self.get(offset), len)`: exactness with
    /// respect to the original generation requires the generator's RNG cursor
    /// to match the original cursor position after `chain[offset]`.
    pub fn derive(&self, generator: &mut DriftGenerator, offset: usize, len: usize) -> DriftChain {
        generator.chain(self.get(offset), len)
    }
}

/// A family of independently drifting context channels sharing one seed.
///
/// Channel k drifts at rate `r0 / base^k` on ChaCha stream k, so a single
/// seed yields a spectrum of time scales from fast-changing to near-static.
pub struct DriftFamily {
    channels: Vec<DriftGenerator>,
}

impl DriftFamily {
    /// Build `count` channels with rates `r0 / base^k`, k = 0..count-1.
    ///
    /// `base` must be >= 1.0 so rates stay within (0, 1].
    pub fn new(seed: u64, r0: f64, base: f64, count: usize) -> Self {
        assert!(base >= 1.0, "rate base must be >= 1.0, got {}", base);
        let channels = (0..count)
            .map(|k| {
                let rate = r0 / base.powi(k as i32);
                DriftGenerator::with_stream(seed, k as u64, rate)
            })
            .collect();
        Self { channels }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Mutable access to channel `k`.
    pub fn channel_mut(&mut self, k: usize) -> &mut DriftGenerator {
        &mut self.channels[k]
    }

    /// Generate one chain per channel, each from a fresh seed vector drawn
    /// from that channel's own stream.
    pub fn chains(
        &mut self,
        dimensions: usize,
        active_count: usize,
        len: usize,
    ) -> Vec<DriftChain> {
        self.channels
            .iter_mut()
            .map(|gen| {
                let seed = gen.seed_vector(dimensions, active_count);
                gen.chain(&seed, len)
            })
            .collect()
    }
}
