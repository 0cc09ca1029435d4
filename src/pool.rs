//! Vector pools: named vocabularies of sparse feature vectors.
//!
//! A [`VectorPool`] maps a symbolic name to an ordered sequence of
//! [`FeatureVector`]s (one vocabulary entry can hold one vector per list
//! item). Generation is deterministic: the RNG for each entry is seeded from
//! SHA-256(global_seed || name), so the same seed and the same call sequence
//! reproduce identical pools across runs and machines.
//!
//! # Permuted-binary generation
//!
//! Vectors generated together under [`PoolOptions`] carry two invariants:
//!
//! - every vector has exactly `round(dimensions * active_fraction)` active
//!   components;
//! - any two vectors in the batch share at most
//!   `(1 - min_diff_pct) * active_count` active components (the pairwise
//!   dissimilarity floor). Candidates violating the floor are reshuffled and
//!   retried until it holds.

use crate::error::{ReverieError, Result};
use crate::vector::FeatureVector;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Options for permuted-binary generation.
#[derive(Clone, Copy, Debug)]
pub struct PoolOptions {
    /// Target fraction of active components per vector
    pub active_fraction: f64,
    /// Minimum fraction of active components by which any two vectors in a
    /// batch must differ
    pub min_diff_pct: f64,
    /// Reshuffle budget before generation gives up
    pub max_attempts: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            active_fraction: 0.2,
            min_diff_pct: 0.5,
            max_attempts: 10_000,
        }
    }
}

/// A named collection of sparse feature vectors.
pub struct VectorPool {
    dimensions: usize,
    global_seed: u64,
    entries: HashMap<String, Vec<FeatureVector>>,
}

impl VectorPool {
    /// Create a new pool with the default seed.
    pub fn new(dimensions: usize) -> Self {
        Self::with_seed(dimensions, 0)
    }

    /// Create a new pool with a specific global seed.
    pub fn with_seed(dimensions: usize, global_seed: u64) -> Self {
        Self {
            dimensions,
            global_seed,
            entries: HashMap::new(),
        }
    }

    /// Get the dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Derive the per-entry RNG from the global seed and the entry name.
    fn entry_rng(&self, name: &str) -> ChaCha8Rng {
        let mut hasher = Sha256::new();
        hasher.update(self.global_seed.to_le_bytes());
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();
        let seed = u64::from_le_bytes(hash[0..8].try_into().unwrap());
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Generate `count` permuted-binary vectors under `opts` and store them
    /// under `name`, replacing any previous entry of that name.
    ///
    /// Returns the generated vectors. Fails with
    /// [`ReverieError::GenerationExhausted`] if the pairwise
    /// minimum-difference floor cannot be satisfied within the attempt
    /// budget, and with [`ReverieError::EmptyInput`] if the active fraction
    /// rounds to zero components.
    pub fn add_permuted(
        &mut self,
        name: &str,
        count: usize,
        opts: PoolOptions,
    ) -> Result<&[FeatureVector]> {
        let active = (self.dimensions as f64 * opts.active_fraction).round() as usize;
        if active == 0 || active > self.dimensions {
            return Err(ReverieError::EmptyInput(format!(
                "active fraction {} yields {} active components",
                opts.active_fraction, active
            )));
        }
        // Two vectors of equal active count sharing at most `max_shared`
        // active components differ in at least min_diff_pct * active of them.
        let max_shared = ((1.0 - opts.min_diff_pct) * active as f64).floor() as usize;

        let mut rng = self.entry_rng(name);
        let mut batch: Vec<FeatureVector> = Vec::with_capacity(count);
        let mut attempts = 0usize;

        while batch.len() < count {
            if attempts >= opts.max_attempts {
                return Err(ReverieError::GenerationExhausted {
                    name: name.to_string(),
                    attempts,
                });
            }
            attempts += 1;

            let indices = sample(&mut rng, self.dimensions, active).into_vec();
            let candidate = FeatureVector::from_active(self.dimensions, &indices);

            let ok = batch
                .iter()
                .all(|prior| candidate.shared_active(prior) <= max_shared);
            if ok {
                batch.push(candidate);
            }
        }

        self.entries.insert(name.to_string(), batch);
        Ok(self.entries.get(name).unwrap())
    }

    /// Get an entry's vectors by name.
    pub fn get(&self, name: &str) -> Option<&[FeatureVector]> {
        self.entries.get(name).map(|v| v.as_slice())
    }

    /// Get an entry's vectors by name, failing if the entry does not exist.
    pub fn entry(&self, name: &str) -> Result<&[FeatureVector]> {
        self.get(name)
            .ok_or_else(|| ReverieError::UnknownPoolEntry(name.to_string()))
    }

    /// Names of all entries.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
