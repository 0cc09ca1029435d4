//! Feature vectors: the sparse binary building block of all stimuli.
//!
//! A [`FeatureVector`] is a fixed-length vector with components in {0, 1},
//! a target fraction of which are active. Internally stored as `i8` for
//! memory efficiency. Vectors are immutable once created; everything built
//! from them (pools, drift chains, patterns) inherits that immutability.

use std::ops::Index;

/// A fixed-length sparse binary vector with components in {0, 1}.
///
/// The number of active (== 1) components is an invariant for vectors
/// produced by the pool and drift generators: it never changes along a
/// drift chain.
#[derive(Clone, Debug)]
pub struct FeatureVector {
    data: Vec<i8>,
}

impl FeatureVector {
    /// Create an all-inactive vector of the given dimensionality.
    pub fn zeros(dimensions: usize) -> Self {
        Self {
            data: vec![0; dimensions],
        }
    }

    /// Create a vector from raw data, thresholding to {0, 1}.
    pub fn from_data(data: Vec<i8>) -> Self {
        let data = data.into_iter().map(|v| i8::from(v > 0)).collect();
        Self { data }
    }

    /// Create a vector with the given components active.
    ///
    /// Out-of-range indices are ignored; duplicates collapse.
    pub fn from_active(dimensions: usize, active: &[usize]) -> Self {
        let mut data = vec![0i8; dimensions];
        for &i in active {
            if i < dimensions {
                data[i] = 1;
            }
        }
        Self { data }
    }

    /// Get the dimensionality.
    pub fn dimensions(&self) -> usize {
        self.data.len()
    }

    /// Get the raw data as a slice.
    pub fn data(&self) -> &[i8] {
        &self.data
    }

    /// Number of active components.
    pub fn active_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Indices of active components, in ascending order.
    pub fn active_indices(&self) -> Vec<usize> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| (v != 0).then_some(i))
            .collect()
    }

    /// Whether component `i` is active.
    pub fn is_active(&self, i: usize) -> bool {
        self.data[i] != 0
    }

    /// Number of components active in both `self` and `other`.
    pub fn shared_active(&self, other: &FeatureVector) -> usize {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "Dimension mismatch in shared_active"
        );
        self.data
            .iter()
            .zip(other.data.iter())
            .filter(|(&a, &b)| a != 0 && b != 0)
            .count()
    }

    /// Convert to f64 values (for clamping engine layers).
    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v as f64).collect()
    }
}

impl Index<usize> for FeatureVector {
    type Output = i8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl PartialEq for FeatureVector {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for FeatureVector {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let v = FeatureVector::zeros(100);
        assert_eq!(v.dimensions(), 100);
        assert_eq!(v.active_count(), 0);
    }

    #[test]
    fn test_from_data_thresholds() {
        let v = FeatureVector::from_data(vec![1, 0, 5, -3, 1]);
        assert_eq!(v.data(), &[1, 0, 1, 0, 1]);
        assert_eq!(v.active_count(), 3);
    }

    #[test]
    fn test_from_active() {
        let v = FeatureVector::from_active(8, &[1, 4, 6]);
        assert_eq!(v.active_indices(), vec![1, 4, 6]);
        assert!(v.is_active(4));
        assert!(!v.is_active(0));
    }

    #[test]
    fn test_shared_active() {
        let a = FeatureVector::from_active(10, &[0, 2, 4, 6]);
        let b = FeatureVector::from_active(10, &[2, 3, 6, 9]);
        assert_eq!(a.shared_active(&b), 2);
    }

    #[test]
    fn test_to_f64() {
        let v = FeatureVector::from_active(4, &[1, 3]);
        assert_eq!(v.to_f64(), vec![0.0, 1.0, 0.0, 1.0]);
    }
}
