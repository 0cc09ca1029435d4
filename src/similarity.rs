//! Similarity metrics for sparse binary vectors.
//!
//! When compiled with the `simd` feature, dot-product based metrics use
//! SIMD-accelerated implementations on supported hardware.

use crate::vector::FeatureVector;

/// Available similarity metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Cosine similarity (scale-invariant)
    Cosine,
    /// Dot product (for binary vectors: count of shared active components)
    Dot,
    /// Hamming similarity (agreement rate over all components)
    Hamming,
    /// Overlap similarity: agreement among components active in either
    /// vector (Jaccard similarity of the active sets)
    Overlap,
}

/// Similarity computation for feature vectors.
pub struct Similarity;

impl Similarity {
    /// Compute similarity using the specified metric.
    pub fn compute(a: &FeatureVector, b: &FeatureVector, metric: Metric) -> f64 {
        match metric {
            Metric::Cosine => Self::cosine(a, b),
            Metric::Dot => Self::dot(a, b),
            Metric::Hamming => Self::hamming(a, b),
            Metric::Overlap => Self::overlap(a, b),
        }
    }

    /// Cosine similarity: dot(a, b) / (||a|| * ||b||).
    ///
    /// For binary vectors this is `shared / sqrt(|A| * |B|)`, in [0, 1].
    #[cfg(feature = "simd")]
    pub fn cosine(a: &FeatureVector, b: &FeatureVector) -> f64 {
        use simsimd::SpatialSimilarity;
        let dot_ab = i8::dot(a.data(), b.data()).unwrap_or(0.0);
        let dot_aa = i8::dot(a.data(), a.data()).unwrap_or(0.0);
        let dot_bb = i8::dot(b.data(), b.data()).unwrap_or(0.0);

        let norm_product = (dot_aa * dot_bb).sqrt();
        if norm_product < 1e-10 {
            return 0.0;
        }

        dot_ab / norm_product
    }

    #[cfg(not(feature = "simd"))]
    pub fn cosine(a: &FeatureVector, b: &FeatureVector) -> f64 {
        let dot = Self::dot_raw(a, b);
        let norm_a = (a.active_count() as f64).sqrt();
        let norm_b = (b.active_count() as f64).sqrt();

        if norm_a < 1e-10 || norm_b < 1e-10 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    /// Raw dot product.
    #[cfg(feature = "simd")]
    pub fn dot(a: &FeatureVector, b: &FeatureVector) -> f64 {
        use simsimd::SpatialSimilarity;
        i8::dot(a.data(), b.data()).unwrap_or(0.0)
    }

    #[cfg(not(feature = "simd"))]
    pub fn dot(a: &FeatureVector, b: &FeatureVector) -> f64 {
        Self::dot_raw(a, b)
    }

    #[allow(dead_code)]
    fn dot_raw(a: &FeatureVector, b: &FeatureVector) -> f64 {
        assert_eq!(
            a.dimensions(),
            b.dimensions(),
            "Dimension mismatch in dot product"
        );

        a.data()
            .iter()
            .zip(b.data().iter())
            .map(|(&x, &y)| (x as i64) * (y as i64))
            .sum::<i64>() as f64
    }

    /// Hamming similarity: fraction of components that agree.
    ///
    /// Returns a value in [0, 1]. Note that for sparse vectors this is
    /// dominated by shared-inactive components; prefer [`Similarity::overlap`]
    /// when only active components matter.
    pub fn hamming(a: &FeatureVector, b: &FeatureVector) -> f64 {
        assert_eq!(
            a.dimensions(),
            b.dimensions(),
            "Dimension mismatch in hamming"
        );

        let matching = a
            .data()
            .iter()
            .zip(b.data().iter())
            .filter(|(&x, &y)| x == y)
            .count();

        matching as f64 / a.dimensions() as f64
    }

    /// Overlap similarity: agreement among components active in either vector.
    ///
    /// For binary vectors this is `|A ∩ B| / |A ∪ B|` over the active sets.
    /// Returns a value in [0, 1]; two vectors with no active components
    /// score 0.
    pub fn overlap(a: &FeatureVector, b: &FeatureVector) -> f64 {
        assert_eq!(
            a.dimensions(),
            b.dimensions(),
            "Dimension mismatch in overlap"
        );

        let mut shared = 0usize;
        let mut either = 0usize;

        for (&x, &y) in a.data().iter().zip(b.data().iter()) {
            if x != 0 || y != 0 {
                either += 1;
                if x != 0 && y != 0 {
                    shared += 1;
                }
            }
        }

        if either == 0 {
            return 0.0;
        }

        shared as f64 / either as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = FeatureVector::from_active(16, &[0, 3, 7, 12]);
        let sim = Similarity::cosine(&v, &v);
        assert!((sim - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_disjoint() {
        let a = FeatureVector::from_active(16, &[0, 1, 2, 3]);
        let b = FeatureVector::from_active(16, &[8, 9, 10, 11]);
        let sim = Similarity::cosine(&a, &b);
        assert!(sim.abs() < 1e-10);
    }

    #[test]
    fn test_dot_counts_shared() {
        let a = FeatureVector::from_active(16, &[0, 1, 2, 3]);
        let b = FeatureVector::from_active(16, &[2, 3, 4, 5]);
        assert!((Similarity::dot(&a, &b) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_hamming() {
        let a = FeatureVector::from_active(4, &[0, 2]);
        let b = FeatureVector::from_active(4, &[0, 3]);
        // components 0 and 1 agree, 2 and 3 differ
        assert!((Similarity::hamming(&a, &b) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_overlap_jaccard() {
        let a = FeatureVector::from_active(16, &[0, 1, 2, 3]);
        let b = FeatureVector::from_active(16, &[2, 3, 4, 5]);
        // |A ∩ B| = 2, |A ∪ B| = 6
        assert!((Similarity::overlap(&a, &b) - 2.0 / 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_overlap_empty_is_zero() {
        let a = FeatureVector::zeros(8);
        let b = FeatureVector::zeros(8);
        assert_eq!(Similarity::overlap(&a, &b), 0.0);
    }

    #[test]
    fn test_compute_dispatches() {
        let a = FeatureVector::from_active(16, &[0, 1, 2, 3]);
        let b = FeatureVector::from_active(16, &[2, 3, 4, 5]);
        for metric in [Metric::Cosine, Metric::Dot, Metric::Hamming, Metric::Overlap] {
            let direct = match metric {
                Metric::Cosine => Similarity::cosine(&a, &b),
                Metric::Dot => Similarity::dot(&a, &b),
                Metric::Hamming => Similarity::hamming(&a, &b),
                Metric::Overlap => Similarity::overlap(&a, &b),
            };
            let via_compute = Similarity::compute(&a, &b, metric);
            assert!((direct - via_compute).abs() < 1e-10);
        }
    }
}
