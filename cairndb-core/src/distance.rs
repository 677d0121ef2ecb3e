//! Distance metrics for ranking stored records against a query.
//!
//! Every metric is symmetric, non-negative and zero for identical vectors,
//! so lower always means more similar and query results can be sorted
//! ascending regardless of the metric.

use serde::{Deserialize, Serialize};

/// Supported distance metrics. Fixed per collection at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity), in `[0, 2]`.
    #[default]
    Cosine,
    /// Euclidean distance (L2 norm of the difference).
    Euclidean,
    /// Squared Euclidean distance. Same ranking as `Euclidean`, no sqrt.
    SquaredEuclidean,
}

impl DistanceMetric {
    /// Computes the distance between two vectors using this metric.
    ///
    /// Callers validate dimensions beforehand; extra trailing components of
    /// the longer slice are ignored.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::SquaredEuclidean => euclidean_distance_squared(a, b),
        }
    }

    /// Short lowercase name, as used in the catalog manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::SquaredEuclidean => "squared_euclidean",
        }
    }
}

/// Computes Euclidean (L2) distance between two vectors.
///
/// Formula: sqrt(sum((a[i] - b[i])^2))
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    euclidean_distance_squared(a, b).sqrt()
}

/// Computes squared Euclidean distance.
#[inline]
pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Computes cosine distance between two vectors.
///
/// Formula: 1 - (a · b) / (||a|| * ||b||), clamped to `[0, 2]`.
///
/// Two zero vectors are identical (distance 0); a zero vector against a
/// non-zero one has no direction and scores 1.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 && norm_b == 0.0 {
        return 0.0;
    }
    let denominator = norm_a * norm_b;
    if denominator == 0.0 {
        return 1.0;
    }

    (1.0 - dot / denominator).clamp(0.0, 2.0)
}

/// Computes dot product (inner product) between two vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
        assert!((euclidean_distance_squared(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_same_vector() {
        let a = [1.0, 2.0, 3.0];
        assert!(euclidean_distance(&a, &a) < 1e-10);
    }

    #[test]
    fn test_cosine_distance_same_direction() {
        let a = [1.0, 0.0];
        let b = [2.0, 0.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_opposite() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vectors() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_cosine_never_negative() {
        // Rounding can push 1 - cos slightly below zero for near-identical inputs.
        let a = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        assert!(cosine_distance(&a, &a) >= 0.0);
    }

    #[test]
    fn test_distance_metric_compute() {
        let a = [3.0, 4.0];
        let b = [0.0, 0.0];

        assert!((DistanceMetric::Euclidean.compute(&a, &b) - 5.0).abs() < 1e-6);
        assert!((DistanceMetric::SquaredEuclidean.compute(&a, &b) - 25.0).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.compute(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_is_cosine() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Cosine);
    }

    #[test]
    fn test_metric_serde_names() {
        let json = serde_json::to_string(&DistanceMetric::SquaredEuclidean).unwrap();
        assert_eq!(json, "\"squared_euclidean\"");
        let metric: DistanceMetric = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(metric, DistanceMetric::Cosine);
    }
}
