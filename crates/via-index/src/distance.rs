//! Distance metrics for vector comparison.
//!
//! Every metric is expressed as a **distance**: lower means closer. The same
//! metric is recorded in the index and applied to both stored vectors and
//! queries, so rankings never mix conventions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric used by a [`VectorIndex`](crate::VectorIndex).
///
/// - **Cosine**: `1 - cos(a, b)`, range `[0, 2]`. Default; suited to text
///   embeddings whose magnitude carries no meaning.
/// - **Euclidean**: L2 distance, range `[0, inf)`.
/// - **DotProduct**: negated inner product, for pre-normalized vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance.
    #[default]
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Negated dot product.
    DotProduct,
}

impl DistanceMetric {
    /// Compute the distance between two vectors of equal length.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::DotProduct => -dot_product(a, b),
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            "dot" | "dot_product" | "inner" => Ok(DistanceMetric::DotProduct),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
