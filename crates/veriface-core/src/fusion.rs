//! Multi-capture fusion.
//!
//! Combines the embeddings extracted from several captures of one identity
//! into a single representative vector. Each capture is weighted by
//! norm x spread, favoring embeddings with both high magnitude and
//! non-degenerate component variance, and the fused vector is re-normalized
//! to unit norm.

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("capture embeddings have mixed dimensionality: expected {expected}, got {got}")]
    MixedDimensions { expected: usize, got: usize },
    #[error("capture weights sum to zero: every input embedding is degenerate")]
    DegenerateWeights,
    #[error("fused embedding has zero norm: capture vectors cancelled out")]
    DegenerateFusion,
}

/// One extracted capture: a normalized embedding plus the time it took to
/// produce it. Latency is observational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    pub embedding: Embedding,
    pub latency_ms: f64,
}

/// Fuse capture embeddings into one identity embedding.
///
/// Zero captures is a normal absent result. A single capture is returned
/// unchanged with no weighting computed. Degenerate inputs (all-zero
/// weights, or a fused vector of zero norm) signal an upstream defect and
/// surface as errors rather than being masked.
pub fn fuse(captures: &[Capture]) -> Result<Option<Capture>, FusionError> {
    if captures.is_empty() {
        return Ok(None);
    }
    if captures.len() == 1 {
        return Ok(Some(captures[0].clone()));
    }

    let dim = captures[0].embedding.len();
    for capture in &captures[1..] {
        if capture.embedding.len() != dim {
            return Err(FusionError::MixedDimensions {
                expected: dim,
                got: capture.embedding.len(),
            });
        }
    }

    let weights: Vec<f32> = captures
        .iter()
        .map(|c| c.embedding.l2_norm() * c.embedding.stddev())
        .collect();
    let weight_sum: f32 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(FusionError::DegenerateWeights);
    }

    let mut fused = vec![0.0f32; dim];
    for (capture, weight) in captures.iter().zip(&weights) {
        let w = weight / weight_sum;
        for (acc, v) in fused.iter_mut().zip(&capture.embedding.values) {
            *acc += w * v;
        }
    }

    let norm = fused.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= 0.0 {
        return Err(FusionError::DegenerateFusion);
    }
    for v in &mut fused {
        *v /= norm;
    }

    let mean_latency =
        captures.iter().map(|c| c.latency_ms).sum::<f64>() / captures.len() as f64;

    tracing::debug!(
        captures = captures.len(),
        mean_latency_ms = mean_latency,
        "captures fused"
    );

    Ok(Some(Capture {
        embedding: Embedding::new(fused),
        latency_ms: mean_latency,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(values: Vec<f32>, latency_ms: f64) -> Capture {
        Capture {
            embedding: Embedding::new(values),
            latency_ms,
        }
    }

    #[test]
    fn test_empty_input_is_absent() {
        assert!(fuse(&[]).unwrap().is_none());
    }

    #[test]
    fn test_single_capture_is_identity() {
        let c = capture(vec![0.6, 0.8, 0.0], 12.5);
        let fused = fuse(&[c.clone()]).unwrap().unwrap();
        assert_eq!(fused.embedding.values, c.embedding.values);
        assert!((fused.latency_ms - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_fused_embedding_is_unit_norm() {
        let captures = vec![
            capture(vec![1.0, 0.0, -0.5], 10.0),
            capture(vec![0.8, 0.2, -0.4], 20.0),
            capture(vec![0.9, -0.1, -0.6], 30.0),
        ];
        let fused = fuse(&captures).unwrap().unwrap();
        assert!((fused.embedding.l2_norm() - 1.0).abs() < 1e-6);
        assert!((fused.latency_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_captures_fuse_to_themselves() {
        let unit = vec![0.6, -0.8];
        let captures = vec![capture(unit.clone(), 5.0), capture(unit.clone(), 7.0)];
        let fused = fuse(&captures).unwrap().unwrap();
        for (a, b) in fused.embedding.values.iter().zip(&unit) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_higher_spread_capture_dominates() {
        // Same norm, but the first capture has far more component spread,
        // so the fused vector should lean toward it.
        let spread = capture(vec![1.0, -1.0, 0.0, 0.0], 1.0);
        let flat = capture(vec![0.70711, 0.70711, 0.0, 0.0], 1.0);
        let fused = fuse(&[spread.clone(), flat]).unwrap().unwrap();
        let toward_spread = fused.embedding.dot(&Embedding::new(
            vec![0.70711, -0.70711, 0.0, 0.0],
        ));
        assert!(toward_spread > 0.5, "fused leans {toward_spread}");
    }

    #[test]
    fn test_all_zero_captures_error() {
        let captures = vec![capture(vec![0.0, 0.0], 1.0), capture(vec![0.0, 0.0], 1.0)];
        assert!(matches!(
            fuse(&captures),
            Err(FusionError::DegenerateWeights)
        ));
    }

    #[test]
    fn test_cancelling_captures_error() {
        // Equal weights, exactly opposite vectors: the weighted sum is zero.
        let captures = vec![
            capture(vec![1.0, -1.0], 1.0),
            capture(vec![-1.0, 1.0], 1.0),
        ];
        assert!(matches!(fuse(&captures), Err(FusionError::DegenerateFusion)));
    }

    #[test]
    fn test_mixed_dimensions_error() {
        let captures = vec![capture(vec![1.0, 0.0], 1.0), capture(vec![1.0, 0.0, 0.0], 1.0)];
        assert!(matches!(
            fuse(&captures),
            Err(FusionError::MixedDimensions { expected: 2, got: 3 })
        ));
    }
}
