use serde::{Deserialize, Serialize};

/// One face found in an image by the upstream detector.
///
/// Bounding box corners are float pixels with `x2 > x1` and `y2 > y1`.
/// Everything beyond the box is an optional auxiliary signal: detectors
/// differ in what they report, and the scoring heuristics degrade to
/// defaults for whatever is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Detection confidence in [0, 1], if the detector reports one.
    pub confidence: Option<f32>,
    /// Head pose as [pitch, yaw, roll] in degrees; (0, 0, 0) is frontal.
    pub pose: Option<[f32; 3]>,
    /// Ordered 2-D landmark points; the first two are treated as
    /// left eye / right eye when estimating frontality.
    pub landmarks: Option<Vec<(f32, f32)>>,
    /// Raw embedding for this face, if the detector extracted one.
    pub embedding: Option<Embedding>,
}

impl Detection {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Bounding-box area in pixel².
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Width/height ratio, or 0.0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f32 {
        let h = self.height();
        if h > 0.0 {
            self.width() / h
        } else {
            0.0
        }
    }
}

/// Face embedding vector (typically 512-dimensional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean (L2) norm of the vector.
    pub fn l2_norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Dot product. Dimensionality agreement is the caller's contract.
    pub fn dot(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Population standard deviation of the components.
    pub fn stddev(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let n = self.values.len() as f32;
        let mean = self.values.iter().sum::<f32>() / n;
        let var = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        var.sqrt()
    }

    /// Enforce embedding invariants: unit L2 norm and components in [-1, 1].
    ///
    /// A zero vector is left as-is (degenerate but valid). A dimensionality
    /// other than `expected_dim` is logged and processed anyway; mismatched
    /// embeddings are only rejected when they meet at verification.
    pub fn into_normalized(mut self, expected_dim: usize) -> Embedding {
        let norm = self.l2_norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }

        if self.values.len() != expected_dim {
            tracing::warn!(
                got = self.values.len(),
                expected = expected_dim,
                "unexpected embedding dimensionality"
            );
        }

        for v in &mut self.values {
            *v = v.clamp(-1.0, 1.0);
        }

        self
    }
}

/// Outcome of a single probe-vs-reference verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub matched: bool,
    /// Final ensemble score in [0, 1].
    pub confidence: f32,
    /// Cosine similarity metric, normalized to [0, 1].
    pub cosine: f32,
    /// Dot-product similarity metric, normalized to [0, 1].
    pub dot_product: f32,
    /// Euclidean similarity metric, normalized to [0, 1].
    pub euclidean: f32,
}

/// An enrolled identity with its fused embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledModel {
    pub id: String,
    pub name: String,
    pub embedding: Embedding,
}

/// Result of identifying a probe against a gallery of enrolled models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyResult {
    pub matched: bool,
    /// Best ensemble similarity seen across the gallery [0, 1].
    pub similarity: f32,
    /// ID of the matched model (if any).
    pub model_id: Option<String>,
    /// Name of the matched model (if any).
    pub model_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: None,
            pose: None,
            landmarks: None,
            embedding: None,
        }
    }

    #[test]
    fn test_detection_geometry() {
        let d = bbox(10.0, 20.0, 110.0, 100.0);
        assert!((d.width() - 100.0).abs() < 1e-6);
        assert!((d.height() - 80.0).abs() < 1e-6);
        assert!((d.area() - 8000.0).abs() < 1e-3);
        assert!((d.aspect_ratio() - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_unit_norm() {
        let e = Embedding::new(vec![3.0, 4.0]).into_normalized(2);
        assert!((e.l2_norm() - 1.0).abs() < 1e-6);
        assert!(e.values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let e = Embedding::new(vec![0.0, 0.0, 0.0]).into_normalized(3);
        assert!(e.values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_wrong_dim_still_processed() {
        // Dimensionality mismatch is a warning, not a failure.
        let e = Embedding::new(vec![1.0, 2.0, 2.0]).into_normalized(512);
        assert_eq!(e.len(), 3);
        assert!((e.l2_norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_large_embedding() {
        let e = Embedding::new(vec![2.0; 512]).into_normalized(512);
        assert!((e.l2_norm() - 1.0).abs() < 1e-6);
        assert!(e.values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_dot_and_distance() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        assert!(a.dot(&b).abs() < 1e-6);
        assert!((a.euclidean_distance(&b) - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_stddev() {
        // Components {1, -1}: mean 0, variance 1, stddev 1.
        let e = Embedding::new(vec![1.0, -1.0]);
        assert!((e.stddev() - 1.0).abs() < 1e-6);
        // Constant vector has zero spread.
        let c = Embedding::new(vec![0.5; 8]);
        assert!(c.stddev().abs() < 1e-6);
    }
}
