//! Calibration constants for the scoring heuristics.
//!
//! The filter thresholds, selector weights, and ensemble weights are emergent
//! tuning, not principled design. They live in one deserializable struct so a
//! deployment can adjust its operating point from a TOML file instead of a
//! rebuild; the defaults reproduce the tuned values exactly.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("cannot read calibration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad calibration TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Full calibration set, with one section per engine stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Expected embedding dimensionality of the upstream model.
    pub embedding_dim: usize,
    pub filter: FilterCalibration,
    pub selector: SelectorCalibration,
    pub verify: VerifyCalibration,
}

/// `[filter]` section: candidate quality checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterCalibration {
    /// Minimum detection confidence (check passes when absent).
    pub min_confidence: f32,
    /// Minimum bounding-box area in pixel².
    pub min_face_area: f32,
    /// Accepted width/height range for a face box.
    pub aspect_ratio_min: f32,
    pub aspect_ratio_max: f32,
    /// Minimum landmark-bbox area as a fraction of face-bbox area.
    pub min_landmark_coverage: f32,
}

/// `[selector]` section: composite-score weights and fallbacks.
///
/// The component weights sum to 1.0. The default confidence score is already
/// pre-weighted (0.35, not 0.35 x weight); the tuned constants carry this
/// asymmetry and changing it shifts every ranking.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorCalibration {
    pub confidence_weight: f32,
    pub default_confidence_score: f32,
    pub size_weight: f32,
    /// Face area the size component considers ideal.
    pub optimal_area: f32,
    /// Divisor of the linear penalty applied past the optimal area.
    pub oversize_penalty_divisor: f32,
    /// Floor of the size component for oversized faces.
    pub min_oversize_score: f32,
    pub pose_weight: f32,
    /// Aggregate pose deviation (degrees) at which the pose score hits zero.
    pub max_pose_deviation_deg: f32,
    pub default_pose_score: f32,
    pub embedding_weight: f32,
    /// Embedding norm is divided by this before capping at the weight.
    pub embedding_norm_divisor: f32,
    pub default_embedding_score: f32,
}

/// `[verify]` section: ensemble weights and the match boost.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifyCalibration {
    pub cosine_weight: f32,
    pub dot_weight: f32,
    pub euclidean_weight: f32,
    /// Combined score above which the boost fires.
    pub boost_trigger: f32,
    /// Multiplicative boost applied above the trigger, capped at 1.0.
    pub boost_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            embedding_dim: 512,
            filter: FilterCalibration::default(),
            selector: SelectorCalibration::default(),
            verify: VerifyCalibration::default(),
        }
    }
}

impl Default for FilterCalibration {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            min_face_area: 1600.0,
            aspect_ratio_min: 0.7,
            aspect_ratio_max: 1.4,
            min_landmark_coverage: 0.1,
        }
    }
}

impl Default for SelectorCalibration {
    fn default() -> Self {
        Self {
            confidence_weight: 0.4,
            default_confidence_score: 0.35,
            size_weight: 0.3,
            optimal_area: 12800.0,
            oversize_penalty_divisor: 100_000.0,
            min_oversize_score: 0.15,
            pose_weight: 0.2,
            max_pose_deviation_deg: 90.0,
            default_pose_score: 0.1,
            embedding_weight: 0.1,
            embedding_norm_divisor: 10.0,
            default_embedding_score: 0.05,
        }
    }
}

impl Default for VerifyCalibration {
    fn default() -> Self {
        Self {
            cosine_weight: 0.7,
            dot_weight: 0.2,
            euclidean_weight: 0.1,
            boost_trigger: 0.6,
            boost_factor: 1.05,
        }
    }
}

impl Calibration {
    /// Parse a calibration from TOML. Omitted sections/keys keep defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, CalibrationError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a calibration TOML file.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tuned_values() {
        let cal = Calibration::default();
        assert_eq!(cal.embedding_dim, 512);
        assert!((cal.filter.min_confidence - 0.3).abs() < 1e-6);
        assert!((cal.filter.min_face_area - 1600.0).abs() < 1e-6);
        assert!((cal.selector.optimal_area - 12800.0).abs() < 1e-6);
        assert!((cal.selector.default_confidence_score - 0.35).abs() < 1e-6);
        assert!((cal.verify.cosine_weight - 0.7).abs() < 1e-6);
        assert!((cal.verify.boost_factor - 1.05).abs() < 1e-6);
        // Selector weights sum to 1.0.
        let sum = cal.selector.confidence_weight
            + cal.selector.size_weight
            + cal.selector.pose_weight
            + cal.selector.embedding_weight;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cal = Calibration::from_toml_str(
            r#"
            embedding_dim = 128

            [verify]
            boost_factor = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(cal.embedding_dim, 128);
        assert!((cal.verify.boost_factor - 1.0).abs() < 1e-6);
        // Untouched sections keep defaults.
        assert!((cal.verify.cosine_weight - 0.7).abs() < 1e-6);
        assert!((cal.selector.optimal_area - 12800.0).abs() < 1e-6);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(Calibration::from_toml_str("embedding_dim = \"many\"").is_err());
    }
}
