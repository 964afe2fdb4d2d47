//! Verification engine.
//!
//! Scores a probe embedding against a reference with an ensemble of three
//! [0, 1]-normalized similarity metrics (cosine 0.7, dot product 0.2,
//! Euclidean 0.1), applies a capped boost to already-likely matches, and
//! decides match/no-match against a caller-supplied threshold. Also sweeps
//! a gallery of enrolled models for 1:N identification.

use crate::calibration::{Calibration, VerifyCalibration};
use crate::types::{Embedding, EnrolledModel, IdentifyResult, VerificationResult};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("embedding dimensionality mismatch: probe has {probe} components, reference has {reference}")]
    DimensionMismatch { probe: usize, reference: usize },
}

/// Decide whether two embeddings represent the same identity.
///
/// The threshold is the caller's operating point (commonly 0.75-0.85); this
/// engine ships no default. Mismatched dimensionalities are a caller
/// contract violation and error out rather than being coerced.
pub fn verify(
    probe: &Embedding,
    reference: &Embedding,
    threshold: f32,
    cal: &Calibration,
) -> Result<VerificationResult, VerifyError> {
    if probe.len() != reference.len() {
        return Err(VerifyError::DimensionMismatch {
            probe: probe.len(),
            reference: reference.len(),
        });
    }

    let cosine = cosine_metric(probe, reference);
    let dot_product = dot_metric(probe, reference);
    let euclidean = euclidean_metric(probe, reference);

    let ensemble = cal.verify.cosine_weight * cosine
        + cal.verify.dot_weight * dot_product
        + cal.verify.euclidean_weight * euclidean;
    let confidence = apply_match_boost(ensemble, &cal.verify).clamp(0.0, 1.0);

    Ok(VerificationResult {
        matched: confidence >= threshold,
        confidence,
        cosine,
        dot_product,
        euclidean,
    })
}

/// Compare a probe against every enrolled model and keep the best score.
///
/// The whole gallery is always traversed, no early exit. Entries whose
/// embedding dimensionality does not match the probe are skipped with a
/// warning; a bad stored model must not abort the sweep.
pub fn identify(
    probe: &Embedding,
    gallery: &[EnrolledModel],
    threshold: f32,
    cal: &Calibration,
) -> IdentifyResult {
    let mut best_similarity = f32::NEG_INFINITY;
    let mut best_idx: Option<usize> = None;

    for (i, model) in gallery.iter().enumerate() {
        let result = match verify(probe, &model.embedding, threshold, cal) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(id = %model.id, error = %e, "skipping gallery entry");
                continue;
            }
        };
        if result.confidence > best_similarity {
            best_similarity = result.confidence;
            best_idx = Some(i);
        }
    }

    match best_idx {
        Some(idx) if best_similarity >= threshold => IdentifyResult {
            matched: true,
            similarity: best_similarity,
            model_id: Some(gallery[idx].id.clone()),
            model_name: Some(gallery[idx].name.clone()),
        },
        _ => IdentifyResult {
            matched: false,
            similarity: if best_similarity == f32::NEG_INFINITY {
                0.0
            } else {
                best_similarity
            },
            model_id: None,
            model_name: None,
        },
    }
}

/// Re-normalize to unit norm; a zero vector is returned unchanged.
fn unit(embedding: &Embedding) -> Embedding {
    let norm = embedding.l2_norm();
    if norm > 0.0 {
        Embedding::new(embedding.values.iter().map(|v| v / norm).collect())
    } else {
        embedding.clone()
    }
}

/// Cosine similarity mapped to [0, 1].
///
/// The raw dot product is clamped to [-1, 1] before the affine map so that
/// floating round-off cannot push the result outside the range.
fn cosine_metric(a: &Embedding, b: &Embedding) -> f32 {
    let dot = unit(a).dot(&unit(b)).clamp(-1.0, 1.0);
    (dot + 1.0) / 2.0
}

/// Dot-product similarity mapped to [0, 1].
///
/// Numerically this coincides with the cosine metric, but it is computed
/// independently on separately re-normalized copies and kept as a distinct
/// ensemble member for redundancy.
fn dot_metric(a: &Embedding, b: &Embedding) -> f32 {
    let dot = unit(a).dot(&unit(b)).clamp(-1.0, 1.0);
    (dot + 1.0) / 2.0
}

/// Euclidean similarity mapped to [0, 1].
///
/// Both inputs are unit-normalized first, so the pairwise distance is
/// bounded in [0, 2] and maps linearly onto [0, 1].
fn euclidean_metric(a: &Embedding, b: &Embedding) -> f32 {
    let distance = unit(a).euclidean_distance(&unit(b));
    (1.0 - distance / 2.0).max(0.0)
}

/// Post-processing boost for already-likely matches.
///
/// Fires only above the trigger and is capped at 1.0, so it can never pull
/// a failing score over a threshold at or below the trigger on its own.
/// Kept as a separate step so its effect on the decision boundary stays
/// auditable.
fn apply_match_boost(score: f32, cal: &VerifyCalibration) -> f32 {
    if score > cal.boost_trigger {
        (score * cal.boost_factor).min(1.0)
    } else {
        score
    }
}
