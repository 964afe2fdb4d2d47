//! Face selector.
//!
//! Ranks filtered detections by a composite quality score (confidence, size,
//! pose, embedding norm; weights 0.4/0.3/0.2/0.1) and picks the single best
//! face. The scan is stable: on a tie the first-seen detection wins.

use crate::calibration::{Calibration, SelectorCalibration};
use crate::types::Detection;

/// Pick the detection with the strictly greatest composite score.
///
/// Returns `None` only for an empty input; a singleton is always returned
/// regardless of its score.
pub fn select_best_face<'a>(
    detections: &'a [Detection],
    cal: &Calibration,
) -> Option<&'a Detection> {
    let mut best: Option<(&Detection, f32)> = None;

    for detection in detections {
        let score = composite_score(detection, &cal.selector);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((detection, score)),
        }
    }

    if let Some((_, score)) = best {
        tracing::debug!(
            candidates = detections.len(),
            score,
            "best face selected"
        );
    }
    best.map(|(detection, _)| detection)
}

/// Composite quality score: weighted sum of the four components.
///
/// Nominally in [0, 1] but not strictly bounded; each component substitutes
/// a fixed default when its input signal is absent.
pub fn composite_score(detection: &Detection, cal: &SelectorCalibration) -> f32 {
    confidence_component(detection, cal)
        + size_component(detection, cal)
        + pose_component(detection, cal)
        + embedding_component(detection, cal)
}

fn confidence_component(detection: &Detection, cal: &SelectorCalibration) -> f32 {
    match detection.confidence {
        Some(c) => c * cal.confidence_weight,
        // The default is already pre-weighted, not default x weight.
        None => cal.default_confidence_score,
    }
}

/// Size score peaks at the optimal area; oversized faces are penalized
/// linearly but floored, never driven below the floor.
fn size_component(detection: &Detection, cal: &SelectorCalibration) -> f32 {
    let area = detection.area();
    if area > cal.optimal_area {
        (cal.size_weight - (area - cal.optimal_area) / cal.oversize_penalty_divisor)
            .max(cal.min_oversize_score)
    } else {
        (area / cal.optimal_area).min(1.0) * cal.size_weight
    }
}

/// Frontal faces score highest. Prefers explicit pose angles, falls back to
/// eye-level symmetry from the first two landmarks, then to a default.
fn pose_component(detection: &Detection, cal: &SelectorCalibration) -> f32 {
    if let Some(pose) = detection.pose {
        let deviation = pose.iter().map(|a| a * a).sum::<f32>().sqrt();
        return (cal.pose_weight - deviation / cal.max_pose_deviation_deg * cal.pose_weight)
            .max(0.0);
    }

    if let Some(landmarks) = &detection.landmarks {
        if landmarks.len() >= 2 {
            let (lx, ly) = landmarks[0];
            let (rx, ry) = landmarks[1];
            let eye_y_diff = (ly - ry).abs();
            let eye_distance = ((lx - rx).powi(2) + (ly - ry).powi(2)).sqrt();
            return (cal.pose_weight - eye_y_diff / eye_distance * cal.pose_weight).max(0.0);
        }
    }

    cal.default_pose_score
}

/// Embedding norm as a weak quality proxy, capped at the component weight.
fn embedding_component(detection: &Detection, cal: &SelectorCalibration) -> f32 {
    match &detection.embedding {
        Some(e) => (e.l2_norm() / cal.embedding_norm_divisor).min(cal.embedding_weight),
        None => cal.default_embedding_score,
    }
}
