//! Candidate quality filter.
//!
//! Runs up to four independent checks per detection and keeps the detections
//! that satisfy at least half of the checks that could be evaluated. When
//! nothing clears the bar the whole input is kept: filtering must never
//! starve the selector of candidates.

use crate::calibration::{Calibration, FilterCalibration};
use crate::types::Detection;

/// Filter detections by quality, falling back to the full input when no
/// detection passes.
pub fn filter_candidates(detections: Vec<Detection>, cal: &Calibration) -> Vec<Detection> {
    let passing: Vec<Detection> = detections
        .iter()
        .filter(|d| passes_quality(d, &cal.filter))
        .cloned()
        .collect();

    if passing.is_empty() {
        if !detections.is_empty() {
            tracing::warn!(
                count = detections.len(),
                "no detections passed quality checks; keeping all candidates"
            );
        }
        return detections;
    }

    tracing::debug!(
        kept = passing.len(),
        total = detections.len(),
        "quality filter applied"
    );
    passing
}

/// A detection passes when satisfied checks >= half the evaluated checks.
/// A check whose input is absent counts as satisfied; the landmark-coverage
/// check is only evaluated when landmarks are present.
fn passes_quality(detection: &Detection, cal: &FilterCalibration) -> bool {
    let mut evaluated = 0u32;
    let mut satisfied = 0u32;

    // Detection confidence.
    evaluated += 1;
    match detection.confidence {
        Some(c) if c <= cal.min_confidence => {}
        _ => satisfied += 1,
    }

    // Face size.
    evaluated += 1;
    if detection.area() > cal.min_face_area {
        satisfied += 1;
    }

    // Aspect ratio: faces are roughly square.
    evaluated += 1;
    let aspect = detection.aspect_ratio();
    if aspect >= cal.aspect_ratio_min && aspect <= cal.aspect_ratio_max {
        satisfied += 1;
    }

    // Landmark spread over the face box.
    if let Some(landmarks) = &detection.landmarks {
        if !landmarks.is_empty() {
            evaluated += 1;
            if landmark_coverage(landmarks, detection.area()) > cal.min_landmark_coverage {
                satisfied += 1;
            }
        }
    }

    satisfied as f32 >= evaluated as f32 * 0.5
}

/// Area of the landmark axis-aligned bounding box relative to the face area.
fn landmark_coverage(landmarks: &[(f32, f32)], face_area: f32) -> f32 {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for &(x, y) in landmarks {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    (max_x - min_x) * (max_y - min_y) / face_area
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x2: f32, y2: f32, confidence: Option<f32>) -> Detection {
        Detection {
            x1: 0.0,
            y1: 0.0,
            x2,
            y2,
            confidence,
            pose: None,
            landmarks: None,
            embedding: None,
        }
    }

    #[test]
    fn test_good_face_passes() {
        // 100x100 box, conf 0.9: all three evaluated checks pass.
        let cal = Calibration::default();
        let kept = filter_candidates(vec![detection(100.0, 100.0, Some(0.9))], &cal);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_tiny_low_confidence_face_fails_against_better_one() {
        let cal = Calibration::default();
        // 25x20 = 500 px², conf 0.2: only the aspect check passes (1/3).
        let bad = detection(25.0, 20.0, Some(0.2));
        let good = detection(100.0, 100.0, Some(0.9));
        let kept = filter_candidates(vec![bad, good], &cal);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].x2 - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_absent_confidence_counts_as_pass() {
        let cal = Calibration::default();
        // Area and aspect pass, confidence is absent: 3/3.
        assert!(passes_quality(&detection(100.0, 100.0, None), &cal.filter));
    }

    #[test]
    fn test_fallback_keeps_all_when_none_pass() {
        let cal = Calibration::default();
        // 10x40 boxes: area 400 fails, aspect 0.25 fails, conf fails. 0/3.
        let all_bad: Vec<Detection> = (0..3).map(|_| detection(10.0, 40.0, Some(0.1))).collect();
        let kept = filter_candidates(all_bad, &cal);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let cal = Calibration::default();
        assert!(filter_candidates(vec![], &cal).is_empty());
    }

    #[test]
    fn test_landmark_coverage_check() {
        let cal = Calibration::default();
        // 100x100 face with landmarks collapsed into a 2x2 patch:
        // coverage 4/10000 fails, so 3/4 checks pass overall.
        let mut d = detection(100.0, 100.0, Some(0.9));
        d.landmarks = Some(vec![(50.0, 50.0), (52.0, 50.0), (51.0, 52.0)]);
        assert!(passes_quality(&d, &cal.filter));

        // Well-spread landmarks clear the coverage check too: 4/4.
        d.landmarks = Some(vec![(20.0, 30.0), (80.0, 30.0), (50.0, 75.0)]);
        assert!(passes_quality(&d, &cal.filter));
    }

    #[test]
    fn test_landmark_coverage_values() {
        // 60x45 landmark box over a 100x100 face: coverage 0.27.
        let lms = vec![(20.0, 30.0), (80.0, 30.0), (50.0, 75.0)];
        let cov = landmark_coverage(&lms, 10000.0);
        assert!((cov - 0.27).abs() < 1e-4);
    }
}
