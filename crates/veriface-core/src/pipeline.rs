//! Per-image extraction and enrollment orchestration.
//!
//! The upstream detector is an injected capability: anything that can turn
//! an image into detection records drives the same filter -> select ->
//! normalize path, which keeps the engine deterministic under stub
//! detectors in tests. Per-image failures are logged and dropped; only the
//! fusion stage can surface a hard error.

use crate::calibration::Calibration;
use crate::filter::filter_candidates;
use crate::fusion::{fuse, Capture, FusionError};
use crate::selector::select_best_face;
use crate::types::Detection;
use std::time::Instant;

/// Capability for producing face detections from an opaque image.
///
/// Implementations wrap the external embedding model. They are commonly not
/// thread-safe, hence `&mut self`; serializing access is the host's job.
pub trait FaceDetector {
    type Image;
    type Error: std::error::Error;

    fn detect(&mut self, image: &Self::Image) -> Result<Vec<Detection>, Self::Error>;
}

/// Run one image through detection, filtering, selection, and normalization.
///
/// Returns `None` when no usable face comes out of the image, whatever the
/// reason: a detector failure, zero detections, or a selected face without
/// an embedding. The latency covers the whole path starting at detection.
pub fn extract_embedding<D: FaceDetector>(
    detector: &mut D,
    image: &D::Image,
    cal: &Calibration,
) -> Option<Capture> {
    let start = Instant::now();

    let detections = match detector.detect(image) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "detector failed; skipping image");
            return None;
        }
    };
    if detections.is_empty() {
        tracing::debug!("no faces detected in image");
        return None;
    }

    let candidates = filter_candidates(detections, cal);
    let best = select_best_face(&candidates, cal)?;

    let Some(embedding) = best.embedding.clone() else {
        tracing::warn!("selected face has no embedding; skipping image");
        return None;
    };
    let embedding = embedding.into_normalized(cal.embedding_dim);

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    Some(Capture {
        embedding,
        latency_ms,
    })
}

/// Enroll one identity from a sequence of captured images.
///
/// Each image independently yields zero or one embedding; survivors are
/// fused into a single identity embedding. `Ok(None)` means no image
/// produced a usable face.
pub fn enroll<D: FaceDetector>(
    detector: &mut D,
    images: &[D::Image],
    cal: &Calibration,
) -> Result<Option<Capture>, FusionError> {
    let mut captures = Vec::new();
    for image in images {
        if let Some(capture) = extract_embedding(detector, image, cal) {
            captures.push(capture);
        }
    }

    tracing::info!(
        usable = captures.len(),
        images = images.len(),
        "enrollment captures extracted"
    );

    fuse(&captures)
}
