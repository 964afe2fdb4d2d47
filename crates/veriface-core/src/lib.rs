//! veriface-core — embedding quality assessment and verification decisions.
//!
//! Takes face detections produced by an external detector (bounding boxes,
//! optional confidence/pose/landmarks, raw embeddings), scores and selects
//! the best candidate per image, fuses multi-capture enrollments into one
//! identity embedding, and renders match/no-match decisions with a
//! multi-metric ensemble score.

pub mod calibration;
pub mod filter;
pub mod fusion;
pub mod pipeline;
pub mod selector;
pub mod types;
pub mod verify;

pub use calibration::Calibration;
pub use filter::filter_candidates;
pub use fusion::{fuse, Capture, FusionError};
pub use pipeline::{enroll, extract_embedding, FaceDetector};
pub use selector::{composite_score, select_best_face};
pub use types::{Detection, Embedding, EnrolledModel, IdentifyResult, VerificationResult};
pub use verify::{identify, verify, VerifyError};
