//! The evaluation-harness seam: model inference as an external collaborator.

use image::RgbImage;

use crate::detection::Detection;
use crate::error::Result;

/// An object-detection model under evaluation.
///
/// Implementations wrap whatever actually runs inference (an ONNX session,
/// an external process, a test stub); weights and execution are opaque to
/// the sweep. Implementations must be thread-safe: the sweep controller
/// calls `infer` from its worker pool.
///
/// Returned detections carry confidence in [0, 1]; values outside that range
/// are rejected at scoring time.
pub trait Model: Send + Sync {
    /// Stable identifier, used in curves and reports.
    fn id(&self) -> &str;

    /// Run inference on one image.
    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}
