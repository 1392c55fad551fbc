//! Detection and ground-truth primitives: axis-aligned boxes, IoU, and the
//! per-box records exchanged with models and annotation files.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// `(x, y)` is the top-left corner; `w`/`h` extend right and down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// All coordinates finite and extent strictly positive.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w > 0.0
            && self.h > 0.0
    }

    /// Intersection-over-union with another box.
    ///
    /// Degenerate boxes (non-positive extent) yield 0.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = (self.x + self.w).min(other.x + other.w);
        let iy1 = (self.y + self.h).min(other.y + other.h);

        let iw = (ix1 - ix0).max(0.0);
        let ih = (iy1 - iy0).max(0.0);
        let inter = iw * ih;

        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

/// One predicted object from a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, matched verbatim against ground-truth labels.
    pub class: String,
    pub bbox: BoundingBox,
    /// Model confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn new(class: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class: class.into(),
            bbox,
            confidence,
        }
    }
}

/// One authoritative annotated object. Read-only during scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBox {
    pub class: String,
    pub bbox: BoundingBox,
}

impl GroundTruthBox {
    pub fn new(class: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            bbox,
        }
    }
}
