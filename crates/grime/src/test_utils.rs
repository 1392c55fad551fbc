//! Shared test utilities: synthetic annotated scenes and stub models.
//!
//! Scenes are a flat dark background with one saturated red rectangle as the
//! annotated object, so a trivial colour-threshold "detector" can serve as a
//! deterministic model whose quality genuinely degrades under corruption.

use image::{Rgb, RgbImage};

use crate::dataset::{Dataset, DatasetEntry};
use crate::detection::{BoundingBox, Detection, GroundTruthBox};
use crate::error::{Error, Result};
use crate::model::Model;

pub(crate) const BACKGROUND: Rgb<u8> = Rgb([40, 44, 48]);
pub(crate) const OBJECT: Rgb<u8> = Rgb([220, 30, 30]);

pub(crate) fn flat_image(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(rgb))
}

/// Render a scene with one red rectangle at `(x, y, w, h)` and its
/// ground-truth annotation.
pub(crate) fn scene(
    width: u32,
    height: u32,
    rect: (u32, u32, u32, u32),
) -> (RgbImage, Vec<GroundTruthBox>) {
    let (rx, ry, rw, rh) = rect;
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for y in ry..(ry + rh).min(height) {
        for x in rx..(rx + rw).min(width) {
            img.put_pixel(x, y, OBJECT);
        }
    }
    let truth = vec![GroundTruthBox::new(
        "object",
        BoundingBox::new(f64::from(rx), f64::from(ry), f64::from(rw), f64::from(rh)),
    )];
    (img, truth)
}

/// A small dataset of 64x64 scenes with the rectangle at shifting positions.
pub(crate) fn make_dataset(n: usize) -> Dataset {
    let entries = (0..n)
        .map(|i| {
            let offset = 8 + 4 * (i as u32 % 6);
            let (image, truth) = scene(64, 64, (offset, offset, 16, 16));
            DatasetEntry {
                file: format!("scene_{i:03}.png"),
                image,
                truth,
            }
        })
        .collect();
    Dataset::from_entries(entries).expect("n > 0")
}

fn is_reddish(px: &Rgb<u8>) -> bool {
    px[0] > 120 && px[0] > px[1].saturating_add(50) && px[0] > px[2].saturating_add(50)
}

/// Threshold detector for the red rectangle in synthetic scenes.
///
/// Reports the bounding box of all reddish pixels; confidence is the fill
/// ratio of that box, which drops as corruption bleeds the rectangle out.
pub(crate) struct RectangleFinder;

impl Model for RectangleFinder {
    fn id(&self) -> &str {
        "rectangle_finder"
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        let mut hits = 0u64;
        for (x, y, px) in image.enumerate_pixels() {
            if is_reddish(px) {
                hits += 1;
                bounds = Some(match bounds {
                    None => (x, x, y, y),
                    Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
                });
            }
        }
        let Some((x0, x1, y0, y1)) = bounds else {
            return Ok(Vec::new());
        };
        let bbox = BoundingBox::new(
            f64::from(x0),
            f64::from(y0),
            f64::from(x1 - x0 + 1),
            f64::from(y1 - y0 + 1),
        );
        let confidence = (hits as f64 / bbox.area()).clamp(0.0, 1.0) as f32;
        Ok(vec![Detection::new("object", bbox, confidence)])
    }
}

/// Oracle that only recognizes bit-identical copies of its reference images.
///
/// Any corruption at all makes inference fail, which makes cell-failure
/// behaviour exactly controllable in sweep tests.
pub(crate) struct StrictOracle {
    references: Vec<(RgbImage, Vec<GroundTruthBox>)>,
}

impl StrictOracle {
    pub(crate) fn over(dataset: &Dataset) -> Self {
        Self {
            references: dataset
                .entries()
                .iter()
                .map(|e| (e.image.clone(), e.truth.clone()))
                .collect(),
        }
    }
}

impl Model for StrictOracle {
    fn id(&self) -> &str {
        "strict_oracle"
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        for (reference, truth) in &self.references {
            if reference == image {
                return Ok(truth
                    .iter()
                    .map(|t| Detection::new(t.class.clone(), t.bbox, 0.9))
                    .collect());
            }
        }
        Err(Error::Inference {
            model: "strict_oracle".to_string(),
            reason: "image does not match any reference".to_string(),
        })
    }
}

/// Model that burns wall-clock time per call, for time-budget tests.
pub(crate) struct SleepyModel {
    pub(crate) delay: std::time::Duration,
}

impl Model for SleepyModel {
    fn id(&self) -> &str {
        "sleepy"
    }

    fn infer(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}
