//! Dataset ingestion: image directory plus versioned annotation JSON.
//!
//! Annotation files follow the `grime.annotations.v1` schema; prediction
//! files (precomputed detections for offline scoring) follow
//! `grime.predictions.v1`. A single unreadable image or malformed box drops
//! that image's contribution with a warning; it never poisons the rest of
//! the dataset.

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detection::{Detection, GroundTruthBox};
use crate::error::{Error, Result};

pub const ANNOTATIONS_SCHEMA_V1: &str = "grime.annotations.v1";
pub const PREDICTIONS_SCHEMA_V1: &str = "grime.predictions.v1";

/// On-disk annotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationFile {
    pub schema: String,
    pub images: Vec<ImageAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageAnnotation {
    /// Image file name, relative to the dataset image directory.
    pub file: String,
    pub boxes: Vec<GroundTruthBox>,
}

/// On-disk prediction file: precomputed detections per image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionFile {
    pub schema: String,
    pub images: Vec<ImagePredictions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagePredictions {
    pub file: String,
    pub detections: Vec<Detection>,
}

impl AnnotationFile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let file: AnnotationFile = serde_json::from_str(&data)?;
        if file.schema != ANNOTATIONS_SCHEMA_V1 {
            return Err(Error::dataset(format!(
                "unsupported annotation schema '{}' (expected '{}')",
                file.schema, ANNOTATIONS_SCHEMA_V1
            )));
        }
        Ok(file)
    }
}

impl PredictionFile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let file: PredictionFile = serde_json::from_str(&data)?;
        if file.schema != PREDICTIONS_SCHEMA_V1 {
            return Err(Error::dataset(format!(
                "unsupported prediction schema '{}' (expected '{}')",
                file.schema, PREDICTIONS_SCHEMA_V1
            )));
        }
        Ok(file)
    }
}

/// One usable dataset entry: decoded image plus its ground truth.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub file: String,
    pub image: RgbImage,
    pub truth: Vec<GroundTruthBox>,
}

/// An in-memory evaluation dataset, entries ordered by file name.
#[derive(Debug, Clone)]
pub struct Dataset {
    entries: Vec<DatasetEntry>,
}

impl Dataset {
    /// Build from pre-decoded entries (library embedding, tests).
    pub fn from_entries(entries: Vec<DatasetEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::dataset("dataset contains no usable images"));
        }
        Ok(Self { entries })
    }

    /// Load images named by `annotations` from `image_dir`.
    ///
    /// Entries with unreadable image files or invalid boxes are skipped with
    /// a warning. Fails only when nothing usable remains.
    pub fn load(image_dir: &Path, annotations: &Path) -> Result<Self> {
        let file = AnnotationFile::from_json_file(annotations)?;

        let mut annotated = file.images;
        annotated.sort_by(|a, b| a.file.cmp(&b.file));

        let mut entries = Vec::with_capacity(annotated.len());
        let mut skipped = 0usize;
        for ann in annotated {
            if let Some(bad) = ann.boxes.iter().find(|b| !b.bbox.is_valid()) {
                tracing::warn!(
                    file = %ann.file,
                    class = %bad.class,
                    "skipping image with invalid ground-truth box"
                );
                skipped += 1;
                continue;
            }
            let path = image_dir.join(&ann.file);
            let image = match image::open(&path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    tracing::warn!(file = %ann.file, error = %e, "skipping unreadable image");
                    skipped += 1;
                    continue;
                }
            };
            entries.push(DatasetEntry {
                file: ann.file,
                image,
                truth: ann.boxes,
            });
        }

        if skipped > 0 {
            tracing::warn!(skipped, usable = entries.len(), "dataset loaded with skips");
        }
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ground truth per entry, in entry order.
    pub fn truth(&self) -> Vec<Vec<GroundTruthBox>> {
        self.entries.iter().map(|e| e.truth.clone()).collect()
    }
}
