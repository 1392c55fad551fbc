//! Error taxonomy for the corruption/evaluation pipeline.
//!
//! Cell-scoped failures ([`Error::Inference`], [`Error::CellTimeout`]) are
//! recorded on the affected curve point by the sweep controller and never
//! abort a sweep; everything else propagates.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A filter parameter outside its documented domain.
    #[error("invalid parameter for filter '{filter}': {reason}")]
    InvalidParameter {
        filter: &'static str,
        reason: String,
    },

    /// A model call failed for one image.
    #[error("inference failed for model '{model}': {reason}")]
    Inference { model: String, reason: String },

    /// Malformed or mismatched detection/ground-truth input.
    #[error("scoring failed: {reason}")]
    Scoring { reason: String },

    /// A sweep cell exceeded its time budget.
    #[error("cell exceeded time budget of {budget:?} after {n_images} images")]
    CellTimeout { budget: Duration, n_images: usize },

    /// Dataset-level ingestion failure (not a single bad image).
    #[error("dataset error: {reason}")]
    Dataset { reason: String },

    /// Malformed sweep configuration.
    #[error("sweep error: {reason}")]
    Sweep { reason: String },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(filter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            filter,
            reason: reason.into(),
        }
    }

    pub(crate) fn scoring(reason: impl Into<String>) -> Self {
        Self::Scoring {
            reason: reason.into(),
        }
    }

    pub(crate) fn dataset(reason: impl Into<String>) -> Self {
        Self::Dataset {
            reason: reason.into(),
        }
    }

    pub(crate) fn sweep(reason: impl Into<String>) -> Self {
        Self::Sweep {
            reason: reason.into(),
        }
    }
}
