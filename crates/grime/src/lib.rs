//! grime — data-error emulation and robustness evaluation for object
//! detection models.
//!
//! Models that score well on clean validation data often fall apart on the
//! degraded imagery they meet in production. grime measures that fall-off by
//! corrupting a dataset with parameterized error sources and charting the
//! detection quality of one or more models across corruption strength. The
//! pipeline stages are:
//!
//! 1. **Filters** – seed-deterministic corruption filters (Gaussian blur,
//!    rain, snow, JPEG re-encode, resolution reduction), dispatched through
//!    a closed [`FilterKind`] registry.
//! 2. **Harness** – model inference behind the [`Model`] trait; weights and
//!    inference engines are external collaborators.
//! 3. **Scoring** – mAP-50 over predicted vs ground-truth boxes.
//! 4. **Sweep** – the filter × parameter × model grid, run on a worker pool
//!    with per-cell failure isolation, producing one [`ScoreCurve`] per
//!    (filter, model) pair.
//!
//! # Public API
//! - [`FilterKind`] / [`Corruption`] for standalone corruption
//! - [`run_sweep`] with [`SweepConfig`] as the primary entry point
//! - [`map50`] for scoring precomputed detections
//! - [`Dataset`] for image + annotation ingestion

pub mod dataset;
pub mod detection;
mod error;
pub mod filter;
pub mod model;
pub mod scoring;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dataset::{Dataset, DatasetEntry};
pub use detection::{BoundingBox, Detection, GroundTruthBox};
pub use error::{Error, Result};
pub use filter::{Corruption, FilterKind};
pub use model::Model;
pub use scoring::{map50, ClassAp, MapScore};
pub use sweep::{run_sweep, CurvePoint, ScoreCurve, SweepConfig, SweepReport};
