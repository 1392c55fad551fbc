//! Sweep controller: the filter × parameter × model grid.
//!
//! Every (parameter, model) cell corrupts the whole dataset at one strength,
//! runs one model over it, and scores the result. Cells are independent and
//! run on a rayon worker pool; each worker accumulates its own cell result
//! and the grid is merged back in order afterwards. A failing cell records
//! its error on the curve point and leaves a gap; it never aborts the sweep.
//!
//! Per-image corruption seeds derive from (sweep seed, parameter index,
//! image index) only, so every model sees bit-identical corrupted images for
//! a given cell parameter.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::detection::GroundTruthBox;
use crate::error::{Error, Result};
use crate::filter::{Corruption, FilterKind};
use crate::model::Model;
use crate::scoring::{map50, MapScore};

pub const SWEEP_REPORT_SCHEMA_V1: &str = "grime.sweep_report.v1";

/// Configuration for one sweep: a filter, its parameter grid, and runtime
/// knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub filter: FilterKind,
    /// Corruption strengths, strictly increasing.
    pub params: Vec<f64>,
    /// Base seed for all corruption randomness.
    pub seed: u64,
    /// Soft per-cell wall-clock budget, checked between images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_time_budget: Option<Duration>,
}

impl SweepConfig {
    pub fn new(filter: FilterKind, params: Vec<f64>) -> Self {
        Self {
            filter,
            params,
            seed: 42,
            cell_time_budget: None,
        }
    }

    /// Validate the parameter grid before any work is scheduled.
    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(Error::sweep("parameter grid is empty"));
        }
        if self.params.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::sweep(format!(
                "parameter values must be strictly increasing, got {:?}",
                self.params
            )));
        }
        for &p in &self.params {
            self.filter.instantiate(p)?;
        }
        Ok(())
    }
}

/// One cell of a score curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvePoint {
    pub param: f64,
    /// mAP-50 for this cell; absent when the cell failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map50: Option<f64>,
    /// Per-class breakdown for this cell; absent when the cell failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_class: Option<Vec<crate::scoring::ClassAp>>,
    /// Failure description for a gapped cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Degradation curve for one (filter, model) pair, points in parameter order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCurve {
    pub filter: FilterKind,
    pub model: String,
    pub points: Vec<CurvePoint>,
}

/// Full sweep output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub schema: String,
    pub filter: FilterKind,
    pub seed: u64,
    pub n_images: usize,
    pub params: Vec<f64>,
    pub curves: Vec<ScoreCurve>,
}

/// Run the full (parameter × model) grid over a dataset.
///
/// Produces one curve per model with exactly one point per parameter value,
/// in parameter order, gaps flagged via [`CurvePoint::error`].
pub fn run_sweep(
    dataset: &Dataset,
    models: &[Box<dyn Model>],
    config: &SweepConfig,
) -> Result<SweepReport> {
    config.validate()?;
    if models.is_empty() {
        return Err(Error::sweep("no models to evaluate"));
    }

    let corruptions: Vec<Corruption> = config
        .params
        .iter()
        .map(|&p| config.filter.instantiate(p))
        .collect::<Result<_>>()?;
    let truth = dataset.truth();

    tracing::info!(
        filter = %config.filter,
        n_params = config.params.len(),
        n_models = models.len(),
        n_images = dataset.len(),
        "starting sweep"
    );

    // Parameter-major cell order; merged back per model below.
    let cells: Vec<(usize, usize)> = (0..config.params.len())
        .flat_map(|pi| (0..models.len()).map(move |mi| (pi, mi)))
        .collect();

    let outcomes: Vec<(Result<MapScore>, Duration)> = cells
        .par_iter()
        .map(|&(pi, mi)| {
            let started = Instant::now();
            let res = run_cell(dataset, &truth, &*models[mi], &corruptions[pi], config, pi);
            (res, started.elapsed())
        })
        .collect();

    let mut curves: Vec<ScoreCurve> = models
        .iter()
        .map(|m| ScoreCurve {
            filter: config.filter,
            model: m.id().to_string(),
            points: Vec::with_capacity(config.params.len()),
        })
        .collect();

    for (&(pi, mi), (res, elapsed)) in cells.iter().zip(outcomes) {
        let param = config.params[pi];
        let point = match res {
            Ok(score) => CurvePoint {
                param,
                map50: Some(score.map50),
                per_class: Some(score.per_class),
                error: None,
                elapsed_ms: elapsed.as_millis() as u64,
            },
            Err(e) => {
                tracing::warn!(
                    model = %curves[mi].model,
                    param,
                    error = %e,
                    "sweep cell failed; leaving a gap"
                );
                CurvePoint {
                    param,
                    map50: None,
                    per_class: None,
                    error: Some(e.to_string()),
                    elapsed_ms: elapsed.as_millis() as u64,
                }
            }
        };
        curves[mi].points.push(point);
    }

    tracing::info!(
        n_cells = cells.len(),
        n_failed = curves
            .iter()
            .flat_map(|c| &c.points)
            .filter(|p| p.error.is_some())
            .count(),
        "sweep finished"
    );

    Ok(SweepReport {
        schema: SWEEP_REPORT_SCHEMA_V1.to_string(),
        filter: config.filter,
        seed: config.seed,
        n_images: dataset.len(),
        params: config.params.clone(),
        curves,
    })
}

fn run_cell(
    dataset: &Dataset,
    truth: &[Vec<GroundTruthBox>],
    model: &dyn Model,
    corruption: &Corruption,
    config: &SweepConfig,
    param_idx: usize,
) -> Result<MapScore> {
    let started = Instant::now();
    let mut predictions = Vec::with_capacity(dataset.len());
    for (img_idx, entry) in dataset.entries().iter().enumerate() {
        if let Some(budget) = config.cell_time_budget {
            if started.elapsed() > budget {
                return Err(Error::CellTimeout {
                    budget,
                    n_images: img_idx,
                });
            }
        }
        let seed = derive_seed(config.seed, param_idx as u64, img_idx as u64);
        let corrupted = corruption.apply(&entry.image, seed)?;
        predictions.push(model.infer(&corrupted)?);
    }
    map50(&predictions, truth)
}

/// splitmix64-style mixer: decorrelates per-image seeds across cells while
/// staying a pure function of its inputs.
fn derive_seed(base: u64, param_idx: u64, img_idx: u64) -> u64 {
    let mut z = base
        ^ param_idx.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ img_idx.wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
