//! grime CLI — corrupt images, score predictions, and run robustness sweeps.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbImage;

use grime::dataset::{AnnotationFile, PredictionFile};
use grime::{map50, run_sweep, Dataset, Detection, FilterKind, Model, SweepConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "grime")]
#[command(about = "Emulate data errors in images and chart object-detection quality against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one corruption filter to a single image.
    Corrupt(CliCorruptArgs),

    /// Score precomputed predictions against ground truth (mAP-50).
    Score(CliScoreArgs),

    /// Run a corruption sweep over a dataset with one or more models.
    Sweep(CliSweepArgs),

    /// List the available corruption filters and their parameter domains.
    Filters,
}

#[derive(Debug, Clone, Args)]
struct CliCorruptArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the corrupted image.
    #[arg(long)]
    out: PathBuf,

    /// Corruption filter to apply.
    #[arg(long, value_enum)]
    filter: FilterArg,

    /// Filter parameter (see `grime filters` for the domain).
    #[arg(long)]
    param: f64,

    /// Seed for the filter's randomness.
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Debug, Clone, Args)]
struct CliScoreArgs {
    /// Prediction file (grime.predictions.v1 JSON).
    #[arg(long)]
    predictions: PathBuf,

    /// Annotation file (grime.annotations.v1 JSON).
    #[arg(long)]
    annotations: PathBuf,

    /// Optional path to write the score breakdown (JSON).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliSweepArgs {
    /// Directory of dataset images.
    #[arg(long)]
    images: PathBuf,

    /// Annotation file (grime.annotations.v1 JSON).
    #[arg(long)]
    annotations: PathBuf,

    /// Corruption filter to sweep.
    #[arg(long, value_enum)]
    filter: FilterArg,

    /// Parameter grid: a comma list ("0.5,1,2") or a linspace ("0:4:9").
    #[arg(long)]
    params: String,

    /// Model spec "name=command", repeatable. The command is run through
    /// `sh -c` with `{image}` replaced by a temp PNG path and must print a
    /// JSON detection array on stdout.
    #[arg(long = "model", required = true)]
    models: Vec<String>,

    /// Base seed for all corruption randomness.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Soft per-cell time budget in seconds, checked between images.
    #[arg(long)]
    cell_timeout: Option<f64>,

    /// Path to write the sweep report (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    GaussianBlur,
    Rain,
    Snow,
    Jpeg,
    Resolution,
}

impl FilterArg {
    fn to_kind(self) -> FilterKind {
        match self {
            Self::GaussianBlur => FilterKind::GaussianBlur,
            Self::Rain => FilterKind::Rain,
            Self::Snow => FilterKind::Snow,
            Self::Jpeg => FilterKind::Jpeg,
            Self::Resolution => FilterKind::Resolution,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Corrupt(args) => run_corrupt(&args),
        Commands::Score(args) => run_score(&args),
        Commands::Sweep(args) => run_sweep_cmd(&args),
        Commands::Filters => run_filters(),
    }
}

// ── filters ────────────────────────────────────────────────────────────

fn run_filters() -> CliResult<()> {
    println!("available corruption filters");
    for kind in FilterKind::ALL {
        println!("  {:<14} {}", kind.name(), kind.param_help());
    }
    Ok(())
}

// ── corrupt ────────────────────────────────────────────────────────────

fn run_corrupt(args: &CliCorruptArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());

    let img = image::open(&args.image)
        .map_err(|e| -> CliError {
            format!("Failed to open image {}: {}", args.image.display(), e).into()
        })?
        .to_rgb8();
    let (w, h) = img.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let corruption = args.filter.to_kind().instantiate(args.param)?;
    let out = corruption.apply(&img, args.seed)?;
    out.save(&args.out)?;
    tracing::info!("Corrupted image written to {}", args.out.display());

    Ok(())
}

// ── score ──────────────────────────────────────────────────────────────

fn run_score(args: &CliScoreArgs) -> CliResult<()> {
    let annotations = AnnotationFile::from_json_file(&args.annotations)?;
    let prediction_file = PredictionFile::from_json_file(&args.predictions)?;

    let (predictions, truth) = align_by_file(&prediction_file, &annotations)?;
    let score = map50(&predictions, &truth)?;

    println!("mAP-50: {:.4}  ({} images)", score.map50, truth.len());
    for class in &score.per_class {
        println!(
            "  {:<20} AP {:.4}  ({} truth, {} detections)",
            class.class, class.ap, class.n_truth, class.n_detections
        );
    }

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&score)?;
        std::fs::write(out, &json)?;
        tracing::info!("Score breakdown written to {}", out.display());
    }

    Ok(())
}

/// Pair prediction entries with annotation entries by file name, in
/// annotation order. Every annotated image must have a prediction entry;
/// unmatched prediction entries are rejected too, since they usually mean
/// the files are from different runs.
fn align_by_file(
    predictions: &PredictionFile,
    annotations: &AnnotationFile,
) -> CliResult<(Vec<Vec<Detection>>, Vec<Vec<grime::GroundTruthBox>>)> {
    let mut by_file: std::collections::BTreeMap<&str, &Vec<Detection>> = predictions
        .images
        .iter()
        .map(|p| (p.file.as_str(), &p.detections))
        .collect();

    let mut preds = Vec::with_capacity(annotations.images.len());
    let mut truth = Vec::with_capacity(annotations.images.len());
    for ann in &annotations.images {
        let dets = by_file.remove(ann.file.as_str()).ok_or_else(|| -> CliError {
            format!("no predictions for annotated image '{}'", ann.file).into()
        })?;
        preds.push(dets.clone());
        truth.push(ann.boxes.clone());
    }

    if let Some((file, _)) = by_file.pop_first() {
        return Err(format!("predictions for unannotated image '{}'", file).into());
    }

    Ok((preds, truth))
}

// ── sweep ──────────────────────────────────────────────────────────────

fn run_sweep_cmd(args: &CliSweepArgs) -> CliResult<()> {
    let dataset = Dataset::load(&args.images, &args.annotations)?;
    tracing::info!("Loaded {} dataset entries", dataset.len());

    let params = parse_params(&args.params)?;
    let models: Vec<Box<dyn Model>> = args
        .models
        .iter()
        .map(|spec| CommandModel::from_spec(spec).map(|m| Box::new(m) as Box<dyn Model>))
        .collect::<CliResult<_>>()?;

    let mut config = SweepConfig::new(args.filter.to_kind(), params);
    config.seed = args.seed;
    config.cell_time_budget = args.cell_timeout.map(Duration::from_secs_f64);

    let report = run_sweep(&dataset, &models, &config)?;

    for curve in &report.curves {
        println!("{} / {}", curve.filter, curve.model);
        for point in &curve.points {
            match (&point.map50, &point.error) {
                (Some(map), _) => println!("  param {:<10} mAP-50 {:.4}", point.param, map),
                (None, Some(err)) => println!("  param {:<10} FAILED: {}", point.param, err),
                (None, None) => println!("  param {:<10} (no score)", point.param),
            }
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Sweep report written to {}", args.out.display());

    Ok(())
}

/// Parse a parameter grid: either a comma list ("0.5,1,2") or an
/// inclusive linspace "start:stop:num" with integer num >= 2.
fn parse_params(spec: &str) -> CliResult<Vec<f64>> {
    let spec = spec.trim();
    if spec.contains(':') {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.len() != 3 {
            return Err(format!("linspace must be start:stop:num, got '{}'", spec).into());
        }
        let start: f64 = parts[0].trim().parse()?;
        let stop: f64 = parts[1].trim().parse()?;
        let num: usize = parts[2].trim().parse()?;
        if num < 2 {
            return Err("linspace needs at least 2 points".into());
        }
        let step = (stop - start) / (num - 1) as f64;
        return Ok((0..num).map(|i| start + step * i as f64).collect());
    }

    spec.split(',')
        .map(|p| p.trim().parse::<f64>().map_err(CliError::from))
        .collect()
}

// ── command model ──────────────────────────────────────────────────────

/// A model bound to an external command template.
///
/// Each `infer` call writes the image to a temp PNG, substitutes its path
/// for the `{image}` token, runs the command through `sh -c`, and parses
/// stdout as a JSON detection array. Calls are independent, so the sweep
/// pool can run them concurrently.
struct CommandModel {
    id: String,
    template: String,
}

impl CommandModel {
    /// Parse a "name=command" spec. The command must contain `{image}`.
    fn from_spec(spec: &str) -> CliResult<Self> {
        let (id, template) = spec.split_once('=').ok_or_else(|| -> CliError {
            format!("model spec must be name=command, got '{}'", spec).into()
        })?;
        if id.trim().is_empty() {
            return Err(format!("model spec has an empty name: '{}'", spec).into());
        }
        if !template.contains("{image}") {
            return Err(format!("model command is missing the {{image}} token: '{}'", spec).into());
        }
        Ok(Self {
            id: id.trim().to_string(),
            template: template.trim().to_string(),
        })
    }

    fn inference_error(&self, reason: impl Into<String>) -> grime::Error {
        grime::Error::Inference {
            model: self.id.clone(),
            reason: reason.into(),
        }
    }
}

impl Model for CommandModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn infer(&self, image: &RgbImage) -> grime::Result<Vec<Detection>> {
        let file = tempfile::Builder::new()
            .prefix("grime-frame-")
            .suffix(".png")
            .tempfile()?;
        save_png(image, file.path())?;

        let command = self.template.replace("{image}", &file.path().to_string_lossy());
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .map_err(|e| self.inference_error(format!("failed to spawn command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.inference_error(format!(
                "command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| self.inference_error(format!("stdout is not a detection array: {}", e)))
    }
}

fn save_png(image: &RgbImage, path: &Path) -> grime::Result<()> {
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_comma_list() {
        let params = parse_params("0.5, 1, 2").unwrap();
        assert_eq!(params, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn parse_params_linspace_is_inclusive() {
        let params = parse_params("0:4:9").unwrap();
        assert_eq!(params.len(), 9);
        assert_eq!(params[0], 0.0);
        assert_eq!(params[8], 4.0);
        assert_eq!(params[1], 0.5);
    }

    #[test]
    fn parse_params_rejects_malformed_linspace() {
        assert!(parse_params("0:4").is_err());
        assert!(parse_params("0:4:1").is_err());
        assert!(parse_params("a:4:3").is_err());
    }

    #[test]
    fn command_model_spec_requires_token_and_name() {
        assert!(CommandModel::from_spec("det=detect.sh {image}").is_ok());
        assert!(CommandModel::from_spec("det=detect.sh").is_err());
        assert!(CommandModel::from_spec("=detect.sh {image}").is_err());
        assert!(CommandModel::from_spec("no-equals-sign").is_err());
    }

    #[test]
    fn command_model_runs_a_shell_pipeline() {
        let model = CommandModel::from_spec("echo=echo '[]' && test -f {image}").unwrap();
        let img = RgbImage::new(8, 8);
        let detections = model.infer(&img).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn command_model_failure_names_the_model() {
        let model = CommandModel::from_spec("bad=cat {image} >/dev/null; exit 3").unwrap();
        let img = RgbImage::new(8, 8);
        let err = model.infer(&img).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }
}
