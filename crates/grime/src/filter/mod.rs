//! Error-injection filters.
//!
//! [`FilterKind`] is the closed registry of corruption kinds; it owns
//! parameter validation. [`Corruption`] is a validated (kind, parameter)
//! pair and owns application. Corruption is a pure function of
//! (image, parameter, seed): the input image is never mutated, the output
//! keeps its dimensions and channel count, and identical inputs produce
//! bit-identical outputs.

mod blur;
mod jpeg;
mod perlin;
mod rain;
mod resolution;
mod snow;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed enumeration of corruption filter kinds.
///
/// Each kind interprets the scalar sweep parameter according to its own
/// semantics; see [`FilterKind::param_help`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    GaussianBlur,
    Rain,
    Snow,
    Jpeg,
    Resolution,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::GaussianBlur,
        FilterKind::Rain,
        FilterKind::Snow,
        FilterKind::Jpeg,
        FilterKind::Resolution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::GaussianBlur => "gaussian_blur",
            FilterKind::Rain => "rain",
            FilterKind::Snow => "snow",
            FilterKind::Jpeg => "jpeg",
            FilterKind::Resolution => "resolution",
        }
    }

    /// Registry lookup by filter name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Human-readable parameter domain, for CLI listings.
    pub fn param_help(self) -> &'static str {
        match self {
            FilterKind::GaussianBlur => "standard deviation in pixels, >= 0 (0 = identity)",
            FilterKind::Rain => "per-pixel streak probability in (0, 1)",
            FilterKind::Snow => "per-pixel snowflake probability in (0, 1)",
            FilterKind::Jpeg => "integer quality in [0, 100] (100 ~ identity)",
            FilterKind::Resolution => "integer downscale factor k >= 1 (1 = identity)",
        }
    }

    /// Validate a scalar parameter and build the corresponding injector.
    pub fn instantiate(self, param: f64) -> Result<Corruption> {
        if !param.is_finite() {
            return Err(Error::invalid_parameter(
                self.name(),
                format!("parameter {param} is not finite"),
            ));
        }
        match self {
            FilterKind::GaussianBlur => {
                if param < 0.0 {
                    return Err(Error::invalid_parameter(
                        self.name(),
                        format!("standard deviation must be >= 0, got {param}"),
                    ));
                }
                Ok(Corruption::GaussianBlur {
                    sigma: param as f32,
                })
            }
            FilterKind::Rain | FilterKind::Snow => {
                if param <= 0.0 || param >= 1.0 {
                    return Err(Error::invalid_parameter(
                        self.name(),
                        format!("probability must lie in the open interval (0, 1), got {param}"),
                    ));
                }
                match self {
                    FilterKind::Rain => Ok(Corruption::Rain { probability: param }),
                    _ => Ok(Corruption::Snow { probability: param }),
                }
            }
            FilterKind::Jpeg => {
                if param.fract() != 0.0 || !(0.0..=100.0).contains(&param) {
                    return Err(Error::invalid_parameter(
                        self.name(),
                        format!("quality must be an integer in [0, 100], got {param}"),
                    ));
                }
                Ok(Corruption::Jpeg {
                    quality: param as u8,
                })
            }
            FilterKind::Resolution => {
                if param.fract() != 0.0 || param < 1.0 || param > u32::MAX as f64 {
                    return Err(Error::invalid_parameter(
                        self.name(),
                        format!("downscale factor must be an integer >= 1, got {param}"),
                    ));
                }
                Ok(Corruption::Resolution {
                    factor: param as u32,
                })
            }
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated corruption injector: filter kind plus its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Corruption {
    GaussianBlur { sigma: f32 },
    Rain { probability: f64 },
    Snow { probability: f64 },
    Jpeg { quality: u8 },
    Resolution { factor: u32 },
}

impl Corruption {
    pub fn kind(&self) -> FilterKind {
        match self {
            Corruption::GaussianBlur { .. } => FilterKind::GaussianBlur,
            Corruption::Rain { .. } => FilterKind::Rain,
            Corruption::Snow { .. } => FilterKind::Snow,
            Corruption::Jpeg { .. } => FilterKind::Jpeg,
            Corruption::Resolution { .. } => FilterKind::Resolution,
        }
    }

    /// The scalar sweep parameter this injector was built from.
    pub fn param(&self) -> f64 {
        match self {
            Corruption::GaussianBlur { sigma } => f64::from(*sigma),
            Corruption::Rain { probability } | Corruption::Snow { probability } => *probability,
            Corruption::Jpeg { quality } => f64::from(*quality),
            Corruption::Resolution { factor } => f64::from(*factor),
        }
    }

    /// Apply the corruption, returning a new image of identical dimensions.
    ///
    /// `seed` drives all randomness; deterministic filters ignore it.
    pub fn apply(&self, image: &RgbImage, seed: u64) -> Result<RgbImage> {
        let out = match self {
            Corruption::GaussianBlur { sigma } => blur::apply(image, *sigma),
            Corruption::Rain { probability } => rain::apply(image, *probability, seed),
            Corruption::Snow { probability } => snow::apply(image, *probability, seed),
            Corruption::Jpeg { quality } => jpeg::apply(image, *quality)?,
            Corruption::Resolution { factor } => resolution::apply(image, *factor),
        };
        debug_assert_eq!(out.dimensions(), image.dimensions());
        Ok(out)
    }
}
