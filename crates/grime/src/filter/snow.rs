//! Snow: stochastic flake occlusion plus a Perlin-noise storm layer.
//!
//! Flakes are seeded with the same geometric-skip scheme as rain; each is a
//! radial sprite with linear alpha falloff, blended toward white. A
//! full-frame storm layer then lifts every pixel toward white by a
//! noise-modulated amount, so even flake-free regions lose contrast.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Geometric, Normal};

use super::perlin;

const FLAKE_RADIUS_MEAN: f64 = 5.0;
const FLAKE_RADIUS_SD: f64 = 2.0;
/// Peak flake opacity at the sprite centre.
const FLAKE_ALPHA: f32 = 0.4;
/// Strength of the full-frame storm layer.
const STORM_ALPHA: f32 = 0.3;

/// Blend a channel value toward white by `weight` in [0, 1].
fn whiten(v: u8, weight: f32) -> u8 {
    (f32::from(v) + (255.0 - f32::from(v)) * weight)
        .round()
        .clamp(0.0, 255.0) as u8
}

pub(super) fn apply(image: &RgbImage, probability: f64, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = image.dimensions();
    let (wi, hi) = (i64::from(w), i64::from(h));

    let skip = Geometric::new(probability).expect("probability validated in (0, 1)");
    let radius = Normal::new(FLAKE_RADIUS_MEAN, FLAKE_RADIUS_SD).expect("constant flake radius");

    let mut out = image.clone();

    // Flake sprites.
    let mut ind: i64 = -1;
    loop {
        ind += skip.sample(&mut rng) as i64 + 1;
        if ind >= wi * hi {
            break;
        }
        let cy = ind / wi;
        let cx = ind % wi;
        let r = radius.sample(&mut rng).round() as i64;
        if r <= 0 {
            continue;
        }

        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(hi - 1);
        let x0 = (cx - r).max(0);
        let x1 = (cx + r).min(wi - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x - cx) as f32;
                let dy = (y - cy) as f32;
                let d = (dx * dx + dy * dy).sqrt();
                let falloff = (1.0 - d / r as f32).max(0.0);
                if falloff <= 0.0 {
                    continue;
                }
                let px = out.get_pixel_mut(x as u32, y as u32);
                for v in &mut px.0 {
                    *v = whiten(*v, falloff * FLAKE_ALPHA);
                }
            }
        }
    }

    // Storm layer: noise in [-1, 1] shifted to [0, 1].
    let noise = perlin::noise_2d(w, h, &mut rng);
    for y in 0..h {
        for x in 0..w {
            let n = (noise[(y * w + x) as usize] + 1.0) / 2.0;
            let px = out.get_pixel_mut(x, y);
            for v in &mut px.0 {
                *v = whiten(*v, STORM_ALPHA * n.clamp(0.0, 1.0));
            }
        }
    }
    out
}
