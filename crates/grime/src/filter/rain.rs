//! Rain: stochastic vertical streak occlusion.
//!
//! Streak origins are seeded by geometric skips over the pixel grid, so the
//! expected density matches the per-pixel probability without visiting every
//! pixel. Streak coverage is accumulated in a 2-D difference array and turned
//! into per-pixel counts by prefix sums; covered pixels get additive normal
//! brightening with a blue-channel bias.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Geometric, Normal, StandardNormal};

/// Streaks are 3 px wide: centre column plus one on each side.
const STREAK_HALF_WIDTH: i64 = 1;
const STREAK_LEN_MEAN: f64 = 20.0;
const STREAK_LEN_SD: f64 = 10.0;
/// Extra brightening on the blue channel per covering streak.
const BLUE_BIAS: f64 = 30.0;

pub(super) fn apply(image: &RgbImage, probability: f64, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = image.dimensions();
    let (wi, hi) = (i64::from(w), i64::from(h));
    let stride = w as usize + 1;

    // Number of failures before a success; +1 gives the geometric skip.
    let skip = Geometric::new(probability).expect("probability validated in (0, 1)");
    let length = Normal::new(STREAK_LEN_MEAN, STREAK_LEN_SD).expect("constant streak length");

    // Difference array over (h + 1) x (w + 1); corners of each streak
    // rectangle are bumped, prefix sums recover per-pixel coverage counts.
    let mut cover = vec![0i32; stride * (h as usize + 1)];
    let mut ind: i64 = -1;
    loop {
        ind += skip.sample(&mut rng) as i64 + 1;
        if ind >= wi * hi {
            break;
        }
        let y = ind / wi;
        let x = ind % wi;
        let y_r = length.sample(&mut rng).round().max(0.0) as i64;

        let x0 = (x - STREAK_HALF_WIDTH).max(0) as usize;
        let x1 = (x + STREAK_HALF_WIDTH + 1).min(wi) as usize;
        let y0 = (y - y_r).max(0) as usize;
        let y1 = (y + y_r + 1).min(hi) as usize;
        cover[y0 * stride + x0] += 1;
        cover[y0 * stride + x1] -= 1;
        cover[y1 * stride + x0] -= 1;
        cover[y1 * stride + x1] += 1;
    }

    for row in cover.chunks_mut(stride) {
        for x in 1..stride {
            row[x] += row[x - 1];
        }
    }
    for y in 1..=h as usize {
        for x in 0..stride {
            cover[y * stride + x] += cover[(y - 1) * stride + x];
        }
    }

    let mut out = image.clone();
    for y in 0..h {
        for x in 0..w {
            let e = f64::from(cover[y as usize * stride + x as usize]);
            if e <= 0.0 {
                continue;
            }
            let loc = 5.0 * e;
            let scale = 10.0 * (e / 12.0).sqrt() + 4.0 * e;
            let px = out.get_pixel_mut(x, y);
            for (ch, v) in px.0.iter_mut().enumerate() {
                let z: f64 = rng.sample(StandardNormal);
                let mut add = loc + scale * z;
                if ch == 2 {
                    add += BLUE_BIAS * e;
                }
                *v = (f64::from(*v) + add).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::flat_image;

    #[test]
    fn same_seed_is_bit_identical() {
        let img = flat_image(64, 48, [128, 128, 128]);
        assert_eq!(apply(&img, 0.01, 42), apply(&img, 0.01, 42));
    }

    #[test]
    fn different_seeds_differ() {
        let img = flat_image(64, 48, [128, 128, 128]);
        assert_ne!(apply(&img, 0.01, 42), apply(&img, 0.01, 43));
    }

    #[test]
    fn rain_brightens_the_blue_channel_on_average() {
        let img = flat_image(96, 96, [100, 100, 100]);
        let out = apply(&img, 0.02, 7);
        let mean_blue =
            |im: &RgbImage| im.pixels().map(|p| u64::from(p[2])).sum::<u64>() as f64 / 9216.0;
        assert!(mean_blue(&out) > mean_blue(&img));
    }

    #[test]
    fn uncovered_pixels_are_untouched() {
        // Vanishingly sparse rain on a tiny image: most pixels keep their value.
        let img = flat_image(16, 16, [50, 60, 70]);
        let out = apply(&img, 1e-9, 3);
        let unchanged = img
            .pixels()
            .zip(out.pixels())
            .filter(|(a, b)| a == b)
            .count();
        assert!(unchanged > 200, "unchanged = {unchanged}");
    }
}
