//! Minimal 2-D Perlin noise over a single 2x2 gradient lattice.
//!
//! Just enough for the snow filter's storm layer: one noise octave whose
//! gradients span the whole frame. Output is row-major, roughly in [-1, 1].

use rand::rngs::StdRng;
use rand::Rng;

/// Quintic fade: 6t^5 - 15t^4 + 10t^3.
fn fade(t: f32) -> f32 {
    ((6.0 * t - 15.0) * t + 10.0) * t * t * t
}

pub(super) fn noise_2d(width: u32, height: u32, rng: &mut StdRng) -> Vec<f32> {
    // Four corner gradients as unit vectors from random angles.
    let mut grad = [[0.0f32; 2]; 4];
    for g in &mut grad {
        let angle = 2.0 * std::f32::consts::PI * rng.gen::<f32>();
        *g = [angle.cos(), angle.sin()];
    }
    let [g00, g01, g10, g11] = grad;

    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let u = y as f32 / height as f32;
        for x in 0..width {
            let v = x as f32 / width as f32;

            // Ramp values at the four corners.
            let n00 = u * g00[0] + v * g00[1];
            let n10 = (u - 1.0) * g10[0] + v * g10[1];
            let n01 = u * g01[0] + (v - 1.0) * g01[1];
            let n11 = (u - 1.0) * g11[0] + (v - 1.0) * g11[1];

            let fu = fade(u);
            let fv = fade(v);
            let n0 = n00 * (1.0 - fu) + fu * n10;
            let n1 = n01 * (1.0 - fu) + fu * n11;
            out.push(std::f32::consts::SQRT_2 * ((1.0 - fv) * n0 + fv * n1));
        }
    }
    out
}
