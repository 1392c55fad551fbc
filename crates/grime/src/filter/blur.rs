//! Gaussian blur: zero-centred normal smoothing with the standard deviation
//! as corruption strength.

use image::RgbImage;

pub(super) fn apply(image: &RgbImage, sigma: f32) -> RgbImage {
    // imageproc rejects sigma <= 0; treat it as the identity.
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scene;

    #[test]
    fn sigma_zero_is_bit_identical() {
        let (img, _) = scene(32, 32, (8, 8, 12, 12));
        let out = apply(&img, 0.0);
        assert_eq!(out, img);
    }

    #[test]
    fn blur_is_deterministic() {
        let (img, _) = scene(32, 32, (8, 8, 12, 12));
        assert_eq!(apply(&img, 2.0), apply(&img, 2.0));
    }

    #[test]
    fn blur_softens_a_hard_edge() {
        let (img, _) = scene(32, 32, (8, 8, 12, 12));
        let out = apply(&img, 3.0);

        // Largest neighbour step in the red channel shrinks under blur.
        let max_step = |im: &RgbImage| {
            let mut m = 0i32;
            for y in 0..im.height() {
                for x in 1..im.width() {
                    let a = i32::from(im.get_pixel(x - 1, y)[0]);
                    let b = i32::from(im.get_pixel(x, y)[0]);
                    m = m.max((a - b).abs());
                }
            }
            m
        };
        assert!(max_step(&out) < max_step(&img));
    }
}
