//! Resolution reduction: k-times downsample then upsample back.
//!
//! Every pixel takes the value of the top-left pixel of its k x k block, so
//! the output has the original dimensions but 1/k^2 of the information.
//! This is deliberate information loss, not a resize.

use image::RgbImage;

pub(super) fn apply(image: &RgbImage, factor: u32) -> RgbImage {
    if factor <= 1 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        let sy = y / factor * factor;
        for x in 0..w {
            let sx = x / factor * factor;
            out.put_pixel(x, y, *image.get_pixel(sx, sy));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scene;

    #[test]
    fn factor_one_is_bit_identical() {
        let (img, _) = scene(31, 17, (3, 4, 9, 6));
        assert_eq!(apply(&img, 1), img);
    }

    #[test]
    fn blocks_are_constant_after_reduction() {
        let (img, _) = scene(32, 32, (5, 5, 13, 11));
        let out = apply(&img, 4);
        for y in 0..32 {
            for x in 0..32 {
                let anchor = out.get_pixel(x / 4 * 4, y / 4 * 4);
                assert_eq!(out.get_pixel(x, y), anchor);
            }
        }
    }

    #[test]
    fn factor_larger_than_image_collapses_to_one_value() {
        let (img, _) = scene(8, 8, (1, 1, 4, 4));
        let out = apply(&img, 16);
        let first = out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| p == first));
    }
}
