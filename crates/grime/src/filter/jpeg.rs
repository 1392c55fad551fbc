//! JPEG compression artifacts via a lossy encode/decode round trip.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

use crate::error::Result;

pub(super) fn apply(image: &RgbImage, quality: u8) -> Result<RgbImage> {
    let mut buf = Vec::new();
    // The codec's quality floor is 1; the registry admits 0 for symmetry
    // with the documented [0, 100] domain.
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.max(1));
    encoder.encode_image(image)?;

    let decoded = image::load_from_memory_with_format(&buf, ImageFormat::Jpeg)?;
    Ok(decoded.to_rgb8())
}
