//! Unsharp masking

use crate::luma::to_u8;
use image::{imageops, RgbImage};

/// Sharpen by adding back `strength` times the difference between the image
/// and a Gaussian blur of it
pub fn unsharp_mask(image: &RgbImage, sigma: f32, strength: f32) -> RgbImage {
    if sigma <= 0.0 || strength.abs() < f32::EPSILON {
        return image.clone();
    }

    let blurred = imageops::blur(image, sigma);
    let mut out = image.clone();
    for (channel, &soft) in out.iter_mut().zip(blurred.iter()) {
        let original = *channel as f32;
        let detail = original - soft as f32;
        *channel = to_u8(original + strength * detail);
    }
    out
}
