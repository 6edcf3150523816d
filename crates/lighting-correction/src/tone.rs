//! Exposure operators: smooth shadow/highlight recovery and gamma curves

use crate::luma::{to_u8, LumaPlanes};
use image::RgbImage;

/// Weight of a luma value (0-1) in the shadow band; 1.0 at black, fading out by `width`
pub fn shadow_weight(v: f32, width: f32) -> f32 {
    (-(v * v) / (2.0 * width * width)).exp()
}

/// Weight of a luma value (0-1) in the highlight band; 1.0 at white
pub fn highlight_weight(v: f32, width: f32) -> f32 {
    let d = v - 1.0;
    (-(d * d) / (2.0 * width * width)).exp()
}

/// Lift dark regions of the luma channel
///
/// Each value moves by `weight * amount * v`, so pure black stays black and
/// mid-tones are barely touched.
pub fn lift_shadows(image: &RgbImage, amount: f32, width: f32) -> RgbImage {
    adjust_luma(image, |v| v + shadow_weight(v, width) * amount * v)
}

/// Pull bright regions of the luma channel down
///
/// Each value moves by `weight * amount * (1 - v)`, so pure white stays white.
pub fn pull_highlights(image: &RgbImage, amount: f32, width: f32) -> RgbImage {
    adjust_luma(image, |v| v - highlight_weight(v, width) * amount * (1.0 - v))
}

fn adjust_luma(image: &RgbImage, curve: impl Fn(f32) -> f32) -> RgbImage {
    let mut planes = LumaPlanes::from_rgb(image);
    for y in planes.y.iter_mut() {
        let v = (*y / 255.0).clamp(0.0, 1.0);
        *y = curve(v).clamp(0.0, 1.0) * 255.0;
    }
    planes.to_rgb()
}

/// Apply a power curve `out = in^gamma` to every channel
///
/// `gamma < 1` brightens, `gamma > 1` darkens.
pub fn apply_gamma(image: &RgbImage, gamma: f32) -> RgbImage {
    let lut: Vec<u8> = (0..=255u32)
        .map(|i| to_u8((i as f32 / 255.0).powf(gamma) * 255.0))
        .collect();

    let mut out = image.clone();
    for channel in out.iter_mut() {
        *channel = lut[*channel as usize];
    }
    out
}
