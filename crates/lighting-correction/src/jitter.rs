//! Randomized color jitter
//!
//! A small brightness/contrast/saturation/hue perturbation. It is disabled by
//! default: identical uploads must classify identically unless a caller asks
//! for variability. Sampling and application are split so the perturbation
//! itself stays deterministic and testable.

use crate::luma::{luma, to_u8};
use image::{Rgb, RgbImage};
use palette::{FromColor, Hsv, ShiftHue, Srgb};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub enabled: bool,
    /// Chance of applying the jitter on a given call when enabled
    pub probability: f64,
    /// Maximum relative brightness change (factor sampled from 1 +/- brightness)
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Maximum hue rotation as a fraction of the full circle
    pub hue: f32,
    /// Fixed seed for reproducible jitter; `None` draws from OS entropy per call
    pub seed: Option<u64>,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.5,
            brightness: 0.1,
            contrast: 0.1,
            saturation: 0.1,
            hue: 0.02,
            seed: None,
        }
    }
}

impl JitterConfig {
    /// Create the random source for one call
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// One sampled perturbation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Hue rotation in degrees
    pub hue_degrees: f32,
}

impl JitterParams {
    /// Parameters that leave an image unchanged
    pub fn identity() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            hue_degrees: 0.0,
        }
    }
}

impl std::fmt::Display for JitterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "brightness x{:.3}, contrast x{:.3}, saturation x{:.3}, hue {:+.1} deg",
            self.brightness, self.contrast, self.saturation, self.hue_degrees
        )
    }
}

/// Decide whether to jitter this call and, if so, with which parameters
pub fn sample<R: Rng>(config: &JitterConfig, rng: &mut R) -> Option<JitterParams> {
    if !config.enabled || !rng.gen_bool(config.probability.clamp(0.0, 1.0)) {
        return None;
    }

    let mut factor = |range: f32| {
        if range <= 0.0 {
            1.0
        } else {
            rng.gen_range((1.0 - range).max(0.0)..=1.0 + range)
        }
    };
    let brightness = factor(config.brightness);
    let contrast = factor(config.contrast);
    let saturation = factor(config.saturation);
    let hue_degrees = if config.hue > 0.0 {
        rng.gen_range(-config.hue..=config.hue) * 360.0
    } else {
        0.0
    };

    Some(JitterParams {
        brightness,
        contrast,
        saturation,
        hue_degrees,
    })
}

/// Apply brightness, contrast, saturation and hue changes in that order
pub fn apply(image: &RgbImage, params: JitterParams) -> RgbImage {
    let mut out = image.clone();

    for pixel in out.pixels_mut() {
        *pixel = Rgb(pixel.0.map(|c| to_u8(c as f32 * params.brightness)));
    }

    if (params.contrast - 1.0).abs() > f32::EPSILON {
        let count = (out.width() as usize * out.height() as usize).max(1);
        let mean_luma = out.pixels().map(|p| luma(p[0], p[1], p[2])).sum::<f32>() / count as f32;
        for pixel in out.pixels_mut() {
            *pixel = Rgb(pixel
                .0
                .map(|c| to_u8((c as f32 - mean_luma) * params.contrast + mean_luma)));
        }
    }

    if (params.saturation - 1.0).abs() > f32::EPSILON {
        for pixel in out.pixels_mut() {
            let gray = luma(pixel[0], pixel[1], pixel[2]);
            *pixel = Rgb(pixel
                .0
                .map(|c| to_u8((c as f32 - gray) * params.saturation + gray)));
        }
    }

    if params.hue_degrees.abs() > f32::EPSILON {
        for pixel in out.pixels_mut() {
            let rgb = Srgb::new(pixel[0], pixel[1], pixel[2]).into_format::<f32>();
            let hsv: Hsv = Hsv::from_color(rgb);
            let back: Srgb<u8> = Srgb::<f32>::from_color(hsv.shift_hue(params.hue_degrees)).into_format();
            *pixel = Rgb([back.red, back.green, back.blue]);
        }
    }

    out
}
