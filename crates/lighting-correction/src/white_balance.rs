//! White balance strategies
//!
//! All strategies compute one gain per channel on the normalized [0, 1] scale,
//! multiply, and clip back into range.

use crate::luma::to_u8;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

const MID_GRAY: f32 = 0.5;
/// Illuminant estimation aims slightly below mid-gray to avoid blowing out skin
const ILLUMINANT_TARGET: f32 = 0.9 * MID_GRAY;
const ILLUMINANT_GRID: u32 = 3;
const MIN_CHANNEL_LEVEL: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhiteBalanceStrategy {
    /// Scale each channel so the image mean becomes mid-gray
    GrayWorld,
    /// Scale each channel so its brightest value becomes full scale
    WhitePatch,
    /// Use the brightest block of a 3x3 grid as the illuminant estimate
    IlluminantEstimation,
}

impl std::fmt::Display for WhiteBalanceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhiteBalanceStrategy::GrayWorld => write!(f, "gray-world"),
            WhiteBalanceStrategy::WhitePatch => write!(f, "white-patch"),
            WhiteBalanceStrategy::IlluminantEstimation => write!(f, "illuminant-estimation"),
        }
    }
}

/// Per-channel gains the strategy would apply to `image`
pub fn channel_gains(image: &RgbImage, strategy: WhiteBalanceStrategy) -> [f32; 3] {
    if image.width() == 0 || image.height() == 0 {
        return [1.0; 3];
    }

    match strategy {
        WhiteBalanceStrategy::GrayWorld => {
            let mean = region_mean(image, 0, 0, image.width(), image.height());
            mean.map(|m| gain_towards(MID_GRAY, m))
        }
        WhiteBalanceStrategy::WhitePatch => {
            let mut max = [0u8; 3];
            for pixel in image.pixels() {
                for c in 0..3 {
                    max[c] = max[c].max(pixel[c]);
                }
            }
            max.map(|m| gain_towards(1.0, m as f32 / 255.0))
        }
        WhiteBalanceStrategy::IlluminantEstimation => {
            let illuminant = brightest_grid_block(image);
            illuminant.map(|m| gain_towards(ILLUMINANT_TARGET, m))
        }
    }
}

/// Apply the given white balance strategy, returning a new image
pub fn apply_white_balance(image: &RgbImage, strategy: WhiteBalanceStrategy) -> RgbImage {
    let gains = channel_gains(image, strategy);
    scale_channels(image, gains)
}

/// Multiply each channel by its gain and clip to the valid range
pub fn scale_channels(image: &RgbImage, gains: [f32; 3]) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let Rgb([r, g, b]) = *pixel;
        *pixel = Rgb([
            scale_level(r, gains[0]),
            scale_level(g, gains[1]),
            scale_level(b, gains[2]),
        ]);
    }
    out
}

fn scale_level(value: u8, gain: f32) -> u8 {
    let normalized = (value as f32 / 255.0 * gain).clamp(0.0, 1.0);
    to_u8(normalized * 255.0)
}

fn gain_towards(target: f32, level: f32) -> f32 {
    if level <= MIN_CHANNEL_LEVEL {
        // A channel with no signal cannot be rebalanced
        1.0
    } else {
        target / level
    }
}

/// Mean of each channel over a rectangle, normalized to [0, 1]
fn region_mean(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> [f32; 3] {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = image.get_pixel(x, y);
            for c in 0..3 {
                sums[c] += pixel[c] as u64;
            }
            count += 1;
        }
    }

    if count == 0 {
        return [0.0; 3];
    }
    sums.map(|s| s as f32 / count as f32 / 255.0)
}

/// Per-channel mean of the grid block with the highest summed channel means
fn brightest_grid_block(image: &RgbImage) -> [f32; 3] {
    let (width, height) = image.dimensions();
    let mut best = [0.0f32; 3];
    let mut best_intensity = f32::MIN;

    for by in 0..ILLUMINANT_GRID {
        for bx in 0..ILLUMINANT_GRID {
            let x0 = bx * width / ILLUMINANT_GRID;
            let x1 = (bx + 1) * width / ILLUMINANT_GRID;
            let y0 = by * height / ILLUMINANT_GRID;
            let y1 = (by + 1) * height / ILLUMINANT_GRID;
            if x0 == x1 || y0 == y1 {
                continue;
            }

            let mean = region_mean(image, x0, y0, x1, y1);
            let intensity = mean.iter().sum::<f32>();
            if intensity > best_intensity {
                best_intensity = intensity;
                best = mean;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tinted_gradient() -> RgbImage {
        // Blue-ish cast, no channel close to clipping after correction
        RgbImage::from_fn(32, 32, |x, y| {
            let t = ((x + y) * 60 / 62) as u8;
            Rgb([60 + t, 80 + t, 100 + t])
        })
    }

    fn mean_abs_diff(a: &RgbImage, b: &RgbImage) -> f64 {
        let total: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs() as u64)
            .sum();
        total as f64 / a.as_raw().len() as f64
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(WhiteBalanceStrategy::GrayWorld.to_string(), "gray-world");
        assert_eq!(WhiteBalanceStrategy::WhitePatch.to_string(), "white-patch");
        assert_eq!(
            WhiteBalanceStrategy::IlluminantEstimation.to_string(),
            "illuminant-estimation"
        );
    }

    #[test]
    fn test_gray_world_neutralizes_mean() {
        let balanced = apply_white_balance(&tinted_gradient(), WhiteBalanceStrategy::GrayWorld);
        let mean = region_mean(&balanced, 0, 0, 32, 32);
        for m in mean {
            assert!((m - 0.5).abs() < 0.01, "channel mean {m} not mid-gray");
        }
    }

    #[test]
    fn test_gray_world_is_nearly_idempotent() {
        let original = tinted_gradient();
        let once = apply_white_balance(&original, WhiteBalanceStrategy::GrayWorld);
        let twice = apply_white_balance(&once, WhiteBalanceStrategy::GrayWorld);

        let second_gains = channel_gains(&once, WhiteBalanceStrategy::GrayWorld);
        for gain in second_gains {
            assert!((gain - 1.0).abs() < 0.02, "second pass gain {gain}");
        }

        let first_change = mean_abs_diff(&original, &once);
        let second_change = mean_abs_diff(&once, &twice);
        assert!(second_change < first_change);
        assert!(second_change < 1.5);
    }

    #[test]
    fn test_white_patch_maps_max_to_full_scale() {
        let image = RgbImage::from_fn(4, 4, |x, _| Rgb([50 + x as u8 * 40, 100, 20 + x as u8 * 10]));
        let balanced = apply_white_balance(&image, WhiteBalanceStrategy::WhitePatch);

        let mut max = [0u8; 3];
        for pixel in balanced.pixels() {
            for c in 0..3 {
                max[c] = max[c].max(pixel[c]);
            }
        }
        assert_eq!(max, [255, 255, 255]);
    }

    #[test]
    fn test_illuminant_estimation_uses_brightest_block() {
        // Warm bright patch in the top-left block, dim neutral elsewhere
        let image = RgbImage::from_fn(9, 9, |x, y| {
            if x < 3 && y < 3 {
                Rgb([200, 150, 100])
            } else {
                Rgb([60, 60, 60])
            }
        });

        let illuminant = brightest_grid_block(&image);
        assert!((illuminant[0] - 200.0 / 255.0).abs() < 1e-4);
        assert!((illuminant[2] - 100.0 / 255.0).abs() < 1e-4);

        let gains = channel_gains(&image, WhiteBalanceStrategy::IlluminantEstimation);
        assert!((gains[0] - 0.45 / (200.0 / 255.0)).abs() < 1e-3);
        // Warm illuminant: blue is boosted more than red
        assert!(gains[2] > gains[0]);

        let balanced = apply_white_balance(&image, WhiteBalanceStrategy::IlluminantEstimation);
        let patch = balanced.get_pixel(0, 0);
        for c in 0..3 {
            assert!((patch[c] as i32 - 115).abs() <= 1, "patch channel {}", patch[c]);
        }
    }

    #[test]
    fn test_black_channel_keeps_unit_gain() {
        let image = RgbImage::from_pixel(3, 3, Rgb([0, 120, 60]));
        let gains = channel_gains(&image, WhiteBalanceStrategy::GrayWorld);
        assert_eq!(gains[0], 1.0);
        let balanced = apply_white_balance(&image, WhiteBalanceStrategy::GrayWorld);
        assert_eq!(balanced.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_scaling_clips_to_range() {
        let image = RgbImage::from_pixel(2, 2, Rgb([200, 200, 200]));
        let scaled = scale_channels(&image, [2.0, 1.0, 0.0]);
        assert_eq!(scaled.get_pixel(0, 0).0, [255, 200, 0]);
    }
}
