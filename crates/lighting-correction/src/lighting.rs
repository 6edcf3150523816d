//! Lighting condition analysis
//!
//! Produces a [`LightingDiagnosis`] from the luma channel of an image. The
//! diagnosis stores only the four measured statistics; every boolean flag is
//! derived from them on demand so a re-diagnosed image can never carry stale
//! flags.

use crate::luma::luma;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Luma below this value counts as a dark pixel
pub const DARK_LUMA_CUTOFF: f32 = 85.0;
/// Luma above this value counts as a bright pixel
pub const BRIGHT_LUMA_CUTOFF: f32 = 170.0;

const UNDEREXPOSED_MAX_MEAN: f64 = 120.0;
const UNDEREXPOSED_MIN_DARK_RATIO: f64 = 0.30;
const OVEREXPOSED_MIN_MEAN: f64 = 180.0;
const OVEREXPOSED_MIN_BRIGHT_RATIO: f64 = 0.20;
const LOW_CONTRAST_MAX_STDDEV: f64 = 25.0;
const UNEVEN_LIGHTING_MIN_STDDEV: f64 = 50.0;

/// Luma statistics of an image, on the 0-255 scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingDiagnosis {
    pub mean_brightness: f64,
    pub brightness_stddev: f64,
    /// Fraction of pixels with luma below [`DARK_LUMA_CUTOFF`]
    pub dark_pixel_ratio: f64,
    /// Fraction of pixels with luma above [`BRIGHT_LUMA_CUTOFF`]
    pub bright_pixel_ratio: f64,
}

impl LightingDiagnosis {
    /// Create a diagnosis from precomputed luma statistics
    pub fn from_stats(
        mean_brightness: f64,
        brightness_stddev: f64,
        dark_pixel_ratio: f64,
        bright_pixel_ratio: f64,
    ) -> Self {
        Self {
            mean_brightness,
            brightness_stddev,
            dark_pixel_ratio,
            bright_pixel_ratio,
        }
    }

    /// Dark on average AND dominated by dark pixels
    pub fn is_underexposed(&self) -> bool {
        self.mean_brightness < UNDEREXPOSED_MAX_MEAN
            && self.dark_pixel_ratio > UNDEREXPOSED_MIN_DARK_RATIO
    }

    /// Bright on average AND dominated by bright pixels
    pub fn is_overexposed(&self) -> bool {
        self.mean_brightness > OVEREXPOSED_MIN_MEAN
            && self.bright_pixel_ratio > OVEREXPOSED_MIN_BRIGHT_RATIO
    }

    /// Luma spread too narrow
    pub fn has_low_contrast(&self) -> bool {
        self.brightness_stddev < LOW_CONTRAST_MAX_STDDEV
    }

    /// Luma spread too wide, typically from side lighting
    pub fn has_uneven_lighting(&self) -> bool {
        self.brightness_stddev > UNEVEN_LIGHTING_MIN_STDDEV
    }

    /// Serializable snapshot of the statistics together with the derived flags
    pub fn report(&self) -> LightingReport {
        LightingReport {
            mean_brightness: self.mean_brightness,
            brightness_stddev: self.brightness_stddev,
            dark_pixel_ratio: self.dark_pixel_ratio,
            bright_pixel_ratio: self.bright_pixel_ratio,
            is_underexposed: self.is_underexposed(),
            is_overexposed: self.is_overexposed(),
            has_low_contrast: self.has_low_contrast(),
            has_uneven_lighting: self.has_uneven_lighting(),
        }
    }
}

/// Flattened diagnosis for JSON output and lighting previews
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightingReport {
    pub mean_brightness: f64,
    pub brightness_stddev: f64,
    pub dark_pixel_ratio: f64,
    pub bright_pixel_ratio: f64,
    pub is_underexposed: bool,
    pub is_overexposed: bool,
    pub has_low_contrast: bool,
    pub has_uneven_lighting: bool,
}

pub struct LightingAnalyzer;

impl LightingAnalyzer {
    /// Measure the luma statistics of an image
    ///
    /// An empty image yields all-zero statistics.
    pub fn analyze(image: &RgbImage) -> LightingDiagnosis {
        let pixel_count = image.width() as usize * image.height() as usize;
        if pixel_count == 0 {
            return LightingDiagnosis::from_stats(0.0, 0.0, 0.0, 0.0);
        }

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut dark = 0usize;
        let mut bright = 0usize;

        for pixel in image.pixels() {
            let y = luma(pixel[0], pixel[1], pixel[2]);
            if y < DARK_LUMA_CUTOFF {
                dark += 1;
            } else if y > BRIGHT_LUMA_CUTOFF {
                bright += 1;
            }
            let y = y as f64;
            sum += y;
            sum_sq += y * y;
        }

        let n = pixel_count as f64;
        let mean = sum / n;
        // Population variance; clamp tiny negative values from rounding
        let variance = (sum_sq / n - mean * mean).max(0.0);

        LightingDiagnosis::from_stats(
            mean,
            variance.sqrt(),
            dark as f64 / n,
            bright as f64 / n,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn split_image(dark_value: u8, bright_value: u8, dark_rows: u32) -> RgbImage {
        RgbImage::from_fn(10, 10, |_, y| {
            if y < dark_rows {
                Rgb([dark_value; 3])
            } else {
                Rgb([bright_value; 3])
            }
        })
    }

    #[test]
    fn test_uniform_image_statistics() {
        let image = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let diagnosis = LightingAnalyzer::analyze(&image);

        assert!((diagnosis.mean_brightness - 100.0).abs() < 1e-3);
        assert!(diagnosis.brightness_stddev < 1e-3);
        assert_eq!(diagnosis.dark_pixel_ratio, 0.0);
        assert_eq!(diagnosis.bright_pixel_ratio, 0.0);
        assert!(diagnosis.has_low_contrast());
        assert!(!diagnosis.has_uneven_lighting());
    }

    #[test]
    fn test_dark_image_is_underexposed() {
        let image = split_image(20, 140, 8);
        let diagnosis = LightingAnalyzer::analyze(&image);

        assert!(diagnosis.mean_brightness < 120.0);
        assert!((diagnosis.dark_pixel_ratio - 0.8).abs() < 1e-9);
        assert!(diagnosis.is_underexposed());
        assert!(!diagnosis.is_overexposed());
    }

    #[test]
    fn test_bright_image_is_overexposed() {
        let image = split_image(150, 240, 2);
        let diagnosis = LightingAnalyzer::analyze(&image);

        assert!(diagnosis.mean_brightness > 180.0);
        assert!(diagnosis.is_overexposed());
        assert!(!diagnosis.is_underexposed());
    }

    #[test]
    fn test_underexposure_requires_both_conditions() {
        // Low mean but too few dark pixels
        let diagnosis = LightingDiagnosis::from_stats(110.0, 20.0, 0.25, 0.0);
        assert!(!diagnosis.is_underexposed());

        // Many dark pixels but mean above cutoff
        let diagnosis = LightingDiagnosis::from_stats(125.0, 60.0, 0.45, 0.3);
        assert!(!diagnosis.is_underexposed());

        let diagnosis = LightingDiagnosis::from_stats(110.0, 60.0, 0.45, 0.1);
        assert!(diagnosis.is_underexposed());
    }

    #[test]
    fn test_overexposure_requires_both_conditions() {
        assert!(!LightingDiagnosis::from_stats(190.0, 10.0, 0.0, 0.1).is_overexposed());
        assert!(!LightingDiagnosis::from_stats(175.0, 10.0, 0.0, 0.5).is_overexposed());
        assert!(LightingDiagnosis::from_stats(190.0, 10.0, 0.0, 0.5).is_overexposed());
    }

    #[test]
    fn test_high_contrast_image_is_uneven() {
        let image = split_image(0, 255, 5);
        let diagnosis = LightingAnalyzer::analyze(&image);

        assert!(diagnosis.brightness_stddev > 100.0);
        assert!(diagnosis.has_uneven_lighting());
        assert!(!diagnosis.has_low_contrast());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 13) as u8, (y * 11) as u8, 90]));
        let first = LightingAnalyzer::analyze(&image);
        let second = LightingAnalyzer::analyze(&image);

        assert_eq!(first, second);
        assert_eq!(first.report(), second.report());
    }

    #[test]
    fn test_report_matches_flags() {
        let diagnosis = LightingDiagnosis::from_stats(100.0, 10.0, 0.5, 0.0);
        let report = diagnosis.report();

        assert_eq!(report.is_underexposed, diagnosis.is_underexposed());
        assert_eq!(report.is_overexposed, diagnosis.is_overexposed());
        assert_eq!(report.has_low_contrast, diagnosis.has_low_contrast());
        assert_eq!(report.has_uneven_lighting, diagnosis.has_uneven_lighting());
    }

    #[test]
    fn test_empty_image() {
        let diagnosis = LightingAnalyzer::analyze(&RgbImage::new(0, 0));
        assert_eq!(diagnosis.mean_brightness, 0.0);
        assert_eq!(diagnosis.dark_pixel_ratio, 0.0);
    }
}
