//! Diagnosis-driven correction pipeline
//!
//! [`plan_corrections`] is the decision table: it maps a diagnosis to the set
//! of operators that should fire. [`CorrectionPipeline`] executes a plan in
//! the fixed order white balance, exposure, contrast, sharpening, jitter, and
//! records each operator it applied.

use crate::clahe::{self, ClaheParams};
use crate::jitter::{self, JitterConfig};
use crate::lighting::{LightingAnalyzer, LightingDiagnosis};
use crate::sharpen::unsharp_mask;
use crate::tone::{apply_gamma, lift_shadows, pull_highlights};
use crate::white_balance::{apply_white_balance, WhiteBalanceStrategy};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bright-pixel fraction above which white-patch balancing is used
const WHITE_PATCH_MIN_BRIGHT_RATIO: f64 = 0.15;
/// Below this stddev the low-contrast CLAHE uses its strongest clip limit
const VERY_LOW_CONTRAST_STDDEV: f64 = 15.0;
/// Below this stddev the image is sharpened
const SHARPEN_MAX_STDDEV: f64 = 30.0;

const STRONG_CLIP_LIMIT: f32 = 4.0;
const LOW_CONTRAST_CLIP_LIMIT: f32 = 2.5;
const LOW_CONTRAST_TILES: u32 = 8;
const UNEVEN_CLIP_LIMIT: f32 = 2.0;
const UNEVEN_TILES: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Width of the shadow/highlight bands on the 0-1 luma scale
    pub tone_band_width: f32,
    pub shadow_amount: f32,
    pub highlight_amount: f32,
    /// Power-curve exponent for underexposed images (< 1 brightens)
    pub underexposure_gamma: f32,
    /// Power-curve exponent for overexposed images (> 1 darkens)
    pub overexposure_gamma: f32,
    pub sharpen_sigma: f32,
    pub sharpen_strength: f32,
    pub jitter: JitterConfig,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            tone_band_width: 0.2,
            shadow_amount: 0.4,
            highlight_amount: 0.3,
            underexposure_gamma: 0.7,
            overexposure_gamma: 1.3,
            sharpen_sigma: 1.0,
            sharpen_strength: 0.5,
            jitter: JitterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureAdjustment {
    /// Shadow lift followed by a brightening gamma
    Brighten,
    /// Highlight pull followed by a darkening gamma
    Darken,
}

/// Operators selected for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPlan {
    pub white_balance: WhiteBalanceStrategy,
    pub exposure: Option<ExposureAdjustment>,
    pub contrast: Option<ClaheParams>,
    pub sharpen: bool,
}

/// The single source of truth for which corrections a diagnosis calls for
pub fn plan_corrections(diagnosis: &LightingDiagnosis) -> CorrectionPlan {
    let white_balance = if diagnosis.bright_pixel_ratio > WHITE_PATCH_MIN_BRIGHT_RATIO {
        WhiteBalanceStrategy::WhitePatch
    } else if diagnosis.has_uneven_lighting() {
        WhiteBalanceStrategy::IlluminantEstimation
    } else {
        WhiteBalanceStrategy::GrayWorld
    };

    let exposure = if diagnosis.is_underexposed() {
        Some(ExposureAdjustment::Brighten)
    } else if diagnosis.is_overexposed() {
        Some(ExposureAdjustment::Darken)
    } else {
        None
    };

    let contrast = if diagnosis.has_low_contrast() {
        let clip = if diagnosis.brightness_stddev < VERY_LOW_CONTRAST_STDDEV {
            STRONG_CLIP_LIMIT
        } else {
            LOW_CONTRAST_CLIP_LIMIT
        };
        Some(ClaheParams::new(clip, LOW_CONTRAST_TILES))
    } else if diagnosis.has_uneven_lighting() {
        Some(ClaheParams::new(UNEVEN_CLIP_LIMIT, UNEVEN_TILES))
    } else {
        None
    };

    CorrectionPlan {
        white_balance,
        exposure,
        contrast,
        sharpen: diagnosis.brightness_stddev < SHARPEN_MAX_STDDEV,
    }
}

/// Human-readable record of the operators applied, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionLog(Vec<String>);

impl CorrectionLog {
    /// Append an entry for an operator that was applied
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    /// Get the entries in application order
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Get the number of operators applied
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no operator was applied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the log, returning its entries
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Output of a correction run
#[derive(Debug, Clone)]
pub struct CorrectedImage {
    pub image: RgbImage,
    /// Diagnosis of the input image that drove the plan
    pub diagnosis: LightingDiagnosis,
    pub plan: CorrectionPlan,
    pub log: CorrectionLog,
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionPipeline {
    config: CorrectionConfig,
}

impl CorrectionPipeline {
    /// Create a pipeline with custom configuration
    pub fn new(config: CorrectionConfig) -> Self {
        Self { config }
    }

    /// Get the pipeline configuration
    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Correct an image, diagnosing it first unless a diagnosis is supplied
    pub fn correct(&self, image: &RgbImage, diagnosis: Option<LightingDiagnosis>) -> CorrectedImage {
        let diagnosis = diagnosis.unwrap_or_else(|| LightingAnalyzer::analyze(image));
        let plan = plan_corrections(&diagnosis);
        let mut log = CorrectionLog::default();

        let mut current = apply_white_balance(image, plan.white_balance);
        log.push(format!("white balance ({})", plan.white_balance));

        match plan.exposure {
            Some(ExposureAdjustment::Brighten) => {
                current = lift_shadows(&current, self.config.shadow_amount, self.config.tone_band_width);
                log.push(format!("shadow lift (amount {:.2})", self.config.shadow_amount));
                current = apply_gamma(&current, self.config.underexposure_gamma);
                log.push(format!("gamma {:.2} (brighten)", self.config.underexposure_gamma));
            }
            Some(ExposureAdjustment::Darken) => {
                current = pull_highlights(&current, self.config.highlight_amount, self.config.tone_band_width);
                log.push(format!("highlight pull (amount {:.2})", self.config.highlight_amount));
                current = apply_gamma(&current, self.config.overexposure_gamma);
                log.push(format!("gamma {:.2} (darken)", self.config.overexposure_gamma));
            }
            None => {}
        }

        if let Some(params) = plan.contrast {
            current = clahe::equalize_luma(&current, params);
            log.push(format!("CLAHE ({params})"));
        }

        if plan.sharpen {
            current = unsharp_mask(&current, self.config.sharpen_sigma, self.config.sharpen_strength);
            log.push(format!("unsharp mask (strength {:.2})", self.config.sharpen_strength));
        }

        if self.config.jitter.enabled {
            let mut rng = self.config.jitter.rng();
            if let Some(params) = jitter::sample(&self.config.jitter, &mut rng) {
                current = jitter::apply(&current, params);
                log.push(format!("color jitter ({params})"));
            }
        }

        debug!(
            width = image.width(),
            height = image.height(),
            mean_brightness = diagnosis.mean_brightness,
            brightness_stddev = diagnosis.brightness_stddev,
            operators = log.len(),
            "Lighting correction applied"
        );

        CorrectedImage {
            image: current,
            diagnosis,
            plan,
            log,
        }
    }
}
