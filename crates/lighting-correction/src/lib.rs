//! Lighting diagnosis and image correction for personal color analysis
//!
//! This crate inspects a face photo's luminance, decides which corrections the
//! lighting calls for, and applies them in a fixed order. Every operator takes
//! an `RgbImage` and returns a new one, so intermediate stages stay immutable.
//!
//! # Operators
//!
//! - **White balance**: gray-world, white-patch and grid illuminant estimation
//! - **Exposure**: smooth shadow lift / highlight pull followed by a gamma curve
//! - **Contrast**: CLAHE on the luma channel only
//! - **Sharpening**: unsharp masking
//! - **Jitter**: optional randomized color perturbation (off by default)

pub mod clahe;
pub mod correction;
pub mod jitter;
pub mod lighting;
pub mod luma;
pub mod sharpen;
pub mod tone;
pub mod white_balance;

pub use clahe::ClaheParams;
pub use correction::{
    plan_corrections, CorrectedImage, CorrectionConfig, CorrectionLog, CorrectionPipeline,
    CorrectionPlan, ExposureAdjustment,
};
pub use jitter::{JitterConfig, JitterParams};
pub use lighting::{LightingAnalyzer, LightingDiagnosis, LightingReport};
pub use white_balance::WhiteBalanceStrategy;
