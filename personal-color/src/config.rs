use anyhow::{Context, Result};
use lighting_correction::CorrectionConfig;
use serde::{Deserialize, Serialize};
use skin_color::{ExtractorConfig, DEFAULT_DETECTION_THRESHOLD};
use std::path::Path;

/// Configuration for an [`crate::Analyzer`] and the services built on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub correction: CorrectionConfig,
    pub extractor: ExtractorConfig,
    /// Minimum face detection score
    pub detection_threshold: f32,
    /// Analyses allowed to run at once in [`crate::AnalysisService`]
    pub max_concurrent: usize,
    /// Byte budget of the opt-in result cache; 0 (the default) analyzes every upload afresh
    pub cache_budget: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            correction: CorrectionConfig::default(),
            extractor: ExtractorConfig::default(),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            max_concurrent: 4,
            cache_budget: 0,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file, defaulting missing fields
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Cached results are only reused when the pipeline is deterministic
    pub fn caching_enabled(&self) -> bool {
        self.cache_budget > 0 && !self.correction.jitter.enabled
    }
}
