//! Analysis outputs and their JSON representation

use chrono::{DateTime, Utc};
use image::RgbImage;
use lighting_correction::{CorrectionLog, LightingReport};
use serde::Serialize;
use skin_color::ColorFeatureVector;
use type_classifier::PersonalColorType;

use crate::AnalysisError;

/// Successful classification of one photo
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub personal_color: &'static PersonalColorType,
    /// Lighting of the uploaded photo before correction
    pub lighting: LightingReport,
    pub corrections: CorrectionLog,
    /// Representative skin colors (Lab) the classification was based on
    pub features: ColorFeatureVector,
    pub analyzed_at: DateTime<Utc>,
}

/// Output of the lighting preview: what was wrong and how it was fixed
#[derive(Debug, Clone)]
pub struct LightingPreview {
    pub diagnosis: LightingReport,
    pub corrected: RgbImage,
    pub log: CorrectionLog,
}

/// Flat payload returned to web clients, for both success and failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_color_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_description: Option<String>,
    pub palette: Vec<String>,
    pub corrections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl From<&AnalysisResult> for AnalysisResponse {
    fn from(result: &AnalysisResult) -> Self {
        let color = result.personal_color;
        Self {
            success: true,
            personal_color_type: Some(color.name.to_string()),
            visual_name: Some(color.visual_name.to_string()),
            type_description: Some(color.description.to_string()),
            palette: color.palette.iter().map(|c| c.to_string()).collect(),
            corrections: result.corrections.entries().to_vec(),
            error: None,
            error_kind: None,
        }
    }
}

impl From<&AnalysisError> for AnalysisResponse {
    fn from(err: &AnalysisError) -> Self {
        Self {
            success: false,
            personal_color_type: None,
            visual_name: None,
            type_description: None,
            palette: Vec::new(),
            corrections: Vec::new(),
            error: Some(err.user_message()),
            error_kind: Some(err.kind().to_string()),
        }
    }
}

impl From<&Result<AnalysisResult, AnalysisError>> for AnalysisResponse {
    fn from(outcome: &Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => result.into(),
            Err(err) => err.into(),
        }
    }
}
