//! Pre-trained classifier parameters

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ClassifierError;

const REFERENCE_MODEL: &str = include_str!("../models/reference.json");

/// Standardization parameters and cluster centers of a trained model.
///
/// Features are standardized as `(x - center) / scale` and assigned to the
/// nearest cluster center; the index of that center is the type id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    #[serde(default)]
    pub version: String,
    /// Number of representative colors the model was trained on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_count: Option<usize>,
    pub center: Vec<f32>,
    pub scale: Vec<f32>,
    pub cluster_centers: Vec<Vec<f32>>,
}

impl ClassifierModel {
    /// The model bundled with this crate
    pub fn reference() -> Result<Self> {
        Self::from_json_str(REFERENCE_MODEL).context("Bundled reference model is invalid")
    }

    /// Parse and validate a model from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json).context("Failed to parse classifier model")?;
        model.validate()?;
        Ok(model)
    }

    /// Load and validate a model from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read classifier model {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid classifier model {}", path.display()))
    }

    /// Length of the feature vector this model expects
    pub fn dimensions(&self) -> usize {
        self.center.len()
    }

    /// Check lengths, scales and finiteness of every parameter
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let dims = self.center.len();
        let invalid = |reason: String| Err(ClassifierError::InvalidModel(reason));

        if dims == 0 {
            return invalid("center vector is empty".into());
        }
        if self.scale.len() != dims {
            return invalid(format!("scale has {} values, center has {dims}", self.scale.len()));
        }
        if let Some(k) = self.color_count {
            if k * 3 != dims {
                return invalid(format!("color_count {k} does not match {dims} features"));
            }
        }
        if self.center.iter().any(|v| !v.is_finite()) {
            return invalid("center contains non-finite values".into());
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return invalid("scale values must be finite and non-zero".into());
        }
        if self.cluster_centers.is_empty() {
            return invalid("model has no cluster centers".into());
        }
        for (i, c) in self.cluster_centers.iter().enumerate() {
            if c.len() != dims {
                return invalid(format!("cluster center {i} has {} values, expected {dims}", c.len()));
            }
            if c.iter().any(|v| !v.is_finite()) {
                return invalid(format!("cluster center {i} contains non-finite values"));
            }
        }
        Ok(())
    }

    /// Apply `(x - center) / scale`
    pub fn standardize(&self, features: &[f32]) -> Vec<f32> {
        features
            .iter()
            .zip(self.center.iter().zip(&self.scale))
            .map(|(x, (c, s))| (x - c) / s)
            .collect()
    }
}
