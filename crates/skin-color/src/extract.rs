//! Representative skin colors from a segmented face

use crate::kmeans::{kmeans, KMeansParams};
use crate::lab::rgb_to_lab;
use crate::segmentation::{SegmentationMap, SKIN_LABELS};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Number of representative colors by default (21-value feature vector)
pub const DEFAULT_COLOR_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// K, the number of representative colors
    pub color_count: usize,
    pub seed: u64,
    pub max_iterations: usize,
    pub tolerance: f32,
    pub restarts: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            color_count: DEFAULT_COLOR_COUNT,
            seed: 0,
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 4,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("found {found} skin pixels, need at least {required}")]
    InsufficientSkinArea { found: usize, required: usize },

    #[error("segmentation map is {map_width}x{map_height} but image is {image_width}x{image_height}")]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        map_width: u32,
        map_height: u32,
    },
}

/// K Lab cluster centers flattened as `[L0, a0, b0, L1, a1, b1, ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorFeatureVector(Vec<f32>);

impl ColorFeatureVector {
    /// Flatten Lab cluster centers in their given order
    pub fn from_centers(centers: &[[f32; 3]]) -> Self {
        Self(centers.iter().flatten().copied().collect())
    }

    /// Get the flattened values
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Get the number of values (3 per color)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the vector holds no colors
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The representative colors as `[L, a, b]` triples
    pub fn colors(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.0.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }
}

pub struct SkinColorExtractor {
    config: ExtractorConfig,
}

impl Default for SkinColorExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl SkinColorExtractor {
    /// Create an extractor with the given clustering configuration
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Get the clustering configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Cluster the Lab colors of skin and nose pixels into K representative colors
    pub fn extract(
        &self,
        image: &RgbImage,
        segmentation: &SegmentationMap,
    ) -> Result<ColorFeatureVector, ExtractionError> {
        let (image_width, image_height) = image.dimensions();
        let (map_width, map_height) = segmentation.dimensions();
        if (image_width, image_height) != (map_width, map_height) {
            return Err(ExtractionError::DimensionMismatch {
                image_width,
                image_height,
                map_width,
                map_height,
            });
        }

        let mask = segmentation.mask(&SKIN_LABELS);
        let points: Vec<[f32; 3]> = image
            .pixels()
            .zip(mask)
            .filter(|(_, selected)| *selected)
            .map(|(pixel, _)| rgb_to_lab(*pixel))
            .collect();

        let k = self.config.color_count;
        if points.len() < k || points.is_empty() {
            return Err(ExtractionError::InsufficientSkinArea {
                found: points.len(),
                required: k.max(1),
            });
        }

        let params = KMeansParams {
            k,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            restarts: self.config.restarts,
            seed: self.config.seed,
        };
        let clustering = kmeans(&points, &params).ok_or(ExtractionError::InsufficientSkinArea {
            found: points.len(),
            required: k.max(1),
        })?;

        debug!(
            skin_pixels = points.len(),
            k,
            iterations = clustering.iterations,
            inertia = clustering.inertia,
            "Clustered skin colors"
        );

        Ok(ColorFeatureVector::from_centers(&clustering.centers))
    }
}
