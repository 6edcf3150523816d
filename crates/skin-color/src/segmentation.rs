//! Face segmentation contract
//!
//! The face detector/parser is an external capability. It receives the
//! working-resolution image and returns detection scores plus a per-pixel
//! label map for the best detection. [`FaceSegmentationAdapter`] enforces the
//! contract: exact input size, a confidence threshold, and a label map with
//! the same dimensions as the input.

use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Side length of the square image the face model consumes
pub const WORKING_SIZE: u32 = 448;
/// Minimum score of the top detection
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;

/// Face-parsing classes (19-class convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FaceLabel {
    Background = 0,
    Skin = 1,
    LeftBrow = 2,
    RightBrow = 3,
    LeftEye = 4,
    RightEye = 5,
    Eyeglasses = 6,
    LeftEar = 7,
    RightEar = 8,
    Earring = 9,
    Nose = 10,
    Mouth = 11,
    UpperLip = 12,
    LowerLip = 13,
    Neck = 14,
    Necklace = 15,
    Cloth = 16,
    Hair = 17,
    Hat = 18,
}

impl FaceLabel {
    /// Get the numeric label id
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Get the label for a numeric id, if it is one of the 19 classes
    pub fn from_id(id: u8) -> Option<Self> {
        use FaceLabel::*;
        const ALL: [FaceLabel; 19] = [
            Background, Skin, LeftBrow, RightBrow, LeftEye, RightEye, Eyeglasses, LeftEar,
            RightEar, Earring, Nose, Mouth, UpperLip, LowerLip, Neck, Necklace, Cloth, Hair, Hat,
        ];
        ALL.get(id as usize).copied()
    }
}

/// Labels whose pixels count as facial skin for color extraction
pub const SKIN_LABELS: [FaceLabel; 2] = [FaceLabel::Skin, FaceLabel::Nose];

/// Integer label per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMap {
    width: u32,
    height: u32,
    labels: Vec<u8>,
}

impl SegmentationMap {
    /// Create a map from row-major labels, checking the count against the size
    pub fn new(width: u32, height: u32, labels: Vec<u8>) -> Result<Self, SegmentationError> {
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(SegmentationError::LabelCount {
                expected,
                actual: labels.len(),
            });
        }
        Ok(Self { width, height, labels })
    }

    /// A map where every pixel carries the same label
    pub fn filled(width: u32, height: u32, label: FaceLabel) -> Self {
        Self {
            width,
            height,
            labels: vec![label.id(); width as usize * height as usize],
        }
    }

    /// Read a map from a grayscale image whose pixel values are label ids
    pub fn from_label_image(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            labels: image.as_raw().clone(),
        }
    }

    /// Get the map's `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the label id at a pixel
    pub fn label_at(&self, x: u32, y: u32) -> u8 {
        self.labels[(y * self.width + x) as usize]
    }

    /// Overwrite the label at a pixel
    pub fn set_label(&mut self, x: u32, y: u32, label: FaceLabel) {
        self.labels[(y * self.width + x) as usize] = label.id();
    }

    /// Get the raw row-major label ids
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Boolean mask, row-major, selecting pixels with any of the given labels
    pub fn mask(&self, wanted: &[FaceLabel]) -> Vec<bool> {
        self.labels
            .iter()
            .map(|&id| wanted.iter().any(|label| label.id() == id))
            .collect()
    }

    /// Count pixels carrying any of the given labels
    pub fn count(&self, wanted: &[FaceLabel]) -> usize {
        self.mask(wanted).into_iter().filter(|&m| m).count()
    }
}

/// Raw output of a face detector/parser
#[derive(Debug, Clone)]
pub struct FaceParse {
    /// One confidence score per detection
    pub scores: Vec<f32>,
    /// Label map for the highest-scoring detection
    pub labels: Option<SegmentationMap>,
}

/// External face detection + parsing capability
pub trait FaceParser: Send + Sync {
    /// Detect faces in a `WORKING_SIZE` x `WORKING_SIZE` image and parse the best one
    fn parse(&self, image: &RgbImage) -> Result<FaceParse>;
}

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("no face detected (top score {top_score:?}, threshold {threshold})")]
    NoFace {
        top_score: Option<f32>,
        threshold: f32,
    },

    #[error("face model expects a {expected}x{expected} image, got {width}x{height}")]
    InputSize { expected: u32, width: u32, height: u32 },

    #[error("label map is {width}x{height}, working image is {expected}x{expected}")]
    LabelDimensions { expected: u32, width: u32, height: u32 },

    #[error("label map has {actual} labels, expected {expected}")]
    LabelCount { expected: usize, actual: usize },

    #[error("face parser failed: {0:#}")]
    Backend(anyhow::Error),
}

/// Enforces the face model's input/output contract around a [`FaceParser`]
pub struct FaceSegmentationAdapter<P: ?Sized> {
    threshold: f32,
    parser: std::sync::Arc<P>,
}

impl<P: FaceParser + ?Sized> FaceSegmentationAdapter<P> {
    /// Create an adapter with the default detection threshold
    pub fn new(parser: std::sync::Arc<P>) -> Self {
        Self::with_threshold(parser, DEFAULT_DETECTION_THRESHOLD)
    }

    /// Create an adapter with a custom detection threshold
    pub fn with_threshold(parser: std::sync::Arc<P>, threshold: f32) -> Self {
        Self { threshold, parser }
    }

    /// Get the minimum accepted detection score
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Segment the working image, or report why no usable face was found
    pub fn segment(&self, image: &RgbImage) -> Result<SegmentationMap, SegmentationError> {
        let (width, height) = image.dimensions();
        if width != WORKING_SIZE || height != WORKING_SIZE {
            return Err(SegmentationError::InputSize {
                expected: WORKING_SIZE,
                width,
                height,
            });
        }

        let parse = self.parser.parse(image).map_err(SegmentationError::Backend)?;
        let top_score = parse.scores.iter().cloned().fold(None, |best: Option<f32>, s| {
            Some(best.map_or(s, |b| b.max(s)))
        });

        debug!(detections = parse.scores.len(), top_score = ?top_score, "Face parser returned");

        let no_face = SegmentationError::NoFace {
            top_score,
            threshold: self.threshold,
        };
        match top_score {
            Some(score) if score >= self.threshold => {}
            _ => return Err(no_face),
        }
        let labels = parse.labels.ok_or(no_face)?;

        let (label_w, label_h) = labels.dimensions();
        if label_w != WORKING_SIZE || label_h != WORKING_SIZE {
            return Err(SegmentationError::LabelDimensions {
                expected: WORKING_SIZE,
                width: label_w,
                height: label_h,
            });
        }

        Ok(labels)
    }
}

/// Serves a label map computed ahead of time, e.g. by a face-parsing model
/// running in another process
pub struct PrecomputedParser {
    labels: SegmentationMap,
    score: f32,
}

impl PrecomputedParser {
    /// Create a parser that always reports one confident face with `labels`
    pub fn new(labels: SegmentationMap) -> Self {
        Self { labels, score: 1.0 }
    }

    /// Load a grayscale PNG whose pixel values are face-parsing label ids
    pub fn from_label_file(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to read label map {}", path.display()))?
            .to_luma8();
        Ok(Self::new(SegmentationMap::from_label_image(&image)))
    }
}

impl FaceParser for PrecomputedParser {
    fn parse(&self, _image: &RgbImage) -> Result<FaceParse> {
        Ok(FaceParse {
            scores: vec![self.score],
            labels: Some(self.labels.clone()),
        })
    }
}
