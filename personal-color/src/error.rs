//! Request-scoped failure taxonomy

use skin_color::{ExtractionError, SegmentationError};
use thiserror::Error;
use type_classifier::ClassifierError;

/// Why a single analysis request did not produce a result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// No detection, or the best detection was below the confidence threshold
    #[error("No face detected: {reason}")]
    NoFaceDetected { reason: String },

    #[error("Insufficient skin area: found {found} skin pixels, need at least {required}")]
    InsufficientSkinArea { found: usize, required: usize },

    /// Upload could not be decoded as an image
    #[error("Unreadable image: {message}")]
    UnreadableImage { message: String },

    /// Unexpected internal fault (non-finite numbers, mismatched dimensions, back-end failures)
    #[error("Analysis failed: {detail}")]
    AnalysisFailed { detail: String },
}

impl AnalysisError {
    /// Create an `UnreadableImage` error
    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::UnreadableImage {
            message: message.into(),
        }
    }

    /// Create an `AnalysisFailed` error
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::AnalysisFailed { detail: detail.into() }
    }

    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::NoFaceDetected { .. } => "no_face_detected",
            AnalysisError::InsufficientSkinArea { .. } => "insufficient_skin_area",
            AnalysisError::UnreadableImage { .. } => "unreadable_image",
            AnalysisError::AnalysisFailed { .. } => "analysis_failed",
        }
    }

    /// Whether a different photo from the same user could succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AnalysisError::AnalysisFailed { .. })
    }

    /// Message suitable for showing to the person who uploaded the photo
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::NoFaceDetected { .. } => {
                "We could not find a face in this photo. Please upload a clear, front-facing portrait.".to_string()
            }
            AnalysisError::InsufficientSkinArea { .. } => {
                "Not enough of your skin is visible. Please use a closer photo without hair or accessories covering your face.".to_string()
            }
            AnalysisError::UnreadableImage { .. } => {
                "The file could not be read as an image. Please upload a PNG or JPEG photo.".to_string()
            }
            AnalysisError::AnalysisFailed { .. } => {
                "Color analysis failed. Please try again with a different photo.".to_string()
            }
        }
    }
}

impl From<SegmentationError> for AnalysisError {
    fn from(err: SegmentationError) -> Self {
        match err {
            SegmentationError::NoFace { .. } => AnalysisError::NoFaceDetected {
                reason: err.to_string(),
            },
            other => AnalysisError::failed(other.to_string()),
        }
    }
}

impl From<ExtractionError> for AnalysisError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InsufficientSkinArea { found, required } => {
                AnalysisError::InsufficientSkinArea { found, required }
            }
            other => AnalysisError::failed(other.to_string()),
        }
    }
}

impl From<ClassifierError> for AnalysisError {
    fn from(err: ClassifierError) -> Self {
        AnalysisError::failed(err.to_string())
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        AnalysisError::unreadable(err.to_string())
    }
}
