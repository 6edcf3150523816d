//! Face segmentation contract and skin color extraction
//!
//! Takes the lighting-corrected working image, isolates facial skin through a
//! pluggable face parser, and summarizes it as K representative Lab colors.

pub mod extract;
pub mod kmeans;
pub mod lab;
pub mod segmentation;

pub use extract::{ColorFeatureVector, ExtractionError, ExtractorConfig, SkinColorExtractor, DEFAULT_COLOR_COUNT};
pub use lab::rgb_to_lab;
pub use segmentation::{
    FaceLabel, FaceParse, FaceParser, FaceSegmentationAdapter, PrecomputedParser, SegmentationError,
    SegmentationMap, DEFAULT_DETECTION_THRESHOLD, SKIN_LABELS, WORKING_SIZE,
};
