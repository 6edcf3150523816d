//! Personal color type catalog and classifier
//!
//! Maps a vector of representative skin colors to one of eight personal color
//! types using a pre-trained standardization plus nearest-center model.

pub mod catalog;
pub mod classifier;
pub mod model;

pub use catalog::{lookup, PersonalColorType, Season, CATALOG};
pub use classifier::TypeClassifier;
pub use model::ClassifierModel;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature {index} is not a finite number")]
    NonFiniteFeature { index: usize },

    #[error("invalid classifier model: {0}")]
    InvalidModel(String),
}
