use crate::catalog::{self, PersonalColorType};
use crate::model::ClassifierModel;
use crate::ClassifierError;
use tracing::debug;

/// Nearest-center classifier over standardized color features
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    model: ClassifierModel,
}

impl TypeClassifier {
    /// Create a classifier from a model, validating it first
    pub fn from_model(model: ClassifierModel) -> Result<Self, ClassifierError> {
        model.validate()?;
        Ok(Self { model })
    }

    /// Get the loaded model parameters
    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    /// Assign a feature vector to a type id
    pub fn classify(&self, features: &[f32]) -> Result<u8, ClassifierError> {
        let expected = self.model.dimensions();
        if features.len() != expected {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteFeature { index });
        }

        let standardized = self.model.standardize(features);
        let (best, distance) = self
            .model
            .cluster_centers
            .iter()
            .enumerate()
            .map(|(i, center)| {
                let d: f32 = center
                    .iter()
                    .zip(&standardized)
                    .map(|(c, x)| (c - x) * (c - x))
                    .sum();
                (i, d)
            })
            .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });

        if !distance.is_finite() {
            return Err(ClassifierError::NonFiniteFeature { index: 0 });
        }

        let id = u8::try_from(best).unwrap_or(u8::MAX);
        debug!(id, distance, "Classified color features");
        Ok(id)
    }

    /// Classify and resolve the id against the catalog
    pub fn classify_type(&self, features: &[f32]) -> Result<&'static PersonalColorType, ClassifierError> {
        self.classify(features).map(catalog::lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> TypeClassifier {
        TypeClassifier::from_model(ClassifierModel::reference().unwrap()).unwrap()
    }

    /// Same Lab color repeated for all seven representative colors
    fn repeated(lab: [f32; 3]) -> Vec<f32> {
        lab.iter().copied().cycle().take(21).collect()
    }

    #[test]
    fn test_zero_normalized_vector_is_stable() {
        let classifier = reference();
        let at_center = classifier.model().center.clone();

        let first = classifier.classify(&at_center).unwrap();
        for _ in 0..10 {
            assert_eq!(classifier.classify(&at_center).unwrap(), first);
        }
        assert!(first < 8);
    }

    #[test]
    fn test_light_warm_skin_is_spring() {
        // One scale unit lighter and 0.6 units yellower than the model center
        let features = repeated([73.0, 14.0, 21.0]);
        assert_eq!(reference().classify_type(&features).unwrap().slug, "spring-light");
    }

    #[test]
    fn test_deep_cool_skin_is_winter() {
        let features = repeated([55.4, 14.8, 14.5]);
        assert_eq!(reference().classify_type(&features).unwrap().slug, "winter-deep");
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            reference().classify(&[1.0, 2.0, 3.0]),
            Err(ClassifierError::DimensionMismatch { expected: 21, actual: 3 })
        );
    }

    #[test]
    fn test_nan_rejected() {
        let mut features = repeated([65.0, 14.0, 18.0]);
        features[4] = f32::NAN;
        assert_eq!(
            reference().classify(&features),
            Err(ClassifierError::NonFiniteFeature { index: 4 })
        );
    }

    #[test]
    fn test_invalid_model_rejected() {
        let model = ClassifierModel {
            version: String::new(),
            color_count: None,
            center: vec![0.0; 3],
            scale: vec![1.0; 3],
            cluster_centers: Vec::new(),
        };
        assert!(TypeClassifier::from_model(model).is_err());
    }
}
