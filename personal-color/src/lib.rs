//! Personal color analysis
//!
//! Runs one photo through the full pipeline:
//!
//! 1. diagnose the lighting and correct it ([`lighting_correction`])
//! 2. resize to the face model's working size and segment the face
//! 3. cluster the skin pixels into representative Lab colors ([`skin_color`])
//! 4. classify the colors into one of eight types ([`type_classifier`])
//!
//! The [`Analyzer`] owns every loaded model and is immutable once built, so a
//! single instance can be shared across threads behind an `Arc`.

pub mod cache;
pub mod config;
pub mod error;
pub mod result;
pub mod service;

pub use cache::{content_key, CacheStats, ResultCache};
pub use config::AnalyzerConfig;
pub use error::AnalysisError;
pub use result::{AnalysisResponse, AnalysisResult, LightingPreview};
pub use service::AnalysisService;

use anyhow::Result;
use chrono::Utc;
use image::{imageops, imageops::FilterType, RgbImage};
use lighting_correction::CorrectionPipeline;
use rayon::prelude::*;
use skin_color::{FaceParser, FaceSegmentationAdapter, SkinColorExtractor, WORKING_SIZE};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use type_classifier::{ClassifierModel, TypeClassifier};

/// Upload extensions accepted by the service
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether an upload name carries one of the accepted image extensions
pub fn is_allowed_upload(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Loaded models and configuration for the analysis pipeline
pub struct Analyzer {
    config: AnalyzerConfig,
    pipeline: CorrectionPipeline,
    segmenter: FaceSegmentationAdapter<dyn FaceParser>,
    extractor: SkinColorExtractor,
    classifier: TypeClassifier,
    cache: Option<ResultCache>,
}

impl Analyzer {
    /// Create an analyzer, checking that the model matches the extractor's feature length
    pub fn new(config: AnalyzerConfig, parser: Arc<dyn FaceParser>, model: ClassifierModel) -> Result<Self> {
        let classifier = TypeClassifier::from_model(model)?;
        let extractor_dims = config.extractor.color_count * 3;
        if classifier.model().dimensions() != extractor_dims {
            anyhow::bail!(
                "Classifier expects {} features but the extractor produces {}",
                classifier.model().dimensions(),
                extractor_dims
            );
        }

        let cache = config.caching_enabled().then(|| ResultCache::new(config.cache_budget));

        Ok(Self {
            pipeline: CorrectionPipeline::new(config.correction.clone()),
            segmenter: FaceSegmentationAdapter::with_threshold(parser, config.detection_threshold),
            extractor: SkinColorExtractor::new(config.extractor.clone()),
            classifier,
            cache,
            config,
        })
    }

    /// Build with the classifier model bundled in `type-classifier`
    pub fn with_reference_model(config: AnalyzerConfig, parser: Arc<dyn FaceParser>) -> Result<Self> {
        Self::new(config, parser, ClassifierModel::reference()?)
    }

    /// Get the configuration the analyzer was built with
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get result cache statistics, or `None` when caching is off
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResultCache::stats)
    }

    /// Classify the personal color type of the face in `image`
    pub fn analyze(&self, image: &RgbImage) -> Result<AnalysisResult, AnalysisError> {
        let outcome = self.run_pipeline(image);
        match &outcome {
            Ok(result) => info!(
                personal_color = result.personal_color.slug,
                corrections = result.corrections.len(),
                "Analysis complete"
            ),
            Err(err) => warn!(kind = err.kind(), error = %err, "Analysis failed"),
        }
        outcome
    }

    fn run_pipeline(&self, image: &RgbImage) -> Result<AnalysisResult, AnalysisError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnalysisError::unreadable("image has no pixels"));
        }

        let corrected = self.pipeline.correct(image, None);
        debug!(steps = ?corrected.log.entries(), "Lighting corrected");

        let working = imageops::resize(&corrected.image, WORKING_SIZE, WORKING_SIZE, FilterType::Triangle);
        let labels = self.segmenter.segment(&working)?;
        let features = self.extractor.extract(&working, &labels)?;
        let personal_color = self.classifier.classify_type(features.as_slice())?;

        Ok(AnalysisResult {
            personal_color,
            lighting: corrected.diagnosis.report(),
            corrections: corrected.log,
            features,
            analyzed_at: Utc::now(),
        })
    }

    /// Decode an upload and analyze it, reusing a cached result for identical bytes
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        let key = self.cache.as_ref().map(|_| content_key(bytes));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(mut hit) = cache.get(key) {
                debug!(key = %key, "Result cache hit");
                hit.analyzed_at = Utc::now();
                return Ok(hit);
            }
        }

        let image = image::load_from_memory(bytes)?.to_rgb8();
        let result = self.analyze(&image)?;

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }

    /// Read and analyze an image file with an accepted extension
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !is_allowed_upload(name) {
            return Err(AnalysisError::unreadable(format!(
                "{} is not a PNG or JPEG file",
                path.display()
            )));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| AnalysisError::unreadable(format!("failed to read {}: {e}", path.display())))?;
        self.analyze_bytes(&bytes)
    }

    /// Analyze many files in parallel, reporting `(completed, total)` after each one
    pub fn analyze_batch<F>(
        &self,
        paths: &[PathBuf],
        progress_callback: F,
    ) -> Vec<(PathBuf, Result<AnalysisResult, AnalysisError>)>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = paths.len();
        let completed = AtomicUsize::new(0);

        paths
            .par_iter()
            .map(|path| {
                let outcome = self.analyze_file(path);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress_callback(done, total);
                (path.clone(), outcome)
            })
            .collect()
    }

    /// Lighting preview: diagnosis of the original and the corrected image
    pub fn diagnose_lighting(&self, image: &RgbImage) -> LightingPreview {
        let corrected = self.pipeline.correct(image, None);
        LightingPreview {
            diagnosis: corrected.diagnosis.report(),
            corrected: corrected.image,
            log: corrected.log,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{fast_config, png_bytes, StubParser};
    use super::*;
    use image::Rgb;
    use skin_color::{FaceLabel, SegmentationMap};
    use std::sync::Mutex;

    fn analyzer(parser: Arc<StubParser>) -> Analyzer {
        Analyzer::with_reference_model(fast_config(), parser).unwrap()
    }

    fn portrait() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([170 + (x % 20) as u8, 125 + (y % 15) as u8, 100]))
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_upload("selfie.JPG"));
        assert!(is_allowed_upload("a.b.png"));
        assert!(is_allowed_upload("photo.jpeg"));
        assert!(!is_allowed_upload("photo.gif"));
        assert!(!is_allowed_upload("png"));
    }

    #[test]
    fn test_uniform_gray_all_skin_succeeds() {
        let parser = Arc::new(StubParser::filled(0.99, FaceLabel::Skin));
        let image = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));

        let result = analyzer(parser.clone()).analyze(&image).unwrap();
        assert!(result.personal_color.id < 8);
        assert_eq!(result.features.len(), 21);
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn test_zero_skin_pixels_is_insufficient_area() {
        let parser = Arc::new(StubParser::filled(0.99, FaceLabel::Background));
        let err = analyzer(parser).analyze(&portrait()).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientSkinArea { found: 0, required: 7 });
    }

    #[test]
    fn test_low_detection_score_is_no_face() {
        let parser = Arc::new(StubParser::filled(0.3, FaceLabel::Skin));
        let err = analyzer(parser.clone()).analyze(&portrait()).unwrap_err();

        assert_eq!(err.kind(), "no_face_detected");
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn test_parser_failure_is_analysis_failed() {
        let parser = Arc::new(StubParser {
            fail: true,
            ..StubParser::filled(0.9, FaceLabel::Skin)
        });
        let err = analyzer(parser).analyze(&portrait()).unwrap_err();
        assert!(matches!(err, AnalysisError::AnalysisFailed { ref detail } if detail.contains("crashed")));
    }

    #[test]
    fn test_label_map_size_mismatch_is_analysis_failed() {
        let parser = Arc::new(StubParser {
            labels: SegmentationMap::filled(100, 100, FaceLabel::Skin),
            ..StubParser::filled(0.9, FaceLabel::Skin)
        });
        let err = analyzer(parser).analyze(&portrait()).unwrap_err();
        assert_eq!(err.kind(), "analysis_failed");
    }

    #[test]
    fn test_unreadable_bytes() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let err = analyzer(parser.clone()).analyze_bytes(b"definitely not a png").unwrap_err();

        assert_eq!(err.kind(), "unreadable_image");
        assert_eq!(parser.calls(), 0);
    }

    #[test]
    fn test_default_config_analyzes_every_upload() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let analyzer = analyzer(parser.clone());
        let bytes = png_bytes(&portrait());

        let first = analyzer.analyze_bytes(&bytes).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = analyzer.analyze_bytes(&bytes).unwrap();

        assert_eq!(parser.calls(), 2);
        assert!(second.analyzed_at > first.analyzed_at);
        assert!(analyzer.cache_stats().is_none());
    }

    #[test]
    fn test_identical_uploads_hit_cache() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let mut config = fast_config();
        config.cache_budget = 4 * 1024 * 1024;
        let analyzer = Analyzer::with_reference_model(config, parser.clone()).unwrap();
        let bytes = png_bytes(&portrait());

        let first = analyzer.analyze_bytes(&bytes).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = analyzer.analyze_bytes(&bytes).unwrap();

        assert_eq!(first.personal_color.id, second.personal_color.id);
        assert_eq!(first.features, second.features);
        assert_eq!(parser.calls(), 1);
        assert_eq!(analyzer.cache_stats().map(|s| s.hits), Some(1));
        // A hit is a new response, stamped when it is served
        assert!(second.analyzed_at > first.analyzed_at);
    }

    #[test]
    fn test_jitter_bypasses_cache() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let mut config = fast_config();
        config.cache_budget = 4 * 1024 * 1024;
        config.correction.jitter.enabled = true;
        let analyzer = Analyzer::with_reference_model(config, parser.clone()).unwrap();
        let bytes = png_bytes(&portrait());

        analyzer.analyze_bytes(&bytes).unwrap();
        analyzer.analyze_bytes(&bytes).unwrap();

        assert!(analyzer.cache_stats().is_none());
        assert_eq!(parser.calls(), 2);
    }

    #[test]
    fn test_repeated_analysis_is_deterministic() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let analyzer = analyzer(parser);

        let first = analyzer.analyze(&portrait()).unwrap();
        let second = analyzer.analyze(&portrait()).unwrap();
        assert_eq!(first.features, second.features);
        assert_eq!(first.personal_color.id, second.personal_color.id);
    }

    #[test]
    fn test_mismatched_model_rejected() {
        let parser: Arc<dyn FaceParser> = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let mut config = AnalyzerConfig::default();
        config.extractor.color_count = 5;
        assert!(Analyzer::with_reference_model(config, parser).is_err());
    }

    #[test]
    fn test_diagnose_lighting_on_dark_image() {
        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let dark = RgbImage::from_fn(32, 32, |x, _| Rgb([20 + x as u8, 18 + x as u8, 15 + x as u8]));

        let preview = analyzer(parser.clone()).diagnose_lighting(&dark);
        assert!(preview.diagnosis.is_underexposed);
        assert!(preview.log.entries().iter().any(|e| e.starts_with("gamma")));
        assert_eq!(preview.corrected.dimensions(), (32, 32));
        assert_eq!(parser.calls(), 0);
    }

    #[test]
    fn test_batch_reports_progress_and_keeps_failures() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("face.png");
        std::fs::write(&good, png_bytes(&portrait()))?;
        let corrupt = dir.path().join("broken.jpg");
        std::fs::write(&corrupt, b"garbage")?;
        let wrong_type = dir.path().join("notes.txt");
        std::fs::write(&wrong_type, b"hello")?;

        let parser = Arc::new(StubParser::filled(0.9, FaceLabel::Skin));
        let progress = Mutex::new(Vec::new());
        let results = analyzer(parser).analyze_batch(&[good.clone(), corrupt, wrong_type], |done, total| {
            progress.lock().unwrap().push((done, total));
        });

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert_eq!(results[0].0, good);
        assert_eq!(results[1].1.as_ref().unwrap_err().kind(), "unreadable_image");
        assert_eq!(results[2].1.as_ref().unwrap_err().kind(), "unreadable_image");

        let mut progress = progress.into_inner().unwrap();
        progress.sort();
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        Ok(())
    }
}
