//! Bounded async front for the blocking analysis pipeline
//!
//! Each analysis runs on tokio's blocking pool. A semaphore caps how many run
//! at once so a slow face model cannot starve the rest of the runtime.

use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::{AnalysisError, AnalysisResult, Analyzer, LightingPreview};

#[derive(Clone)]
pub struct AnalysisService {
    analyzer: Arc<Analyzer>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl AnalysisService {
    /// Create a service allowing `max_concurrent` analyses at once
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        let max_concurrent = analyzer.config().max_concurrent.max(1);
        Self {
            analyzer,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Get the shared analyzer
    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    /// Get the concurrency limit
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Permits not currently held by a running analysis
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the blocking pool once a permit is free
    async fn run_blocking<T, F>(&self, job: F) -> Result<T, AnalysisError>
    where
        T: Send + 'static,
        F: FnOnce(&Analyzer) -> T + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AnalysisError::failed("analysis service is shut down"))?;
        let analyzer = Arc::clone(&self.analyzer);

        tokio::task::spawn_blocking(move || {
            // The permit lives as long as the blocking work, even if the caller stops waiting
            let _permit = permit;
            job(&analyzer)
        })
        .await
        .map_err(|e| AnalysisError::failed(format!("analysis task failed: {e}")))
    }

    /// Analyze an uploaded image
    pub async fn analyze_bytes(&self, bytes: Vec<u8>) -> Result<AnalysisResult, AnalysisError> {
        debug!(bytes = bytes.len(), "Queued analysis");
        self.run_blocking(move |analyzer| analyzer.analyze_bytes(&bytes)).await?
    }

    /// Analyze an already decoded image
    pub async fn analyze_image(&self, image: RgbImage) -> Result<AnalysisResult, AnalysisError> {
        self.run_blocking(move |analyzer| analyzer.analyze(&image)).await?
    }

    /// Lighting preview on the blocking pool
    pub async fn diagnose_lighting(&self, image: RgbImage) -> Result<LightingPreview, AnalysisError> {
        self.run_blocking(move |analyzer| analyzer.diagnose_lighting(&image)).await
    }

    /// Analyze with a caller-side deadline.
    ///
    /// The pipeline itself is never interrupted: if the deadline passes while
    /// waiting for a permit nothing runs, and if it passes during the analysis
    /// the finished result is discarded.
    pub async fn analyze_with_deadline(
        &self,
        bytes: Vec<u8>,
        deadline: Duration,
    ) -> Result<AnalysisResult, AnalysisError> {
        match tokio::time::timeout(deadline, self.analyze_bytes(bytes)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(deadline_ms = deadline.as_millis() as u64, "Analysis deadline exceeded");
                Err(AnalysisError::failed(format!(
                    "deadline of {}ms exceeded",
                    deadline.as_millis()
                )))
            }
        }
    }
}
