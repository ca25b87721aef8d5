//! Comparison engines.
//!
//! [`InspectionEngine`] is the seam between callers and the image stack. The
//! real [`ImageComparer`] exists only when the crate is built with the
//! `image-processing` feature; otherwise [`UnavailableImageComparer`] answers
//! every request with a dependency error. Use [`InspectionEngineFactory`] to
//! get whichever one this build provides.
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use mouldsight_core::{
//!     ComparisonRequest, DefectCatalog, InspectionConfig, InspectionEngineFactory,
//! };
//!
//! # fn example() -> mouldsight_core::Result<()> {
//! let engine = InspectionEngineFactory::create(
//!     InspectionConfig::default(),
//!     Arc::new(DefectCatalog::standard()),
//! )?;
//! let request = ComparisonRequest::new(
//!     PathBuf::from("master.png"),
//!     PathBuf::from("part.png"),
//! );
//! let result = engine.compare(&request);
//! println!("{:?}", result.similarity_score());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::config::InspectionConfig;
use crate::diagnosis::DefectCatalog;
use crate::error::{InspectionError, Result};
use crate::result::ComparisonResult;
use crate::sample::{ComparisonRequest, ImageSource, MasterSample};

/// Anything that can compare a candidate image against a reference.
///
/// Implementations never return `Err`: failures are reported inside the
/// [`ComparisonResult`] so callers always get a record back.
pub trait InspectionEngine: Send + Sync {
    fn compare(&self, request: &ComparisonRequest) -> ComparisonResult;

    /// Compare a candidate against a stored master sample and record which
    /// sample version was used.
    fn compare_with_sample(
        &self,
        sample: &MasterSample,
        candidate: ImageSource,
        min_defect_area: Option<u32>,
    ) -> ComparisonResult {
        if !sample.active {
            let err = InspectionError::InactiveSample {
                key: sample.key.clone(),
            };
            warn!(sample = %sample.key, "Comparison against inactive master sample refused");
            return ComparisonResult::failed(&err).with_sample(sample.reference());
        }

        let request = ComparisonRequest {
            reference: sample.image_source(),
            candidate,
            min_defect_area,
        };
        self.compare(&request).with_sample(sample.reference())
    }

    /// Whether this engine can actually process images.
    fn is_available(&self) -> bool;
}

/// Stand-in engine for builds without image processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableImageComparer;

impl UnavailableImageComparer {
    pub const MESSAGE: &'static str = "Image processing is not available in this build. \
        Rebuild mouldsight-core with the `image-processing` feature enabled \
        (it pulls in the `image` and `imageproc` crates).";
}

impl InspectionEngine for UnavailableImageComparer {
    fn compare(&self, _request: &ComparisonRequest) -> ComparisonResult {
        ComparisonResult::failed(&InspectionError::DependencyUnavailable(
            Self::MESSAGE.to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(feature = "image-processing")]
pub use comparer::ImageComparer;

#[cfg(feature = "image-processing")]
mod comparer {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    use image::DynamicImage;
    use tracing::{debug, info, instrument, warn};

    use super::InspectionEngine;
    use crate::config::InspectionConfig;
    use crate::diagnosis::{DefectCatalog, DiagnosticEngine};
    use crate::error::{InspectionError, Result};
    use crate::result::{ComparisonResult, Inspection};
    use crate::sample::ComparisonRequest;
    use crate::vision::{extract_regions, normalize, structural_similarity, ImageLoader, NormalizedPair};

    /// SSIM based comparer.
    #[derive(Debug, Clone)]
    pub struct ImageComparer {
        config: InspectionConfig,
        loader: ImageLoader,
        diagnostics: DiagnosticEngine,
    }

    impl ImageComparer {
        /// Build a comparer after validating the configuration.
        pub fn new(config: InspectionConfig, catalog: Arc<DefectCatalog>) -> Result<Self> {
            config.validate()?;
            Ok(Self {
                loader: ImageLoader::new(config.max_image_dimension),
                diagnostics: DiagnosticEngine::new(&config, catalog),
                config,
            })
        }

        /// Replace the diagnostic engine, e.g. to use a custom rule table.
        pub fn with_diagnostics(mut self, diagnostics: DiagnosticEngine) -> Self {
            self.diagnostics = diagnostics;
            self
        }

        pub fn config(&self) -> &InspectionConfig {
            &self.config
        }

        /// Compare two already decoded images.
        pub fn compare_images(&self, reference: &DynamicImage, candidate: &DynamicImage) -> ComparisonResult {
            let pair = normalize(reference, candidate);
            self.finish(self.analyze(&pair, self.config.min_defect_area))
        }

        #[instrument(skip(self, request), fields(
            reference = %request.reference.describe(),
            candidate = %request.candidate.describe(),
        ))]
        fn run(&self, request: &ComparisonRequest) -> Result<Inspection> {
            let pair = self.loader.load_pair(&request.reference, &request.candidate)?;
            let min_area = request
                .min_defect_area
                .unwrap_or(self.config.min_defect_area);
            self.analyze(&pair, min_area)
        }

        fn analyze(&self, pair: &NormalizedPair, min_area: u32) -> Result<Inspection> {
            let (width, height) = pair.dimensions();
            let map = structural_similarity(&pair.reference, &pair.candidate, self.config.ssim_window)?;
            let score = map.percentage();
            debug!(width, height, resized = pair.resized, score, "SSIM computed");

            let regions = extract_regions(&map, min_area);
            let diagnosis = self.diagnostics.diagnose(score, &regions);

            info!(
                score,
                severity = %diagnosis.severity,
                defects = regions.len(),
                "Comparison complete"
            );
            Ok(Inspection::new(score, regions, diagnosis))
        }

        fn finish(&self, outcome: Result<Inspection>) -> ComparisonResult {
            match outcome {
                Ok(inspection) => ComparisonResult::completed(inspection),
                Err(e) => {
                    warn!(error = %e, "Comparison failed");
                    ComparisonResult::failed(&e)
                }
            }
        }
    }

    impl InspectionEngine for ImageComparer {
        fn compare(&self, request: &ComparisonRequest) -> ComparisonResult {
            // Decoders can panic on hostile input; keep that inside the result
            let outcome = catch_unwind(AssertUnwindSafe(|| self.run(request))).unwrap_or_else(|_| {
                Err(InspectionError::Processing(
                    "image pipeline panicked while processing the request".into(),
                ))
            });
            self.finish(outcome)
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

/// Picks the engine implementation available in this build.
pub struct InspectionEngineFactory;

impl InspectionEngineFactory {
    #[cfg(feature = "image-processing")]
    pub fn create(config: InspectionConfig, catalog: Arc<DefectCatalog>) -> Result<Arc<dyn InspectionEngine>> {
        Ok(Arc::new(ImageComparer::new(config, catalog)?))
    }

    #[cfg(not(feature = "image-processing"))]
    pub fn create(config: InspectionConfig, _catalog: Arc<DefectCatalog>) -> Result<Arc<dyn InspectionEngine>> {
        config.validate()?;
        tracing::warn!("Built without image processing; comparisons will report a dependency error");
        Ok(Arc::new(UnavailableImageComparer))
    }

    /// Engine that always reports missing image support.
    pub fn create_unavailable() -> Arc<dyn InspectionEngine> {
        Arc::new(UnavailableImageComparer)
    }
}
