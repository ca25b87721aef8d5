//! MouldSight Core - master-sample visual inspection for moulded parts
//!
//! This crate compares a photo of a freshly produced part against the
//! approved master sample image and reports how similar they are, where they
//! differ, and what an operator should check on the machine.
//!
//! # Features
//!
//! - Windowed SSIM similarity score (0-100) with severity tiers
//! - Defect region extraction via Otsu thresholding and contour tracing
//! - Rule-table diagnosis with a catalog of common moulding defects
//! - Versioned master samples with content digests
//! - Bounded async worker pool with per-job timeouts (`async` feature)
//!
//! Image decoding and analysis live behind the `image-processing` feature.
//! Without it the engine still builds and reports a dependency error for
//! every comparison.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use mouldsight_core::{ComparisonRequest, DefectCatalog, InspectionConfig, InspectionEngineFactory};
//!
//! # fn example() -> mouldsight_core::Result<()> {
//! let engine = InspectionEngineFactory::create(
//!     InspectionConfig::from_env(),
//!     Arc::new(DefectCatalog::standard()),
//! )?;
//!
//! let result = engine.compare(&ComparisonRequest::new(
//!     PathBuf::from("master/MS-001.png"),
//!     PathBuf::from("line3/part-0042.jpg"),
//! ));
//!
//! if let Some(score) = result.similarity_score() {
//!     println!("similarity {score:.2}% ({:?})", result.severity());
//!     println!("{}", result.fix_instructions().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnosis;
pub mod engine;
pub mod error;
#[cfg(feature = "async")]
pub mod pool;
pub mod result;
pub mod sample;
#[cfg(feature = "image-processing")]
pub mod vision;

// Re-export main types for convenience
pub use config::{
    InspectionConfig, SeverityThresholds, DEFAULT_LARGE_DEFECT_AREA, DEFAULT_MAX_IMAGE_DIMENSION,
    DEFAULT_MIN_DEFECT_AREA, DEFAULT_SSIM_WINDOW, MAX_SSIM_WINDOW,
};
pub use diagnosis::{
    DefectCatalog, DefectCatalogEntry, Diagnosis, DiagnosticEngine, MachineAdjustment, Rule,
    RuleSet, Severity,
};
pub use engine::{InspectionEngine, InspectionEngineFactory, UnavailableImageComparer};
pub use error::{FailureKind, ImageRole, InspectionError, Result};
pub use result::{ComparisonResult, DefectRegion, Inspection};
pub use sample::{ComparisonRequest, ImageSource, MasterSample, SampleRef};

#[cfg(feature = "async")]
pub use config::PoolConfig;
#[cfg(feature = "async")]
pub use pool::InspectionPool;

#[cfg(feature = "image-processing")]
pub use engine::ImageComparer;
#[cfg(feature = "image-processing")]
pub use vision::SimilarityMap;
