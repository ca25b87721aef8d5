//! Pixel-level comparison of a candidate part against its master sample.
//!
//! # Components
//!
//! - **Loader**: decodes both images, resizes the candidate to the reference
//!   dimensions and converts to 8-bit luminance.
//! - **SSIM**: windowed structural similarity producing a per-pixel map and
//!   its mean score.
//! - **Regions**: Otsu binarization of the dissimilarity image and external
//!   contour extraction into [`DefectRegion`](crate::DefectRegion)s.

pub mod loader;
pub mod regions;
pub mod ssim;

pub use loader::{decode, normalize, ImageLoader, NormalizedPair};
pub use regions::{binarize, extract_regions, otsu_level, polygon_area};
pub use ssim::{structural_similarity, SimilarityMap};
