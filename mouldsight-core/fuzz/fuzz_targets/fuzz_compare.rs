#![no_main]

//! Fuzz target for the comparison pipeline
//!
//! Splits the input into a reference and a candidate image and runs a full
//! comparison. Whatever the bytes, the engine must return a result record
//! and never panic out of `compare`.
//!
//! Run with: cargo +nightly fuzz run fuzz_compare

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use mouldsight_core::{
    ComparisonRequest, DefectCatalog, ImageComparer, InspectionConfig, InspectionEngine,
};

fuzz_target!(|data: &[u8]| {
    let config = InspectionConfig {
        max_image_dimension: 512,
        ..Default::default()
    };
    let Ok(comparer) = ImageComparer::new(config, Arc::new(DefectCatalog::standard())) else {
        return;
    };

    let split = data.first().map_or(0, |&b| b as usize).min(data.len());
    let (reference, candidate) = data.split_at(split);

    let result = comparer.compare(&ComparisonRequest::new(reference.to_vec(), candidate.to_vec()));

    // A failed comparison must never carry measurements
    if result.is_error() {
        assert!(result.similarity_score().is_none());
    } else if let Some(regions) = result.defect_regions() {
        assert_eq!(result.defect_count(), Some(regions.len()));
    }
});
