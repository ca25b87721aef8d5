#![no_main]

//! Fuzz target for JSON configuration and defect catalog parsing
//!
//! Run with: cargo +nightly fuzz run fuzz_config

use libfuzzer_sys::fuzz_target;
use mouldsight_core::{DefectCatalog, InspectionConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = InspectionConfig::from_json(text) {
        // Anything accepted must pass validation again after a roundtrip
        let json = serde_json::to_string(&config).unwrap_or_default();
        assert!(InspectionConfig::from_json(&json).is_ok());
    }

    if let Ok(catalog) = DefectCatalog::from_json(text) {
        for entry in catalog.entries() {
            assert!(catalog.get(&entry.key).is_some());
        }
    }
});
