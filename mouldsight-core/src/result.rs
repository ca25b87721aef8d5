//! Comparison records handed back to the surrounding application.
//!
//! A [`ComparisonResult`] is either *completed* (it carries an
//! [`Inspection`]) or *failed* (it carries only an error). The two are never
//! mixed: a failed result has no score, no regions and no text, so a zero
//! score can never be mistaken for a comparison that did not run.

use serde::{Deserialize, Serialize};

use crate::diagnosis::{Diagnosis, Severity};
use crate::error::{FailureKind, InspectionError, Result};
use crate::sample::SampleRef;

/// A localized difference, in candidate pixel coordinates after resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefectRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Area enclosed by the region boundary (px², always > 0)
    pub area: u32,
}

impl DefectRegion {
    /// Flat `(x, y, width, height, area)` record.
    pub fn as_tuple(&self) -> (u32, u32, u32, u32, u32) {
        (self.x, self.y, self.width, self.height, self.area)
    }

    /// Whether the bounding box lies fully inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x + self.width <= width && self.y + self.height <= height
    }
}

/// Everything a successful comparison produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    similarity_score: f64,
    severity: Severity,
    defect_count: usize,
    defect_regions: Vec<DefectRegion>,
    defect_description: String,
    fix_instructions: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rules_applied: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    catalog_refs: Vec<String>,
}

impl Inspection {
    pub fn new(similarity_score: f64, defect_regions: Vec<DefectRegion>, diagnosis: Diagnosis) -> Self {
        Self {
            similarity_score,
            severity: diagnosis.severity,
            defect_count: defect_regions.len(),
            defect_regions,
            defect_description: diagnosis.description,
            fix_instructions: diagnosis.fix_instructions,
            rules_applied: diagnosis.rules_applied,
            catalog_refs: diagnosis.catalog_refs,
        }
    }

    /// Similarity percentage, 0-100, two decimals
    pub fn similarity_score(&self) -> f64 {
        self.similarity_score
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn defect_count(&self) -> usize {
        self.defect_count
    }

    pub fn defects_found(&self) -> bool {
        self.defect_count > 0
    }

    pub fn defect_regions(&self) -> &[DefectRegion] {
        &self.defect_regions
    }

    pub fn defect_description(&self) -> &str {
        &self.defect_description
    }

    pub fn fix_instructions(&self) -> &str {
        &self.fix_instructions
    }

    /// Names of the diagnostic rules that contributed text
    pub fn rules_applied(&self) -> &[String] {
        &self.rules_applied
    }

    /// Catalog entries whose fix steps were interpolated
    pub fn catalog_refs(&self) -> &[String] {
        &self.catalog_refs
    }
}

/// The record returned by every comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(flatten)]
    inspection: Option<Inspection>,
    approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master_sample: Option<SampleRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_kind: Option<FailureKind>,
}

impl ComparisonResult {
    /// Wrap a successful inspection. `approved` always starts false.
    pub fn completed(inspection: Inspection) -> Self {
        Self {
            inspection: Some(inspection),
            approved: false,
            master_sample: None,
            error: None,
            failure_kind: None,
        }
    }

    /// Error-only result.
    pub fn failed(error: &InspectionError) -> Self {
        Self {
            inspection: None,
            approved: false,
            master_sample: None,
            error: Some(error.to_string()),
            failure_kind: Some(error.kind()),
        }
    }

    /// Record which master sample version this result was compared against.
    pub fn with_sample(mut self, sample: SampleRef) -> Self {
        self.master_sample = Some(sample);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    pub fn inspection(&self) -> Option<&Inspection> {
        self.inspection.as_ref()
    }

    pub fn similarity_score(&self) -> Option<f64> {
        self.inspection.as_ref().map(Inspection::similarity_score)
    }

    pub fn severity(&self) -> Option<Severity> {
        self.inspection.as_ref().map(Inspection::severity)
    }

    pub fn defect_count(&self) -> Option<usize> {
        self.inspection.as_ref().map(Inspection::defect_count)
    }

    pub fn defects_found(&self) -> Option<bool> {
        self.inspection.as_ref().map(Inspection::defects_found)
    }

    pub fn defect_regions(&self) -> Option<&[DefectRegion]> {
        self.inspection.as_ref().map(Inspection::defect_regions)
    }

    pub fn defect_description(&self) -> Option<&str> {
        self.inspection.as_ref().map(Inspection::defect_description)
    }

    pub fn fix_instructions(&self) -> Option<&str> {
        self.inspection.as_ref().map(Inspection::fix_instructions)
    }

    pub fn master_sample(&self) -> Option<&SampleRef> {
        self.master_sample.as_ref()
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    /// Mark the part as approved. Only an external, authorized actor calls
    /// this; failed comparisons cannot be approved.
    pub fn approve(&mut self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(InspectionError::NotApprovable(format!(
                "comparison failed: {error}"
            )));
        }
        self.approved = true;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InspectionError::Processing(format!("Failed to serialize result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageRole;

    fn diagnosis(severity: Severity) -> Diagnosis {
        Diagnosis {
            severity,
            description: "Minor differences detected".into(),
            fix_instructions: "1. Fine-tune injection speed".into(),
            rules_applied: vec!["tier_minor".into()],
            catalog_refs: vec![],
        }
    }

    fn region(area: u32) -> DefectRegion {
        DefectRegion {
            x: 1,
            y: 2,
            width: 30,
            height: 40,
            area,
        }
    }

    #[test]
    fn test_defect_count_tracks_regions() {
        let inspection = Inspection::new(90.0, vec![region(500), region(1500)], diagnosis(Severity::Minor));
        assert_eq!(inspection.defect_count(), 2);
        assert_eq!(inspection.defect_count(), inspection.defect_regions().len());
        assert!(inspection.defects_found());
    }

    #[test]
    fn test_completed_result_is_never_approved() {
        let result = ComparisonResult::completed(Inspection::new(
            99.0,
            vec![],
            diagnosis(Severity::None),
        ));
        assert!(!result.is_approved());
        assert!(!result.is_error());
        assert_eq!(result.defects_found(), Some(false));
    }

    #[test]
    fn test_failed_result_has_no_measurements() {
        let err = InspectionError::ImageLoad {
            role: ImageRole::Reference,
            reason: "corrupt".into(),
        };
        let result = ComparisonResult::failed(&err);

        assert!(result.is_error());
        assert_eq!(result.failure_kind(), Some(FailureKind::ImageLoad));
        assert!(result.similarity_score().is_none());
        assert!(result.defect_count().is_none());
        assert!(result.defect_regions().is_none());
        assert!(result.defect_description().is_none());
        assert!(result.fix_instructions().is_none());
        assert!(!result.is_approved());
    }

    #[test]
    fn test_failed_result_serializes_without_score_fields() {
        let result = ComparisonResult::failed(&InspectionError::DependencyUnavailable(
            "not built".into(),
        ));
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert!(json.get("similarity_score").is_none());
        assert!(json.get("defect_count").is_none());
        assert_eq!(json["approved"], false);
        assert_eq!(json["failure_kind"], "dependency_unavailable");
        assert!(json["error"].as_str().unwrap().contains("not built"));
    }

    #[test]
    fn test_completed_result_serializes_flat_record() {
        let result = ComparisonResult::completed(Inspection::new(
            88.5,
            vec![region(1600)],
            diagnosis(Severity::Minor),
        ));
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(json["similarity_score"], 88.5);
        assert_eq!(json["defect_count"], 1);
        assert_eq!(json["severity"], "minor");
        assert_eq!(json["defect_regions"][0]["area"], 1600);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_approve_refused_for_failed_result() {
        let mut failed = ComparisonResult::failed(&InspectionError::Processing("boom".into()));
        assert!(matches!(
            failed.approve(),
            Err(InspectionError::NotApprovable(_))
        ));
        assert!(!failed.is_approved());

        let mut completed = ComparisonResult::completed(Inspection::new(
            97.0,
            vec![],
            diagnosis(Severity::None),
        ));
        completed.approve().unwrap();
        assert!(completed.is_approved());
    }

    #[test]
    fn test_region_bounds_check() {
        let r = region(100);
        assert!(r.fits_within(31, 42));
        assert!(!r.fits_within(30, 42));
        assert_eq!(r.as_tuple(), (1, 2, 30, 40, 100));
    }
}
