//! Turn a similarity score and defect regions into operator guidance.
//!
//! The [`DiagnosticEngine`] classifies the score into a [`Severity`] tier,
//! evaluates the ordered [`RuleSet`] and concatenates the text of every rule
//! that fires. Fix steps are numbered sequentially across rules; hints that
//! name a [`DefectCatalog`] entry can be expanded with that entry's fix steps.

pub mod catalog;
pub mod rules;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{InspectionConfig, SeverityThresholds};
use crate::result::DefectRegion;

pub use catalog::{DefectCatalog, DefectCatalogEntry, MachineAdjustment};
pub use rules::{Condition, Evidence, FixStep, Hint, Rule, RuleSet};

/// Severity tier of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Matches the master sample
    None,
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text produced for one comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub severity: Severity,
    /// Newline-joined description fragments
    pub description: String,
    /// Newline-joined numbered fix steps; empty when nothing needs fixing
    pub fix_instructions: String,
    /// Names of the rules that fired, in order
    pub rules_applied: Vec<String>,
    /// Catalog keys whose fix steps were interpolated
    pub catalog_refs: Vec<String>,
}

/// Rule-table driven diagnosis.
#[derive(Debug, Clone)]
pub struct DiagnosticEngine {
    tiers: SeverityThresholds,
    large_defect_area: u32,
    elaborate_from_catalog: bool,
    rules: RuleSet,
    catalog: Arc<DefectCatalog>,
}

impl DiagnosticEngine {
    /// Engine with the standard rule table.
    pub fn new(config: &InspectionConfig, catalog: Arc<DefectCatalog>) -> Self {
        Self {
            tiers: config.tiers,
            large_defect_area: config.large_defect_area,
            elaborate_from_catalog: config.elaborate_from_catalog,
            rules: RuleSet::standard(),
            catalog,
        }
    }

    /// Replace the rule table.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn catalog(&self) -> &DefectCatalog {
        &self.catalog
    }

    /// Collect the facts the rules are evaluated against.
    pub fn evidence(&self, score: f64, regions: &[DefectRegion]) -> Evidence {
        let large_count = regions
            .iter()
            .filter(|r| r.area > self.large_defect_area)
            .count();

        Evidence {
            score,
            severity: self.tiers.classify(score),
            defect_count: regions.len(),
            large_count,
            small_count: regions.len() - large_count,
            large_defect_area: self.large_defect_area,
        }
    }

    pub fn diagnose(&self, score: f64, regions: &[DefectRegion]) -> Diagnosis {
        let evidence = self.evidence(score, regions);

        let mut description = Vec::new();
        let mut fixes = Vec::new();
        let mut rules_applied = Vec::new();
        let mut catalog_refs: Vec<String> = Vec::new();
        let mut step_number = 0;

        for rule in self.rules.matching(&evidence) {
            rules_applied.push(rule.name.clone());

            if let Some(fragment) = rule.render_description(&evidence) {
                description.push(fragment);
            }

            for step in &rule.fixes {
                step_number += 1;
                fixes.push(format!("{step_number}. {}", step.text));
                for hint in &step.hints {
                    fixes.push(format!("   - {}", hint.text));
                    self.elaborate(hint, &mut fixes, &mut catalog_refs);
                }
            }
        }

        debug!(
            score,
            severity = %evidence.severity,
            defects = evidence.defect_count,
            rules = ?rules_applied,
            "Diagnosis complete"
        );

        Diagnosis {
            severity: evidence.severity,
            description: description.join("\n"),
            fix_instructions: fixes.join("\n"),
            rules_applied,
            catalog_refs,
        }
    }

    fn elaborate(&self, hint: &Hint, fixes: &mut Vec<String>, refs: &mut Vec<String>) {
        if !self.elaborate_from_catalog {
            return;
        }
        let Some(key) = hint.catalog_key.as_deref() else {
            return;
        };
        // Unknown keys degrade to the hint line alone
        let Some(entry) = self.catalog.get(key) else {
            debug!(key, "No catalog entry for hint");
            return;
        };

        fixes.extend(entry.fix_steps.iter().map(|step| format!("     * {step}")));
        if !refs.contains(&entry.key) {
            refs.push(entry.key.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DiagnosticEngine {
        DiagnosticEngine::new(
            &InspectionConfig::default(),
            Arc::new(DefectCatalog::standard()),
        )
    }

    fn plain_engine() -> DiagnosticEngine {
        let config = InspectionConfig {
            elaborate_from_catalog: false,
            ..Default::default()
        };
        DiagnosticEngine::new(&config, Arc::new(DefectCatalog::standard()))
    }

    fn region(area: u32) -> DefectRegion {
        DefectRegion {
            x: 0,
            y: 0,
            width: 50,
            height: 50,
            area,
        }
    }

    #[test]
    fn test_clean_match_has_no_fixes() {
        let diagnosis = engine().diagnose(99.2, &[]);
        assert_eq!(diagnosis.severity, Severity::None);
        assert_eq!(
            diagnosis.description,
            "Product matches master sample. No defects detected."
        );
        assert!(diagnosis.fix_instructions.is_empty());
        assert!(diagnosis.catalog_refs.is_empty());
    }

    #[test]
    fn test_tier_boundaries_through_rule_table() {
        let engine = engine();
        let cases = [
            (95.0, Severity::None, "Product matches master sample"),
            (94.99, Severity::Minor, "Minor differences detected"),
            (85.0, Severity::Minor, "Minor differences detected"),
            (84.99, Severity::Moderate, "Moderate differences detected"),
            (70.0, Severity::Moderate, "Moderate differences detected"),
            (69.99, Severity::Major, "Major differences detected"),
        ];

        for (score, severity, text) in cases {
            let diagnosis = engine.diagnose(score, &[]);
            assert_eq!(diagnosis.severity, severity, "score {score}");
            assert!(diagnosis.description.starts_with(text), "score {score}");
            assert_eq!(
                diagnosis.fix_instructions.is_empty(),
                severity == Severity::None,
                "score {score}"
            );
        }

        let exact = engine.diagnose(95.0, &[]);
        assert_eq!(
            exact.description,
            "Product matches master sample. No defects detected."
        );
        assert_eq!(exact.fix_instructions, "");
    }

    #[test]
    fn test_tier_text_without_regions() {
        let minor = engine().diagnose(90.0, &[]);
        assert_eq!(minor.severity, Severity::Minor);
        assert_eq!(minor.description, "Minor differences detected");
        assert_eq!(
            minor.fix_instructions,
            "1. Fine-tune injection speed\n2. Check material temperature\n3. Verify mould temperature is consistent"
        );

        let moderate = engine().diagnose(75.0, &[]);
        assert_eq!(moderate.description, "Moderate differences detected");
        assert!(moderate
            .fix_instructions
            .starts_with("1. Check injection pressure and holding pressure"));

        let major = engine().diagnose(40.0, &[]);
        assert_eq!(
            major.description,
            "Major differences detected from master sample"
        );
        assert!(major
            .fix_instructions
            .starts_with("1. Check if correct mould is being used"));
    }

    #[test]
    fn test_large_region_augments_description_and_fixes() {
        let diagnosis = plain_engine().diagnose(88.0, &[region(2025)]);

        let lines: Vec<&str> = diagnosis.description.lines().collect();
        assert_eq!(lines[0], "Minor differences detected");
        assert_eq!(lines[1], "1 defect area(s) identified");
        assert!(lines[2].contains("large defect area"));

        assert!(diagnosis
            .fix_instructions
            .contains("4. Large defects detected - check for:\n   - Short shots (incomplete filling)\n   - Flash (excess material)\n   - Sink marks"));
        assert!(!diagnosis.fix_instructions.contains("Small defects"));
    }

    #[test]
    fn test_both_buckets_number_sequentially() {
        let diagnosis = plain_engine().diagnose(60.0, &[region(5000), region(300)]);

        assert_eq!(diagnosis.severity, Severity::Major);
        assert!(diagnosis.fix_instructions.contains("4. Large defects detected"));
        assert!(diagnosis.fix_instructions.contains("5. Small defects detected"));
        assert!(diagnosis.description.contains("2 defect area(s) identified"));
        assert!(diagnosis.description.contains("1 small defect area(s)"));
    }

    #[test]
    fn test_small_only_is_numbered_after_tier_steps() {
        let diagnosis = plain_engine().diagnose(80.0, &[region(150)]);
        assert!(diagnosis.fix_instructions.contains("4. Small defects detected - check for:"));
        assert!(!diagnosis.description.contains("large defect area"));
    }

    #[test]
    fn test_area_at_large_threshold_counts_as_small() {
        let evidence = engine().evidence(90.0, &[region(1000), region(1001)]);
        assert_eq!(evidence.large_count, 1);
        assert_eq!(evidence.small_count, 1);
    }

    #[test]
    fn test_catalog_steps_are_interpolated() {
        let diagnosis = engine().diagnose(88.0, &[region(2025)]);

        assert!(diagnosis
            .fix_instructions
            .contains("   - Short shots (incomplete filling)\n     * Increase injection pressure"));
        assert_eq!(diagnosis.catalog_refs, vec!["short_shot", "flash", "sink_marks"]);
    }

    #[test]
    fn test_missing_catalog_entry_degrades_to_hint_only() {
        let engine = DiagnosticEngine::new(
            &InspectionConfig::default(),
            Arc::new(DefectCatalog::empty()),
        );
        let diagnosis = engine.diagnose(88.0, &[region(2025)]);

        assert!(diagnosis.fix_instructions.contains("   - Sink marks"));
        assert!(!diagnosis.fix_instructions.contains("     * "));
        assert!(diagnosis.catalog_refs.is_empty());
    }

    #[test]
    fn test_regions_within_tolerance_are_reported() {
        let diagnosis = plain_engine().diagnose(97.5, &[region(400)]);

        assert_eq!(diagnosis.severity, Severity::None);
        assert!(diagnosis
            .description
            .starts_with("Product matches master sample within tolerance."));
        assert!(diagnosis.fix_instructions.starts_with("1. Small defects detected"));
    }

    #[test]
    fn test_custom_rules_replace_standard_table() {
        let rules = RuleSet::new(vec![Rule::new("any", Condition::AnyDefects)
            .describe("{count} region(s) at {score}%")
            .fix(FixStep::new("Hold the part for review"))]);
        let engine = engine().with_rules(rules);

        let diagnosis = engine.diagnose(91.5, &[region(200)]);
        assert_eq!(diagnosis.description, "1 region(s) at 91.50%");
        assert_eq!(diagnosis.fix_instructions, "1. Hold the part for review");
        assert_eq!(diagnosis.rules_applied, vec!["any"]);
    }

    #[test]
    fn test_severity_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Severity::Moderate).unwrap(), "\"moderate\"");
        assert_eq!(Severity::None.to_string(), "none");
        assert!(Severity::Major > Severity::Minor);
    }
}
