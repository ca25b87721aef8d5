//! Ordered diagnostic rule table.
//!
//! Each [`Rule`] pairs a [`Condition`] over the comparison [`Evidence`] with a
//! description fragment and fix steps. The engine walks the table in order and
//! concatenates the fragments of every rule whose condition holds, so tier
//! guidance and defect-size guidance add up rather than replace each other.

use serde::{Deserialize, Serialize};

use super::Severity;

/// Facts the rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    pub score: f64,
    pub severity: Severity,
    pub defect_count: usize,
    /// Regions with `area > large_defect_area`
    pub large_count: usize,
    /// Regions with `area <= large_defect_area`
    pub small_count: usize,
    pub large_defect_area: u32,
}

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Tier(Severity),
    NoDefects,
    AnyDefects,
    LargeDefects,
    SmallDefects,
    All(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, evidence: &Evidence) -> bool {
        match self {
            Self::Tier(severity) => evidence.severity == *severity,
            Self::NoDefects => evidence.defect_count == 0,
            Self::AnyDefects => evidence.defect_count > 0,
            Self::LargeDefects => evidence.large_count > 0,
            Self::SmallDefects => evidence.small_count > 0,
            Self::All(conditions) => conditions.iter().all(|c| c.holds(evidence)),
        }
    }
}

/// A candidate cause listed under a fix step, optionally tied to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub text: String,
    #[serde(default)]
    pub catalog_key: Option<String>,
}

impl Hint {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            catalog_key: None,
        }
    }

    pub fn cataloged(text: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            catalog_key: Some(key.into()),
        }
    }
}

/// One numbered line of fix instructions with optional sub-items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixStep {
    pub text: String,
    #[serde(default)]
    pub hints: Vec<Hint>,
}

impl FixStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: Vec::new(),
        }
    }

    pub fn with_hints(text: impl Into<String>, hints: Vec<Hint>) -> Self {
        Self {
            text: text.into(),
            hints,
        }
    }
}

/// `(predicate, description fragment, fix fragment)` entry of the rule table.
///
/// Description fragments may use the placeholders `{count}`, `{large}`,
/// `{small}`, `{large_area}` and `{score}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub when: Condition,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fixes: Vec<FixStep>,
}

impl Rule {
    pub fn new(name: impl Into<String>, when: Condition) -> Self {
        Self {
            name: name.into(),
            when,
            description: None,
            fixes: Vec::new(),
        }
    }

    pub fn describe(mut self, fragment: impl Into<String>) -> Self {
        self.description = Some(fragment.into());
        self
    }

    pub fn fix(mut self, step: FixStep) -> Self {
        self.fixes.push(step);
        self
    }

    /// Render the description fragment for the given evidence.
    pub fn render_description(&self, evidence: &Evidence) -> Option<String> {
        self.description.as_ref().map(|template| {
            template
                .replace("{count}", &evidence.defect_count.to_string())
                .replace("{large}", &evidence.large_count.to_string())
                .replace("{small}", &evidence.small_count.to_string())
                .replace("{large_area}", &evidence.large_defect_area.to_string())
                .replace("{score}", &format!("{:.2}", evidence.score))
        })
    }
}

/// Phrase used by the large-defect bucket description.
pub const LARGE_DEFECT_PHRASE: &str = "large defect area(s)";

/// Phrase used by the small-defect bucket description.
pub const SMALL_DEFECT_PHRASE: &str = "small defect area(s)";

/// Ordered rule table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules whose condition holds, in table order.
    pub fn matching<'a>(&'a self, evidence: &'a Evidence) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |rule| rule.when.holds(evidence))
    }

    /// The standard moulding rule table: one rule per severity tier followed
    /// by the defect-count and defect-size augmentations.
    pub fn standard() -> Self {
        Self::new(vec![
            Rule::new(
                "tier_none",
                Condition::All(vec![Condition::Tier(Severity::None), Condition::NoDefects]),
            )
            .describe("Product matches master sample. No defects detected."),
            Rule::new(
                "tier_none_with_regions",
                Condition::All(vec![Condition::Tier(Severity::None), Condition::AnyDefects]),
            )
            .describe("Product matches master sample within tolerance."),
            Rule::new("tier_minor", Condition::Tier(Severity::Minor))
                .describe("Minor differences detected")
                .fix(FixStep::new("Fine-tune injection speed"))
                .fix(FixStep::new("Check material temperature"))
                .fix(FixStep::new("Verify mould temperature is consistent")),
            Rule::new("tier_moderate", Condition::Tier(Severity::Moderate))
                .describe("Moderate differences detected")
                .fix(FixStep::new("Check injection pressure and holding pressure"))
                .fix(FixStep::new("Verify cooling time is adequate"))
                .fix(FixStep::new("Inspect mould for wear or damage")),
            Rule::new("tier_major", Condition::Tier(Severity::Major))
                .describe("Major differences detected from master sample")
                .fix(FixStep::new("Check if correct mould is being used"))
                .fix(FixStep::new(
                    "Verify material type and color match specifications",
                ))
                .fix(FixStep::new(
                    "Review machine settings (temperature, pressure, cycle time)",
                )),
            Rule::new("defect_count", Condition::AnyDefects)
                .describe("{count} defect area(s) identified"),
            Rule::new("large_defects", Condition::LargeDefects)
                .describe(format!(
                    "{{large}} {LARGE_DEFECT_PHRASE} over {{large_area}} px²: possible short shot, flash or sink marks"
                ))
                .fix(FixStep::with_hints(
                    "Large defects detected - check for:",
                    vec![
                        Hint::cataloged("Short shots (incomplete filling)", "short_shot"),
                        Hint::cataloged("Flash (excess material)", "flash"),
                        Hint::cataloged("Sink marks", "sink_marks"),
                    ],
                )),
            Rule::new("small_defects", Condition::SmallDefects)
                .describe(format!(
                    "{{small}} {SMALL_DEFECT_PHRASE}: possible surface blemishes, flow marks or contamination"
                ))
                .fix(FixStep::with_hints(
                    "Small defects detected - check for:",
                    vec![
                        Hint::new("Surface blemishes"),
                        Hint::cataloged("Flow marks", "flow_marks"),
                        Hint::new("Contamination"),
                    ],
                )),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(severity: Severity, large: usize, small: usize) -> Evidence {
        Evidence {
            score: 90.0,
            severity,
            defect_count: large + small,
            large_count: large,
            small_count: small,
            large_defect_area: 1000,
        }
    }

    fn fired(rules: &RuleSet, evidence: &Evidence) -> Vec<String> {
        rules.matching(evidence).map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_exactly_one_tier_rule_fires() {
        let rules = RuleSet::standard();
        for severity in [
            Severity::None,
            Severity::Minor,
            Severity::Moderate,
            Severity::Major,
        ] {
            for (large, small) in [(0, 0), (1, 0), (0, 2), (1, 1)] {
                let names = fired(&rules, &evidence(severity, large, small));
                let tiers = names.iter().filter(|n| n.starts_with("tier_")).count();
                assert_eq!(tiers, 1, "{severity:?} with {large}/{small}: {names:?}");
            }
        }
    }

    #[test]
    fn test_bucket_rules_fire_independent_of_tier() {
        let rules = RuleSet::standard();
        let names = fired(&rules, &evidence(Severity::Major, 1, 1));
        assert_eq!(
            names,
            vec!["tier_major", "defect_count", "large_defects", "small_defects"]
        );
    }

    #[test]
    fn test_no_defects_fires_only_tier_rule() {
        let rules = RuleSet::standard();
        assert_eq!(fired(&rules, &evidence(Severity::Minor, 0, 0)), vec!["tier_minor"]);
        assert_eq!(fired(&rules, &evidence(Severity::None, 0, 0)), vec!["tier_none"]);
    }

    #[test]
    fn test_description_placeholders() {
        let rules = RuleSet::standard();
        let ev = evidence(Severity::Minor, 2, 3);
        let large = rules
            .rules()
            .iter()
            .find(|r| r.name == "large_defects")
            .unwrap();
        let text = large.render_description(&ev).unwrap();
        assert!(text.starts_with("2 large defect area(s) over 1000 px²"), "{text}");

        let count = rules
            .rules()
            .iter()
            .find(|r| r.name == "defect_count")
            .unwrap();
        assert_eq!(
            count.render_description(&ev).unwrap(),
            "5 defect area(s) identified"
        );
    }

    #[test]
    fn test_condition_all_requires_every_part() {
        let cond = Condition::All(vec![Condition::Tier(Severity::None), Condition::LargeDefects]);
        assert!(cond.holds(&evidence(Severity::None, 1, 0)));
        assert!(!cond.holds(&evidence(Severity::None, 0, 1)));
        assert!(!cond.holds(&evidence(Severity::Minor, 1, 0)));
    }

    #[test]
    fn test_rule_set_is_extensible() {
        let mut rules = RuleSet::standard();
        rules.push(
            Rule::new("many_defects", Condition::AnyDefects)
                .fix(FixStep::new("Quarantine the batch")),
        );
        let names = fired(&rules, &evidence(Severity::Moderate, 0, 1));
        assert_eq!(names.last().map(String::as_str), Some("many_defects"));
    }

    #[test]
    fn test_rule_set_json_roundtrip_keeps_order() {
        let rules = RuleSet::standard();
        let json = serde_json::to_string(&rules).unwrap();
        let parsed: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rules);
    }
}
