//! Defect-type reference catalog.
//!
//! Static data mapping a named moulding defect to its usual causes, the fix
//! steps to try and the machine-parameter changes that go with them. The
//! diagnostic rules consult it for elaboration only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{InspectionError, Result};

/// A suggested change to one machine parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineAdjustment {
    pub parameter: String,
    pub change: String,
}

impl MachineAdjustment {
    pub fn new(parameter: impl Into<String>, change: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            change: change.into(),
        }
    }
}

impl std::fmt::Display for MachineAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.parameter, self.change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectCatalogEntry {
    /// Lookup key, e.g. `short_shot`
    pub key: String,
    /// Display name, e.g. `Short Shot`
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub fix_steps: Vec<String>,
    #[serde(default)]
    pub machine_adjustments: Vec<MachineAdjustment>,
}

/// Read-only collection of [`DefectCatalogEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct DefectCatalog {
    entries: Vec<DefectCatalogEntry>,
    index: HashMap<String, usize>,
}

impl DefectCatalog {
    /// Build a catalog, rejecting entries whose keys collide after normalization.
    pub fn new(entries: Vec<DefectCatalogEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let key = normalize_key(&entry.key);
            if key.is_empty() {
                return Err(InspectionError::Catalog(format!(
                    "entry '{}' has an empty key",
                    entry.name
                )));
            }
            if index.insert(key, i).is_some() {
                return Err(InspectionError::Catalog(format!(
                    "duplicate defect key '{}'",
                    entry.key
                )));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<DefectCatalogEntry> = serde_json::from_str(json)
            .map_err(|e| InspectionError::Catalog(format!("Invalid catalog JSON: {e}")))?;
        Self::new(entries)
    }

    /// Look up an entry. `"Short Shot"`, `"short-shot"` and `"short_shot"`
    /// all resolve to the same entry.
    pub fn get(&self, key: &str) -> Option<&DefectCatalogEntry> {
        self.index
            .get(&normalize_key(key))
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[DefectCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The standard injection-moulding defect types.
    pub fn standard() -> Self {
        let entries = vec![
            entry(
                "short_shot",
                "Short Shot",
                "Incomplete filling of mould cavity",
                &[
                    "Insufficient injection pressure",
                    "Low material temperature",
                    "Inadequate injection speed",
                    "Material blockage",
                    "Insufficient material supply",
                ],
                &[
                    "Increase injection pressure",
                    "Increase material temperature",
                    "Increase injection speed",
                    "Check for material blockage",
                    "Verify adequate material supply",
                ],
                &[
                    ("Injection Pressure", "+5-10%"),
                    ("Melt Temperature", "+10-15°C"),
                    ("Injection Speed", "+10-20%"),
                    ("Injection Time", "+0.5-1.0 sec"),
                ],
            ),
            entry(
                "flash",
                "Flash",
                "Excess material at parting line",
                &[
                    "Excessive injection pressure",
                    "Worn mould surfaces",
                    "Insufficient clamp tonnage",
                    "High material temperature",
                    "Mould misalignment",
                ],
                &[
                    "Reduce injection pressure",
                    "Reduce material temperature",
                    "Increase clamping force",
                    "Inspect and repair mould parting line",
                    "Check mould alignment",
                ],
                &[
                    ("Injection Pressure", "-5-10%"),
                    ("Melt Temperature", "-10-15°C"),
                    ("Clamp Tonnage", "Increase as needed"),
                    ("Packing Pressure", "-10-15%"),
                ],
            ),
            entry(
                "sink_marks",
                "Sink Marks",
                "Surface depressions opposite thick sections",
                &[
                    "Insufficient packing pressure",
                    "Inadequate cooling time",
                    "Thick wall sections",
                    "Poor gate location",
                ],
                &[
                    "Increase packing pressure",
                    "Extend packing time",
                    "Reduce material temperature",
                    "Increase cooling time",
                    "Optimize gate location",
                ],
                &[
                    ("Packing Pressure", "+10-15%"),
                    ("Packing Time", "+1-2 sec"),
                    ("Melt Temperature", "-10-20°C"),
                    ("Cooling Time", "+20-30%"),
                ],
            ),
            entry(
                "warpage",
                "Warpage",
                "Part distortion or bending",
                &[
                    "Uneven cooling",
                    "High melt temperature",
                    "Residual stress",
                    "Uneven wall thickness",
                ],
                &[
                    "Optimize cooling system",
                    "Reduce material temperature",
                    "Adjust packing pressure",
                    "Increase cooling time",
                    "Check mould temperature uniformity",
                ],
                &[
                    ("Melt Temperature", "-10-20°C"),
                    ("Cooling Time", "+20-30%"),
                    ("Mould Temperature", "Uniform across cavities"),
                ],
            ),
            entry(
                "flow_marks",
                "Flow Marks",
                "Wavy lines showing flow direction",
                &[
                    "Low injection speed",
                    "Cold material temperature",
                    "Poor venting",
                    "Cold mould temperature",
                ],
                &[
                    "Increase injection speed",
                    "Increase material temperature",
                    "Improve mould venting",
                    "Optimize gate location",
                    "Increase mould temperature",
                ],
                &[
                    ("Injection Speed", "+10-20%"),
                    ("Melt Temperature", "+10-15°C"),
                    ("Mould Temperature", "+5-10°C"),
                ],
            ),
            entry(
                "burn_marks",
                "Burn Marks",
                "Black or brown discoloration",
                &[
                    "Poor venting",
                    "Excessive injection speed",
                    "High melt temperature",
                    "Air entrapment",
                ],
                &[
                    "Improve mould venting",
                    "Reduce injection speed by 10-15%",
                    "Lower melt temperature by 10-15°C",
                    "Reduce back pressure",
                    "Clean all mould vents",
                ],
                &[
                    ("Injection Speed", "-10-15%"),
                    ("Melt Temperature", "-10-15°C"),
                    ("Back Pressure", "-20-30%"),
                ],
            ),
            entry(
                "weld_lines",
                "Weld Lines",
                "Visible lines where flow fronts meet",
                &[
                    "Multiple gates",
                    "Flow around inserts",
                    "Low melt temperature",
                    "Poor venting at weld line",
                ],
                &[
                    "Increase melt temperature by 15-20°C",
                    "Increase mould temperature by 10-15°C",
                    "Increase injection speed",
                    "Relocate gates to minimize weld lines",
                    "Improve venting at weld line location",
                ],
                &[
                    ("Melt Temperature", "+15-20°C"),
                    ("Mould Temperature", "+10-15°C"),
                    ("Injection Speed", "+20-30%"),
                ],
            ),
            entry(
                "jetting",
                "Jetting",
                "Snake-like flow pattern",
                &[
                    "Excessive injection speed",
                    "Small gate size",
                    "Poor gate location",
                ],
                &[
                    "Reduce initial injection speed",
                    "Increase gate size",
                    "Relocate gate to side wall",
                    "Increase melt temperature by 10-15°C",
                    "Implement multi-stage injection profile",
                ],
                &[
                    ("Injection Speed", "Reduce initially, then ramp up"),
                    ("Melt Temperature", "+10-15°C"),
                    ("Injection Profile", "Multi-stage"),
                ],
            ),
            entry(
                "splay_marks",
                "Splay Marks",
                "Silver streaks from moisture",
                &[
                    "Moisture in material",
                    "Material degradation",
                    "Contamination",
                ],
                &[
                    "Dry material properly",
                    "Reduce melt temperature by 10-15°C",
                    "Reduce back pressure",
                    "Check for material contamination",
                    "Clean hopper and barrel thoroughly",
                ],
                &[
                    ("Material Drying", "Critical - follow specs"),
                    ("Melt Temperature", "-10-15°C"),
                    ("Back Pressure", "-20-30%"),
                ],
            ),
            entry(
                "brittleness",
                "Brittleness",
                "Parts break easily",
                &[
                    "Material degradation",
                    "Long residence time",
                    "Excessive regrind",
                    "Moisture",
                ],
                &[
                    "Reduce melt temperature to prevent degradation",
                    "Reduce residence time in barrel",
                    "Increase packing pressure",
                    "Verify correct material grade",
                    "Reduce regrind percentage below 25%",
                ],
                &[
                    ("Melt Temperature", "Reduce to lower range"),
                    ("Packing Pressure", "+10-15%"),
                    ("Regrind", "Limit to 15-25% maximum"),
                ],
            ),
        ];

        // keys above are unique, so indexing cannot collide
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (normalize_key(&e.key), i))
            .collect();
        Self { entries, index }
    }
}

fn entry(
    key: &str,
    name: &str,
    description: &str,
    causes: &[&str],
    fix_steps: &[&str],
    adjustments: &[(&str, &str)],
) -> DefectCatalogEntry {
    DefectCatalogEntry {
        key: key.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        causes: causes.iter().map(|s| s.to_string()).collect(),
        fix_steps: fix_steps.iter().map(|s| s.to_string()).collect(),
        machine_adjustments: adjustments
            .iter()
            .map(|(p, c)| MachineAdjustment::new(*p, *c))
            .collect(),
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
