//! Inspection configuration.
//!
//! Every threshold the engine uses is a named value here. Defaults reproduce
//! the behaviour operators are used to; deployments tune sensitivity per part
//! type through [`InspectionConfig::from_env`] or a JSON file.

use std::str::FromStr;
#[cfg(feature = "async")]
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diagnosis::Severity;
use crate::error::{InspectionError, Result};

/// Default minimum region area (px²) kept by the region extractor.
pub const DEFAULT_MIN_DEFECT_AREA: u32 = 100;

/// Default boundary between "small" and "large" defect regions (px²).
pub const DEFAULT_LARGE_DEFECT_AREA: u32 = 1000;

/// Default side length of the square SSIM window.
pub const DEFAULT_SSIM_WINDOW: u32 = 7;

/// Largest accepted SSIM window side length.
pub const MAX_SSIM_WINDOW: u32 = 255;

/// Default limit on decoded image width and height.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Score boundaries (0-100) separating the severity tiers.
///
/// A score belongs to the highest tier whose lower bound it reaches:
/// `score >= none_min` is [`Severity::None`], `score >= minor_min` is
/// [`Severity::Minor`], `score >= moderate_min` is [`Severity::Moderate`],
/// anything lower is [`Severity::Major`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub none_min: f64,
    pub minor_min: f64,
    pub moderate_min: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            none_min: 95.0,
            minor_min: 85.0,
            moderate_min: 70.0,
        }
    }
}

impl SeverityThresholds {
    /// Map a similarity percentage to its severity tier.
    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.none_min {
            Severity::None
        } else if score >= self.minor_min {
            Severity::Minor
        } else if score >= self.moderate_min {
            Severity::Moderate
        } else {
            Severity::Major
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("none_min", self.none_min),
            ("minor_min", self.minor_min),
            ("moderate_min", self.moderate_min),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(InspectionError::InvalidConfig(format!(
                    "tier threshold {name} must be within 0-100, got {value}"
                )));
            }
        }

        if !(self.none_min > self.minor_min && self.minor_min > self.moderate_min) {
            return Err(InspectionError::InvalidConfig(format!(
                "tier thresholds must be strictly descending (none {} > minor {} > moderate {})",
                self.none_min, self.minor_min, self.moderate_min
            )));
        }

        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionConfig {
    /// Severity tier boundaries
    pub tiers: SeverityThresholds,
    /// Regions with an area above this are "large" (px²)
    pub large_defect_area: u32,
    /// Regions with an area below this are discarded as noise (px²)
    pub min_defect_area: u32,
    /// SSIM window side length (odd, >= 3)
    pub ssim_window: u32,
    /// Images wider or taller than this are rejected at decode time
    pub max_image_dimension: u32,
    /// Interpolate catalog fix steps into the fix instructions
    pub elaborate_from_catalog: bool,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            tiers: SeverityThresholds::default(),
            large_defect_area: DEFAULT_LARGE_DEFECT_AREA,
            min_defect_area: DEFAULT_MIN_DEFECT_AREA,
            ssim_window: DEFAULT_SSIM_WINDOW,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            elaborate_from_catalog: true,
        }
    }
}

impl InspectionConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            tiers: SeverityThresholds {
                none_min: env_or("MOULDSIGHT_TIER_NONE_MIN", defaults.tiers.none_min),
                minor_min: env_or("MOULDSIGHT_TIER_MINOR_MIN", defaults.tiers.minor_min),
                moderate_min: env_or("MOULDSIGHT_TIER_MODERATE_MIN", defaults.tiers.moderate_min),
            },
            large_defect_area: env_or("MOULDSIGHT_LARGE_DEFECT_AREA", defaults.large_defect_area),
            min_defect_area: env_or("MOULDSIGHT_MIN_DEFECT_AREA", defaults.min_defect_area),
            ssim_window: env_or("MOULDSIGHT_SSIM_WINDOW", defaults.ssim_window),
            max_image_dimension: env_or(
                "MOULDSIGHT_MAX_IMAGE_DIMENSION",
                defaults.max_image_dimension,
            ),
            elaborate_from_catalog: std::env::var("MOULDSIGHT_ELABORATE_FROM_CATALOG")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.elaborate_from_catalog),
        }
    }

    /// Parse a configuration from JSON. Missing fields keep their default.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| InspectionError::InvalidConfig(format!("Invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.tiers.validate()?;

        if self.ssim_window < 3 || self.ssim_window % 2 == 0 || self.ssim_window > MAX_SSIM_WINDOW
        {
            return Err(InspectionError::InvalidConfig(format!(
                "ssim_window must be an odd number between 3 and {MAX_SSIM_WINDOW}, got {}",
                self.ssim_window
            )));
        }

        if self.max_image_dimension == 0 {
            return Err(InspectionError::InvalidConfig(
                "max_image_dimension must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Worker pool settings.
#[cfg(feature = "async")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum comparisons running at once
    pub max_concurrency: usize,
    /// Per-comparison deadline
    pub job_timeout: Duration,
}

#[cfg(feature = "async")]
impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(1),
            job_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(feature = "async")]
impl PoolConfig {
    /// Load pool settings from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrency = env_or("MOULDSIGHT_MAX_CONCURRENCY", defaults.max_concurrency).max(1);
        let job_timeout = std::env::var("MOULDSIGHT_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.job_timeout);

        Self {
            max_concurrency,
            job_timeout,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
