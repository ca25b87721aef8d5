//! Exit codes following sysexits.h conventions.
//!
//! Line scripts and PLC gateways branch on these codes, so a part that
//! fails inspection is distinguishable from a missing file or a broken
//! installation.

use mouldsight_core::{ComparisonResult, FailureKind, InspectionError, Severity};

/// Part matches its master sample.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Invalid request (unknown catalog entry, inactive sample).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Comparison ran and the part differs from the master sample.
/// Maps to EX_DATAERR from sysexits.h.
pub const DEFECTS_FOUND: i32 = 65;

/// An image could not be read or decoded.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Image processing not compiled in.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Internal processing failure.
/// Maps to EX_SOFTWARE from sysexits.h.
pub const PROCESSING_ERROR: i32 = 70;

/// Comparison exceeded its deadline.
/// Maps to EX_TEMPFAIL from sysexits.h.
pub const TIMEOUT: i32 = 75;

/// Invalid configuration file or values.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Help text appended to `--help`.
pub const HELP: &str = "Exit codes:
  0   part matches master sample
  1   unexpected error
  64  invalid request (unknown catalog entry, inactive master sample)
  65  differences found (severity minor, moderate or major)
  66  image could not be loaded
  69  image processing not available in this build
  70  processing failure
  75  comparison timed out
  78  invalid configuration";

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_failure_kind(kind: FailureKind) -> i32 {
        match kind {
            FailureKind::ImageLoad => INPUT_ERROR,
            FailureKind::DependencyUnavailable => UNAVAILABLE,
            FailureKind::Processing => PROCESSING_ERROR,
            FailureKind::InvalidRequest => USAGE_ERROR,
            FailureKind::Timeout => TIMEOUT,
        }
    }

    /// Exit code for a single comparison outcome.
    pub fn from_result(result: &ComparisonResult) -> Self {
        if let Some(kind) = result.failure_kind() {
            return Self {
                code: Self::from_failure_kind(kind),
                message: result.error().map(str::to_string),
            };
        }
        match result.severity() {
            Some(Severity::None) | None => Self::success(),
            Some(severity) => Self::error(DEFECTS_FOUND, format!("severity {severity}")),
        }
    }

    /// Exit code for a batch: the first failure wins, then any defect.
    pub fn from_results(results: &[ComparisonResult]) -> Self {
        let codes: Vec<Self> = results.iter().map(Self::from_result).collect();
        if let Some(failure) = codes
            .iter()
            .find(|c| c.code != SUCCESS && c.code != DEFECTS_FOUND)
        {
            return Self {
                code: failure.code,
                message: failure.message.clone(),
            };
        }
        let defective = codes.iter().filter(|c| c.code == DEFECTS_FOUND).count();
        if defective > 0 {
            return Self::error(DEFECTS_FOUND, format!("{defective} part(s) with differences"));
        }
        Self::success()
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if let Some(inspection) = err
            .chain()
            .find_map(|e| e.downcast_ref::<InspectionError>())
        {
            match inspection {
                InspectionError::InvalidConfig(_) => CONFIG_ERROR,
                other => Self::from_failure_kind(other.kind()),
            }
        } else if err
            .chain()
            .any(|e| e.downcast_ref::<std::io::Error>().is_some())
        {
            INPUT_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
