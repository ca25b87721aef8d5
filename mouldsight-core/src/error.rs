use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of a comparison an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    /// The master sample image.
    Reference,
    /// The freshly produced part.
    Candidate,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Candidate => write!(f, "candidate"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("Failed to load {role} image: {reason}")]
    ImageLoad { role: ImageRole, reason: String },

    #[error("Image processing unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Image processing failed: {0}")]
    Processing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Defect catalog error: {0}")]
    Catalog(String),

    #[error("Master sample '{key}' is inactive")]
    InactiveSample { key: String },

    #[error("Comparison timed out after {0:?}")]
    Timeout(Duration),

    #[error("Comparison cannot be approved: {0}")]
    NotApprovable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectionError {
    /// Coarse classification stored alongside the message in failed results.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ImageLoad { .. } | Self::Io(_) => FailureKind::ImageLoad,
            Self::DependencyUnavailable(_) => FailureKind::DependencyUnavailable,
            Self::Processing(_) => FailureKind::Processing,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::InvalidConfig(_)
            | Self::Catalog(_)
            | Self::InactiveSample { .. }
            | Self::NotApprovable(_) => FailureKind::InvalidRequest,
        }
    }
}

/// Serializable failure category of an error-only comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ImageLoad,
    DependencyUnavailable,
    Processing,
    InvalidRequest,
    Timeout,
}

pub type Result<T> = std::result::Result<T, InspectionError>;
