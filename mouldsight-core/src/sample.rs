use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::Result;

/// Where an image comes from. The engine only needs a decoder for the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// File on disk, opened and released inside the comparison
    Path(PathBuf),
    /// Encoded image bytes already in memory
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Drain a stream into memory.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::Bytes(data))
    }

    /// Short human-readable label for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(data) => format!("<{} bytes>", data.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

/// The immutable input to one comparison run.
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub reference: ImageSource,
    pub candidate: ImageSource,
    /// Overrides the configured minimum defect area for this run only
    pub min_defect_area: Option<u32>,
}

impl ComparisonRequest {
    pub fn new(reference: impl Into<ImageSource>, candidate: impl Into<ImageSource>) -> Self {
        Self {
            reference: reference.into(),
            candidate: candidate.into(),
            min_defect_area: None,
        }
    }

    pub fn with_min_defect_area(mut self, area: u32) -> Self {
        self.min_defect_area = Some(area);
        self
    }
}

/// Identifies exactly which master sample image a comparison was run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    pub key: String,
    pub version: u32,
    /// SHA3-256 of the encoded reference image, hex encoded
    pub image_digest: String,
}

/// An accepted reference image for one mould/part configuration.
///
/// Samples are values: replacing the image produces a new sample with a
/// bumped version, so results that recorded the old [`SampleRef`] stay valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterSample {
    /// Unique sample number
    pub key: String,
    /// Starts at 1, incremented on every image replacement
    pub version: u32,
    pub description: String,
    /// Key specifications and tolerances
    pub specifications: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    image_digest: String,
    #[serde(with = "hex_bytes")]
    image: Vec<u8>,
}

impl MasterSample {
    /// Create version 1 of a sample from encoded image bytes.
    pub fn new(
        key: impl Into<String>,
        image: Vec<u8>,
        specifications: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            version: 1,
            description: String::new(),
            specifications: specifications.into(),
            active: true,
            created_at: Utc::now(),
            image_digest: digest_hex(&image),
            image,
        }
    }

    /// Create a sample by reading its image from disk.
    pub fn open(
        key: impl Into<String>,
        path: impl AsRef<Path>,
        specifications: impl Into<String>,
    ) -> Result<Self> {
        let image = std::fs::read(path)?;
        Ok(Self::new(key, image, specifications))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Return the next version of this sample carrying a new image.
    pub fn replace_image(&self, image: Vec<u8>) -> Self {
        Self {
            key: self.key.clone(),
            version: self.version + 1,
            description: self.description.clone(),
            specifications: self.specifications.clone(),
            active: self.active,
            created_at: Utc::now(),
            image_digest: digest_hex(&image),
            image,
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn image_digest(&self) -> &str {
        &self.image_digest
    }

    pub fn image_source(&self) -> ImageSource {
        ImageSource::Bytes(self.image.clone())
    }

    pub fn reference(&self) -> SampleRef {
        SampleRef {
            key: self.key.clone(),
            version: self.version,
            image_digest: self.image_digest.clone(),
        }
    }
}

fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex encoding for the stored reference image
mod hex_bytes {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
