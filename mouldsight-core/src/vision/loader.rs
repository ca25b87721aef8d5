//! Image decoding and normalization.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageReader, Limits};
use tracing::debug;

use crate::error::{ImageRole, InspectionError, Result};
use crate::sample::ImageSource;

/// Reference and candidate as same-sized 8-bit luminance images.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    pub reference: GrayImage,
    pub candidate: GrayImage,
    /// Whether the candidate had to be resized
    pub resized: bool,
}

impl NormalizedPair {
    pub fn dimensions(&self) -> (u32, u32) {
        self.reference.dimensions()
    }
}

/// Decodes image sources under a dimension limit.
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_dimension: u32,
}

impl ImageLoader {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Read and decode one source. File handles are released before returning.
    pub fn load(&self, source: &ImageSource, role: ImageRole) -> Result<DynamicImage> {
        match source {
            ImageSource::Path(path) => {
                let data = std::fs::read(path).map_err(|e| InspectionError::ImageLoad {
                    role,
                    reason: format!("{}: {e}", path.display()),
                })?;
                self.decode_bytes(&data, role)
            }
            ImageSource::Bytes(data) => self.decode_bytes(data, role),
        }
    }

    fn decode_bytes(&self, data: &[u8], role: ImageRole) -> Result<DynamicImage> {
        if data.is_empty() {
            return Err(InspectionError::ImageLoad {
                role,
                reason: "no image data".into(),
            });
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);

        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| InspectionError::ImageLoad {
                role,
                reason: format!("Failed to detect format: {e}"),
            })?;
        reader.limits(limits);

        let image = reader.decode().map_err(|e| InspectionError::ImageLoad {
            role,
            reason: format!("Failed to decode image: {e}"),
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(InspectionError::ImageLoad {
                role,
                reason: "image has zero width or height".into(),
            });
        }

        debug!(%role, width = image.width(), height = image.height(), "Decoded image");
        Ok(image)
    }

    /// Decode both sources and normalize them into a comparable pair.
    pub fn load_pair(&self, reference: &ImageSource, candidate: &ImageSource) -> Result<NormalizedPair> {
        let reference = self.load(reference, ImageRole::Reference)?;
        let candidate = self.load(candidate, ImageRole::Candidate)?;
        Ok(normalize(&reference, &candidate))
    }
}

/// Decode an in-memory image with the default dimension limit.
pub fn decode(data: &[u8], role: ImageRole) -> Result<DynamicImage> {
    ImageLoader::new(crate::config::DEFAULT_MAX_IMAGE_DIMENSION).decode_bytes(data, role)
}

/// Resize the candidate to the reference dimensions and convert both to luma.
///
/// The candidate is left untouched when the dimensions already agree.
pub fn normalize(reference: &DynamicImage, candidate: &DynamicImage) -> NormalizedPair {
    let (width, height) = (reference.width(), reference.height());
    let resized = candidate.width() != width || candidate.height() != height;

    let candidate = if resized {
        debug!(
            from_width = candidate.width(),
            from_height = candidate.height(),
            width,
            height,
            "Resizing candidate to reference dimensions"
        );
        candidate.resize_exact(width, height, FilterType::Triangle).to_luma8()
    } else {
        candidate.to_luma8()
    };

    NormalizedPair {
        reference: reference.to_luma8(),
        candidate,
        resized,
    }
}
