use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{LipiError, Result};

/// Image bytes uploaded by the caller.
///
/// The buffer is shared, so handing a `RawImage` to the pipeline never
/// consumes the caller's copy.
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Arc<[u8]>,
    file_name: String,
    mime_type: String,
}

impl RawImage {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        file_name: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Self {
        let bytes = bytes.into();
        let file_name = file_name.into();
        let mime_type = match mime_type {
            Some(declared) if !declared.trim().is_empty() => declared.trim().to_string(),
            _ => guess_mime_type(&file_name, &bytes),
        };

        Self {
            bytes,
            file_name,
            mime_type,
        }
    }

    /// Wrap bytes with no filename; the MIME type is sniffed from content.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(bytes, "upload", None)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_mime_type(file_name: &str, bytes: &[u8]) -> String {
    if let Some(mime) = mime_guess::from_path(file_name).first() {
        return mime.essence_str().to_string();
    }
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Turns raw bytes into a pixel matrix and enforces dimension limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDecoder {
    min_dimension: u32,
    max_dimension: u32,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::from_config(&OcrConfig::default())
    }
}

impl ImageDecoder {
    pub fn new(min_dimension: u32, max_dimension: u32) -> Self {
        Self {
            min_dimension,
            max_dimension: max_dimension.max(min_dimension).max(1),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.min_image_dimension, config.max_image_dimension)
    }

    /// Decode an image, rejecting tiny inputs and downscaling huge ones.
    ///
    /// The format is sniffed from the content; the declared MIME type is not
    /// trusted.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        let img = decode(bytes)?;

        let (width, height) = img.dimensions();
        if width < self.min_dimension || height < self.min_dimension {
            return Err(LipiError::InvalidImage(format!(
                "Image too small: {}x{}, minimum {}x{}",
                width, height, self.min_dimension, self.min_dimension
            )));
        }

        Ok(resize_if_needed(img, self.max_dimension))
    }
}

/// Decode bytes into a pixel matrix without any size policy.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(LipiError::InvalidImage("empty input".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LipiError::InvalidImage(format!("Failed to read image: {e}")))?;

    if reader.format().is_none() {
        return Err(LipiError::InvalidImage(
            "unrecognized image format".to_string(),
        ));
    }

    let img = reader
        .decode()
        .map_err(|e| LipiError::InvalidImage(format!("Failed to decode image: {e}")))?;

    debug!(
        width = img.width(),
        height = img.height(),
        channels = img.color().channel_count(),
        "Decoded image"
    );

    Ok(img)
}

/// Encode a processed matrix as PNG, for engines that take encoded images.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| LipiError::InvalidImage(format!("Failed to encode PNG: {e}")))?;
    Ok(png)
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
///
/// Uses Lanczos3 filter for high-quality downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    debug!(width, height, new_width, new_height, "Downscaling oversized image");

    img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
}
