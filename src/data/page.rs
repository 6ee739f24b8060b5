//! Page images: decoding, dimensions and region crops.

use std::path::Path;

use image::DynamicImage;
use thiserror::Error;

use crate::geometry::{clamp_to_image, BBox, ImageBounds};

/// File extensions accepted as page images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Errors from loading a page image.
#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unsupported image data in '{0}'")]
    Unsupported(String),
}

/// Check whether a filename has a supported image extension.
pub fn is_image_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Check common image magic bytes.
pub fn looks_like_image(data: &[u8]) -> bool {
    if data.len() < 8 {
        return false;
    }

    // PNG
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return true;
    }
    // JPEG
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }
    // BMP
    if data.starts_with(b"BM") {
        return true;
    }
    // TIFF, little and big endian
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return true;
    }
    // WebP: RIFF....WEBP
    data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP"
}

/// Read only the header of an image file to get its size.
pub fn header_bounds(path: &Path) -> Result<ImageBounds, ImageLoadError> {
    let (width, height) = image::image_dimensions(path)?;
    Ok(ImageBounds::new(width, height))
}

/// A decoded page image.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// File name used to name exports
    pub filename: String,
    pub image: DynamicImage,
}

impl PageImage {
    /// Decode an image file from disk.
    pub fn open(path: &Path) -> Result<Self, ImageLoadError> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(filename, &data)
    }

    /// Decode an image held in memory.
    pub fn from_bytes(filename: impl Into<String>, data: &[u8]) -> Result<Self, ImageLoadError> {
        let filename = filename.into();
        if !looks_like_image(data) {
            return Err(ImageLoadError::Unsupported(filename));
        }
        let image = image::load_from_memory(data)?;
        log::info!(
            "Loaded page image {} ({}x{})",
            filename,
            image.width(),
            image.height()
        );
        Ok(Self { filename, image })
    }

    /// Wrap an already decoded image.
    pub fn new(filename: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            filename: filename.into(),
            image,
        }
    }

    pub fn bounds(&self) -> ImageBounds {
        ImageBounds::new(self.image.width(), self.image.height())
    }

    /// Copy out the pixels under `bbox`, clipped to the image.
    pub fn crop(&self, bbox: &BBox) -> DynamicImage {
        let clipped = clamp_to_image(*bbox, self.bounds());
        self.image.crop_imm(
            clipped.x as u32,
            clipped.y as u32,
            clipped.w as u32,
            clipped.h as u32,
        )
    }
}
