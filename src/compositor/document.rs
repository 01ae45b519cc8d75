//! Base document and decoded sources
//!
//! The base document is the fixed-resolution canvas every layer is placed
//! on. It is independent of any preview scale: exports are always rendered
//! at the base's natural size and encoded in the base's format.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Output formats understood by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Parse a mime type; anything outside the supported set is `None`
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Guess the format from a file name extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".png") {
            Some(ImageFormat::Png)
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(ImageFormat::Jpeg)
        } else if lower.ends_with(".webp") {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }

    /// Resolve the format for an ingested file: explicit mime first, then
    /// the file name, then png
    pub fn resolve(mime: Option<&str>, file_name: &str) -> Self {
        mime.and_then(Self::from_mime)
            .or_else(|| Self::from_file_name(file_name))
            .unwrap_or_default()
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
        }
    }
}

/// A decoded image as handed over by ingestion.
///
/// Holds the decoded pixels and the untouched input bytes, which serve as
/// the display-ready reference and as the payload of "original" downloads.
#[derive(Debug)]
pub struct SourceImage {
    /// File name as supplied by the user
    pub name: String,
    /// Format of the original bytes
    pub format: ImageFormat,
    /// Decoded pixels
    pub pixels: RgbaImage,
    /// Bytes exactly as ingested
    pub original: Vec<u8>,
}

impl SourceImage {
    pub fn new(
        name: impl Into<String>,
        format: ImageFormat,
        pixels: RgbaImage,
        original: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            pixels,
            original,
        }
    }

    /// Build a source from pixels only (no original bytes available)
    pub fn from_pixels(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self::new(name, ImageFormat::Png, pixels, Vec::new())
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }
}

/// The base image: defines model space and the export resolution
#[derive(Debug, Clone)]
pub struct BaseDocument {
    source: Arc<SourceImage>,
}

impl BaseDocument {
    /// Create a base document. Returns `None` for an empty (0-sized) image.
    pub fn new(source: Arc<SourceImage>) -> Option<Self> {
        if source.natural_width() == 0 || source.natural_height() == 0 {
            return None;
        }
        Some(Self { source })
    }

    pub fn natural_width(&self) -> u32 {
        self.source.natural_width()
    }

    pub fn natural_height(&self) -> u32 {
        self.source.natural_height()
    }

    /// (width, height) as floats, for model-space math
    pub fn size(&self) -> (f32, f32) {
        (self.natural_width() as f32, self.natural_height() as f32)
    }

    pub fn format(&self) -> ImageFormat {
        self.source.format
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn source(&self) -> &Arc<SourceImage> {
        &self.source
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.source.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution_order() {
        assert_eq!(ImageFormat::resolve(Some("image/webp"), "a.png"), ImageFormat::WebP);
        assert_eq!(ImageFormat::resolve(None, "Photo.JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::resolve(Some(""), "photo.jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::resolve(Some("image/gif"), "anim.gif"), ImageFormat::Png);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::WebP.mime(), "image/webp");
    }

    #[test]
    fn test_empty_base_rejected() {
        let src = Arc::new(SourceImage::from_pixels("empty", RgbaImage::new(0, 0)));
        assert!(BaseDocument::new(src).is_none());

        let src = Arc::new(SourceImage::from_pixels("ok", RgbaImage::new(8, 4)));
        let base = BaseDocument::new(src).unwrap();
        assert_eq!(base.size(), (8.0, 4.0));
    }
}
