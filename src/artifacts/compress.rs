//! Screenshot resizing and JPEG re-encoding
//!
//! Only the compressed copies ever leave the machine; the PNGs on disk are
//! read, never modified.

use crate::capture::types::ScreenshotRecord;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Default longest side after resizing
pub const DEFAULT_MAX_DIMENSION: u32 = 1280;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Resize and encoding parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// One screenshot ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// Sequence index of the source screenshot
    pub sequence_index: u32,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl CompressedImage {
    pub fn size(&self) -> usize {
        self.jpeg.len()
    }
}

/// Target size keeping aspect ratio so the longest side is at most `max`
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, max);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max);
    (w, h)
}

/// Resize and re-encode an already-decoded image
pub fn compress_image(
    image: &DynamicImage,
    sequence_index: u32,
    settings: &CompressionSettings,
) -> crate::Result<CompressedImage> {
    let (w, h) = fit_within(image.width(), image.height(), settings.max_dimension);
    let resized = if (w, h) == (image.width(), image.height()) {
        image.to_rgb8()
    } else {
        image.resize_exact(w, h, FilterType::Lanczos3).to_rgb8()
    };

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, settings.jpeg_quality);
    resized.write_with_encoder(encoder)?;

    debug!(sequence_index, width = w, height = h, bytes = jpeg.len(), "Screenshot compressed");
    Ok(CompressedImage { sequence_index, width: w, height: h, jpeg })
}

/// Load a screenshot from disk and compress it
pub fn compress_file(
    path: &Path,
    sequence_index: u32,
    settings: &CompressionSettings,
) -> crate::Result<CompressedImage> {
    let image = image::open(path)?;
    compress_image(&image, sequence_index, settings)
}

/// Compress a set of selected records, in order
pub fn compress_records(
    records: &[ScreenshotRecord],
    settings: &CompressionSettings,
) -> crate::Result<Vec<CompressedImage>> {
    records
        .iter()
        .map(|r| compress_file(&r.file_path, r.sequence_index, settings))
        .collect()
}
