//! Artifact selection and compression
//!
//! Reduces a finished capture to a bounded set of small JPEGs plus the full
//! action log.

pub mod compress;
pub mod select;

pub use compress::{compress_image, compress_records, CompressedImage, CompressionSettings};
pub use select::{select_evenly, stride_indices};

use crate::capture::types::{ActionEvent, ScreenshotRecord};
use tracing::info;

/// Bounded, compressed evidence for one task
#[derive(Debug, Clone)]
pub struct CompiledArtifactSet {
    pub task_name: String,
    pub images: Vec<CompressedImage>,
    pub actions: Vec<ActionEvent>,
    /// Screenshots captured before selection
    pub raw_screenshot_count: usize,
}

impl CompiledArtifactSet {
    /// Select at most `max_screenshots` records and compress them
    pub fn build(
        task_name: impl Into<String>,
        records: &[ScreenshotRecord],
        actions: Vec<ActionEvent>,
        max_screenshots: usize,
        settings: &CompressionSettings,
    ) -> crate::Result<Self> {
        let task_name = task_name.into();
        let selected = select_evenly(records, max_screenshots);
        let images = compress_records(&selected, settings)?;
        info!(
            task = %task_name,
            raw = records.len(),
            selected = images.len(),
            bytes = images.iter().map(CompressedImage::size).sum::<usize>(),
            "Artifacts compressed"
        );
        Ok(Self { task_name, images, actions, raw_screenshot_count: records.len() })
    }

    pub fn total_image_bytes(&self) -> usize {
        self.images.iter().map(CompressedImage::size).sum()
    }

    /// Mean compressed image size, 0 when there are no images
    pub fn average_image_bytes(&self) -> usize {
        if self.images.is_empty() {
            0
        } else {
            self.total_image_bytes() / self.images.len()
        }
    }

    /// Action log as sent in the request
    pub fn actions_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.actions)?)
    }
}
