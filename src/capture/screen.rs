//! Screen sampling
//!
//! Frames are grabbed from a [`ScreenSource`], optionally blurred in memory,
//! and written to `screenshots/screen_NNNN.png` as soon as they are taken.

use crate::app::paths::{write_atomic, TaskLayout};
use crate::capture::types::ScreenshotRecord;
use image::{imageops, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Blur strength for privacy mode
const PRIVACY_BLUR_SIGMA: f32 = 35.0;

/// Weight of the blurred frame in the privacy blend
const PRIVACY_BLUR_WEIGHT: f32 = 0.9;

/// Source of full-screen frames
pub trait ScreenSource: Send {
    fn capture(&mut self) -> crate::Result<RgbaImage>;
}

impl<F> ScreenSource for F
where
    F: FnMut() -> crate::Result<RgbaImage> + Send,
{
    fn capture(&mut self) -> crate::Result<RgbaImage> {
        self()
    }
}

/// Heavily blur a frame so on-screen text is unreadable.
///
/// The output is 90% blurred frame and 10% original, which keeps window
/// layout recognizable.
pub fn privacy_blur(frame: &RgbaImage) -> RgbaImage {
    let blurred = imageops::fast_blur(frame, PRIVACY_BLUR_SIGMA);
    let mut out = blurred;
    for (dst, src) in out.pixels_mut().zip(frame.pixels()) {
        for c in 0..4 {
            let mixed = dst.0[c] as f32 * PRIVACY_BLUR_WEIGHT
                + src.0[c] as f32 * (1.0 - PRIVACY_BLUR_WEIGHT);
            dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Encode a frame as PNG and write it atomically
pub fn write_png(frame: &RgbaImage, path: &Path) -> crate::Result<()> {
    let mut buf = std::io::Cursor::new(Vec::new());
    frame.write_to(&mut buf, image::ImageFormat::Png)?;
    write_atomic(path, buf.get_ref())?;
    Ok(())
}

/// Blur the frame if requested, then persist it. Blocking.
pub fn save_frame(frame: RgbaImage, blur: bool, path: &Path) -> crate::Result<()> {
    let frame = if blur { privacy_blur(&frame) } else { frame };
    write_png(&frame, path)
}

/// Numbered frame writer for one task
#[derive(Debug)]
pub struct ScreenSampler {
    layout: TaskLayout,
    privacy_blur: bool,
    records: Vec<ScreenshotRecord>,
}

impl ScreenSampler {
    pub fn new(layout: TaskLayout, privacy_blur: bool) -> Self {
        Self { layout, privacy_blur, records: Vec::new() }
    }

    /// Path the next frame will be written to
    pub fn next_path(&self) -> PathBuf {
        self.layout.screenshot_file(self.records.len() as u32)
    }

    /// Record a frame that has been written to `path`
    pub fn push(&mut self, path: PathBuf, t_offset: f64) -> &ScreenshotRecord {
        let sequence_index = self.records.len() as u32;
        debug!(sequence_index, t_offset, "Screenshot saved");
        self.records.push(ScreenshotRecord { sequence_index, file_path: path, t_offset });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[ScreenshotRecord] {
        &self.records
    }

    pub fn privacy_blur(&self) -> bool {
        self.privacy_blur
    }

    /// Persist the manifest and hand back the records
    pub fn finish(self) -> crate::Result<Vec<ScreenshotRecord>> {
        save_manifest(&self.layout.screenshot_manifest(), &self.records)?;
        Ok(self.records)
    }
}

/// Write `screenshots.json`
pub fn save_manifest(path: &Path, records: &[ScreenshotRecord]) -> crate::Result<()> {
    let json = serde_json::to_vec_pretty(records)?;
    write_atomic(path, &json)?;
    Ok(())
}

/// Read `screenshots.json`; `None` when it does not exist
pub fn load_manifest(path: &Path) -> crate::Result<Option<Vec<ScreenshotRecord>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
