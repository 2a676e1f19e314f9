//! Loading a finished recording from disk

use crate::app::paths::{validate_task_name, Paths, TaskLayout};
use crate::capture::action_log::ActionLog;
use crate::capture::screen::load_manifest;
use crate::capture::types::{ActionEvent, ScreenshotRecord, SessionSummary};
use std::path::Path;
use tracing::{debug, warn};

/// Screenshots, actions and summary of one recorded task
#[derive(Debug, Clone)]
pub struct RecordedTask {
    pub task_name: String,
    pub layout: TaskLayout,
    pub screenshots: Vec<ScreenshotRecord>,
    pub actions: Vec<ActionEvent>,
    pub summary: Option<SessionSummary>,
}

impl RecordedTask {
    /// Load `recordings/<task>`. Never modifies anything on disk.
    pub fn load(paths: &Paths, task_name: &str) -> crate::Result<Self> {
        let task_name = validate_task_name(task_name)?;
        let layout = paths.task(task_name);
        if !layout.dir().is_dir() {
            return Err(crate::Error::TaskNotFound(layout.dir().to_path_buf()));
        }

        let screenshots = match load_manifest(&layout.screenshot_manifest())? {
            Some(records) => records,
            None => {
                debug!(task = %task_name, "No screenshot manifest; scanning directory");
                scan_screenshots(&layout.screenshots_dir())?
            }
        };
        if screenshots.is_empty() {
            return Err(crate::Error::NoScreenshots(layout.screenshots_dir()));
        }

        let actions_file = layout.actions_file();
        let actions = if actions_file.exists() {
            ActionLog::load(&actions_file)?
        } else if let Some(recovered) = ActionLog::recover_checkpoint(&actions_file) {
            warn!(
                task = %task_name,
                count = recovered.len(),
                "Using action log checkpoint from an interrupted recording"
            );
            recovered
        } else {
            Vec::new()
        };

        let summary = std::fs::read_to_string(layout.summary_file())
            .ok()
            .and_then(|c| serde_json::from_str(&c).ok());

        Ok(Self { task_name: task_name.to_string(), layout, screenshots, actions, summary })
    }
}

/// Build records from `screen_NNNN.png` files when the manifest is missing.
/// Offsets are unknown and left at zero.
fn scan_screenshots(dir: &Path) -> crate::Result<Vec<ScreenshotRecord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")))
        .collect();
    files.sort();

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let sequence_index = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("screen_"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(i as u32);
            ScreenshotRecord { sequence_index, file_path: path, t_offset: 0.0 }
        })
        .collect())
}

/// One entry of `mimic list`
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListing {
    pub task_name: String,
    pub screenshots: usize,
    pub summary: Option<SessionSummary>,
    pub has_skill: bool,
}

/// Recorded tasks under the recordings directory, sorted by name.
/// Hidden folders and folders that are not valid task names are skipped.
pub fn list_tasks(paths: &Paths) -> crate::Result<Vec<TaskListing>> {
    let entries = match std::fs::read_dir(paths.recordings_dir()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut listings = Vec::new();
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || validate_task_name(&name).is_err() {
            continue;
        }
        let layout = paths.task(&name);
        let screenshots = match load_manifest(&layout.screenshot_manifest()) {
            Ok(Some(records)) => records.len(),
            _ => scan_screenshots(&layout.screenshots_dir())?.len(),
        };
        let summary = std::fs::read_to_string(layout.summary_file())
            .ok()
            .and_then(|c| serde_json::from_str(&c).ok());
        listings.push(TaskListing {
            task_name: name,
            screenshots,
            summary,
            has_skill: layout.skill_file().exists(),
        });
    }
    listings.sort_by(|a, b| a.task_name.cmp(&b.task_name));
    Ok(listings)
}

/// Forget the raw capture of a previous recording of the same task.
/// Generated skills are kept.
pub fn clear_previous_capture(layout: &TaskLayout) -> crate::Result<()> {
    let screenshots = layout.screenshots_dir();
    if screenshots.exists() {
        std::fs::remove_dir_all(&screenshots)?;
    }
    for file in [
        layout.actions_file(),
        layout.actions_file().with_extension("json.tmp"),
        layout.screenshot_manifest(),
        layout.summary_file(),
    ] {
        match std::fs::remove_file(&file) {
            Ok(()) => debug!(path = %file.display(), "Removed previous capture file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
