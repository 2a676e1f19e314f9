//! On-disk layout
//!
//! Everything mimic persists lives under one data root so that separate
//! `start`/`stop`/`status` invocations agree on where the session marker is.

use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data root
pub const HOME_ENV: &str = "MIMIC_HOME";

/// Maximum length of a task name
const MAX_TASK_NAME_LEN: usize = 100;

/// Data root and the well-known files inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Use an explicit data root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data root: `MIMIC_HOME`, else `~/.mimic`
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(
                dirs::home_dir()
                    .map(|h| h.join(".mimic"))
                    .unwrap_or_else(|| PathBuf::from(".mimic")),
            ),
        }
    }

    /// The data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persisted session marker
    pub fn state_file(&self) -> PathBuf {
        self.root.join("session.json")
    }

    /// Preferences file
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Directory holding one folder per recorded task
    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join("recordings")
    }

    /// Layout of a single task's recording folder
    pub fn task(&self, task_name: &str) -> TaskLayout {
        TaskLayout::new(self.recordings_dir().join(task_name))
    }
}

/// Files belonging to one recorded task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLayout {
    dir: PathBuf,
}

impl TaskLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn actions_file(&self) -> PathBuf {
        self.dir.join("actions.json")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.dir.join("screenshots")
    }

    pub fn screenshot_manifest(&self) -> PathBuf {
        self.dir.join("screenshots.json")
    }

    pub fn summary_file(&self) -> PathBuf {
        self.dir.join("summary.json")
    }

    pub fn skill_file(&self) -> PathBuf {
        self.dir.join("SKILL.md")
    }

    pub fn skill_metadata_file(&self) -> PathBuf {
        self.dir.join("skill.json")
    }

    /// File name for the screenshot with the given sequence index
    pub fn screenshot_file(&self, sequence_index: u32) -> PathBuf {
        self.screenshots_dir()
            .join(format!("screen_{:04}.png", sequence_index))
    }
}

/// Write a file all-or-nothing: the bytes go to a temporary file in the same
/// directory which is then renamed over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Check that a task name is safe to use as a single path component.
pub fn validate_task_name(name: &str) -> crate::Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::InvalidTaskName("name cannot be empty".to_string()));
    }
    if trimmed == "." || trimmed.contains("..") {
        return Err(crate::Error::InvalidTaskName(
            "path traversal not allowed".to_string(),
        ));
    }
    if trimmed
        .chars()
        .any(|c| c.is_control() || c == '/' || c == '\\' || c == '\0')
    {
        return Err(crate::Error::InvalidTaskName(format!(
            "'{}' contains path separators or control characters",
            trimmed.escape_debug()
        )));
    }
    if trimmed.chars().count() > MAX_TASK_NAME_LEN {
        return Err(crate::Error::InvalidTaskName(format!(
            "name too long (max {} characters)",
            MAX_TASK_NAME_LEN
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let paths = Paths::new("/data");
        assert_eq!(paths.state_file(), PathBuf::from("/data/session.json"));
        assert_eq!(paths.config_file(), PathBuf::from("/data/config.toml"));
        assert_eq!(
            paths.task("t1").actions_file(),
            PathBuf::from("/data/recordings/t1/actions.json")
        );
    }

    #[test]
    fn test_screenshot_file_is_zero_padded() {
        let layout = TaskLayout::new("/r/t1");
        assert_eq!(
            layout.screenshot_file(7),
            PathBuf::from("/r/t1/screenshots/screen_0007.png")
        );
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("file.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No temporary files left behind
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_validate_task_name_accepts_simple_names() {
        assert_eq!(validate_task_name("fill-form").unwrap(), "fill-form");
        assert_eq!(validate_task_name("  open browser ").unwrap(), "open browser");
    }

    #[test]
    fn test_validate_task_name_rejects_traversal_and_separators() {
        assert!(validate_task_name("").is_err());
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name("..").is_err());
        assert!(validate_task_name("a/b").is_err());
        assert!(validate_task_name("a\\b").is_err());
        assert!(validate_task_name("bad\nname").is_err());
        assert!(validate_task_name(&"x".repeat(101)).is_err());
    }
}
