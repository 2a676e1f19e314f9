//! SKILL.md persistence
//!
//! The generated document is always written to the task's recording folder
//! first, then installed into the automation runtime's skills directory.
//! Every write is a temp file plus rename.

use crate::app::paths::{write_atomic, TaskLayout};
use crate::synthesis::cost::CostEstimate;
use crate::synthesis::model::ModelTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the skills directory
pub const SKILLS_DIR_ENV: &str = "MIMIC_SKILLS_DIR";

/// File name of the document inside a skill folder
pub const SKILL_FILE_NAME: &str = "SKILL.md";

/// Provenance stored next to SKILL.md as `skill.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub task_name: String,
    pub model: String,
    pub tier: ModelTier,
    pub screenshots_sent: usize,
    pub raw_screenshots: usize,
    pub actions: usize,
    pub estimated_cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl SkillMetadata {
    /// `raw_screenshots` and `actions` count the recording as captured, before
    /// selection
    pub fn new(
        task_name: impl Into<String>,
        model: impl Into<String>,
        estimate: &CostEstimate,
        raw_screenshots: usize,
        actions: usize,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            model: model.into(),
            tier: estimate.tier,
            screenshots_sent: estimate.image_count,
            raw_screenshots,
            actions,
            estimated_cost_usd: estimate.total_cost,
            input_tokens: None,
            output_tokens: None,
            created_at: Utc::now(),
        }
    }
}

/// A generated document and its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSkill {
    pub content: String,
    pub metadata: SkillMetadata,
}

impl CompiledSkill {
    pub fn new(content: &str, metadata: SkillMetadata) -> Self {
        Self { content: normalize_document(content), metadata }
    }

    /// First `max_chars` characters, for previews
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Strip a ```markdown fence wrapped around the whole document and make sure
/// the file ends with a newline
pub fn normalize_document(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```markdown")
        .or_else(|| trimmed.strip_prefix("```md"))
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    format!("{}\n", unfenced)
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Platform default skills directory of the automation runtime
pub fn default_skills_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        let app_support = home.join("Library").join("Application Support");
        if app_support.exists() {
            return app_support.join("moltbot").join("skills");
        }
    } else if cfg!(target_os = "windows") {
        if let Some(appdata) = dirs::config_dir() {
            return appdata.join("moltbot").join("skills");
        }
    }
    home.join(".moltbot").join("skills")
}

/// A directory that exists, or could be created under an existing parent
fn usable(path: &Path) -> bool {
    path.exists() || path.parent().is_some_and(Path::exists)
}

/// Pick the skills directory: env override, then preferences, then `default`
pub fn resolve_destination(
    env_value: Option<&str>,
    configured: Option<&Path>,
    default: &Path,
) -> crate::Result<PathBuf> {
    let candidates = env_value
        .filter(|v| !v.trim().is_empty())
        .map(|v| expand_tilde(Path::new(v.trim())))
        .into_iter()
        .chain(configured.map(expand_tilde));

    for candidate in candidates {
        if usable(&candidate) {
            return Ok(candidate);
        }
        debug!(path = %candidate.display(), "Skills directory candidate not usable");
    }
    if usable(default) {
        return Ok(default.to_path_buf());
    }
    Err(crate::Error::DestinationNotFound { default: default.to_path_buf() })
}

fn map_write_error(err: std::io::Error, path: &Path) -> crate::Error {
    if err.kind() == ErrorKind::PermissionDenied {
        crate::Error::PermissionDenied { path: path.to_path_buf() }
    } else {
        crate::Error::Io(err)
    }
}

/// Writes compiled skills for one task
#[derive(Debug, Clone)]
pub struct SkillWriter {
    layout: TaskLayout,
}

impl SkillWriter {
    pub fn new(layout: TaskLayout) -> Self {
        Self { layout }
    }

    /// Write SKILL.md and skill.json into the recording folder
    pub fn write_local(&self, skill: &CompiledSkill) -> crate::Result<PathBuf> {
        let skill_file = self.layout.skill_file();
        write_atomic(&skill_file, skill.content.as_bytes())
            .map_err(|e| map_write_error(e, &skill_file))?;
        let metadata_file = self.layout.skill_metadata_file();
        write_atomic(&metadata_file, &serde_json::to_vec_pretty(&skill.metadata)?)
            .map_err(|e| map_write_error(e, &metadata_file))?;
        info!(path = %skill_file.display(), "Skill saved locally");
        Ok(skill_file)
    }

    /// Install into `<skills_dir>/<task>/SKILL.md`
    pub fn install(&self, skill: &CompiledSkill, skills_dir: &Path) -> crate::Result<PathBuf> {
        let task_dir = skills_dir.join(&skill.metadata.task_name);
        std::fs::create_dir_all(&task_dir).map_err(|e| map_write_error(e, &task_dir))?;
        let target = task_dir.join(SKILL_FILE_NAME);
        write_atomic(&target, skill.content.as_bytes()).map_err(|e| map_write_error(e, &target))?;
        info!(path = %target.display(), "Skill installed");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn skill(task: &str, content: &str) -> CompiledSkill {
        let estimate = crate::synthesis::cost::estimate_from_stats(3, 1000, 100, ModelTier::Balanced);
        CompiledSkill::new(content, SkillMetadata::new(task, "model-x", &estimate, 7, 12))
    }

    #[test]
    fn test_normalize_strips_fence() {
        assert_eq!(normalize_document("```markdown\n# Title\nbody\n```"), "# Title\nbody\n");
        assert_eq!(normalize_document("# Title\n\n"), "# Title\n");
        assert_eq!(normalize_document("```\n# T\n```\n"), "# T\n");
    }

    #[test]
    fn test_preview_truncates() {
        let s = skill("t", "abcdef");
        assert_eq!(s.preview(3), "abc...");
        assert_eq!(s.preview(100), "abcdef\n");
    }

    #[test]
    fn test_write_local_and_install() {
        let dir = tempdir().unwrap();
        let writer = SkillWriter::new(TaskLayout::new(dir.path().join("recordings").join("t1")));
        let s = skill("t1", "# Fill form\n");

        let local = writer.write_local(&s).unwrap();
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "# Fill form\n");
        let meta: SkillMetadata = serde_json::from_slice(
            &std::fs::read(dir.path().join("recordings/t1/skill.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.model, "model-x");
        assert_eq!(meta.screenshots_sent, 3);
        assert_eq!(meta.raw_screenshots, 7);
        assert_eq!(meta.actions, 12);

        let skills = dir.path().join("skills");
        let installed = writer.install(&s, &skills).unwrap();
        assert_eq!(installed, skills.join("t1").join("SKILL.md"));
        assert_eq!(std::fs::read_to_string(installed).unwrap(), "# Fill form\n");
    }

    #[test]
    fn test_recompile_replaces_document() {
        let dir = tempdir().unwrap();
        let writer = SkillWriter::new(TaskLayout::new(dir.path().join("t1")));
        writer.write_local(&skill("t1", "# v1")).unwrap();
        let path = writer.write_local(&skill("t1", "# v2")).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# v2\n");
    }

    #[test]
    fn test_resolve_destination_order() {
        let dir = tempdir().unwrap();
        let env_dir = dir.path().join("env-skills");
        let cfg_dir = dir.path().join("cfg-skills");
        let default = dir.path().join("default").join("skills");

        // env wins when usable (parent exists)
        let got = resolve_destination(env_dir.to_str(), Some(&cfg_dir), &default).unwrap();
        assert_eq!(got, env_dir);

        // unusable env falls through to config
        let bad = dir.path().join("no").join("such").join("dir");
        let got = resolve_destination(bad.to_str(), Some(&cfg_dir), &default).unwrap();
        assert_eq!(got, cfg_dir);

        // default with missing parent is not found
        let err = resolve_destination(None, None, &default).unwrap_err();
        assert!(matches!(err, crate::Error::DestinationNotFound { .. }));

        std::fs::create_dir_all(dir.path().join("default")).unwrap();
        assert_eq!(resolve_destination(Some("  "), None, &default).unwrap(), default);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_destination_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let skills = dir.path().join("locked");
        std::fs::create_dir(&skills).unwrap();
        std::fs::set_permissions(&skills, std::fs::Permissions::from_mode(0o500)).unwrap();
        // Root ignores permission bits
        if std::fs::write(skills.join("probe"), b"x").is_ok() {
            return;
        }

        let writer = SkillWriter::new(TaskLayout::new(dir.path().join("t1")));
        let s = skill("t1", "# doc");
        let local = writer.write_local(&s).unwrap();
        let err = writer.install(&s, &skills).unwrap_err();
        assert!(matches!(err, crate::Error::PermissionDenied { .. }));
        assert!(local.exists());

        std::fs::set_permissions(&skills, std::fs::Permissions::from_mode(0o700)).unwrap();
    }
}
