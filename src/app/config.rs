//! Configuration Management
//!
//! The preferences file never holds secrets; the model credential is read from
//! the environment only.

use crate::capture::redaction::ScreenRegion;
use crate::synthesis::model::{ModelIds, ModelTier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest accepted sampling interval (one hour)
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Longest accepted recording (one day)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Compilation settings
    #[serde(default)]
    pub compile: CompileConfig,
    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Seconds between screenshots
    pub interval_secs: u64,
    /// Hard recording limit in seconds
    pub timeout_secs: u64,
    /// Write an action-log checkpoint every N events
    pub checkpoint_every: usize,
    /// Screen regions always treated as credential fields
    pub sensitive_regions: Vec<ScreenRegion>,
}

/// Compilation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Maximum screenshots sent to the model
    pub max_screenshots: usize,
    /// Longest image side after resizing (pixels)
    pub max_dimension: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Default model tier
    pub model: ModelTier,
    /// Service-side request size ceiling in bytes
    pub max_request_bytes: usize,
    /// HTTP timeout for the model request
    pub request_timeout_secs: u64,
    /// Output token budget for the generated document
    pub max_output_tokens: u32,
    /// Tier to model id mapping
    pub models: ModelIds,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// External runtime skills directory
    pub skills_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            timeout_secs: 60,
            checkpoint_every: 25,
            sensitive_regions: Vec::new(),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_screenshots: 25,
            max_dimension: 1280,
            jpeg_quality: 70,
            model: ModelTier::Balanced,
            max_request_bytes: 32 * 1024 * 1024,
            request_timeout_secs: 300,
            max_output_tokens: 4096,
            models: ModelIds::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.capture.interval_secs == 0 {
            return Err(crate::Error::Config("interval_secs must be > 0".to_string()));
        }
        if self.capture.interval_secs > MAX_INTERVAL_SECS {
            return Err(crate::Error::Config(format!(
                "interval_secs must be <= {}, got {}",
                MAX_INTERVAL_SECS, self.capture.interval_secs
            )));
        }
        if self.capture.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(crate::Error::Config(format!(
                "timeout_secs must be <= {}, got {}",
                MAX_TIMEOUT_SECS, self.capture.timeout_secs
            )));
        }
        if self.capture.timeout_secs < self.capture.interval_secs {
            return Err(crate::Error::Config(format!(
                "timeout_secs ({}) must be >= interval_secs ({})",
                self.capture.timeout_secs, self.capture.interval_secs
            )));
        }
        if self.capture.checkpoint_every == 0 {
            return Err(crate::Error::Config("checkpoint_every must be > 0".to_string()));
        }
        if !(1..=100).contains(&self.compile.max_screenshots) {
            return Err(crate::Error::Config(format!(
                "max_screenshots must be in [1, 100], got {}",
                self.compile.max_screenshots
            )));
        }
        if !(64..=8192).contains(&self.compile.max_dimension) {
            return Err(crate::Error::Config(format!(
                "max_dimension must be in [64, 8192], got {}",
                self.compile.max_dimension
            )));
        }
        if !(1..=100).contains(&self.compile.jpeg_quality) {
            return Err(crate::Error::Config(format!(
                "jpeg_quality must be in [1, 100], got {}",
                self.compile.jpeg_quality
            )));
        }
        if self.compile.max_request_bytes == 0 {
            return Err(crate::Error::Config("max_request_bytes must be > 0".to_string()));
        }
        if self.compile.request_timeout_secs == 0 {
            return Err(crate::Error::Config("request_timeout_secs must be > 0".to_string()));
        }
        for tier in ModelTier::ALL {
            if self.compile.models.id_for(tier).trim().is_empty() {
                return Err(crate::Error::Config(format!(
                    "model id for '{}' must not be empty",
                    tier
                )));
            }
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a path, falling back to defaults if the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, crate::Error> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capture.interval_secs, 2);
        assert_eq!(config.capture.timeout_secs, 60);
        assert_eq!(config.compile.max_screenshots, 25);
        assert_eq!(config.compile.max_dimension, 1280);
        assert_eq!(config.compile.jpeg_quality, 70);
        assert_eq!(config.compile.model, ModelTier::Balanced);
        assert!(config.output.skills_dir.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[capture]"));
        assert!(toml.contains("[compile]"));
        assert!(toml.contains("model = \"balanced\""));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.capture.interval_secs = 3;
        original.compile.model = ModelTier::Best;
        original.output.skills_dir = Some(PathBuf::from("/opt/skills"));
        original.capture.sensitive_regions.push(ScreenRegion {
            x: 10,
            y: 20,
            width: 300,
            height: 40,
        });

        original.save(&config_path).expect("Failed to save config");
        let loaded = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded.capture.interval_secs, 3);
        assert_eq!(loaded.compile.model, ModelTier::Best);
        assert_eq!(loaded.output.skills_dir, Some(PathBuf::from("/opt/skills")));
        assert_eq!(loaded.capture.sensitive_regions.len(), 1);
        assert_eq!(loaded.capture.sensitive_regions[0].width, 300);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[output]
skills_dir = "/tmp/skills"
"#,
        )
        .expect("partial config should deserialize");
        assert_eq!(config.capture.timeout_secs, 60);
        assert_eq!(config.compile.max_screenshots, 25);
        assert_eq!(config.output.skills_dir, Some(PathBuf::from("/tmp/skills")));
    }

    #[test]
    fn test_model_aliases_accepted() {
        let config: Config = toml::from_str("[compile]\nmodel = \"opus\"\n").unwrap();
        assert_eq!(config.compile.model, ModelTier::Best);
    }

    #[test]
    fn test_load_or_default_when_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.capture.interval_secs, 2);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load(&temp_dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml_parsing() {
        let result: Result<Config, _> = toml::from_str("this is not valid toml {{{}}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = Config::default();
        config.capture.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_timeout_shorter_than_interval() {
        let mut config = Config::default();
        config.capture.timeout_secs = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_capture_durations() {
        let mut config = Config::default();
        config.capture.interval_secs = MAX_INTERVAL_SECS + 1;
        config.capture.timeout_secs = u64::MAX;
        assert!(config.validate().is_err());

        config.capture.interval_secs = 2;
        assert!(config.validate().is_err());

        config.capture.timeout_secs = MAX_TIMEOUT_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_quality_out_of_range() {
        let mut config = Config::default();
        config.compile.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.compile.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_max_screenshots_bounds() {
        let mut config = Config::default();
        config.compile.max_screenshots = 0;
        assert!(config.validate().is_err());
        config.compile.max_screenshots = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_model_id() {
        let mut config = Config::default();
        config.compile.models.fast = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "[capture]\ninterval_secs = 0\n").unwrap();
        assert!(Config::load(&config_path).is_err());
    }
}
