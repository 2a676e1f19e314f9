//! # Mimic
//!
//! Records a desktop task (screenshots plus pointer/keyboard actions) and
//! compiles the recording into a portable SKILL.md automation by asking an
//! external generative model to describe the procedure.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mimic::app::paths::Paths;
//! use mimic::session::{SessionOptions, SessionStore};
//!
//! let paths = Paths::from_env();
//! let store = SessionStore::new(paths.state_file());
//!
//! // Claim the single recording slot
//! let handle = store.start("fill-form", SessionOptions::default())?;
//! println!("recording '{}'", handle.session().task_name);
//! # Ok::<(), mimic::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`session`]: Idle/Recording/Stopping lifecycle backed by an on-disk state file
//! - [`capture`]: Screen sampling, input listening, redaction and the capture coordinator
//! - [`artifacts`]: Even-stride screenshot selection and JPEG compression
//! - [`synthesis`]: Cost estimation, request assembly and the model transport
//! - [`codegen`]: Atomic SKILL.md persistence to local and runtime directories
//! - [`workflow`]: The `start` and `compile` pipelines
//! - [`app`]: CLI, preferences file and directory layout
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Session   │───▶│   Capture   │───▶│  Select &   │───▶│    Cost     │
//! │    State    │    │ Coordinator │    │  Compress   │    │  Estimator  │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  SKILL.md   │◀───│   Model     │◀───│   Request   │
//! │   Writer    │    │  Transport  │    │   Builder   │
//! └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod app;
pub mod artifacts;
pub mod capture;
pub mod codegen;
pub mod session;
pub mod synthesis;
pub mod workflow;

// Re-export commonly used types
pub use capture::types::{ActionEvent, MouseButton, ScreenshotRecord, SessionSummary};
pub use session::{RecordingSession, SessionOptions, SessionSnapshot, SessionStore};
pub use workflow::compiler::{CompileOptions, CompileOutcome, Compiler, PreparedCompile};

use std::path::PathBuf;

/// Result type alias for mimic
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mimic
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Already recording task '{task}'")]
    AlreadyRecording { task: String },

    #[error("No recording in progress")]
    NoActiveSession,

    #[error("Stale session marker left behind: {reason}")]
    StaleSession { reason: String },

    #[error("No API credential found (ANTHROPIC_API_KEY is not set)")]
    MissingCredential,

    #[error("Request is {size} bytes, above the service limit of {limit} bytes")]
    PayloadTooLarge {
        size: usize,
        limit: usize,
        suggested_max: usize,
    },

    #[error("Model API is rate limiting requests")]
    RateLimited { retry_after: Option<u64> },

    #[error("Permission denied writing to {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Skills directory not found (default would be {})", default.display())]
    DestinationNotFound { default: PathBuf },

    #[error("Invalid task name: {0}")]
    InvalidTaskName(String),

    #[error("Recording not found: {}", .0.display())]
    TaskNotFound(PathBuf),

    #[error("No screenshots found in {}", .0.display())]
    NoScreenshots(PathBuf),

    #[error("Capture backend unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error kind at the CLI boundary
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::AlreadyRecording { .. } => 2,
            Error::NoActiveSession => 3,
            Error::StaleSession { .. } => 4,
            Error::MissingCredential => 5,
            Error::PayloadTooLarge { .. } => 6,
            Error::RateLimited { .. } => 7,
            Error::PermissionDenied { .. } => 8,
            Error::DestinationNotFound { .. } => 9,
            _ => 1,
        }
    }

    /// Actionable guidance shown after the error message, if any
    pub fn remediation(&self) -> Option<String> {
        match self {
            Error::AlreadyRecording { .. } => Some("Run 'mimic stop' first".to_string()),
            Error::NoActiveSession => Some("Start one with: mimic start <task>".to_string()),
            Error::StaleSession { .. } => Some(
                "A previous recorder exited uncleanly. Run 'mimic clear' to remove the marker"
                    .to_string(),
            ),
            Error::MissingCredential => {
                Some("Set it via: export ANTHROPIC_API_KEY=sk-ant-...".to_string())
            }
            Error::PayloadTooLarge { suggested_max, .. } => Some(format!(
                "Reduce the screenshot count (try compile.max_screenshots = {})",
                suggested_max
            )),
            Error::RateLimited { retry_after } => Some(match retry_after {
                Some(secs) => format!("Wait {}s and run compile again", secs),
                None => "Wait a minute and run compile again".to_string(),
            }),
            Error::PermissionDenied { .. } => Some(
                "The skill was kept in the recording folder; fix permissions or set MIMIC_SKILLS_DIR"
                    .to_string(),
            ),
            Error::DestinationNotFound { .. } => {
                Some("Set MIMIC_SKILLS_DIR or output.skills_dir in config.toml".to_string())
            }
            Error::CaptureUnavailable(_) => {
                Some("Rebuild with the 'desktop' feature: cargo install mimic --features desktop".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let errors = [
            Error::AlreadyRecording { task: "t".into() },
            Error::NoActiveSession,
            Error::StaleSession { reason: "old".into() },
            Error::MissingCredential,
            Error::PayloadTooLarge { size: 2, limit: 1, suggested_max: 1 },
            Error::RateLimited { retry_after: None },
            Error::PermissionDenied { path: PathBuf::from("/x") },
            Error::DestinationNotFound { default: PathBuf::from("/y") },
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&1));
    }

    #[test]
    fn test_payload_too_large_suggests_reduction() {
        let err = Error::PayloadTooLarge { size: 40, limit: 32, suggested_max: 12 };
        let hint = err.remediation().unwrap();
        assert!(hint.contains("12"));
    }

    #[test]
    fn test_generic_errors_use_exit_code_one() {
        let err = Error::Config("bad".into());
        assert_eq!(err.exit_code(), 1);
        assert!(err.remediation().is_none());
    }
}
