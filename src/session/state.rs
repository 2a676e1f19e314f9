//! Persisted session marker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle status stored in the state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Recording,
    Stopping,
}

/// Options chosen when the session was started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Blur every frame before it is written
    pub privacy_blur: bool,
    /// Run `compile` once recording ends
    pub auto_compile: bool,
}

/// The single active recording, as persisted in `session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSession {
    /// Identifies the owning recorder
    pub id: Uuid,
    pub task_name: String,
    pub start_time: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub options: SessionOptions,
    /// Process id of the recorder
    pub pid: u32,
}

impl RecordingSession {
    pub fn new(task_name: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_name: task_name.into(),
            start_time: Utc::now(),
            status: SessionStatus::Recording,
            options,
            pid: std::process::id(),
        }
    }

    /// Wall-clock time since the session started
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.start_time).to_std().unwrap_or_default()
    }

    pub fn is_stopping(&self) -> bool {
        self.status == SessionStatus::Stopping
    }
}

/// Result of a `status` query
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSnapshot {
    /// No session marker exists
    Idle,
    /// A live recorder owns the marker
    Active {
        session: RecordingSession,
        elapsed: Duration,
    },
    /// A marker exists but no live recorder can own it
    Stale { reason: String },
}

/// Acknowledgement of a stop request
#[derive(Debug, Clone, PartialEq)]
pub struct StopAck {
    pub session: RecordingSession,
    /// The session was already stopping before this request
    pub already_stopping: bool,
}
