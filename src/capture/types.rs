//! Core types for event capture
//!
//! Defines the records produced while a session is recording and persisted
//! alongside the screenshots.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Marker substituted for keystrokes typed into a credential field
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Mouse button of a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// Accessibility description of the element under the pointer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Element role (button, text field, password text, ...)
    pub role: String,
    /// Element label or visible text
    #[serde(default)]
    pub name: String,
    /// Parent container name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
}

/// A single entry of the action log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionEvent {
    /// Pointer button press
    Click {
        x: f64,
        y: f64,
        button: MouseButton,
        /// Seconds since session start
        t_offset: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<ElementInfo>,
        /// The click landed on a field classified as a credential input
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        sensitive: bool,
    },
    /// Key press; `key` is the character typed, a named key such as `Enter`,
    /// or [`REDACTION_MARKER`]
    KeyPress {
        key: String,
        /// Seconds since session start
        t_offset: f64,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        redacted: bool,
    },
}

impl ActionEvent {
    pub fn t_offset(&self) -> f64 {
        match self {
            ActionEvent::Click { t_offset, .. } | ActionEvent::KeyPress { t_offset, .. } => {
                *t_offset
            }
        }
    }

    pub fn is_click(&self) -> bool {
        matches!(self, ActionEvent::Click { .. })
    }

    pub fn is_key(&self) -> bool {
        matches!(self, ActionEvent::KeyPress { .. })
    }

    pub fn element(&self) -> Option<&ElementInfo> {
        match self {
            ActionEvent::Click { element, .. } => element.as_ref(),
            ActionEvent::KeyPress { .. } => None,
        }
    }
}

/// One saved screen sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    /// Position in capture order, starting at 0
    pub sequence_index: u32,
    /// PNG file on local storage
    pub file_path: PathBuf,
    /// Seconds since session start
    pub t_offset: f64,
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A stop request or Ctrl+C was observed
    Stopped,
    /// The wall-clock limit elapsed
    TimedOut,
}

/// Counts reported when a recording ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub task_name: String,
    pub screenshots: usize,
    pub actions: usize,
    pub duration_secs: f64,
    pub end_reason: EndReason,
}
