//! Credential-field detection and keystroke masking
//!
//! A click on an element that looks like a credential input arms the
//! [`Redactor`]; while armed, typed characters are replaced with
//! [`REDACTION_MARKER`] before they reach the action log. This is a
//! best-effort heuristic.

use crate::capture::input::KeyInput;
use crate::capture::types::{ActionEvent, ElementInfo, MouseButton, REDACTION_MARKER};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Words in an element's name or role that mark it as sensitive
pub const SENSITIVE_KEYWORDS: &[&str] =
    &["password", "secret", "token", "key", "credit", "ssn", "bank"];

/// Accessibility roles used for credential inputs
const CREDENTIAL_ROLES: &[&str] = &["password text", "password", "secret", "secure text field"];

/// Rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRegion {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let left = self.x as f64;
        let top = self.y as f64;
        x >= left && x < left + self.width as f64 && y >= top && y < top + self.height as f64
    }
}

/// Looks up the UI element under a screen point
pub trait ElementInspector: Send + Sync {
    fn element_at(&self, x: f64, y: f64) -> Option<ElementInfo>;
}

/// Inspector for platforms without an accessibility bridge
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInspector;

impl ElementInspector for NoInspector {
    fn element_at(&self, _x: f64, _y: f64) -> Option<ElementInfo> {
        None
    }
}

/// Whether an element looks like a credential input
pub fn is_credential_element(element: &ElementInfo) -> bool {
    let role = element.role.to_lowercase();
    let name = element.name.to_lowercase();
    CREDENTIAL_ROLES.contains(&role.as_str())
        || SENSITIVE_KEYWORDS
            .iter()
            .any(|kw| role.contains(kw) || name.contains(kw))
}

/// Turns raw clicks and keys into action log entries, masking keystrokes
/// typed into credential fields
pub struct Redactor {
    inspector: Box<dyn ElementInspector>,
    regions: Vec<ScreenRegion>,
    armed: bool,
    warned: bool,
}

impl Redactor {
    pub fn new(inspector: Box<dyn ElementInspector>, regions: Vec<ScreenRegion>) -> Self {
        Self { inspector, regions, armed: false, warned: false }
    }

    /// Whether the next typed characters will be masked
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Classify a click and produce its log entry
    pub fn on_click(&mut self, x: f64, y: f64, button: MouseButton, t_offset: f64) -> ActionEvent {
        let element = self.inspector.element_at(x, y);
        let in_region = self.regions.iter().any(|r| r.contains(x, y));
        let sensitive = in_region || element.as_ref().is_some_and(is_credential_element);

        self.armed = sensitive;
        if sensitive {
            if !self.warned {
                warn!(x, y, "Clicked on a potentially sensitive field; keystrokes will be redacted");
                self.warned = true;
            } else {
                debug!(x, y, "Sensitive field clicked");
            }
        }

        ActionEvent::Click { x, y, button, t_offset, element, sensitive }
    }

    /// Produce the log entry for a key press
    pub fn on_key(&mut self, key: KeyInput, t_offset: f64) -> ActionEvent {
        let event = match &key {
            KeyInput::Char(_) if self.armed => ActionEvent::KeyPress {
                key: REDACTION_MARKER.to_string(),
                t_offset,
                redacted: true,
            },
            KeyInput::Char(c) => ActionEvent::KeyPress {
                key: c.to_string(),
                t_offset,
                redacted: false,
            },
            KeyInput::Named(name) => ActionEvent::KeyPress {
                key: name.clone(),
                t_offset,
                redacted: false,
            },
        };
        if key.leaves_field() {
            self.armed = false;
        }
        event
    }
}
