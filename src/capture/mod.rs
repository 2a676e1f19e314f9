//! Event capture module
//!
//! Screen sampling and input listening for one recording session. Platform
//! backends live behind the `desktop` feature; everything else works against
//! the [`ScreenSource`], [`InputSource`] and [`ElementInspector`] traits.

pub mod action_log;
pub mod coordinator;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod input;
pub mod redaction;
pub mod screen;
pub mod types;

pub use action_log::ActionLog;
pub use coordinator::{spawn_stop_watcher, CaptureCoordinator, CaptureSettings};
pub use input::{ChannelInput, InputEvent, InputSource, KeyInput, TimedInput};
pub use redaction::{ElementInspector, NoInspector, Redactor, ScreenRegion};
pub use screen::{ScreenSampler, ScreenSource};
pub use types::*;

/// Name of the compiled-in capture backend, if any
pub fn backend_name() -> Option<&'static str> {
    if cfg!(feature = "desktop") {
        Some("xcap + rdev")
    } else {
        None
    }
}

/// Platform screen and input sources
#[cfg(feature = "desktop")]
pub fn desktop_sources() -> crate::Result<(Box<dyn ScreenSource>, Box<dyn InputSource>)> {
    Ok((
        Box::new(desktop::MonitorScreen),
        Box::new(desktop::GlobalInput::default()),
    ))
}

/// Platform screen and input sources
#[cfg(not(feature = "desktop"))]
pub fn desktop_sources() -> crate::Result<(Box<dyn ScreenSource>, Box<dyn InputSource>)> {
    Err(crate::Error::CaptureUnavailable(
        "this build has no screen/input capture backend".to_string(),
    ))
}

/// Element inspector for this platform. No accessibility bridge is wired in,
/// so sensitive fields are found through configured regions only.
pub fn platform_inspector() -> Box<dyn ElementInspector> {
    Box::new(NoInspector)
}
