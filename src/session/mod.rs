//! Recording session lifecycle
//!
//! Idle → Recording (`start`) → Stopping (`stop`) → Idle (recorder releases
//! its marker). At most one session exists at a time.

pub mod state;
pub mod store;

pub use state::{RecordingSession, SessionOptions, SessionSnapshot, SessionStatus, StopAck};
pub use store::{SessionHandle, SessionStore};
