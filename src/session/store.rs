//! Session registry backed by a single state file
//!
//! `start`, `stop` and `status` run in separate processes, so the files next to
//! the data root are the only shared state. The state file is created with an
//! atomic create-if-absent and never rewritten afterwards: `stop` drops a
//! separate stop-request file carrying the session id, and the recorder
//! removes both when it exits.

use crate::app::paths::{validate_task_name, write_atomic};
use crate::session::state::{
    RecordingSession, SessionOptions, SessionSnapshot, SessionStatus, StopAck,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default oldest age a live session can reach (60s timeout + 2 × 2s interval)
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(64);

/// What the state file currently holds
#[derive(Debug)]
enum Marker {
    Missing,
    Live(RecordingSession),
    Stale(String),
}

/// Explicit handle on the session state file
#[derive(Debug, Clone)]
pub struct SessionStore {
    state_file: PathBuf,
    stop_file: PathBuf,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();
        let stop_file = state_file.with_extension("stop");
        Self { state_file, stop_file, max_age: DEFAULT_MAX_AGE }
    }

    /// Bound session age by the recorder's timeout and sampling interval
    pub fn with_lifetime(mut self, timeout: Duration, interval: Duration) -> Self {
        self.max_age = timeout.saturating_add(interval.saturating_mul(2));
        self
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn stop_file(&self) -> &Path {
        &self.stop_file
    }

    fn state_dir(&self) -> PathBuf {
        match self.state_file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Session id named by the stop-request file, if one is present
    fn stop_request(&self) -> Option<Uuid> {
        let content = std::fs::read_to_string(&self.stop_file).ok()?;
        Uuid::parse_str(content.trim()).ok()
    }

    /// Overlay a pending stop request onto a freshly read marker
    fn with_stop_status(&self, mut session: RecordingSession) -> RecordingSession {
        if self.stop_request() == Some(session.id) {
            session.status = SessionStatus::Stopping;
        }
        session
    }

    fn read_marker(&self) -> crate::Result<Marker> {
        let content = match std::fs::read_to_string(&self.state_file) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Marker::Missing),
            Err(e) => return Err(e.into()),
        };
        let session: RecordingSession = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => return Ok(Marker::Stale(format!("unreadable state file ({})", e))),
        };
        let elapsed = session.elapsed();
        if elapsed > self.max_age {
            return Ok(Marker::Stale(format!(
                "session '{}' started {}s ago, longer than any recording can run",
                session.task_name,
                elapsed.as_secs()
            )));
        }
        Ok(Marker::Live(session))
    }

    fn existing_error(&self, task: &str) -> crate::Error {
        match self.read_marker() {
            Ok(Marker::Live(session)) => crate::Error::AlreadyRecording { task: session.task_name },
            Ok(Marker::Stale(reason)) => crate::Error::StaleSession { reason },
            // Vanished between our create attempt and the read
            Ok(Marker::Missing) => crate::Error::AlreadyRecording { task: task.to_string() },
            Err(e) => e,
        }
    }

    /// Claim the recording slot. Fails without touching an existing marker.
    pub fn start(&self, task_name: &str, options: SessionOptions) -> crate::Result<SessionHandle> {
        let task_name = validate_task_name(task_name)?;

        match self.read_marker()? {
            Marker::Missing => {}
            Marker::Live(session) => {
                return Err(crate::Error::AlreadyRecording { task: session.task_name })
            }
            Marker::Stale(reason) => return Err(crate::Error::StaleSession { reason }),
        }

        let session = RecordingSession::new(task_name, options);
        let json = serde_json::to_vec_pretty(&session)?;
        if !self.create_exclusive(&self.state_file, &json)? {
            return Err(self.existing_error(task_name));
        }

        info!(task = %session.task_name, id = %session.id, "Session started");
        Ok(SessionHandle { store: self.clone(), session, released: false })
    }

    /// Write `contents` to `path` only if nothing is there yet. The full
    /// content is written first and then linked into place.
    fn create_exclusive(&self, path: &Path, contents: &[u8]) -> crate::Result<bool> {
        let dir = self.state_dir();
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }

    /// Ask the running recorder to stop. The state file is left untouched.
    pub fn stop(&self) -> crate::Result<StopAck> {
        let mut session = match self.read_marker()? {
            Marker::Missing => return Err(crate::Error::NoActiveSession),
            Marker::Stale(reason) => return Err(crate::Error::StaleSession { reason }),
            Marker::Live(session) => session,
        };

        let id = session.id.to_string();
        let already_stopping = if self.create_exclusive(&self.stop_file, id.as_bytes())? {
            false
        } else if self.stop_request() == Some(session.id) {
            true
        } else {
            // Left behind by a recorder that exited while a stop was in flight
            write_atomic(&self.stop_file, id.as_bytes())?;
            false
        };

        session.status = SessionStatus::Stopping;
        if already_stopping {
            debug!(task = %session.task_name, "Stop already requested");
        } else {
            info!(task = %session.task_name, "Stop requested");
        }
        Ok(StopAck { session, already_stopping })
    }

    pub fn status(&self) -> crate::Result<SessionSnapshot> {
        Ok(match self.read_marker()? {
            Marker::Missing => SessionSnapshot::Idle,
            Marker::Stale(reason) => SessionSnapshot::Stale { reason },
            Marker::Live(session) => {
                let session = self.with_stop_status(session);
                let elapsed = session.elapsed();
                SessionSnapshot::Active { session, elapsed }
            }
        })
    }

    /// Remove any marker and stop request. Returns whether a marker existed.
    pub fn clear(&self) -> crate::Result<bool> {
        remove_if_present(&self.stop_file)?;
        match std::fs::remove_file(&self.state_file) {
            Ok(()) => {
                info!(path = %self.state_file.display(), "Session marker cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the recorder owning `id` should stop: a stop request names it,
    /// or its marker was removed or replaced by another session.
    pub fn stop_requested(&self, id: Uuid) -> bool {
        if self.stop_request() == Some(id) {
            return true;
        }
        let content = match std::fs::read_to_string(&self.state_file) {
            Ok(c) => c,
            Err(_) => return true,
        };
        match serde_json::from_str::<RecordingSession>(&content) {
            Ok(session) => session.id != id,
            Err(_) => true,
        }
    }

    /// Remove the marker only if it still belongs to `id`, then any stop
    /// request aimed at `id`
    fn release(&self, id: Uuid) -> crate::Result<bool> {
        let owned = std::fs::read_to_string(&self.state_file)
            .ok()
            .and_then(|c| serde_json::from_str::<RecordingSession>(&c).ok())
            .is_some_and(|s| s.id == id);
        let removed = owned && remove_if_present(&self.state_file)?;
        if self.stop_request() == Some(id) {
            remove_if_present(&self.stop_file)?;
        }
        Ok(removed)
    }
}

fn remove_if_present(path: &Path) -> crate::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Ownership of the active session. Dropping it releases the marker.
#[derive(Debug)]
pub struct SessionHandle {
    store: SessionStore,
    session: RecordingSession,
    released: bool,
}

impl SessionHandle {
    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Return to Idle by removing this session's marker
    pub fn finish(mut self) -> crate::Result<()> {
        self.released = true;
        if self.store.release(self.session.id)? {
            info!(task = %self.session.task_name, "Session released");
        }
        Ok(())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.store.release(self.session.id) {
                warn!(error = %e, "Failed to release session marker");
            }
        }
    }
}
