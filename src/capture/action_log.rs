//! Append-only action log
//!
//! Events are kept in memory in capture order and checkpointed to
//! `actions.json.tmp` every few events so a crashed recorder leaves something
//! behind. `flush` writes the final `actions.json` atomically.

use crate::app::paths::write_atomic;
use crate::capture::types::ActionEvent;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Get the checkpoint (temporary) path for an action log file
fn checkpoint_path(final_path: &Path) -> PathBuf {
    final_path.with_extension("json.tmp")
}

/// Ordered, append-only record of input events for one session
#[derive(Debug)]
pub struct ActionLog {
    path: PathBuf,
    events: Vec<ActionEvent>,
    checkpoint_every: usize,
}

impl ActionLog {
    /// Create an empty log that will be flushed to `path`
    pub fn new(path: impl Into<PathBuf>, checkpoint_every: usize) -> Self {
        Self {
            path: path.into(),
            events: Vec::new(),
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Offset of the most recent event, or 0.0 when empty
    pub fn last_offset(&self) -> f64 {
        self.events.last().map(ActionEvent::t_offset).unwrap_or(0.0)
    }

    /// Append an event. Offsets are clamped so the log never goes backwards.
    pub fn append(&mut self, mut event: ActionEvent) {
        let floor = self.last_offset();
        match &mut event {
            ActionEvent::Click { t_offset, .. } | ActionEvent::KeyPress { t_offset, .. } => {
                if *t_offset < floor {
                    *t_offset = floor;
                }
            }
        }
        self.events.push(event);

        if self.events.len() % self.checkpoint_every == 0 {
            if let Err(e) = self.checkpoint() {
                warn!(error = %e, "Failed to checkpoint action log");
            }
        }
    }

    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Save the current events to the checkpoint file
    pub fn checkpoint(&self) -> crate::Result<()> {
        let json = serde_json::to_vec(&self.events)?; // compact JSON for speed
        write_atomic(&checkpoint_path(&self.path), &json)?;
        debug!(count = self.events.len(), "Action log checkpoint written");
        Ok(())
    }

    /// Write the final log and remove the checkpoint
    pub fn flush(self) -> crate::Result<Vec<ActionEvent>> {
        let json = serde_json::to_vec_pretty(&self.events)?;
        write_atomic(&self.path, &json)?;
        let _ = std::fs::remove_file(checkpoint_path(&self.path));
        Ok(self.events)
    }

    /// Load a flushed log. A missing file is an empty log.
    pub fn load(path: &Path) -> crate::Result<Vec<ActionEvent>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Recover events from a checkpoint left by a crashed recorder
    pub fn recover_checkpoint(final_path: &Path) -> Option<Vec<ActionEvent>> {
        let content = std::fs::read_to_string(checkpoint_path(final_path)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::MouseButton;
    use tempfile::tempdir;

    fn key(k: &str, t: f64) -> ActionEvent {
        ActionEvent::KeyPress { key: k.to_string(), t_offset: t, redacted: false }
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = tempdir().unwrap();
        let mut log = ActionLog::new(dir.path().join("actions.json"), 100);
        log.append(key("a", 0.5));
        log.append(ActionEvent::Click {
            x: 1.0,
            y: 2.0,
            button: MouseButton::Left,
            t_offset: 1.0,
            element: None,
            sensitive: false,
        });
        log.append(key("b", 1.5));
        assert_eq!(log.len(), 3);
        assert!(log.events()[1].is_click());
        assert_eq!(log.last_offset(), 1.5);
    }

    #[test]
    fn test_offsets_never_go_backwards() {
        let dir = tempdir().unwrap();
        let mut log = ActionLog::new(dir.path().join("actions.json"), 100);
        log.append(key("a", 2.0));
        log.append(key("b", 1.0));
        assert_eq!(log.events()[1].t_offset(), 2.0);
    }

    #[test]
    fn test_flush_writes_json_and_removes_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let mut log = ActionLog::new(&path, 2);
        log.append(key("a", 0.1));
        log.append(key("b", 0.2));
        assert!(ActionLog::recover_checkpoint(&path).is_some());

        let events = log.flush().unwrap();
        assert_eq!(events.len(), 2);
        assert!(ActionLog::recover_checkpoint(&path).is_none());

        let loaded = ActionLog::load(&path).unwrap();
        assert_eq!(loaded, events);
    }

    #[test]
    fn test_checkpoint_every_n_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let mut log = ActionLog::new(&path, 3);
        log.append(key("a", 0.1));
        log.append(key("b", 0.2));
        assert!(ActionLog::recover_checkpoint(&path).is_none());
        log.append(key("c", 0.3));
        let recovered = ActionLog::recover_checkpoint(&path).unwrap();
        assert_eq!(recovered.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let events = ActionLog::load(&dir.path().join("nope.json")).unwrap();
        assert!(events.is_empty());
    }
}
