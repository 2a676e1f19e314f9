//! The `start` pipeline
//!
//! Owns a claimed session from the first sample until its marker is released.

use crate::app::config::Config;
use crate::app::paths::{Paths, TaskLayout};
use crate::capture::coordinator::{spawn_stop_watcher, CaptureCoordinator, CaptureSettings};
use crate::capture::input::InputSource;
use crate::capture::redaction::{ElementInspector, Redactor};
use crate::capture::screen::ScreenSource;
use crate::capture::types::SessionSummary;
use crate::session::{SessionHandle, SessionSnapshot, SessionStore};
use crate::workflow::recording::clear_previous_capture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Poll period while waiting for a recorder to release its session
const RELEASE_POLL: Duration = Duration::from_millis(250);

/// Runs recordings with the configured capture settings
#[derive(Debug, Clone)]
pub struct Recorder {
    paths: Paths,
    config: Config,
}

impl Recorder {
    pub fn new(paths: Paths, config: Config) -> Self {
        Self { paths, config }
    }

    /// Session store bounded by this recorder's timeout and interval
    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.paths.state_file()).with_lifetime(
            Duration::from_secs(self.config.capture.timeout_secs),
            Duration::from_secs(self.config.capture.interval_secs),
        )
    }

    /// Record the session owned by `handle` until it is stopped, `interrupt`
    /// is cancelled, or the timeout elapses. The session marker is released
    /// on every path.
    pub async fn record(
        &self,
        handle: SessionHandle,
        screen: Box<dyn ScreenSource>,
        mut input: Box<dyn InputSource>,
        inspector: Box<dyn ElementInspector>,
        interrupt: CancellationToken,
    ) -> crate::Result<SessionSummary> {
        let session = handle.session().clone();
        let layout = self.paths.task(&session.task_name);
        let settings = CaptureSettings::from_config(&self.config.capture, session.options.privacy_blur);

        let result = async {
            clear_previous_capture(&layout)?;
            let watcher = spawn_stop_watcher(
                handle.store().clone(),
                handle.id(),
                settings.interval,
                interrupt.clone(),
            );
            let redactor = Redactor::new(inspector, self.config.capture.sensitive_regions.clone());
            let summary = CaptureCoordinator::new(&session.task_name, layout.clone(), settings)
                .with_cancellation(interrupt.clone())
                .run(screen, input.as_mut(), redactor)
                .await;

            interrupt.cancel();
            if let Err(e) = watcher.await {
                warn!(error = %e, "Stop watcher ended abnormally");
            }
            summary
        }
        .await;

        handle.finish()?;
        if let Ok(summary) = &result {
            info!(
                task = %summary.task_name,
                reason = ?summary.end_reason,
                "Recording complete"
            );
        }
        result
    }
}

/// Summary written by the last recording of a task
pub fn read_summary(layout: &TaskLayout) -> Option<SessionSummary> {
    let content = std::fs::read_to_string(layout.summary_file()).ok()?;
    serde_json::from_str(&content).ok()
}

/// Wait until no live session remains or `timeout` passes. Returns whether
/// the session was released in time.
pub async fn wait_for_release(store: &SessionStore, timeout: Duration) -> crate::Result<bool> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match store.status()? {
            SessionSnapshot::Idle => return Ok(true),
            SessionSnapshot::Stale { .. } => return Ok(false),
            SessionSnapshot::Active { .. } => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(RELEASE_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::ChannelInput;
    use crate::capture::redaction::NoInspector;
    use crate::capture::types::EndReason;
    use crate::session::SessionOptions;
    use image::RgbaImage;

    fn short_config() -> Config {
        let mut config = Config::default();
        config.capture.interval_secs = 1;
        config.capture.timeout_secs = 3;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_releases_session_and_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        let recorder = Recorder::new(paths.clone(), short_config());
        let store = recorder.store();
        let handle = store.start("t1", SessionOptions::default()).unwrap();
        let (_tx, input) = ChannelInput::new();

        let summary = recorder
            .record(
                handle,
                Box::new(|| -> crate::Result<RgbaImage> { Ok(RgbaImage::new(2, 2)) }),
                Box::new(input),
                Box::new(NoInspector),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.end_reason, EndReason::TimedOut);
        assert_eq!(summary.screenshots, 3);
        assert_eq!(store.status().unwrap(), SessionSnapshot::Idle);
        assert_eq!(read_summary(&paths.task("t1")), Some(summary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_ends_recording() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        let mut config = short_config();
        config.capture.timeout_secs = 60;
        let recorder = Recorder::new(paths, config);
        let store = recorder.store();
        let handle = store.start("t1", SessionOptions::default()).unwrap();
        let (_tx, input) = ChannelInput::new();

        let stopper = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                store.stop().unwrap();
            })
        };

        let summary = recorder
            .record(
                handle,
                Box::new(|| -> crate::Result<RgbaImage> { Ok(RgbaImage::new(2, 2)) }),
                Box::new(input),
                Box::new(NoInspector),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        stopper.await.unwrap();

        assert_eq!(summary.end_reason, EndReason::Stopped);
        // Observed at the watcher tick at t=3s
        assert!(summary.duration_secs <= 3.0 + 1e-9);
        assert!(wait_for_release(&store, Duration::from_secs(2)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_before_record_still_releases_session() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        let mut config = short_config();
        config.capture.timeout_secs = 60;
        let recorder = Recorder::new(paths, config);
        let store = recorder.store();

        // Ctrl+C lands between claiming the session and the first sample
        let interrupt = CancellationToken::new();
        let handle = store.start("t1", SessionOptions::default()).unwrap();
        interrupt.cancel();
        let (_tx, input) = ChannelInput::new();

        let summary = recorder
            .record(
                handle,
                Box::new(|| -> crate::Result<RgbaImage> { Ok(RgbaImage::new(2, 2)) }),
                Box::new(input),
                Box::new(NoInspector),
                interrupt,
            )
            .await
            .unwrap();

        assert_eq!(summary.end_reason, EndReason::Stopped);
        assert!(summary.duration_secs < 1.0);
        assert_eq!(store.status().unwrap(), SessionSnapshot::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_release_times_out_while_active() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let _handle = store.start("t1", SessionOptions::default()).unwrap();
        assert!(!wait_for_release(&store, Duration::from_secs(1)).await.unwrap());
    }
}
