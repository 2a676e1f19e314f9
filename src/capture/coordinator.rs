//! Capture coordinator
//!
//! Runs the screen sampler and the input listener as two tokio tasks sharing
//! a [`CancellationToken`]. The session ends when the token is cancelled (stop
//! request, Ctrl+C) or the timeout elapses, whichever comes first.

use crate::app::config::CaptureConfig;
use crate::app::paths::{write_atomic, TaskLayout};
use crate::capture::action_log::ActionLog;
use crate::capture::input::{InputEvent, InputReceiver, InputSource, TimedInput};
use crate::capture::redaction::Redactor;
use crate::capture::screen::{save_frame, ScreenSampler, ScreenSource};
use crate::capture::types::{EndReason, SessionSummary};
use crate::session::SessionStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Timing and storage parameters for one capture run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub checkpoint_every: usize,
    pub privacy_blur: bool,
}

impl CaptureSettings {
    pub fn from_config(config: &CaptureConfig, privacy_blur: bool) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
            checkpoint_every: config.checkpoint_every,
            privacy_blur,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default(), false)
    }
}

/// Drives one recording from first sample to flushed artifacts
pub struct CaptureCoordinator {
    task_name: String,
    layout: TaskLayout,
    settings: CaptureSettings,
    token: CancellationToken,
}

impl CaptureCoordinator {
    pub fn new(task_name: impl Into<String>, layout: TaskLayout, settings: CaptureSettings) -> Self {
        Self {
            task_name: task_name.into(),
            layout,
            settings,
            token: CancellationToken::new(),
        }
    }

    /// End the capture when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Token that ends the capture when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Record until stopped or timed out, then flush everything to disk
    pub async fn run(
        self,
        screen: Box<dyn ScreenSource>,
        input: &mut dyn InputSource,
        redactor: Redactor,
    ) -> crate::Result<SessionSummary> {
        let rx = input.listen()?;
        std::fs::create_dir_all(self.layout.screenshots_dir())?;

        let start = Instant::now();
        let deadline = start + self.settings.timeout;
        info!(
            task = %self.task_name,
            interval_secs = self.settings.interval.as_secs_f64(),
            timeout_secs = self.settings.timeout.as_secs_f64(),
            "Capture started"
        );

        let sampler = ScreenSampler::new(self.layout.clone(), self.settings.privacy_blur);
        let sampler_task = tokio::spawn(run_sampler(
            sampler,
            screen,
            start,
            deadline,
            self.settings.interval,
            self.token.clone(),
        ));

        let log = ActionLog::new(self.layout.actions_file(), self.settings.checkpoint_every);
        let listener_task = tokio::spawn(run_listener(
            log,
            rx,
            redactor,
            start,
            deadline,
            self.token.clone(),
        ));

        let end_reason = tokio::select! {
            _ = self.token.cancelled() => EndReason::Stopped,
            _ = time::sleep_until(deadline) => {
                self.token.cancel();
                EndReason::TimedOut
            }
        };
        let duration = Instant::now()
            .saturating_duration_since(start)
            .min(self.settings.timeout);
        info!(task = %self.task_name, reason = ?end_reason, "Capture ending");

        let sampler = sampler_task
            .await
            .map_err(|e| crate::Error::Capture(format!("sampler task failed: {}", e)))?;
        let log = listener_task
            .await
            .map_err(|e| crate::Error::Capture(format!("listener task failed: {}", e)))?;

        let screenshots = sampler.finish()?;
        let actions = log.flush()?;

        let summary = SessionSummary {
            task_name: self.task_name.clone(),
            screenshots: screenshots.len(),
            actions: actions.len(),
            duration_secs: duration.as_secs_f64(),
            end_reason,
        };
        write_atomic(&self.layout.summary_file(), &serde_json::to_vec_pretty(&summary)?)?;

        info!(
            task = %summary.task_name,
            screenshots = summary.screenshots,
            actions = summary.actions,
            "Capture finished"
        );
        Ok(summary)
    }
}

async fn run_sampler(
    mut sampler: ScreenSampler,
    mut source: Box<dyn ScreenSource>,
    start: Instant,
    deadline: Instant,
    interval: Duration,
    token: CancellationToken,
) -> ScreenSampler {
    let mut ticker = time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let tick = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            tick = ticker.tick() => tick,
        };
        if tick >= deadline {
            break;
        }

        let t_offset = tick.saturating_duration_since(start).as_secs_f64();
        let path = sampler.next_path();
        let blur = sampler.privacy_blur();
        let target = path.clone();

        // Grabbing and encoding a frame is blocking work
        let outcome = tokio::task::spawn_blocking(move || {
            let result = source
                .capture()
                .and_then(|frame| save_frame(frame, blur, &target));
            (source, result)
        })
        .await;

        match outcome {
            Ok((returned, Ok(()))) => {
                source = returned;
                sampler.push(path, t_offset);
            }
            Ok((returned, Err(e))) => {
                source = returned;
                warn!(error = %e, t_offset, "Screenshot failed; skipping sample");
            }
            Err(e) => {
                warn!(error = %e, "Screen source panicked; sampling stopped");
                break;
            }
        }
    }

    debug!(count = sampler.records().len(), "Sampler stopped");
    sampler
}

async fn run_listener(
    mut log: ActionLog,
    mut rx: InputReceiver,
    mut redactor: Redactor,
    start: Instant,
    deadline: Instant,
    token: CancellationToken,
) -> ActionLog {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                // Keep what was captured before the stop was observed
                while let Ok(input) = rx.try_recv() {
                    record_input(&mut log, &mut redactor, input, start, deadline);
                }
                break;
            }
            input = rx.recv() => match input {
                Some(input) => record_input(&mut log, &mut redactor, input, start, deadline),
                None => {
                    debug!("Input source closed");
                    token.cancelled().await;
                    break;
                }
            },
        }
    }

    debug!(count = log.len(), "Listener stopped");
    log
}

fn record_input(
    log: &mut ActionLog,
    redactor: &mut Redactor,
    input: TimedInput,
    start: Instant,
    deadline: Instant,
) {
    if input.at >= deadline {
        return;
    }
    let t_offset = input.at.saturating_duration_since(start).as_secs_f64();
    let event = match input.event {
        InputEvent::Click { x, y, button } => redactor.on_click(x, y, button, t_offset),
        InputEvent::Key(key) => redactor.on_key(key, t_offset),
    };
    debug!(t_offset, click = event.is_click(), "Action recorded");
    log.append(event);
}

/// Poll the session store once per interval and cancel `token` when the
/// session owned by `id` is asked to stop.
pub fn spawn_stop_watcher(
    store: SessionStore,
    id: Uuid,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if store.stop_requested(id) {
                        info!("Stop request observed");
                        token.cancel();
                        break;
                    }
                }
            }
        }
    })
}
