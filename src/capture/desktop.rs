//! Desktop capture backends (`desktop` feature)
//!
//! Screen frames come from `xcap` (first monitor) and global input events
//! from an `rdev` hook running on its own thread.

use crate::capture::input::{InputEvent, InputReceiver, InputSource, KeyInput, TimedInput};
use crate::capture::screen::ScreenSource;
use crate::capture::types::MouseButton;
use image::RgbaImage;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Full-frame grabs of the first monitor
#[derive(Debug, Default)]
pub struct MonitorScreen;

impl ScreenSource for MonitorScreen {
    fn capture(&mut self) -> crate::Result<RgbaImage> {
        let monitor = xcap::Monitor::all()
            .map_err(|e| crate::Error::Capture(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| crate::Error::Capture("no monitor found".to_string()))?;
        monitor
            .capture_image()
            .map_err(|e| crate::Error::Capture(e.to_string()))
    }
}

/// Global keyboard/pointer hook
#[derive(Debug, Default)]
pub struct GlobalInput {
    started: bool,
}

impl InputSource for GlobalInput {
    fn listen(&mut self) -> crate::Result<InputReceiver> {
        if self.started {
            return Err(crate::Error::Capture("input hook already started".to_string()));
        }
        self.started = true;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("mimic-input-hook".to_string())
            .spawn(move || {
                let mut pointer = (0.0_f64, 0.0_f64);
                let result = rdev::listen(move |event| {
                    let input = match event.event_type {
                        rdev::EventType::MouseMove { x, y } => {
                            pointer = (x, y);
                            return;
                        }
                        rdev::EventType::ButtonPress(button) => InputEvent::Click {
                            x: pointer.0,
                            y: pointer.1,
                            button: map_button(button),
                        },
                        rdev::EventType::KeyPress(key) => {
                            InputEvent::Key(map_key(key, event.name.as_deref()))
                        }
                        _ => return,
                    };
                    // The receiver is gone once the session ends
                    let _ = tx.send(TimedInput::now(input));
                });
                if let Err(e) = result {
                    error!(error = ?e, "Input hook failed; grant Accessibility/Input Monitoring access");
                }
            })
            .map_err(|e| crate::Error::Capture(format!("failed to spawn input hook: {}", e)))?;

        info!("Global input hook started");
        Ok(rx)
    }
}

fn map_button(button: rdev::Button) -> MouseButton {
    match button {
        rdev::Button::Left => MouseButton::Left,
        rdev::Button::Right => MouseButton::Right,
        rdev::Button::Middle => MouseButton::Middle,
        rdev::Button::Unknown(_) => MouseButton::Other,
    }
}

fn map_key(key: rdev::Key, name: Option<&str>) -> KeyInput {
    match key {
        rdev::Key::Tab => return KeyInput::Named("Tab".to_string()),
        rdev::Key::Return | rdev::Key::KpReturn => return KeyInput::Named("Enter".to_string()),
        rdev::Key::Escape => return KeyInput::Named("Escape".to_string()),
        _ => {}
    }
    let mut chars = name.unwrap_or_default().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => KeyInput::Char(c),
        _ => KeyInput::Named(format!("{:?}", key)),
    }
}
