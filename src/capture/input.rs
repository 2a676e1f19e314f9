//! Input event intake
//!
//! An [`InputSource`] delivers pointer and keyboard events over a channel.
//! Every event is stamped with its capture instant by the source so offsets
//! stay accurate even when the listener task is busy.

use crate::capture::types::MouseButton;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A key as reported by the platform hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// A printable character
    Char(char),
    /// A named key such as `Enter`, `Tab` or `Backspace`
    Named(String),
}

impl KeyInput {
    /// Named keys that move focus away from the current field
    pub fn leaves_field(&self) -> bool {
        match self {
            KeyInput::Named(name) => matches!(
                name.to_ascii_lowercase().as_str(),
                "tab" | "enter" | "return" | "escape"
            ),
            KeyInput::Char(_) => false,
        }
    }
}

/// Pointer or keyboard event
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Click { x: f64, y: f64, button: MouseButton },
    Key(KeyInput),
}

/// An event with the instant it was captured
#[derive(Debug, Clone, PartialEq)]
pub struct TimedInput {
    pub at: Instant,
    pub event: InputEvent,
}

impl TimedInput {
    /// Stamp an event with the current instant
    pub fn now(event: InputEvent) -> Self {
        Self { at: Instant::now(), event }
    }
}

/// Receiving end of an input stream
pub type InputReceiver = mpsc::UnboundedReceiver<TimedInput>;

/// Sending end of an input stream
pub type InputSender = mpsc::UnboundedSender<TimedInput>;

/// Platform hook delivering pointer and keyboard events
pub trait InputSource: Send {
    /// Begin listening. Events flow until the receiver is dropped.
    fn listen(&mut self) -> crate::Result<InputReceiver>;
}

/// Input source fed by hand, used for scripted sessions and tests
#[derive(Debug)]
pub struct ChannelInput {
    receiver: Option<InputReceiver>,
}

impl ChannelInput {
    /// Create the source and the sender that feeds it
    pub fn new() -> (InputSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { receiver: Some(rx) })
    }
}

impl InputSource for ChannelInput {
    fn listen(&mut self) -> crate::Result<InputReceiver> {
        self.receiver
            .take()
            .ok_or_else(|| crate::Error::Capture("input source already started".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_field() {
        assert!(KeyInput::Named("Tab".into()).leaves_field());
        assert!(KeyInput::Named("Enter".into()).leaves_field());
        assert!(KeyInput::Named("escape".into()).leaves_field());
        assert!(!KeyInput::Named("Backspace".into()).leaves_field());
        assert!(!KeyInput::Char('\t').leaves_field());
    }

    #[tokio::test]
    async fn test_channel_input_delivers_events() {
        let (tx, mut source) = ChannelInput::new();
        let mut rx = source.listen().unwrap();
        tx.send(TimedInput::now(InputEvent::Key(KeyInput::Char('a')))).unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.event, InputEvent::Key(KeyInput::Char('a')));
    }

    #[test]
    fn test_channel_input_listens_once() {
        let (_tx, mut source) = ChannelInput::new();
        assert!(source.listen().is_ok());
        assert!(source.listen().is_err());
    }
}
