//! Transport layer abstractions
//!
//! This module defines the [`Transport`] trait for full-duplex
//! newline-delimited JSON communication with the Claude CLI, plus the
//! framer that assembles messages from the raw output stream.

use crate::errors::{Result, SdkError};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

pub mod mock;
pub mod subprocess;

pub use subprocess::SubprocessTransport;

/// Maximum bytes buffered while assembling a single JSON message (1 MiB)
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Input message written to the CLI stdin in streaming mode
#[derive(Debug, Clone, serde::Serialize)]
pub struct InputMessage {
    /// Message type (always "user")
    #[serde(rename = "type")]
    pub r#type: String,
    /// Message payload
    pub message: serde_json::Value,
    /// Parent tool use ID (for tool results)
    pub parent_tool_use_id: Option<String>,
    /// Session ID
    pub session_id: String,
}

impl InputMessage {
    /// Create a new user message
    pub fn user(content: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            r#type: "user".to_string(),
            message: serde_json::json!({
                "role": "user",
                "content": content.into()
            }),
            parent_tool_use_id: None,
            session_id: session_id.into(),
        }
    }
}

/// Transport trait for communicating with the Claude CLI
///
/// Implementations own the underlying channel (a subprocess, or an
/// in-memory pair for tests) and expose raw JSON envelopes; routing and
/// typed parsing happen above this layer.
#[async_trait]
pub trait Transport: Send {
    /// Launch the underlying channel and begin reading
    async fn connect(&mut self) -> Result<()>;

    /// Write one JSON message as a single newline-terminated line
    ///
    /// Rejects with a connection error when the transport is not ready or
    /// a prior exit error has been latched.
    async fn write(&mut self, data: &str) -> Result<()>;

    /// Take the inbound envelope receiver. Yields raw JSON envelopes in
    /// arrival order; the channel closes when the stream ends. Can only be
    /// taken once.
    fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<Result<Value>>>;

    /// Signal end of input by closing the write side
    async fn end_input(&mut self) -> Result<()>;

    /// Whether the transport is ready for writes
    fn is_ready(&self) -> bool;

    /// Shut the transport down. Idempotent; re-raises a latched exit error
    /// so callers observe process failure.
    async fn close(&mut self) -> Result<()>;
}

/// Transport lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Constructed, not yet connected
    New,
    /// Connected and accepting writes
    Ready,
    /// Shut down
    Closed,
}

/// Assembles newline-delimited JSON messages from the CLI output stream
///
/// A single message may arrive split across several reads; lines are
/// accumulated until they decode. The accumulator is capped at
/// [`MAX_BUFFER_SIZE`]; overflow raises a decode error and resets the
/// buffer.
#[derive(Debug, Default)]
pub struct JsonFramer {
    buffer: String,
}

impl JsonFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line from the stream
    ///
    /// Returns `Ok(Some(value))` when the accumulated input decodes to a
    /// complete JSON message, `Ok(None)` while the message is still
    /// partial, and an error on buffer overflow.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Value>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        self.buffer.push_str(line);

        if self.buffer.len() > MAX_BUFFER_SIZE {
            self.buffer.clear();
            return Err(SdkError::JsonDecodeError {
                reason: format!("message exceeded {MAX_BUFFER_SIZE} byte buffer limit"),
            });
        }

        match serde_json::from_str::<Value>(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                Ok(Some(value))
            }
            Err(_) => Ok(None),
        }
    }

    /// Bytes currently buffered
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_message_user() {
        let msg = InputMessage::user("Hello", "session-123");
        assert_eq!(msg.r#type, "user");
        assert_eq!(msg.session_id, "session-123");
        assert!(msg.parent_tool_use_id.is_none());

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"user""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn test_framer_single_line() {
        let mut framer = JsonFramer::new();
        let value = framer.push_line(r#"{"type":"system","subtype":"init"}"#).unwrap();
        assert_eq!(value, Some(json!({"type": "system", "subtype": "init"})));
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_framer_assembles_split_message() {
        let mut framer = JsonFramer::new();
        assert_eq!(framer.push_line(r#"{"type":"#).unwrap(), None);
        assert_eq!(framer.push_line(r#""user","message""#).unwrap(), None);
        let value = framer.push_line(r#":{"content":"hi"}}"#).unwrap();
        assert_eq!(
            value,
            Some(json!({"type": "user", "message": {"content": "hi"}}))
        );
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = JsonFramer::new();
        assert_eq!(framer.push_line("").unwrap(), None);
        assert_eq!(framer.push_line("   ").unwrap(), None);
        assert_eq!(framer.buffered_len(), 0);

        let value = framer.push_line(r#"{"a":1}"#).unwrap();
        assert_eq!(value, Some(json!({"a": 1})));
    }

    #[test]
    fn test_framer_overflow_resets_buffer() {
        let mut framer = JsonFramer::new();
        // An unterminated string keeps the decoder hungry until the cap.
        let chunk = format!("{{\"data\":\"{}", "x".repeat(MAX_BUFFER_SIZE));
        let err = framer.push_line(&chunk).unwrap_err();
        assert!(matches!(err, SdkError::JsonDecodeError { .. }));
        assert_eq!(framer.buffered_len(), 0);

        // The framer recovers after the reset.
        let value = framer.push_line(r#"{"ok":true}"#).unwrap();
        assert_eq!(value, Some(json!({"ok": true})));
    }

    #[test]
    fn test_framer_exactly_one_error_per_overflow() {
        let mut framer = JsonFramer::new();
        let half = format!("{{\"data\":\"{}", "y".repeat(MAX_BUFFER_SIZE / 2));
        assert_eq!(framer.push_line(&half).unwrap(), None);
        assert!(framer.buffered_len() > 0);

        let err = framer.push_line(&half).unwrap_err();
        assert!(matches!(err, SdkError::JsonDecodeError { .. }));
        assert_eq!(framer.buffered_len(), 0);
    }
}
