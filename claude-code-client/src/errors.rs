//! Error types for the Claude Code client SDK
//!
//! Every failure the SDK can surface is a variant of [`SdkError`]. The
//! variants map onto the layers of the SDK: CLI discovery, transport and
//! process supervision, wire framing, message parsing, and the control
//! protocol.

use thiserror::Error;

/// Main error type for the Claude Code client SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// Claude CLI executable was not found
    #[error(
        "Claude CLI not found. Install with: npm install -g @anthropic-ai/claude-code\n\nSearched in:\n{searched_paths}"
    )]
    CliNotFound {
        /// Paths that were searched for the CLI
        searched_paths: String,
    },

    /// Claude CLI was not found and neither was a Node.js runtime
    #[error(
        "Node.js is required to run the Claude CLI but was not found on PATH.\nInstall Node.js from https://nodejs.org/, then install the CLI with: npm install -g @anthropic-ai/claude-code\n\nSearched in:\n{searched_paths}"
    )]
    NodeNotFound {
        /// Paths that were searched for the CLI
        searched_paths: String,
    },

    /// Transport is not ready, a write failed, or options were invalid
    #[error("Failed to connect to Claude CLI: {0}")]
    ConnectionError(String),

    /// The CLI answered a control request with an error response
    #[error("Control request failed: {0}")]
    ControlRequestError(String),

    /// A control request received no response within the deadline
    #[error("Control request '{subtype}' timed out after {seconds} seconds")]
    ControlRequestTimeout {
        /// Subtype of the request that timed out
        subtype: String,
        /// Seconds waited before giving up
        seconds: u64,
    },

    /// Process-related I/O errors
    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    /// The CLI process exited with a non-zero status
    #[error("Claude CLI exited with code {exit_code:?}: {stderr}")]
    ProcessFailed {
        /// Exit code if available
        exit_code: Option<i32>,
        /// Captured stderr output
        stderr: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CLI output could not be framed into a JSON message
    #[error("Failed to decode JSON from CLI output: {reason}")]
    JsonDecodeError {
        /// What went wrong while framing
        reason: String,
    },

    /// Typed-message parsing rejected an envelope
    #[error("Failed to parse message: {error}\nRaw message: {raw}")]
    MessageParseError {
        /// Parse error description
        error: String,
        /// Raw message that failed to parse
        raw: String,
    },

    /// Invalid state transition
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// Create a new MessageParseError
    pub fn parse_error(error: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MessageParseError {
            error: error.into(),
            raw: raw.into(),
        }
    }

    /// Create a new InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if the error is a configuration or installation issue
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::CliNotFound { .. } | Self::NodeNotFound { .. } | Self::ConfigError(_)
        )
    }
}
