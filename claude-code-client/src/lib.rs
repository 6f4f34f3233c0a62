//! # Claude Code client SDK
//!
//! A Rust client for the Claude Code CLI. The SDK launches the CLI as a
//! child process, speaks newline-delimited JSON over its standard streams,
//! surfaces a typed conversation stream, and services the bidirectional
//! control protocol through which the CLI requests permission decisions and
//! invokes user-supplied hook callbacks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use claude_code_client::{query, Result};
//! use futures::{pin_mut, StreamExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let messages = query("What is 2 + 2?", None).await?;
//!     pin_mut!(messages);
//!
//!     while let Some(msg) = messages.next().await {
//!         println!("{:?}", msg?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Interactive sessions
//!
//! [`ClaudeSDKClient`] keeps a streaming connection open for follow-up
//! messages, interrupts, permission callbacks, and hooks:
//!
//! ```rust,no_run
//! use claude_code_client::{ClaudeCodeOptions, ClaudeSDKClient, Result};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = ClaudeSDKClient::new(ClaudeCodeOptions::default());
//!     client.connect().await?;
//!
//!     client.query("Summarize this repo", None).await?;
//!     let mut turn = client.receive_response();
//!     while let Some(msg) = turn.next().await {
//!         println!("{:?}", msg?);
//!     }
//!     drop(turn);
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod errors;
mod internal_query;
mod message_parser;
mod query;
pub mod transport;
mod types;

pub use client::{ClaudeSDKClient, ClientState};
pub use errors::{Result, SdkError};
pub use internal_query::Query;
pub use message_parser::parse_message;
pub use query::query;
pub use transport::{InputMessage, SubprocessTransport, Transport};

pub use types::{
    AssistantMessage,
    CanUseTool,
    CanUseToolRequest,
    ClaudeCodeOptions,
    ClaudeCodeOptionsBuilder,
    ContentBlock,
    HookCallback,
    HookCallbackRequest,
    HookContext,
    HookInput,
    HookMatcher,
    HookOutput,
    McpMessageRequest,
    McpServerConfig,
    McpServers,
    Message,
    OutboundControlRequest,
    PermissionBehavior,
    PermissionMode,
    PermissionResult,
    PermissionResultAllow,
    PermissionResultDeny,
    PermissionRuleValue,
    PermissionUpdate,
    PermissionUpdateDestination,
    PermissionUpdateType,
    PostToolUseHookInput,
    PreCompactHookInput,
    PreToolUseHookInput,
    StopHookInput,
    SubagentStopHookInput,
    TextContent,
    ThinkingContent,
    ToolPermissionContext,
    ToolResultContent,
    ToolUseContent,
    UserContent,
    UserMessage,
    UserPromptSubmitHookInput,
    HOOK_EVENTS,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        query, CanUseTool, ClaudeCodeOptions, ClaudeSDKClient, HookCallback, Message,
        PermissionMode, PermissionResult, Result, SdkError,
    };
}
