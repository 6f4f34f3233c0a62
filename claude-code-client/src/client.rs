//! Client façade for bidirectional communication with Claude
//!
//! [`ClaudeSDKClient`] composes a transport and the internal [`Query`]
//! control plane, manages the connect/disconnect lifecycle, and exposes the
//! typed conversation stream.

use crate::{
    errors::{Result, SdkError},
    internal_query::Query,
    transport::{subprocess::CliMode, InputMessage, SubprocessTransport, Transport},
    types::{ClaudeCodeOptions, Message},
};
use futures::stream::Stream;
use serde_json::Value as JsonValue;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Client lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not connected
    Disconnected,
    /// Connected and ready
    Connected,
}

/// Interactive client for the Claude Code CLI
///
/// Supports three connection modes:
///
/// - [`connect`](ClaudeSDKClient::connect) — streaming mode with no initial
///   input; messages are sent later with [`query`](ClaudeSDKClient::query).
/// - [`connect_with_prompt`](ClaudeSDKClient::connect_with_prompt) — one-shot
///   mode; the prompt is passed on the command line and no control protocol
///   is available.
/// - [`connect_with_stream`](ClaudeSDKClient::connect_with_stream) —
///   streaming mode fed by a caller-supplied input stream.
///
/// # Example
///
/// ```rust,no_run
/// use claude_code_client::{ClaudeCodeOptions, ClaudeSDKClient, Message, Result};
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let options = ClaudeCodeOptions::builder()
///         .model("claude-sonnet-4-5")
///         .build();
///
///     let mut client = ClaudeSDKClient::new(options);
///     client.connect().await?;
///
///     client.query("What is 2 + 2?", None).await?;
///
///     let mut messages = client.receive_response();
///     while let Some(msg) = messages.next().await {
///         println!("{:?}", msg?);
///     }
///     drop(messages);
///
///     client.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct ClaudeSDKClient {
    /// Configuration options
    options: ClaudeCodeOptions,
    /// Transport override, used instead of a subprocess when set
    custom_transport: Option<Box<dyn Transport + Send>>,
    /// Shared transport, populated while connected
    transport: Option<Arc<Mutex<Box<dyn Transport + Send>>>>,
    /// Control plane, populated while connected
    query: Option<Query>,
    /// Conversation message receiver shared across returned streams
    message_rx: Option<Arc<Mutex<mpsc::Receiver<Result<Message>>>>>,
    /// Client state
    state: ClientState,
}

impl ClaudeSDKClient {
    /// Create a new client with the given options
    pub fn new(options: ClaudeCodeOptions) -> Self {
        Self {
            options,
            custom_transport: None,
            transport: None,
            query: None,
            message_rx: None,
            state: ClientState::Disconnected,
        }
    }

    /// Create a new client with a custom transport implementation
    ///
    /// The transport replaces the default subprocess transport on the next
    /// connect. Used by tests and by callers with alternative channels to
    /// the CLI.
    pub fn with_transport(options: ClaudeCodeOptions, transport: Box<dyn Transport + Send>) -> Self {
        Self {
            options,
            custom_transport: Some(transport),
            transport: None,
            query: None,
            message_rx: None,
            state: ClientState::Disconnected,
        }
    }

    /// Connect in streaming mode with no initial input
    pub async fn connect(&mut self) -> Result<()> {
        self.connect_internal(CliMode::Streaming, None).await
    }

    /// Connect in one-shot mode with a prompt passed on the command line
    ///
    /// No control protocol is available on a one-shot connection: permission
    /// callbacks, hooks, interrupts, and input streaming all require
    /// streaming mode.
    pub async fn connect_with_prompt(&mut self, prompt: impl Into<String>) -> Result<()> {
        self.connect_internal(
            CliMode::Print {
                prompt: prompt.into(),
            },
            None,
        )
        .await
    }

    /// Connect in streaming mode fed by a caller-supplied input stream
    ///
    /// Each record is serialized as one newline-JSON line to the CLI stdin;
    /// stdin is closed when the stream completes.
    pub async fn connect_with_stream<S>(&mut self, stream: S) -> Result<()>
    where
        S: Stream<Item = JsonValue> + Send + 'static,
    {
        self.connect_internal(CliMode::Streaming, Some(Box::pin(stream)))
            .await
    }

    async fn connect_internal(
        &mut self,
        mode: CliMode,
        input: Option<Pin<Box<dyn Stream<Item = JsonValue> + Send>>>,
    ) -> Result<()> {
        if self.state == ClientState::Connected {
            debug!("Already connected; ignoring connect");
            return Ok(());
        }

        let streaming = matches!(mode, CliMode::Streaming);

        // Options validation happens before any process is launched.
        let mut effective = self.options.clone();
        if effective.can_use_tool.is_some() {
            if !streaming {
                return Err(SdkError::ConnectionError(
                    "can_use_tool callback requires streaming mode".into(),
                ));
            }
            if effective.permission_prompt_tool_name.is_some() {
                return Err(SdkError::ConnectionError(
                    "can_use_tool callback cannot be used with permission_prompt_tool_name".into(),
                ));
            }
            // Route permission prompts back over the control protocol.
            effective.permission_prompt_tool_name = Some("stdio".to_string());
        }

        let transport: Box<dyn Transport + Send> = match self.custom_transport.take() {
            Some(custom) => custom,
            None => Box::new(SubprocessTransport::new(effective.clone(), mode)?),
        };
        let transport = Arc::new(Mutex::new(transport));
        transport.lock().await.connect().await?;

        let mut query = Query::new(
            transport.clone(),
            streaming,
            effective.can_use_tool.clone(),
            effective.hooks.clone(),
        );
        query.start().await?;
        query.initialize().await?;

        let message_rx = query.take_message_receiver().ok_or_else(|| {
            SdkError::invalid_state("conversation stream already consumed")
        })?;

        if let Some(stream) = input {
            query.stream_input(stream);
        }

        self.transport = Some(transport);
        self.query = Some(query);
        self.message_rx = Some(Arc::new(Mutex::new(message_rx)));
        self.state = ClientState::Connected;

        info!("Connected to Claude CLI");
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state != ClientState::Connected {
            return Err(SdkError::invalid_state("client is not connected"));
        }
        Ok(())
    }

    /// Send a user message into the conversation
    pub async fn query(
        &mut self,
        prompt: impl Into<String>,
        session_id: Option<String>,
    ) -> Result<()> {
        self.ensure_connected()?;

        let message = InputMessage::user(
            prompt.into(),
            session_id.unwrap_or_else(|| "default".to_string()),
        );
        let line = serde_json::to_string(&message)?;

        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| SdkError::invalid_state("client is not connected"))?;
        transport.lock().await.write(&line).await
    }

    /// Receive conversation messages as a stream
    ///
    /// The stream yields messages in arrival order and ends when the
    /// connection closes. Returned streams share one underlying receiver,
    /// so consuming from two at once splits the messages between them.
    pub fn receive_messages(&mut self) -> Pin<Box<dyn Stream<Item = Result<Message>> + Send>> {
        let Some(rx) = self.message_rx.clone() else {
            return Box::pin(async_stream::stream! {
                yield Err(SdkError::invalid_state("client is not connected"));
            });
        };

        Box::pin(async_stream::stream! {
            let mut rx = rx.lock().await;
            while let Some(item) = rx.recv().await {
                yield item;
            }
        })
    }

    /// Receive messages until the current turn completes
    ///
    /// Forwards messages and ends after the first `Result` message, which
    /// closes out one conversation turn.
    pub fn receive_response(&mut self) -> Pin<Box<dyn Stream<Item = Result<Message>> + Send>> {
        let Some(rx) = self.message_rx.clone() else {
            return Box::pin(async_stream::stream! {
                yield Err(SdkError::invalid_state("client is not connected"));
            });
        };

        Box::pin(async_stream::stream! {
            let mut rx = rx.lock().await;
            while let Some(item) = rx.recv().await {
                let done = matches!(item, Ok(Message::Result { .. }) | Err(_));
                yield item;
                if done {
                    break;
                }
            }
        })
    }

    /// Interrupt the current turn
    pub async fn interrupt(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.query
            .as_ref()
            .expect("connected client has a query handler")
            .interrupt()
            .await
    }

    /// Change the permission mode for the rest of the session
    pub async fn set_permission_mode(&mut self, mode: &str) -> Result<()> {
        self.ensure_connected()?;
        self.query
            .as_ref()
            .expect("connected client has a query handler")
            .set_permission_mode(mode)
            .await
    }

    /// Server info returned by the control protocol handshake
    ///
    /// `None` before connecting and on one-shot connections.
    pub fn get_server_info(&self) -> Option<JsonValue> {
        self.query
            .as_ref()
            .and_then(|q| q.get_initialization_result().cloned())
    }

    /// Whether the client is connected
    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    /// Disconnect from the CLI
    ///
    /// Idempotent. Re-raises a latched process failure so callers observe
    /// how the CLI exited.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == ClientState::Disconnected {
            return Ok(());
        }

        self.state = ClientState::Disconnected;
        self.message_rx = None;
        self.transport = None;

        let result = match self.query.take() {
            Some(mut query) => query.close().await,
            None => Ok(()),
        };

        info!("Disconnected from Claude CLI");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::types::{PermissionResult, ToolPermissionContext};
    use async_trait::async_trait;

    struct AllowAll;

    #[async_trait]
    impl crate::types::CanUseTool for AllowAll {
        async fn can_use_tool(
            &self,
            _tool_name: &str,
            _input: &serde_json::Value,
            _context: &ToolPermissionContext,
        ) -> Result<PermissionResult> {
            Ok(PermissionResult::allow())
        }
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut client = ClaudeSDKClient::new(ClaudeCodeOptions::default());
        assert!(!client.is_connected());

        let err = client.query("hi", None).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidState { .. }));

        let err = client.interrupt().await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_can_use_tool_requires_streaming_mode() {
        let options = ClaudeCodeOptions::builder()
            .can_use_tool(Arc::new(AllowAll))
            .build();
        let (transport, _handle) = MockTransport::pair();
        let mut client = ClaudeSDKClient::with_transport(options, transport);

        let err = client.connect_with_prompt("hi").await.unwrap_err();
        assert!(matches!(err, SdkError::ConnectionError(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_can_use_tool_conflicts_with_permission_prompt_tool() {
        let options = ClaudeCodeOptions::builder()
            .can_use_tool(Arc::new(AllowAll))
            .permission_prompt_tool_name("my-tool")
            .build();
        let (transport, _handle) = MockTransport::pair();
        let mut client = ClaudeSDKClient::with_transport(options, transport);

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, SdkError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut client = ClaudeSDKClient::new(ClaudeCodeOptions::default());
        assert!(client.disconnect().await.is_ok());
        assert!(client.disconnect().await.is_ok());
    }
}
