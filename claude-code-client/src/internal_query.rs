//! Internal query implementation with control protocol support
//!
//! [`Query`] owns the transport for the duration of a connection. It
//! de-multiplexes the inbound envelope stream into conversation messages,
//! control responses, and control requests; correlates outbound control
//! requests with their responses under a timeout; and dispatches permission
//! and hook callbacks on worker tasks so they never stall the reader.

use crate::{
    errors::{Result, SdkError},
    message_parser::parse_message,
    transport::Transport,
    types::{
        CanUseTool, CanUseToolRequest, HookCallback, HookCallbackRequest, HookContext, HookInput,
        HookMatcher, McpMessageRequest, Message, OutboundControlRequest, PermissionResult,
        ToolPermissionContext,
    },
};
use futures::stream::Stream;
use futures::StreamExt;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};

/// Deadline for outbound control requests
const CONTROL_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Buffer size for the conversation message channel
const MESSAGE_CHANNEL_SIZE: usize = 100;

type PendingResponses = Arc<Mutex<HashMap<String, oneshot::Sender<JsonValue>>>>;
type HookRegistry = Arc<RwLock<HashMap<String, Arc<dyn HookCallback>>>>;
type SharedTransport = Arc<Mutex<Box<dyn Transport + Send>>>;

/// Internal query handler with control protocol support
pub struct Query {
    /// Transport layer (shared with the client)
    transport: SharedTransport,
    /// Whether the CLI was launched in streaming mode
    is_streaming_mode: bool,
    /// Tool permission callback
    can_use_tool: Option<Arc<dyn CanUseTool>>,
    /// Hook configurations, consumed during initialize
    hooks: Option<HashMap<String, Vec<HookMatcher>>>,
    /// Registered hook callbacks by minted ID
    hook_callbacks: HookRegistry,
    /// Callback ID counter
    callback_counter: AtomicU64,
    /// Request ID counter
    request_counter: AtomicU64,
    /// In-flight control requests awaiting responses
    pending_responses: PendingResponses,
    /// Conversation message sender, moved into the router task on start
    message_tx: Option<mpsc::Sender<Result<Message>>>,
    /// Conversation message receiver, taken once by the client
    message_rx: Option<mpsc::Receiver<Result<Message>>>,
    /// Initialization result from the CLI
    initialization_result: Option<JsonValue>,
    /// Router task reading the transport
    router_task: Option<JoinHandle<()>>,
    /// Input streaming task
    input_task: Option<JoinHandle<()>>,
    /// Whether close() has run
    closed: AtomicBool,
}

impl Query {
    /// Create a new query handler
    pub fn new(
        transport: SharedTransport,
        is_streaming_mode: bool,
        can_use_tool: Option<Arc<dyn CanUseTool>>,
        hooks: Option<HashMap<String, Vec<HookMatcher>>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_SIZE);

        Self {
            transport,
            is_streaming_mode,
            can_use_tool,
            hooks,
            hook_callbacks: Arc::new(RwLock::new(HashMap::new())),
            callback_counter: AtomicU64::new(0),
            request_counter: AtomicU64::new(0),
            pending_responses: Arc::new(Mutex::new(HashMap::new())),
            message_tx: Some(tx),
            message_rx: Some(rx),
            initialization_result: None,
            router_task: None,
            input_task: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Start routing the inbound envelope stream
    pub async fn start(&mut self) -> Result<()> {
        let envelope_rx = {
            let mut transport = self.transport.lock().await;
            transport.take_message_receiver()
        };
        let mut envelope_rx = envelope_rx.ok_or_else(|| {
            SdkError::ConnectionError("transport message stream already consumed".into())
        })?;

        let message_tx = self
            .message_tx
            .take()
            .ok_or_else(|| SdkError::invalid_state("query already started"))?;
        let transport = self.transport.clone();
        let can_use_tool = self.can_use_tool.clone();
        let hook_callbacks = self.hook_callbacks.clone();
        let pending_responses = self.pending_responses.clone();

        let router_task = tokio::spawn(async move {
            // Set once a parse error has closed the conversation stream;
            // control routing continues regardless.
            let mut conversation_closed = false;

            while let Some(item) = envelope_rx.recv().await {
                match item {
                    Ok(envelope) => {
                        let msg_type = envelope
                            .get("type")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default();

                        match msg_type {
                            "control_response" => {
                                Self::route_control_response(&pending_responses, &envelope).await;
                            }
                            "control_request" => {
                                let request_id =
                                    envelope.get("request_id").cloned().unwrap_or(JsonValue::Null);
                                let request =
                                    envelope.get("request").cloned().unwrap_or_else(|| json!({}));
                                let transport = transport.clone();
                                let can_use_tool = can_use_tool.clone();
                                let hook_callbacks = hook_callbacks.clone();
                                tokio::spawn(async move {
                                    Self::handle_control_request(
                                        request_id,
                                        request,
                                        transport,
                                        can_use_tool,
                                        hook_callbacks,
                                    )
                                    .await;
                                });
                            }
                            "control_cancel_request" => {
                                debug!("Ignoring control_cancel_request: {}", envelope);
                            }
                            _ => {
                                if conversation_closed {
                                    debug!("Dropping conversation message after stream error");
                                    continue;
                                }
                                match parse_message(&envelope) {
                                    Ok(message) => {
                                        let _ = message_tx.send(Ok(message)).await;
                                    }
                                    Err(e) => {
                                        warn!("Failed to parse message: {}", e);
                                        let _ = message_tx.send(Err(e)).await;
                                        conversation_closed = true;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        // Transport-level failure (framing or process exit);
                        // surfaced on the conversation stream.
                        let _ = message_tx.send(Err(e)).await;
                    }
                }
            }

            debug!("Envelope stream ended");

            // Outstanding control requests can no longer complete. Dropping
            // the senders fails each waiting caller with a closed-channel
            // connection error.
            pending_responses.lock().await.clear();
        });

        self.router_task = Some(router_task);
        Ok(())
    }

    /// Initialize the control protocol
    ///
    /// Registers hook callbacks under freshly minted IDs and performs the
    /// `initialize` handshake. A non-streaming connection skips the
    /// handshake and leaves the initialization result empty.
    pub async fn initialize(&mut self) -> Result<()> {
        if !self.is_streaming_mode {
            return Ok(());
        }

        let hooks = self.build_hooks_payload().await;
        let response = self
            .send_control_request(OutboundControlRequest::Initialize { hooks })
            .await?;
        self.initialization_result = Some(response);

        debug!("Control protocol initialized");
        Ok(())
    }

    /// Build the hooks payload, minting one callback ID per callback
    async fn build_hooks_payload(&mut self) -> Option<JsonValue> {
        let hooks = self.hooks.take()?;
        if hooks.is_empty() {
            return None;
        }

        let mut registry = self.hook_callbacks.write().await;
        let mut payload = serde_json::Map::new();

        for (event, matchers) in hooks {
            let matchers_json: Vec<JsonValue> = matchers
                .into_iter()
                .map(|matcher| {
                    let callback_ids: Vec<String> = matcher
                        .hooks
                        .into_iter()
                        .map(|callback| {
                            let id = format!(
                                "hook_{}",
                                self.callback_counter.fetch_add(1, Ordering::SeqCst)
                            );
                            registry.insert(id.clone(), callback);
                            id
                        })
                        .collect();

                    json!({
                        "matcher": matcher.matcher,
                        "hookCallbackIds": callback_ids,
                    })
                })
                .collect();

            payload.insert(event, JsonValue::Array(matchers_json));
        }

        Some(JsonValue::Object(payload))
    }

    /// Register a hook callback under a known ID
    ///
    /// Intended for tests that inject `hook_callback` control requests
    /// without running the initialize handshake.
    pub async fn register_hook_callback_for_test(
        &self,
        callback_id: String,
        callback: Arc<dyn HookCallback>,
    ) {
        self.hook_callbacks.write().await.insert(callback_id, callback);
    }

    /// Send a control request and wait for the correlated response
    pub async fn send_control_request(
        &self,
        request: OutboundControlRequest,
    ) -> Result<JsonValue> {
        if !self.is_streaming_mode {
            return Err(SdkError::ConnectionError(
                "control requests require streaming mode".into(),
            ));
        }

        let subtype = request.subtype();
        let request_id = format!(
            "req_{}_{}",
            self.request_counter.fetch_add(1, Ordering::SeqCst),
            uuid::Uuid::new_v4().simple()
        );

        let envelope = json!({
            "type": "control_request",
            "request_id": request_id,
            "request": request,
        });
        let line = serde_json::to_string(&envelope)?;

        let (tx, rx) = oneshot::channel();
        self.pending_responses
            .lock()
            .await
            .insert(request_id.clone(), tx);

        {
            let mut transport = self.transport.lock().await;
            if let Err(e) = transport.write(&line).await {
                self.pending_responses.lock().await.remove(&request_id);
                return Err(e);
            }
        }
        debug!("Sent control request {} ({})", request_id, subtype);

        match timeout(Duration::from_secs(CONTROL_REQUEST_TIMEOUT_SECS), rx).await {
            Ok(Ok(response)) => {
                if response.get("subtype").and_then(|v| v.as_str()) == Some("error") {
                    let message = response
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown control request error");
                    return Err(SdkError::ControlRequestError(message.to_string()));
                }
                Ok(response
                    .get("response")
                    .cloned()
                    .unwrap_or_else(|| json!({})))
            }
            Ok(Err(_)) => Err(SdkError::ConnectionError(
                "connection closed before control response".into(),
            )),
            Err(_) => {
                self.pending_responses.lock().await.remove(&request_id);
                Err(SdkError::ControlRequestTimeout {
                    subtype: subtype.to_string(),
                    seconds: CONTROL_REQUEST_TIMEOUT_SECS,
                })
            }
        }
    }

    /// Complete the pending slot matching an inbound control response
    async fn route_control_response(pending: &PendingResponses, envelope: &JsonValue) {
        let Some(response) = envelope.get("response") else {
            warn!("Control response missing 'response' payload: {}", envelope);
            return;
        };
        let Some(request_id) = response.get("request_id").and_then(|v| v.as_str()) else {
            warn!("Control response missing request_id: {}", envelope);
            return;
        };

        let mut pending = pending.lock().await;
        match pending.remove(request_id) {
            Some(tx) => {
                let _ = tx.send(response.clone());
                debug!("Control response delivered for {}", request_id);
            }
            None => {
                // Late arrival after a timeout already evicted the slot.
                debug!("No pending control request for {}", request_id);
            }
        }
    }

    /// Handle one inbound control request and write exactly one response
    async fn handle_control_request(
        request_id: JsonValue,
        request: JsonValue,
        transport: SharedTransport,
        can_use_tool: Option<Arc<dyn CanUseTool>>,
        hook_callbacks: HookRegistry,
    ) {
        let subtype = request
            .get("subtype")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let outcome = match subtype.as_str() {
            "can_use_tool" => Self::handle_can_use_tool(&request, can_use_tool).await,
            "hook_callback" => Self::handle_hook_callback(&request, hook_callbacks).await,
            "mcp_message" => Self::handle_mcp_message(&request),
            other => Err(format!("Unsupported control request subtype: {other}")),
        };

        let response = match outcome {
            Ok(data) => json!({
                "type": "control_response",
                "response": {
                    "subtype": "success",
                    "request_id": request_id,
                    "response": data,
                }
            }),
            Err(message) => {
                warn!("Control request '{}' failed: {}", subtype, message);
                json!({
                    "type": "control_response",
                    "response": {
                        "subtype": "error",
                        "request_id": request_id,
                        "error": message,
                    }
                })
            }
        };

        let line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize control response: {}", e);
                return;
            }
        };

        let mut transport = transport.lock().await;
        if let Err(e) = transport.write(&line).await {
            error!("Failed to send control response: {}", e);
        }
    }

    async fn handle_can_use_tool(
        request: &JsonValue,
        can_use_tool: Option<Arc<dyn CanUseTool>>,
    ) -> std::result::Result<JsonValue, String> {
        let Some(callback) = can_use_tool else {
            return Err("canUseTool callback is not provided".to_string());
        };

        let req: CanUseToolRequest = serde_json::from_value(request.clone())
            .map_err(|e| format!("Invalid can_use_tool request: {e}"))?;

        let context = ToolPermissionContext {
            signal: None,
            suggestions: req.permission_suggestions.unwrap_or_default(),
        };

        match callback
            .can_use_tool(&req.tool_name, &req.input, &context)
            .await
        {
            Ok(PermissionResult::Allow(allow)) => {
                let mut response = json!({ "allow": true });
                if let Some(input) = allow.updated_input {
                    response["input"] = input;
                }
                if let Some(permissions) = allow.updated_permissions {
                    response["updatedPermissions"] =
                        serde_json::to_value(permissions).map_err(|e| e.to_string())?;
                }
                Ok(response)
            }
            Ok(PermissionResult::Deny(deny)) => {
                let mut response = json!({ "allow": false, "reason": deny.message });
                if deny.interrupt {
                    response["interrupt"] = json!(true);
                }
                Ok(response)
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn handle_hook_callback(
        request: &JsonValue,
        hook_callbacks: HookRegistry,
    ) -> std::result::Result<JsonValue, String> {
        let req: HookCallbackRequest = serde_json::from_value(request.clone())
            .map_err(|e| format!("Invalid hook_callback request: {e}"))?;

        let callback = {
            let registry = hook_callbacks.read().await;
            registry.get(&req.callback_id).cloned()
        };
        let Some(callback) = callback else {
            return Err(format!("No hook callback found for ID: {}", req.callback_id));
        };

        let input: HookInput = serde_json::from_value(req.input.clone())
            .map_err(|e| format!("Invalid hook input: {e}"))?;
        let context = HookContext { signal: None };

        match callback
            .execute(&input, req.tool_use_id.as_deref(), &context)
            .await
        {
            Ok(output) => serde_json::to_value(output).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn handle_mcp_message(request: &JsonValue) -> std::result::Result<JsonValue, String> {
        let req: McpMessageRequest = serde_json::from_value(request.clone())
            .map_err(|e| format!("Invalid mcp_message request: {e}"))?;

        // In-process MCP servers are not supported; answer with the
        // JSON-RPC method-not-found error so the CLI can fail the call.
        let id = req.message.get("id").cloned().unwrap_or(JsonValue::Null);
        Ok(json!({
            "mcp_response": {
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": -32601,
                    "message": format!(
                        "SDK MCP servers are not supported by this client (server: {})",
                        req.server_name
                    ),
                }
            }
        }))
    }

    /// Stream caller-supplied input records to the CLI stdin
    ///
    /// Each record is serialized as one newline-JSON line; stdin is closed
    /// when the stream completes. A write failure cancels the stream.
    pub fn stream_input<S>(&mut self, input_stream: S)
    where
        S: Stream<Item = JsonValue> + Send + 'static,
    {
        let transport = self.transport.clone();

        let task = tokio::spawn(async move {
            let mut stream = Box::pin(input_stream);

            while let Some(value) = stream.next().await {
                let line = match serde_json::to_string(&value) {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to serialize input record: {}", e);
                        break;
                    }
                };
                let mut guard = transport.lock().await;
                if let Err(e) = guard.write(&line).await {
                    error!("Failed to write input record: {}", e);
                    break;
                }
            }

            let mut guard = transport.lock().await;
            if let Err(e) = guard.end_input().await {
                warn!("Failed to close input stream: {}", e);
            }
        });

        self.input_task = Some(task);
    }

    /// Take the conversation message receiver. Can only be taken once.
    pub fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<Result<Message>>> {
        self.message_rx.take()
    }

    /// Send an interrupt request
    pub async fn interrupt(&self) -> Result<()> {
        self.send_control_request(OutboundControlRequest::Interrupt)
            .await?;
        Ok(())
    }

    /// Change the permission mode via the control protocol
    pub async fn set_permission_mode(&self, mode: &str) -> Result<()> {
        self.send_control_request(OutboundControlRequest::SetPermissionMode {
            mode: mode.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Initialization result from the CLI, if the handshake ran
    pub fn get_initialization_result(&self) -> Option<&JsonValue> {
        self.initialization_result.as_ref()
    }

    /// Shut the control plane down. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.router_task.take() {
            task.abort();
        }
        if let Some(task) = self.input_task.take() {
            task.abort();
        }

        // Fail outstanding control requests rather than leaking them.
        self.pending_responses.lock().await.clear();

        let mut transport = self.transport.lock().await;
        transport.close().await
    }
}
