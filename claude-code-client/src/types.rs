//! Type definitions for the Claude Code client SDK
//!
//! This module contains the option types handed to the transport, the typed
//! conversation messages parsed from the CLI output stream, and the payload
//! types of the bidirectional control protocol (permissions, hooks, MCP
//! passthrough).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::Result;

/// Permission modes for tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Default permission handling
    Default,
    /// Automatically accept file edits
    AcceptEdits,
    /// Plan mode, no execution
    Plan,
    /// Bypass all permission checks
    BypassPermissions,
}

impl PermissionMode {
    /// CLI flag value for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// MCP server configuration
///
/// Serialized into the `--mcp-config` JSON payload. In-process SDK servers
/// are not supported by this SDK, so a server config never carries an
/// `instance` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpServerConfig {
    /// Stdio-based MCP server launched as a subprocess
    Stdio {
        /// Command to execute
        command: String,
        /// Command arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        /// Environment variables for the server process
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    /// Server-sent-events MCP server
    Sse {
        /// Server URL
        url: String,
        /// Additional headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// HTTP-based MCP server
    Http {
        /// Server URL
        url: String,
        /// Additional headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
}

/// MCP server set handed to the CLI
#[derive(Debug, Clone, PartialEq)]
pub enum McpServers {
    /// Named server configurations, serialized as `{"mcpServers": {...}}`
    Map(HashMap<String, McpServerConfig>),
    /// Raw JSON string or config file path, passed through untouched
    Raw(String),
}

impl Default for McpServers {
    fn default() -> Self {
        McpServers::Map(HashMap::new())
    }
}

impl McpServers {
    /// Whether any server configuration is present
    pub fn is_empty(&self) -> bool {
        match self {
            McpServers::Map(map) => map.is_empty(),
            McpServers::Raw(raw) => raw.trim().is_empty(),
        }
    }
}

// ============================================================================
// Permission types
// ============================================================================

/// Permission update destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionUpdateDestination {
    /// User settings
    UserSettings,
    /// Project settings
    ProjectSettings,
    /// Local settings
    LocalSettings,
    /// Session
    Session,
}

/// Permission behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionBehavior {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
    /// Ask the user
    Ask,
}

/// Permission rule value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionRuleValue {
    /// Tool name
    pub tool_name: String,
    /// Rule content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_content: Option<String>,
}

/// Permission update type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionUpdateType {
    /// Add rules
    AddRules,
    /// Replace rules
    ReplaceRules,
    /// Remove rules
    RemoveRules,
    /// Set mode
    SetMode,
    /// Add directories
    AddDirectories,
    /// Remove directories
    RemoveDirectories,
}

/// Permission update suggested by the CLI or returned by a callback
///
/// The SDK does not interpret these; they travel through the control
/// protocol verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdate {
    /// Update type
    #[serde(rename = "type")]
    pub update_type: PermissionUpdateType,
    /// Rules to update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<PermissionRuleValue>>,
    /// Behavior to set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<PermissionBehavior>,
    /// Mode to set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<PermissionMode>,
    /// Directories to add/remove
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories: Option<Vec<String>>,
    /// Destination for the update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PermissionUpdateDestination>,
}

/// Context passed to the tool permission callback
#[derive(Clone, Default)]
pub struct ToolPermissionContext {
    /// Cancellation signal. Reserved: the current CLI never fires it.
    pub signal: Option<Arc<dyn std::any::Any + Send + Sync>>,
    /// Permission suggestions from the CLI
    pub suggestions: Vec<PermissionUpdate>,
}

impl std::fmt::Debug for ToolPermissionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolPermissionContext")
            .field("signal", &self.signal.is_some())
            .field("suggestions", &self.suggestions)
            .finish()
    }
}

/// Permission result - Allow
#[derive(Debug, Clone, Default)]
pub struct PermissionResultAllow {
    /// Updated input parameters to run the tool with
    pub updated_input: Option<serde_json::Value>,
    /// Updated permissions
    pub updated_permissions: Option<Vec<PermissionUpdate>>,
}

/// Permission result - Deny
#[derive(Debug, Clone)]
pub struct PermissionResultDeny {
    /// Denial message
    pub message: String,
    /// Whether to interrupt the conversation
    pub interrupt: bool,
}

/// Decision returned by a tool permission callback
#[derive(Debug, Clone)]
pub enum PermissionResult {
    /// Allow the tool use
    Allow(PermissionResultAllow),
    /// Deny the tool use
    Deny(PermissionResultDeny),
}

impl PermissionResult {
    /// Allow without modifying the input
    pub fn allow() -> Self {
        PermissionResult::Allow(PermissionResultAllow::default())
    }

    /// Deny with a message
    pub fn deny(message: impl Into<String>) -> Self {
        PermissionResult::Deny(PermissionResultDeny {
            message: message.into(),
            interrupt: false,
        })
    }
}

/// Tool permission callback trait
///
/// Consulted by the CLI before tool execution when the permission prompt
/// tool is routed over the control protocol. Returning `Err` reports the
/// failure back to the CLI as a control error response.
#[async_trait]
pub trait CanUseTool: Send + Sync {
    /// Decide whether a tool invocation may proceed
    async fn can_use_tool(
        &self,
        tool_name: &str,
        input: &serde_json::Value,
        context: &ToolPermissionContext,
    ) -> Result<PermissionResult>;
}

// ============================================================================
// Hook types
// ============================================================================

/// Context passed to hook callbacks
#[derive(Clone, Default)]
pub struct HookContext {
    /// Cancellation signal. Reserved: the current CLI never fires it.
    pub signal: Option<Arc<dyn std::any::Any + Send + Sync>>,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("signal", &self.signal.is_some())
            .finish()
    }
}

/// Input data for PreToolUse hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolUseHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Name of the tool being used
    pub tool_name: String,
    /// Input parameters for the tool
    pub tool_input: serde_json::Value,
}

/// Input data for PostToolUse hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUseHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Name of the tool that was used
    pub tool_name: String,
    /// Input parameters that were passed to the tool
    pub tool_input: serde_json::Value,
    /// Response from the tool execution
    pub tool_response: serde_json::Value,
}

/// Input data for UserPromptSubmit hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptSubmitHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// The prompt submitted by the user
    pub prompt: String,
}

/// Input data for Stop hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Whether a stop hook is already active
    pub stop_hook_active: bool,
}

/// Input data for SubagentStop hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentStopHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Whether a stop hook is already active
    pub stop_hook_active: bool,
}

/// Input data for PreCompact hook events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCompactHookInput {
    /// Session ID for this conversation
    pub session_id: String,
    /// Path to the transcript file
    pub transcript_path: String,
    /// Current working directory
    pub cwd: String,
    /// Permission mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// Trigger type: "manual" or "auto"
    pub trigger: String,
    /// Custom instructions for compaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

/// Union of all hook inputs, discriminated by `hook_event_name`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    /// PreToolUse hook input
    PreToolUse(PreToolUseHookInput),
    /// PostToolUse hook input
    PostToolUse(PostToolUseHookInput),
    /// UserPromptSubmit hook input
    UserPromptSubmit(UserPromptSubmitHookInput),
    /// Stop hook input
    Stop(StopHookInput),
    /// SubagentStop hook input
    SubagentStop(SubagentStopHookInput),
    /// PreCompact hook input
    PreCompact(PreCompactHookInput),
}

/// Output returned by a hook callback
///
/// Only the fields the callback actually set are serialized into the
/// control response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HookOutput {
    /// Set to "block" to indicate blocking behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    /// Message displayed to the user
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Event-specific output (e.g. permissionDecision for PreToolUse)
    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<serde_json::Value>,
}

/// Hook callback trait
///
/// Invoked by the CLI at the lifecycle event the matcher was registered
/// for. Returning `Err` reports the failure back to the CLI as a control
/// error response.
#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Execute the hook
    async fn execute(
        &self,
        input: &HookInput,
        tool_use_id: Option<&str>,
        context: &HookContext,
    ) -> Result<HookOutput>;
}

/// Hook matcher configuration
#[derive(Clone)]
pub struct HookMatcher {
    /// Matcher criteria (e.g. a tool name for PreToolUse)
    pub matcher: Option<String>,
    /// Callbacks to invoke when the matcher fires
    pub hooks: Vec<Arc<dyn HookCallback>>,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Hook event names accepted in the `initialize` payload
pub const HOOK_EVENTS: &[&str] = &[
    "PreToolUse",
    "PostToolUse",
    "UserPromptSubmit",
    "Stop",
    "SubagentStop",
    "PreCompact",
];

// ============================================================================
// Configuration options
// ============================================================================

/// Configuration options for the Claude Code client
#[derive(Clone, Default)]
pub struct ClaudeCodeOptions {
    /// System prompt replacing the default
    pub system_prompt: Option<String>,
    /// Additional system prompt appended to the default
    pub append_system_prompt: Option<String>,
    /// Tool invocations that bypass permission prompts
    pub allowed_tools: Vec<String>,
    /// Tools that are completely disabled
    pub disallowed_tools: Vec<String>,
    /// Permission mode for tool execution
    pub permission_mode: Option<PermissionMode>,
    /// MCP server configurations
    pub mcp_servers: McpServers,
    /// Maximum number of conversation turns
    pub max_turns: Option<i32>,
    /// Model to use
    pub model: Option<String>,
    /// Name of the tool the CLI consults for permission prompts
    pub permission_prompt_tool_name: Option<String>,
    /// Continue the most recent conversation
    pub continue_conversation: bool,
    /// Resume from a specific conversation ID
    pub resume: Option<String>,
    /// Settings JSON or settings file path
    pub settings: Option<String>,
    /// Additional directories the CLI may access
    pub add_dirs: Vec<PathBuf>,
    /// Extra arbitrary CLI flags
    pub extra_args: HashMap<String, Option<String>>,
    /// Environment variables overlaid on the child process
    pub env: HashMap<String, String>,
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Value exported as `USER` to the child process
    pub user: Option<String>,
    /// Explicit CLI binary path, bypassing discovery
    pub cli_path: Option<PathBuf>,
    /// Tool permission callback (requires streaming mode)
    pub can_use_tool: Option<Arc<dyn CanUseTool>>,
    /// Hook configurations keyed by event name
    pub hooks: Option<HashMap<String, Vec<HookMatcher>>>,
}

impl std::fmt::Debug for ClaudeCodeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeCodeOptions")
            .field("system_prompt", &self.system_prompt)
            .field("append_system_prompt", &self.append_system_prompt)
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("permission_mode", &self.permission_mode)
            .field("mcp_servers", &self.mcp_servers)
            .field("max_turns", &self.max_turns)
            .field("model", &self.model)
            .field(
                "permission_prompt_tool_name",
                &self.permission_prompt_tool_name,
            )
            .field("continue_conversation", &self.continue_conversation)
            .field("resume", &self.resume)
            .field("settings", &self.settings)
            .field("add_dirs", &self.add_dirs)
            .field("extra_args", &self.extra_args)
            .field("env", &self.env)
            .field("cwd", &self.cwd)
            .field("user", &self.user)
            .field("cli_path", &self.cli_path)
            .field("can_use_tool", &self.can_use_tool.is_some())
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl ClaudeCodeOptions {
    /// Create a new options builder
    pub fn builder() -> ClaudeCodeOptionsBuilder {
        ClaudeCodeOptionsBuilder::default()
    }
}

/// Builder for [`ClaudeCodeOptions`]
#[derive(Debug, Default)]
pub struct ClaudeCodeOptionsBuilder {
    options: ClaudeCodeOptions,
}

impl ClaudeCodeOptionsBuilder {
    /// Set system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    /// Set append system prompt
    pub fn append_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.append_system_prompt = Some(prompt.into());
        self
    }

    /// Set allowed tools
    pub fn allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.options.allowed_tools = tools;
        self
    }

    /// Add a single allowed tool
    pub fn allow_tool(mut self, tool: impl Into<String>) -> Self {
        self.options.allowed_tools.push(tool.into());
        self
    }

    /// Set disallowed tools
    pub fn disallowed_tools(mut self, tools: Vec<String>) -> Self {
        self.options.disallowed_tools = tools;
        self
    }

    /// Set permission mode
    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = Some(mode);
        self
    }

    /// Add an MCP server configuration
    pub fn add_mcp_server(mut self, name: impl Into<String>, config: McpServerConfig) -> Self {
        match &mut self.options.mcp_servers {
            McpServers::Map(map) => {
                map.insert(name.into(), config);
            }
            raw @ McpServers::Raw(_) => {
                let mut map = HashMap::new();
                map.insert(name.into(), config);
                *raw = McpServers::Map(map);
            }
        }
        self
    }

    /// Set MCP servers from a raw JSON string or config file path
    pub fn mcp_config(mut self, raw: impl Into<String>) -> Self {
        self.options.mcp_servers = McpServers::Raw(raw.into());
        self
    }

    /// Set maximum conversation turns
    pub fn max_turns(mut self, turns: i32) -> Self {
        self.options.max_turns = Some(turns);
        self
    }

    /// Set model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Set permission prompt tool name
    pub fn permission_prompt_tool_name(mut self, name: impl Into<String>) -> Self {
        self.options.permission_prompt_tool_name = Some(name.into());
        self
    }

    /// Continue the most recent conversation
    pub fn continue_conversation(mut self, value: bool) -> Self {
        self.options.continue_conversation = value;
        self
    }

    /// Resume from a conversation ID
    pub fn resume(mut self, id: impl Into<String>) -> Self {
        self.options.resume = Some(id.into());
        self
    }

    /// Set settings JSON or settings file path
    pub fn settings(mut self, settings: impl Into<String>) -> Self {
        self.options.settings = Some(settings.into());
        self
    }

    /// Add an additional directory
    pub fn add_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.add_dirs.push(dir.into());
        self
    }

    /// Add an extra CLI flag
    pub fn add_extra_arg(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.options.extra_args.insert(key.into(), value);
        self
    }

    /// Add an environment variable for the child process
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Set working directory
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(path.into());
        self
    }

    /// Set the `USER` environment variable for the child process
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.options.user = Some(user.into());
        self
    }

    /// Set an explicit CLI binary path
    pub fn cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cli_path = Some(path.into());
        self
    }

    /// Set the tool permission callback
    pub fn can_use_tool(mut self, callback: Arc<dyn CanUseTool>) -> Self {
        self.options.can_use_tool = Some(callback);
        self
    }

    /// Set hook configurations
    pub fn hooks(mut self, hooks: HashMap<String, Vec<HookMatcher>>) -> Self {
        self.options.hooks = Some(hooks);
        self
    }

    /// Build the options
    pub fn build(self) -> ClaudeCodeOptions {
        self.options
    }
}

// ============================================================================
// Conversation messages
// ============================================================================

/// Typed conversation message surfaced to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// User message
    User {
        /// Message content
        message: UserMessage,
    },
    /// Assistant message
    Assistant {
        /// Message content
        message: AssistantMessage,
    },
    /// System message
    System {
        /// Subtype of system message
        subtype: String,
        /// Complete envelope, retained verbatim
        data: serde_json::Value,
    },
    /// Result message indicating end of turn
    Result {
        /// Result subtype
        subtype: String,
        /// Duration in milliseconds
        duration_ms: i64,
        /// API duration in milliseconds
        duration_api_ms: i64,
        /// Whether an error occurred
        is_error: bool,
        /// Number of turns
        num_turns: i32,
        /// Session ID
        session_id: String,
        /// Total cost in USD
        #[serde(skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        /// Usage statistics
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<serde_json::Value>,
        /// Result text
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
}

/// User message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessage {
    /// Message content, either plain text or content blocks
    pub content: UserContent,
}

/// User content, either a bare string or ordered content blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain text prompt
    Text(String),
    /// Content blocks (e.g. tool results echoed back by the CLI)
    Blocks(Vec<ContentBlock>),
}

/// Assistant message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    /// Content blocks
    pub content: Vec<ContentBlock>,
    /// Model that produced the message
    pub model: String,
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text(TextContent),
    /// Thinking content
    Thinking(ThinkingContent),
    /// Tool use request
    ToolUse(ToolUseContent),
    /// Tool result
    ToolResult(ToolResultContent),
}

/// Text content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    /// Text content
    pub text: String,
}

/// Thinking content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThinkingContent {
    /// Thinking content
    pub thinking: String,
    /// Signature
    pub signature: String,
}

/// Tool use content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUseContent {
    /// Tool use ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input parameters
    pub input: serde_json::Value,
}

/// Tool result content block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultContent {
    /// Tool use ID this result corresponds to
    pub tool_use_id: String,
    /// Result content, arbitrary JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    /// Whether this is an error result. Absent on the wire stays absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

// ============================================================================
// Control protocol payloads
// ============================================================================

/// Control request sent from the SDK to the CLI
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum OutboundControlRequest {
    /// Control protocol handshake carrying the hook registration payload
    Initialize {
        /// Hook matchers per event, with minted callback IDs
        #[serde(skip_serializing_if = "Option::is_none")]
        hooks: Option<serde_json::Value>,
    },
    /// Interrupt the current turn
    Interrupt,
    /// Change the permission mode
    SetPermissionMode {
        /// New permission mode
        mode: String,
    },
}

impl OutboundControlRequest {
    /// Subtype string used on the wire and in timeout errors
    pub fn subtype(&self) -> &'static str {
        match self {
            OutboundControlRequest::Initialize { .. } => "initialize",
            OutboundControlRequest::Interrupt => "interrupt",
            OutboundControlRequest::SetPermissionMode { .. } => "set_permission_mode",
        }
    }
}

/// Inbound `can_use_tool` control request payload
#[derive(Debug, Clone, Deserialize)]
pub struct CanUseToolRequest {
    /// Tool name
    #[serde(alias = "toolName")]
    pub tool_name: String,
    /// Tool input
    pub input: serde_json::Value,
    /// Permission suggestions from the CLI
    #[serde(default, alias = "permissionSuggestions")]
    pub permission_suggestions: Option<Vec<PermissionUpdate>>,
}

/// Inbound `hook_callback` control request payload
#[derive(Debug, Clone, Deserialize)]
pub struct HookCallbackRequest {
    /// Callback ID minted during initialization
    #[serde(alias = "callbackId")]
    pub callback_id: String,
    /// Hook input data
    pub input: serde_json::Value,
    /// Tool use ID, when the event concerns a tool
    #[serde(default, alias = "toolUseId")]
    pub tool_use_id: Option<String>,
}

/// Inbound `mcp_message` control request payload
#[derive(Debug, Clone, Deserialize)]
pub struct McpMessageRequest {
    /// MCP server name
    #[serde(alias = "serverName")]
    pub server_name: String,
    /// JSON-RPC message to forward
    pub message: serde_json::Value,
}
