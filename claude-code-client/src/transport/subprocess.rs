//! Subprocess-based transport implementation
//!
//! Launches the Claude CLI as a child process and speaks newline-delimited
//! JSON over its standard streams. One dedicated task reads stdout through
//! the [`JsonFramer`]; stderr is drained into a capture buffer used for
//! process-failure diagnostics.

use super::{JsonFramer, Transport, TransportState};
use crate::{
    errors::{Result, SdkError},
    types::{ClaudeCodeOptions, McpServers},
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Buffer size for the inbound envelope channel
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Environment variable overriding CLI discovery
pub const CLI_PATH_ENV: &str = "CLAUDE_CODE_CLI_PATH";

/// Value exported as `CLAUDE_CODE_ENTRYPOINT` on the child process
const SDK_ENTRYPOINT: &str = "sdk-rust";

/// How the CLI is launched
#[derive(Debug, Clone, PartialEq)]
pub enum CliMode {
    /// Bidirectional streaming: `--input-format stream-json`
    Streaming,
    /// One-shot: `--print -- <prompt>`, no control protocol
    Print {
        /// The prompt passed on the command line
        prompt: String,
    },
}

/// Failure latched by the transport and re-raised on write and close
#[derive(Debug, Clone)]
enum LatchedError {
    Process {
        exit_code: Option<i32>,
        stderr: String,
    },
    JsonDecode(String),
    Io(String),
}

impl LatchedError {
    fn to_sdk_error(&self) -> SdkError {
        match self {
            LatchedError::Process { exit_code, stderr } => SdkError::ProcessFailed {
                exit_code: *exit_code,
                stderr: stderr.clone(),
            },
            LatchedError::JsonDecode(reason) => SdkError::JsonDecodeError {
                reason: reason.clone(),
            },
            LatchedError::Io(message) => SdkError::ConnectionError(message.clone()),
        }
    }
}

/// Subprocess-based transport for the Claude CLI
pub struct SubprocessTransport {
    /// Configuration options
    options: ClaudeCodeOptions,
    /// CLI binary path
    cli_path: PathBuf,
    /// Launch mode
    mode: CliMode,
    /// Transport state
    state: TransportState,
    /// Child process slot, shared with the reader for reaping
    child: Arc<Mutex<Option<Child>>>,
    /// Child stdin; dropped on end_input
    stdin: Option<ChildStdin>,
    /// Inbound envelope channel, taken once by the consumer
    message_rx: Option<mpsc::Receiver<Result<Value>>>,
    /// Latched failure, re-raised on write and close
    exit_error: Arc<StdMutex<Option<LatchedError>>>,
    /// Stdout reader task
    reader_task: Option<JoinHandle<()>>,
}

impl SubprocessTransport {
    /// Create a new subprocess transport
    ///
    /// Resolves the CLI binary immediately so discovery failures surface
    /// before any process is launched.
    pub fn new(options: ClaudeCodeOptions, mode: CliMode) -> Result<Self> {
        let cli_path = match options.cli_path {
            Some(ref explicit_path) => {
                debug!("Using explicit CLI path: {:?}", explicit_path);
                explicit_path.clone()
            }
            None => find_claude_cli()?,
        };

        Ok(Self {
            options,
            cli_path,
            mode,
            state: TransportState::New,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            message_rx: None,
            exit_error: Arc::new(StdMutex::new(None)),
            reader_task: None,
        })
    }

    /// Create with a specific CLI path, bypassing discovery
    pub fn with_cli_path(
        options: ClaudeCodeOptions,
        cli_path: impl Into<PathBuf>,
        mode: CliMode,
    ) -> Self {
        Self {
            options,
            cli_path: cli_path.into(),
            mode,
            state: TransportState::New,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            message_rx: None,
            exit_error: Arc::new(StdMutex::new(None)),
            reader_task: None,
        }
    }

    /// Translate the options into the CLI argument vector
    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];

        if let Some(ref prompt) = self.options.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(prompt.clone());
        }
        if let Some(ref prompt) = self.options.append_system_prompt {
            args.push("--append-system-prompt".to_string());
            args.push(prompt.clone());
        }

        if !self.options.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(self.options.allowed_tools.join(","));
        }
        if !self.options.disallowed_tools.is_empty() {
            args.push("--disallowedTools".to_string());
            args.push(self.options.disallowed_tools.join(","));
        }

        if let Some(max_turns) = self.options.max_turns {
            args.push("--max-turns".to_string());
            args.push(max_turns.to_string());
        }
        if let Some(ref model) = self.options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if let Some(ref tool_name) = self.options.permission_prompt_tool_name {
            args.push("--permission-prompt-tool".to_string());
            args.push(tool_name.clone());
        }
        if let Some(mode) = self.options.permission_mode {
            args.push("--permission-mode".to_string());
            args.push(mode.as_str().to_string());
        }

        if self.options.continue_conversation {
            args.push("--continue".to_string());
        }
        if let Some(ref resume_id) = self.options.resume {
            args.push("--resume".to_string());
            args.push(resume_id.clone());
        }
        if let Some(ref settings) = self.options.settings {
            args.push("--settings".to_string());
            args.push(settings.clone());
        }

        for dir in &self.options.add_dirs {
            args.push("--add-dir".to_string());
            args.push(dir.display().to_string());
        }

        match &self.options.mcp_servers {
            McpServers::Map(map) if !map.is_empty() => {
                let config = serde_json::json!({ "mcpServers": map });
                args.push("--mcp-config".to_string());
                args.push(config.to_string());
            }
            McpServers::Raw(raw) if !raw.trim().is_empty() => {
                args.push("--mcp-config".to_string());
                args.push(raw.clone());
            }
            _ => {}
        }

        for (key, value) in &self.options.extra_args {
            let flag = if key.starts_with('-') {
                key.clone()
            } else {
                format!("--{key}")
            };
            args.push(flag);
            if let Some(val) = value {
                if !val.trim().is_empty() {
                    args.push(val.clone());
                }
            }
        }

        match &self.mode {
            CliMode::Streaming => {
                args.push("--input-format".to_string());
                args.push("stream-json".to_string());
            }
            CliMode::Print { prompt } => {
                args.push("--print".to_string());
                args.push("--".to_string());
                args.push(prompt.clone());
            }
        }

        args
    }

    /// Build the command with arguments, environment, and pipes
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(self.build_args());

        for (key, value) in &self.options.env {
            cmd.env(key, value);
        }
        cmd.env("CLAUDE_CODE_ENTRYPOINT", SDK_ENTRYPOINT);

        if let Some(ref cwd) = self.options.cwd {
            cmd.current_dir(cwd);
            cmd.env("PWD", cwd);
        }
        if let Some(ref user) = self.options.user {
            cmd.env("USER", user);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd
    }

    /// Latched failure converted back to an error, if any
    fn latched_error(&self) -> Option<SdkError> {
        self.exit_error
            .lock()
            .expect("exit error lock poisoned")
            .as_ref()
            .map(LatchedError::to_sdk_error)
    }
}

#[async_trait]
impl Transport for SubprocessTransport {
    async fn connect(&mut self) -> Result<()> {
        match self.state {
            TransportState::Ready => return Ok(()),
            TransportState::Closed => {
                return Err(SdkError::invalid_state("transport is closed"));
            }
            TransportState::New => {}
        }

        let mut cmd = self.build_command();
        debug!(
            "Starting Claude CLI: {} {:?}",
            self.cli_path.display(),
            cmd.as_std().get_args().collect::<Vec<_>>()
        );

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn Claude CLI: {}", e);
            SdkError::ProcessError(e)
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SdkError::ConnectionError("Failed to get stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SdkError::ConnectionError("Failed to get stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SdkError::ConnectionError("Failed to get stderr".into()))?;

        let stderr_buf = Arc::new(StdMutex::new(String::new()));

        // Drain stderr into the capture buffer used for failure reports.
        let stderr_buf_clone = stderr_buf.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                debug!("Claude CLI stderr: {}", line);
                let mut buf = stderr_buf_clone.lock().expect("stderr lock poisoned");
                if !buf.is_empty() {
                    buf.push('\n');
                }
                buf.push_str(&line);
            }
        });

        let (tx, rx) = mpsc::channel::<Result<Value>>(CHANNEL_BUFFER_SIZE);
        let child_slot = self.child.clone();
        let exit_error = self.exit_error.clone();

        let reader_task = tokio::spawn(async move {
            let mut framer = JsonFramer::new();
            let mut lines = BufReader::new(stdout).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                match framer.push_line(&line) {
                    Ok(Some(envelope)) => {
                        if tx.send(Ok(envelope)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        if let SdkError::JsonDecodeError { ref reason } = e {
                            *exit_error.lock().expect("exit error lock poisoned") =
                                Some(LatchedError::JsonDecode(reason.clone()));
                        }
                        if tx.send(Err(e)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Claude CLI stdout reader ended");

            // Reap the child; non-zero exit latches a process failure.
            let mut guard = child_slot.lock().await;
            if let Some(mut child) = guard.take() {
                match child.wait().await {
                    Ok(status) if !status.success() => {
                        // Process exit closed the stderr pipe; wait for the
                        // drain task so the capture is complete.
                        let _ = stderr_task.await;
                        let stderr = stderr_buf
                            .lock()
                            .expect("stderr lock poisoned")
                            .clone();
                        warn!(
                            "Claude CLI exited with {:?}: {}",
                            status.code(),
                            stderr
                        );
                        let latched = LatchedError::Process {
                            exit_code: status.code(),
                            stderr,
                        };
                        *exit_error.lock().expect("exit error lock poisoned") =
                            Some(latched.clone());
                        let _ = tx.send(Err(latched.to_sdk_error())).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(Err(SdkError::ProcessError(e))).await;
                    }
                }
            }
        });

        *self.child.lock().await = Some(child);
        self.stdin = Some(stdin);
        self.message_rx = Some(rx);
        self.reader_task = Some(reader_task);
        self.state = TransportState::Ready;

        info!("Connected to Claude CLI");
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if self.state != TransportState::Ready {
            return Err(SdkError::ConnectionError(
                "transport is not ready for writing".into(),
            ));
        }
        if let Some(latched) = self.latched_error() {
            return Err(SdkError::ConnectionError(format!(
                "cannot write after process failure: {latched}"
            )));
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| {
            SdkError::ConnectionError("stdin has been closed".into())
        })?;

        let result: std::io::Result<()> = async {
            stdin.write_all(data.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!("Failed to write to Claude CLI stdin: {}", e);
            *self.exit_error.lock().expect("exit error lock poisoned") =
                Some(LatchedError::Io(format!("stdin write failed: {e}")));
            self.state = TransportState::Closed;
            return Err(SdkError::ConnectionError(format!("stdin write failed: {e}")));
        }

        Ok(())
    }

    fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<Result<Value>>> {
        self.message_rx.take()
    }

    async fn end_input(&mut self) -> Result<()> {
        // Dropping stdin closes the pipe and signals end of input.
        self.stdin.take();
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state == TransportState::Ready
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.stdin.take();

        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
            info!("Claude CLI process terminated");
        }

        self.state = TransportState::Closed;

        match self.latched_error() {
            Some(err @ (SdkError::ProcessFailed { .. } | SdkError::JsonDecodeError { .. })) => {
                Err(err)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}

/// Find the Claude CLI binary
///
/// Search order:
/// 1. `CLAUDE_CODE_CLI_PATH` environment override
/// 2. `claude` on PATH
/// 3. Well-known installation locations
pub fn find_claude_cli() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CLI_PATH_ENV) {
        if !path.trim().is_empty() {
            debug!("Using CLI path from {}: {}", CLI_PATH_ENV, path);
            return Ok(PathBuf::from(path));
        }
    }

    if let Ok(path) = which::which("claude") {
        debug!("Found Claude CLI in PATH at: {}", path.display());
        return Ok(path);
    }

    let mut locations = vec![
        PathBuf::from("/usr/local/bin/claude"),
        PathBuf::from("/opt/homebrew/bin/claude"),
    ];
    if let Some(home) = dirs::home_dir() {
        locations.extend([
            home.join(".npm-global/bin/claude"),
            home.join(".local/bin/claude"),
            home.join("node_modules/.bin/claude"),
            home.join(".yarn/bin/claude"),
            home.join(".claude/local/claude"),
        ]);
    }

    let mut searched = Vec::new();
    for path in &locations {
        searched.push(path.display().to_string());
        if path.exists() && path.is_file() {
            debug!("Found Claude CLI at: {}", path.display());
            return Ok(path.clone());
        }
    }

    warn!("Claude CLI not found in any standard location");
    let searched_paths = searched.join("\n");

    if which::which("node").is_err() {
        return Err(SdkError::NodeNotFound { searched_paths });
    }

    Err(SdkError::CliNotFound { searched_paths })
}
