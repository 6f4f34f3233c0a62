//! Integration tests for the subprocess transport, driven by a fake CLI
//! shell script so the framing, reaping, and error-latching paths run
//! against a real child process.

#![cfg(unix)]

use claude_code_client::transport::subprocess::CliMode;
use claude_code_client::transport::{SubprocessTransport, Transport};
use claude_code_client::{ClaudeCodeOptions, SdkError};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tokio::time::{timeout, Duration};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn write_fake_cli(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fake-claude");
    let script = format!("#!/bin/sh\n{body}");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn clean_exit_yields_messages_then_end_of_stream() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cli = write_fake_cli(
        &dir,
        r#"echo '{"type":"system","subtype":"init"}'
exit 0
"#,
    );

    let mut transport =
        SubprocessTransport::with_cli_path(ClaudeCodeOptions::default(), cli, CliMode::Streaming);
    transport.connect().await.unwrap();
    assert!(transport.is_ready());

    let mut rx = transport.take_message_receiver().unwrap();

    let envelope = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(envelope["type"], "system");
    assert_eq!(envelope["subtype"], "init");

    // Zero exit: the stream just ends.
    let end = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(end.is_none());

    transport.close().await.unwrap();
}

#[tokio::test]
async fn message_split_across_lines_is_assembled() {
    let dir = tempfile::tempdir().unwrap();
    let cli = write_fake_cli(
        &dir,
        r#"echo '{"type":"system",'
echo ''
echo '"subtype":"init"}'
exit 0
"#,
    );

    let mut transport =
        SubprocessTransport::with_cli_path(ClaudeCodeOptions::default(), cli, CliMode::Streaming);
    transport.connect().await.unwrap();
    let mut rx = transport.take_message_receiver().unwrap();

    let envelope = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(envelope["subtype"], "init");

    transport.close().await.unwrap();
}

#[tokio::test]
async fn process_failure_is_latched_and_reraised() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cli = write_fake_cli(
        &dir,
        r#"echo '{"type":"system","subtype":"init"}'
echo 'boom' >&2
exit 2
"#,
    );

    let mut transport =
        SubprocessTransport::with_cli_path(ClaudeCodeOptions::default(), cli, CliMode::Streaming);
    transport.connect().await.unwrap();
    let mut rx = transport.take_message_receiver().unwrap();

    let envelope = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(envelope["type"], "system");

    // The non-zero exit surfaces as a process error on the stream.
    let err = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    match err {
        SdkError::ProcessFailed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(2));
            assert!(stderr.contains("boom"));
        }
        other => panic!("Expected ProcessFailed, got {other:?}"),
    }

    // Writes after exit are connection errors, not process errors.
    let err = transport.write("{}").await.unwrap_err();
    assert!(matches!(err, SdkError::ConnectionError(_)));

    // close() re-raises the latched process failure.
    let err = transport.close().await.unwrap_err();
    match err {
        SdkError::ProcessFailed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(2));
            assert!(stderr.contains("boom"));
        }
        other => panic!("Expected ProcessFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn streaming_mode_writes_reach_child_stdin() {
    let dir = tempfile::tempdir().unwrap();
    // The fake CLI echoes its first stdin line back wrapped in an envelope.
    let cli = write_fake_cli(
        &dir,
        r#"read line
printf '{"type":"system","subtype":"echo","line":%s}\n' "$line"
exit 0
"#,
    );

    let mut transport =
        SubprocessTransport::with_cli_path(ClaudeCodeOptions::default(), cli, CliMode::Streaming);
    transport.connect().await.unwrap();
    let mut rx = transport.take_message_receiver().unwrap();

    transport.write(r#""ping""#).await.unwrap();

    let envelope = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(envelope["subtype"], "echo");
    assert_eq!(envelope["line"], "ping");

    transport.close().await.unwrap();
}
