//! E2E tests for the client façade: connection lifecycle, turn consumption,
//! and input streaming.

mod common;

use claude_code_client::transport::mock::MockTransport;
use claude_code_client::{ClaudeCodeOptions, ClaudeSDKClient, ContentBlock, Message};
use common::{next_outbound, spawn_initialize_responder};
use futures::StreamExt;
use serde_json::json;
use tokio::time::{timeout, Duration};

fn assistant_envelope(text: &str) -> serde_json::Value {
    json!({
        "type": "assistant",
        "message": {
            "model": "claude-sonnet-4",
            "content": [{"type": "text", "text": text}],
        }
    })
}

fn result_envelope() -> serde_json::Value {
    json!({
        "type": "result",
        "subtype": "success",
        "is_error": false,
        "num_turns": 1,
        "duration_ms": 12,
        "duration_api_ms": 10,
        "session_id": "s1",
    })
}

#[tokio::test]
async fn e2e_one_shot_receive_response_completes_after_result() {
    let (transport, handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);
    client.connect_with_prompt("hi").await.unwrap();

    handle
        .inbound_tx
        .send(Ok(assistant_envelope("hello")))
        .await
        .unwrap();
    handle.inbound_tx.send(Ok(result_envelope())).await.unwrap();

    let mut turn = client.receive_response();

    let first = turn.next().await.unwrap().unwrap();
    match first {
        Message::Assistant { message } => {
            assert_eq!(message.model, "claude-sonnet-4");
            assert!(matches!(
                &message.content[0],
                ContentBlock::Text(text) if text.text == "hello"
            ));
        }
        other => panic!("Expected Assistant, got {other:?}"),
    }

    let second = turn.next().await.unwrap().unwrap();
    match second {
        Message::Result {
            subtype,
            is_error,
            num_turns,
            duration_ms,
            duration_api_ms,
            session_id,
            ..
        } => {
            assert_eq!(subtype, "success");
            assert!(!is_error);
            assert_eq!(num_turns, 1);
            assert_eq!(duration_ms, 12);
            assert_eq!(duration_api_ms, 10);
            assert_eq!(session_id, "s1");
        }
        other => panic!("Expected Result, got {other:?}"),
    }

    // The derived stream terminates with the turn.
    assert!(turn.next().await.is_none());
}

#[tokio::test]
async fn e2e_connect_twice_is_a_noop() {
    let (transport, _handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);

    client.connect_with_prompt("hi").await.unwrap();
    assert!(client.is_connected());

    client.connect_with_prompt("again").await.unwrap();
    assert!(client.is_connected());

    client.disconnect().await.unwrap();
    assert!(!client.is_connected());
}

#[tokio::test]
async fn e2e_query_writes_user_envelope() {
    let (transport, mut handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);
    client.connect_with_prompt("seed").await.unwrap();

    client.query("hi", None).await.unwrap();

    let outbound = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(
        outbound,
        json!({
            "type": "user",
            "message": {"role": "user", "content": "hi"},
            "parent_tool_use_id": null,
            "session_id": "default",
        })
    );

    client.query("follow-up", Some("sess-9".to_string())).await.unwrap();
    let outbound = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(outbound["session_id"], "sess-9");
}

#[tokio::test]
async fn e2e_streaming_input_is_written_then_stdin_closed() {
    let (transport, handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);

    let records = futures::stream::iter(vec![
        json!({"type": "user", "message": {"role": "user", "content": "one"}}),
        json!({"type": "user", "message": {"role": "user", "content": "two"}}),
    ]);

    let responder = spawn_initialize_responder(handle);
    client.connect_with_stream(records).await.unwrap();
    let (mut handle, _init) = responder.await.unwrap();

    let first = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(first["message"]["content"], "one");
    let second = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(second["message"]["content"], "two");

    let closed = timeout(Duration::from_secs(1), handle.end_input_rx.recv())
        .await
        .expect("timed out waiting for end_input")
        .unwrap();
    assert!(closed);
}

#[tokio::test]
async fn e2e_server_info_absent_on_one_shot_connection() {
    let (transport, _handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);
    client.connect_with_prompt("hi").await.unwrap();

    assert!(client.get_server_info().is_none());
}

#[tokio::test]
async fn e2e_server_info_present_after_streaming_handshake() {
    let (transport, handle) = MockTransport::pair();
    let mut client = ClaudeSDKClient::with_transport(ClaudeCodeOptions::default(), transport);

    let responder = spawn_initialize_responder(handle);
    client.connect().await.unwrap();
    responder.await.unwrap();

    let info = client.get_server_info().unwrap();
    assert_eq!(info["output_style"], "default");
}
