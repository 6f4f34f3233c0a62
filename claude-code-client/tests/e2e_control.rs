//! E2E tests for the control plane: request/response correlation, timeouts,
//! MCP passthrough, and router resilience.

mod common;

use claude_code_client::transport::mock::{MockTransport, MockTransportHandle};
use claude_code_client::{Query, SdkError, Transport};
use common::next_outbound;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

async fn start_query() -> (Query, MockTransportHandle) {
    let (mut transport, handle) = MockTransport::pair();
    transport.connect().await.unwrap();
    let mut query = Query::new(Arc::new(Mutex::new(transport)), true, None, None);
    query.start().await.unwrap();
    (query, handle)
}

/// Reply success to the next outbound control request of the given subtype.
fn respond_success(
    mut handle: MockTransportHandle,
    subtype: &'static str,
) -> tokio::task::JoinHandle<(MockTransportHandle, Value)> {
    tokio::spawn(async move {
        loop {
            let outbound = next_outbound(&mut handle.outbound_rx).await;
            if outbound["type"] == "control_request"
                && outbound["request"]["subtype"] == subtype
            {
                handle
                    .inbound_tx
                    .send(Ok(json!({
                        "type": "control_response",
                        "response": {
                            "subtype": "success",
                            "request_id": outbound["request_id"],
                        }
                    })))
                    .await
                    .unwrap();
                return (handle, outbound);
            }
        }
    })
}

#[tokio::test]
async fn e2e_interrupt_round_trip() {
    let (query, handle) = start_query().await;

    let responder = respond_success(handle, "interrupt");
    query.interrupt().await.unwrap();

    let (_handle, outbound) = responder.await.unwrap();
    assert_eq!(outbound["request"], json!({"subtype": "interrupt"}));
    assert!(outbound["request_id"].as_str().unwrap().starts_with("req_"));
}

#[tokio::test]
async fn e2e_set_permission_mode_round_trip() {
    let (query, handle) = start_query().await;

    let responder = respond_success(handle, "set_permission_mode");
    query.set_permission_mode("acceptEdits").await.unwrap();

    let (_handle, outbound) = responder.await.unwrap();
    assert_eq!(
        outbound["request"],
        json!({"subtype": "set_permission_mode", "mode": "acceptEdits"})
    );
}

#[tokio::test]
async fn e2e_server_error_response_is_raised_to_caller() {
    let (query, mut handle) = start_query().await;

    let inbound = handle.inbound_tx.clone();
    let responder = tokio::spawn(async move {
        let outbound = next_outbound(&mut handle.outbound_rx).await;
        inbound
            .send(Ok(json!({
                "type": "control_response",
                "response": {
                    "subtype": "error",
                    "request_id": outbound["request_id"],
                    "error": "cannot interrupt now",
                }
            })))
            .await
            .unwrap();
    });

    let err = query.interrupt().await.unwrap_err();
    responder.await.unwrap();

    match err {
        SdkError::ControlRequestError(message) => assert_eq!(message, "cannot interrupt now"),
        other => panic!("Expected ControlRequestError, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn e2e_control_timeout_names_subtype_and_recovers() {
    let (query, mut handle) = start_query().await;

    // No response arrives; the paused clock jumps straight to the deadline.
    let err = query.interrupt().await.unwrap_err();
    match err {
        SdkError::ControlRequestTimeout { subtype, seconds } => {
            assert_eq!(subtype, "interrupt");
            assert_eq!(seconds, 60);
        }
        other => panic!("Expected ControlRequestTimeout, got {other:?}"),
    }

    // A late response for the evicted request id is silently dropped.
    let stale = next_outbound(&mut handle.outbound_rx).await;
    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_response",
            "response": {
                "subtype": "success",
                "request_id": stale["request_id"],
            }
        })))
        .await
        .unwrap();

    // The control plane still works afterwards.
    let responder = respond_success(handle, "set_permission_mode");
    query.set_permission_mode("plan").await.unwrap();
    let (_handle, outbound) = responder.await.unwrap();
    assert_eq!(outbound["request"]["mode"], "plan");
}

#[tokio::test]
async fn e2e_mcp_message_gets_method_not_found() {
    let (_query, mut handle) = start_query().await;

    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_request",
            "request_id": "m1",
            "request": {
                "subtype": "mcp_message",
                "server_name": "calc",
                "message": {"jsonrpc": "2.0", "id": 42, "method": "tools/call"},
            }
        })))
        .await
        .unwrap();

    let response = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(response["response"]["subtype"], "success");
    assert_eq!(response["response"]["request_id"], "m1");
    let mcp = &response["response"]["response"]["mcp_response"];
    assert_eq!(mcp["jsonrpc"], "2.0");
    assert_eq!(mcp["id"], 42);
    assert_eq!(mcp["error"]["code"], -32601);
}

#[tokio::test]
async fn e2e_unknown_subtype_gets_error_response_and_connection_survives() {
    let (_query, mut handle) = start_query().await;

    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_request",
            "request_id": "u1",
            "request": {"subtype": "bogus"},
        })))
        .await
        .unwrap();

    let response = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(response["response"]["subtype"], "error");
    assert_eq!(
        response["response"]["error"],
        "Unsupported control request subtype: bogus"
    );

    // The router keeps serving requests after the unknown subtype.
    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_request",
            "request_id": "u2",
            "request": {
                "subtype": "mcp_message",
                "server_name": "calc",
                "message": {"id": 1},
            }
        })))
        .await
        .unwrap();

    let response = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(response["response"]["request_id"], "u2");
}

#[tokio::test]
async fn e2e_cancel_request_is_ignored_without_response() {
    let (_query, mut handle) = start_query().await;

    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_cancel_request",
            "request_id": "c1",
        })))
        .await
        .unwrap();

    // Follow with a real request; the only response observed belongs to it.
    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_request",
            "request_id": "c2",
            "request": {
                "subtype": "mcp_message",
                "server_name": "calc",
                "message": {"id": 2},
            }
        })))
        .await
        .unwrap();

    let response = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(response["response"]["request_id"], "c2");
}

#[tokio::test]
async fn e2e_parse_error_closes_conversation_but_control_continues() {
    let (mut transport, mut handle) = MockTransport::pair();
    transport.connect().await.unwrap();
    let mut query = Query::new(Arc::new(Mutex::new(transport)), true, None, None);
    query.start().await.unwrap();
    let mut messages = query.take_message_receiver().unwrap();

    // An envelope the parser rejects closes the conversation stream.
    handle
        .inbound_tx
        .send(Ok(json!({"type": "banana"})))
        .await
        .unwrap();

    let err = timeout(Duration::from_secs(1), messages.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SdkError::MessageParseError { .. }));

    // Later conversation messages are dropped rather than surfaced.
    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "assistant",
            "message": {"model": "claude-sonnet-4", "content": []},
        })))
        .await
        .unwrap();
    assert!(
        timeout(Duration::from_millis(100), messages.recv())
            .await
            .is_err(),
        "conversation stream should stay closed after a parse error"
    );

    // The control plane is unaffected.
    handle
        .inbound_tx
        .send(Ok(json!({
            "type": "control_request",
            "request_id": "p1",
            "request": {
                "subtype": "mcp_message",
                "server_name": "calc",
                "message": {"id": 3},
            }
        })))
        .await
        .unwrap();

    let response = next_outbound(&mut handle.outbound_rx).await;
    assert_eq!(response["response"]["request_id"], "p1");
}
