//! Shared helpers for e2e tests driving the SDK against the mock transport.
#![allow(dead_code)]

use claude_code_client::transport::mock::MockTransportHandle;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

/// Receive the next outbound envelope with a short deadline.
pub async fn next_outbound(rx: &mut mpsc::Receiver<Value>) -> Value {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for outbound message")
        .expect("outbound channel closed")
}

/// Answer the `initialize` handshake so streaming connects can complete.
///
/// Reads outbound envelopes until the initialize control request arrives,
/// replies with a success control response, and hands the handle back
/// together with the initialize request that was observed.
pub fn spawn_initialize_responder(
    mut handle: MockTransportHandle,
) -> JoinHandle<(MockTransportHandle, Value)> {
    tokio::spawn(async move {
        loop {
            let outbound = next_outbound(&mut handle.outbound_rx).await;
            if outbound["type"] == "control_request"
                && outbound["request"]["subtype"] == "initialize"
            {
                let response = json!({
                    "type": "control_response",
                    "response": {
                        "subtype": "success",
                        "request_id": outbound["request_id"],
                        "response": {"commands": [], "output_style": "default"},
                    }
                });
                handle
                    .inbound_tx
                    .send(Ok(response))
                    .await
                    .expect("inbound channel closed");
                return (handle, outbound);
            }
        }
    })
}
