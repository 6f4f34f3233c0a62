//! In-memory mock transport for tests and e2e simulations

use super::Transport;
use crate::errors::{Result, SdkError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Handle for interacting with the mock transport in tests
pub struct MockTransportHandle {
    /// Inject inbound envelopes (as if coming from the CLI)
    pub inbound_tx: mpsc::Sender<Result<Value>>,
    /// Observe outbound lines written by the SDK, parsed back to JSON
    pub outbound_rx: mpsc::Receiver<Value>,
    /// Observe end_input calls from the SDK
    pub end_input_rx: mpsc::Receiver<bool>,
}

/// An in-memory transport implementing the [`Transport`] trait
pub struct MockTransport {
    ready: AtomicBool,
    inbound_rx: Option<mpsc::Receiver<Result<Value>>>,
    outbound_tx: mpsc::Sender<Value>,
    end_input_tx: mpsc::Sender<bool>,
}

impl MockTransport {
    /// Create a new mock transport and a handle for tests
    pub fn pair() -> (Box<dyn Transport + Send>, MockTransportHandle) {
        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        let (end_input_tx, end_input_rx) = mpsc::channel(10);

        let transport = MockTransport {
            ready: AtomicBool::new(false),
            inbound_rx: Some(inbound_rx),
            outbound_tx,
            end_input_tx,
        };

        let handle = MockTransportHandle {
            inbound_tx,
            outbound_rx,
            end_input_rx,
        };

        (Box::new(transport), handle)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(SdkError::ConnectionError(
                "transport is not ready for writing".into(),
            ));
        }
        let value: Value = serde_json::from_str(data)?;
        self.outbound_tx
            .send(value)
            .await
            .map_err(|_| SdkError::ConnectionError("mock outbound channel closed".into()))
    }

    fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<Result<Value>>> {
        self.inbound_rx.take()
    }

    async fn end_input(&mut self) -> Result<()> {
        let _ = self.end_input_tx.send(true).await;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }
}
