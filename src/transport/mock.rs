//! In-memory transport for exercising the engine without hardware.
//! Uses an mpsc channel pair rather than a duplex stream to match this
//! crate's chunked `Transport` contract.

use std::convert::Infallible;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Framing, Transport};

/// The test-side handle for a [`MockTransport`]: push bytes the engine
/// should "receive", and inspect what the engine wrote.
pub struct MockHandle {
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockHandle {
    /// Queues a chunk of bytes for the next `read_chunk` call to return.
    /// Silently dropped if the transport side has already been closed.
    pub fn push_inbound(&self, chunk: impl Into<Vec<u8>>) {
        let _ = self.inbound_tx.send(chunk.into());
    }

    /// Returns the next frame the engine wrote, if any has arrived yet.
    pub async fn next_written(&mut self) -> Option<Vec<u8>> {
        self.outbound_rx.recv().await
    }

    pub fn try_next_written(&mut self) -> Option<Vec<u8>> {
        self.outbound_rx.try_recv().ok()
    }
}

pub struct MockTransport {
    open: bool,
    framing: Framing,
    inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl MockTransport {
    /// Builds a connected pair: the transport to hand to an `Engine`, and
    /// a handle the test keeps to script inbound bytes and observe writes.
    pub fn pair(framing: Framing) -> (Self, MockHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                open: false,
                framing,
                inbound_rx,
                outbound_tx,
            },
            MockHandle {
                inbound_tx,
                outbound_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = Infallible;

    async fn open(&mut self) -> Result<(), Self::Error> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let _ = self.outbound_tx.send(frame.to_vec());
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, Self::Error> {
        match self.inbound_rx.recv().await {
            Some(chunk) => Ok(chunk),
            // Sender dropped: no more data will ever arrive. Rather than
            // erroring (no infallible variant to build), pend forever so
            // an in-flight transaction's timeout is the thing that fires.
            None => std::future::pending().await,
        }
    }

    fn framing(&self) -> Framing {
        self.framing
    }
}
