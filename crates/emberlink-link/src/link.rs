//! Byte-stream link abstraction.
//!
//! A [`Link`] carries raw frame bytes between the host and one endpoint.
//! Receiving is non-blocking: `try_recv` drains whatever has arrived so
//! the session layer can poll cooperatively instead of parking a thread
//! on a blocking read.

use crate::error::LinkError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// One exclusively owned byte stream to an endpoint
#[async_trait]
pub trait Link: Send {
    /// Write bytes to the endpoint
    async fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Drain any bytes that have arrived. Returns an empty vector when
    /// nothing is pending and `LinkError::Closed` once the peer is gone
    /// and the stream is drained.
    fn try_recv(&mut self) -> Result<Vec<u8>, LinkError>;

    /// Release the stream. Further sends fail.
    fn close(&mut self);
}

/// In-process link backed by byte queues.
///
/// [`MemoryLink::pair`] returns two connected ends; bytes written to one
/// end arrive at the other. Used by tests and by the simulated endpoint.
pub struct MemoryLink {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryLink {
    /// Create a connected pair of links
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: b_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: a_rx,
            },
        )
    }
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let tx = self.tx.as_ref().ok_or(LinkError::Closed)?;
        tx.send(bytes.to_vec()).map_err(|_| LinkError::Closed)
    }

    fn try_recv(&mut self) -> Result<Vec<u8>, LinkError> {
        let mut bytes = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if bytes.is_empty() {
                        return Err(LinkError::Closed);
                    }
                    break;
                }
            }
        }
        Ok(bytes)
    }

    fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}
