//! Error types for the emberlink transport layer.

use emberlink_proto::ProtoError;
use thiserror::Error;

/// Byte-stream link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O failure on the underlying stream
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port failure
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The peer end of the link is gone
    #[error("link closed")]
    Closed,
}

/// Session-level errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation requires an established connection
    #[error("not connected")]
    NotConnected,

    /// Handshake was not acknowledged in time
    #[error("handshake failed: endpoint did not respond")]
    HandshakeFailed,

    /// The endpoint violated the packet grammar
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The operation was cancelled by the caller
    #[error("cancelled")]
    Cancelled,

    /// Underlying link failure
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Malformed packet on the wire
    #[error(transparent)]
    Proto(#[from] ProtoError),
}
