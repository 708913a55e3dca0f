//! Error types for the emberlink wire protocol.

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    /// Frame structure error
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Checksum mismatch between frame and payload
    #[error("integrity error: computed checksum 0x{computed:02X}, frame carries 0x{received:02X}")]
    Integrity {
        /// Checksum computed over the received payload
        computed: u8,
        /// Checksum byte carried by the frame
        received: u8,
    },

    /// Payload exceeds the endpoint's packet budget
    #[error("payload too large: {0} bytes, maximum {max}", max = crate::MAX_PAYLOAD)]
    PayloadTooLarge(usize),

    /// Payload ended before a declared field
    #[error("truncated payload: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Bytes missing from the field being read
        needed: usize,
        /// Read position where the shortfall was found
        offset: usize,
    },

    /// Rule input/output carried an address type outside the table
    #[error("unknown address type: 0x{0:02X}")]
    UnknownAddressType(u8),
}

/// Frame structure errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Frame too short to hold the fixed fields
    #[error("frame too short: expected at least {expected}, got {actual}")]
    TooShort {
        /// Minimum frame size
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// First byte is not the start marker
    #[error("bad start marker: 0x{0:02X}")]
    BadStartMarker(u8),

    /// Last byte is not the end marker
    #[error("bad end marker: 0x{0:02X}")]
    BadEndMarker(u8),

    /// Declared length does not match the payload span
    #[error("length mismatch: header declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch {
        /// Length field from the frame header
        declared: usize,
        /// Payload bytes actually present
        actual: usize,
    },
}
