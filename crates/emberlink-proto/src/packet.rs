//! Packet framing and checksums for the emberlink wire protocol.
//!
//! A packet is one framed, typed, checksummed unit. All multi-byte fields
//! are big-endian. The checksum is the bytewise XOR of the payload; it is
//! blind to an even number of flips in the same bit position, which is a
//! documented weakness of the wire format, not something this codec fixes.

use crate::error::{FramingError, ProtoError};
use crate::{END_BYTE, FRAME_OVERHEAD, MAX_PAYLOAD, START_BYTE};

/// Packet types as carried in the TYPE byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Panel root configuration
    PanelConfig = 0x01,
    /// Detection loop configuration
    LoopConfig = 0x02,
    /// Loop device configuration
    DeviceConfig = 0x03,
    /// Communication bus configuration
    BusConfig = 0x04,
    /// Bus node configuration
    BusNodeConfig = 0x05,
    /// Cause-and-effect rule header
    CeHeader = 0x06,
    /// Cause-and-effect rule input
    CeInput = 0x07,
    /// Cause-and-effect rule output
    CeOutput = 0x08,
    /// Connection liveness check
    Handshake = 0xF0,
    /// Positive acknowledgment
    Ack = 0xF1,
    /// Negative acknowledgment
    Nack = 0xF2,
    /// Request the endpoint to replay its stored configuration
    DownloadRequest = 0xF3,
    /// End of a configuration stream
    EndTransmission = 0xFF,
}

impl PacketKind {
    /// Look up a kind by its wire code. Unknown codes return `None` so a
    /// download loop can log and skip them instead of failing.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::PanelConfig),
            0x02 => Some(Self::LoopConfig),
            0x03 => Some(Self::DeviceConfig),
            0x04 => Some(Self::BusConfig),
            0x05 => Some(Self::BusNodeConfig),
            0x06 => Some(Self::CeHeader),
            0x07 => Some(Self::CeInput),
            0x08 => Some(Self::CeOutput),
            0xF0 => Some(Self::Handshake),
            0xF1 => Some(Self::Ack),
            0xF2 => Some(Self::Nack),
            0xF3 => Some(Self::DownloadRequest),
            0xFF => Some(Self::EndTransmission),
            _ => None,
        }
    }

    /// Wire code for this kind
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One framed unit of the wire protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    type_code: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a packet of a known kind
    #[must_use]
    pub fn new(kind: PacketKind, payload: Vec<u8>) -> Self {
        Self {
            type_code: kind.code(),
            payload,
        }
    }

    /// Create a packet with an empty payload
    #[must_use]
    pub fn empty(kind: PacketKind) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Raw TYPE byte
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Kind of this packet, `None` if the TYPE byte is outside the table
    #[must_use]
    pub fn kind(&self) -> Option<PacketKind> {
        PacketKind::from_code(self.type_code)
    }

    /// Payload bytes
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytewise XOR checksum of a payload, 0 for an empty payload
    #[must_use]
    pub fn checksum(payload: &[u8]) -> u8 {
        payload.iter().fold(0, |acc, b| acc ^ b)
    }

    /// Encode into a framed byte sequence.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::PayloadTooLarge` if the payload exceeds
    /// [`MAX_PAYLOAD`].
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD {
            return Err(ProtoError::PayloadTooLarge(len));
        }

        let mut buf = Vec::with_capacity(len + FRAME_OVERHEAD);
        buf.push(START_BYTE);
        buf.push(self.type_code);
        buf.push((len >> 8) as u8);
        buf.push((len & 0xFF) as u8);
        buf.extend_from_slice(&self.payload);
        buf.push(Self::checksum(&self.payload));
        buf.push(END_BYTE);
        Ok(buf)
    }

    /// Decode a complete framed byte sequence.
    ///
    /// # Errors
    ///
    /// Returns `ProtoError::Framing` for a short frame, missing markers, or
    /// a length field that disagrees with the buffer size, and
    /// `ProtoError::Integrity` for a checksum mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(FramingError::TooShort {
                expected: FRAME_OVERHEAD,
                actual: bytes.len(),
            }
            .into());
        }
        if bytes[0] != START_BYTE {
            return Err(FramingError::BadStartMarker(bytes[0]).into());
        }
        let last = bytes[bytes.len() - 1];
        if last != END_BYTE {
            return Err(FramingError::BadEndMarker(last).into());
        }

        let type_code = bytes[1];
        let declared = ((bytes[2] as usize) << 8) | bytes[3] as usize;
        let actual = bytes.len() - FRAME_OVERHEAD;
        if declared != actual {
            return Err(FramingError::LengthMismatch { declared, actual }.into());
        }

        let payload = &bytes[4..4 + declared];
        let received = bytes[bytes.len() - 2];
        let computed = Self::checksum(payload);
        if computed != received {
            return Err(ProtoError::Integrity { computed, received });
        }

        Ok(Self {
            type_code,
            payload: payload.to_vec(),
        })
    }

    /// Total frame size on the wire for a payload of `payload_len` bytes
    #[must_use]
    pub fn frame_len(payload_len: usize) -> usize {
        payload_len + FRAME_OVERHEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_roundtrip() {
        let encoded = Packet::empty(PacketKind::Handshake).encode().unwrap();
        assert_eq!(encoded, vec![0xAA, 0xF0, 0x00, 0x00, 0x00, 0x55]);

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.kind(), Some(PacketKind::Handshake));
        assert!(decoded.payload().is_empty());
    }

    #[test]
    fn payload_roundtrip() {
        let packet = Packet::new(PacketKind::PanelConfig, vec![0x01, 0x02, 0x03]);
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded[2], 0x00);
        assert_eq!(encoded[3], 0x03);
        assert_eq!(encoded[encoded.len() - 2], 0x01 ^ 0x02 ^ 0x03);

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn oversized_payload_rejected() {
        let packet = Packet::new(PacketKind::PanelConfig, vec![0; MAX_PAYLOAD + 1]);
        assert_eq!(
            packet.encode(),
            Err(ProtoError::PayloadTooLarge(MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn max_payload_accepted() {
        let packet = Packet::new(PacketKind::DeviceConfig, vec![0x5A; MAX_PAYLOAD]);
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded.len(), MAX_PAYLOAD + FRAME_OVERHEAD);
        assert_eq!(Packet::decode(&encoded).unwrap(), packet);
    }

    #[test]
    fn short_frame_rejected() {
        let err = Packet::decode(&[0xAA, 0xF1, 0x00, 0x00, 0x55]).unwrap_err();
        assert!(matches!(
            err,
            ProtoError::Framing(FramingError::TooShort { .. })
        ));
    }

    #[test]
    fn bad_markers_rejected() {
        let mut frame = Packet::empty(PacketKind::Ack).encode().unwrap();
        frame[0] = 0xAB;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtoError::Framing(FramingError::BadStartMarker(0xAB)))
        ));

        let mut frame = Packet::empty(PacketKind::Ack).encode().unwrap();
        let end = frame.len() - 1;
        frame[end] = 0x54;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtoError::Framing(FramingError::BadEndMarker(0x54)))
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut frame = Packet::new(PacketKind::LoopConfig, vec![1, 2, 3, 4])
            .encode()
            .unwrap();
        frame[3] = 0x03;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtoError::Framing(FramingError::LengthMismatch {
                declared: 3,
                actual: 4
            }))
        ));
    }

    #[test]
    fn corrupted_payload_rejected() {
        let mut frame = Packet::new(PacketKind::DeviceConfig, vec![0x10, 0x20, 0x30])
            .encode()
            .unwrap();
        frame[5] ^= 0x01;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtoError::Integrity { .. })
        ));
    }

    #[test]
    fn unknown_type_code_survives_decode() {
        let frame = vec![0xAA, 0x7E, 0x00, 0x01, 0x42, 0x42, 0x55];
        let packet = Packet::decode(&frame).unwrap();
        assert_eq!(packet.type_code(), 0x7E);
        assert_eq!(packet.kind(), None);
        assert_eq!(packet.payload(), &[0x42]);
    }
}
