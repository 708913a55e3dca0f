//! # Emberlink Protocol
//!
//! Wire protocol for the emberlink configuration transfer link between a
//! panel editor and an embedded endpoint.
//!
//! This crate provides:
//! - Packet framing and checksums
//! - Field-level wire codecs (bounded strings, extended data blocks)
//! - The configuration tree model (panels, loops, devices, buses, rules)
//! - Per-entity payload codecs
//! - The device type lookup table
//!
//! ## Wire format
//!
//! ```text
//! ┌───────┬──────┬────────┬────────┬───────────┬──────────┬──────┐
//! │ 0xAA  │ TYPE │ LEN_HI │ LEN_LO │ DATA[LEN] │ XOR(DATA)│ 0x55 │
//! └───────┴──────┴────────┴────────┴───────────┴──────────┴──────┘
//! ```
//!
//! Length is big-endian 16-bit; the checksum is the bytewise XOR of the
//! payload (0 for an empty payload).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device_types;
pub mod error;
pub mod model;
pub mod packet;
pub mod payload;
pub mod wire;

pub use error::{FramingError, ProtoError};
pub use model::{
    Bus, BusKind, BusNode, CeInput, CeOutput, CeRule, ContentType, Device, DeviceRef, HttpMethod,
    LogicGate, Loop, Panel,
};
pub use packet::{Packet, PacketKind};
pub use wire::{WireReader, WireWriter};

/// Frame start marker
pub const START_BYTE: u8 = 0xAA;

/// Frame end marker
pub const END_BYTE: u8 = 0x55;

/// Maximum payload size in bytes (the endpoint has limited RAM)
pub const MAX_PAYLOAD: usize = 512;

/// Bytes of framing around the payload: start, type, two length bytes,
/// checksum, end
pub const FRAME_OVERHEAD: usize = 6;

/// Maximum encoded length of a name or location field
pub const MAX_NAME_LEN: usize = 32;

/// Size of the extended data block in rule input/output payloads
pub const EXT_BLOCK_LEN: usize = 64;
