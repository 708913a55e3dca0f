//! # Emberlink Transport
//!
//! Host-side transport for the emberlink configuration protocol.
//!
//! This crate provides:
//! - A byte-stream [`Link`] abstraction with serial and in-memory backends
//! - The transport [`Session`] state machine (handshake, raw send,
//!   ACK/NACK wait with timeout)
//! - The [`upload`] session: pre-order tree walk, one acknowledged packet
//!   per configuration unit
//! - The [`download`] session: ordered packet stream reconstructed into a
//!   configuration tree through an explicit [`TreeBuilder`]
//!
//! ## Session model
//!
//! ```text
//! Disconnected ──connect──▶ Handshaking ──ACK──▶ Connected
//!       ▲                        │                   │
//!       └────────────────────────┴── disconnect ─────┤
//!                                                Faulted (link failure)
//! ```
//!
//! One logical session owns the link exclusively; reconnecting tears the
//! link down and adopts a new one. Waits are cooperative poll loops
//! bounded by wall-clock deadlines, so they compose with cancellation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod download;
pub mod error;
pub mod link;
pub mod progress;
pub mod serial;
pub mod session;
pub mod stream;
pub mod upload;

pub use builder::{BuildStep, TreeBuilder};
pub use download::{download, DownloadOutcome};
pub use error::{LinkError, SessionError};
pub use link::{Link, MemoryLink};
pub use progress::{NullProgress, ProgressSink};
pub use serial::SerialLink;
pub use session::{Session, SessionConfig, SessionState};
pub use upload::{count_units, plan_units, upload, UploadOutcome};
