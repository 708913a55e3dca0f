//! Simulated panel endpoint.
//!
//! A software stand-in for the embedded control unit: it answers the
//! handshake, stores uploaded configuration trees, and replays the
//! stored tree on a download request. Drive it directly through
//! [`SimulatedPanel::handle_packet`], or serve one half of a
//! [`MemoryLink`] pair with [`SimulatedPanel::spawn`] to exercise the
//! full transport against it.

#![warn(missing_docs)]
#![warn(clippy::all)]

use emberlink_link::builder::{BuildStep, TreeBuilder};
use emberlink_link::link::{Link, MemoryLink};
use emberlink_link::stream::extract_frame;
use emberlink_link::upload::plan_units;
use emberlink_proto::{Packet, PacketKind, Panel};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cadence of the serve loop's receive poll
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Default)]
struct Store {
    builder: TreeBuilder,
    committed: Option<Panel>,
}

/// A simulated endpoint with store-and-replay semantics.
///
/// Clones share one store, so a test can keep a handle for inspection
/// while a spawned serve loop owns another.
#[derive(Clone, Default)]
pub struct SimulatedPanel {
    store: Arc<Mutex<Store>>,
}

impl SimulatedPanel {
    /// Create an endpoint with no stored configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a complete configuration has been committed
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.lock().committed.is_some()
    }

    /// Snapshot of the committed configuration, if any
    #[must_use]
    pub fn stored_panel(&self) -> Option<Panel> {
        self.lock().committed.clone()
    }

    /// Drop both the committed configuration and any partial upload
    pub fn reset(&self) {
        let mut store = self.lock();
        store.builder = TreeBuilder::new();
        store.committed = None;
    }

    /// Answer one inbound packet with zero or more response packets.
    ///
    /// Configuration packets accumulate in a staging tree and are
    /// committed atomically when end-of-transmission arrives; a refused
    /// packet discards the staging tree so the next upload starts clean.
    pub fn handle_packet(&self, packet: &Packet) -> Vec<Packet> {
        match packet.kind() {
            Some(PacketKind::Handshake) => vec![Packet::empty(PacketKind::Ack)],
            Some(PacketKind::DownloadRequest) => self.replay(),
            Some(PacketKind::Ack) | Some(PacketKind::Nack) => Vec::new(),
            Some(_) => self.store_unit(packet),
            None => {
                tracing::debug!(
                    "refusing packet of unknown type 0x{:02X}",
                    packet.type_code()
                );
                vec![Packet::empty(PacketKind::Nack)]
            }
        }
    }

    /// Serve one end of an in-memory link until the peer closes it
    pub fn spawn(&self, link: MemoryLink) -> JoinHandle<()> {
        let endpoint = self.clone();
        tokio::spawn(async move { endpoint.serve(link).await })
    }

    async fn serve(&self, mut link: MemoryLink) {
        let mut rx_buf = Vec::new();
        loop {
            let bytes = match link.try_recv() {
                Ok(bytes) => bytes,
                Err(_) => {
                    tracing::debug!("peer closed, simulated endpoint stopping");
                    return;
                }
            };
            rx_buf.extend_from_slice(&bytes);

            while let Some(frame) = extract_frame(&mut rx_buf) {
                let responses = match Packet::decode(&frame) {
                    Ok(packet) => self.handle_packet(&packet),
                    Err(e) => {
                        tracing::debug!("refusing undecodable frame: {e}");
                        vec![Packet::empty(PacketKind::Nack)]
                    }
                };
                for response in responses {
                    match response.encode() {
                        Ok(bytes) => {
                            if link.send(&bytes).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!("dropping unencodable response: {e}"),
                    }
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn store_unit(&self, packet: &Packet) -> Vec<Packet> {
        let mut store = self.lock();
        match store.builder.apply(packet) {
            Ok(BuildStep::Stored(label)) => {
                tracing::debug!("stored {label}");
                vec![Packet::empty(PacketKind::Ack)]
            }
            Ok(BuildStep::Finished) => {
                let staged = std::mem::take(&mut store.builder).finish();
                if let Some(panel) = staged {
                    tracing::info!("committed configuration for panel '{}'", panel.name);
                    store.committed = Some(panel);
                }
                vec![Packet::empty(PacketKind::Ack)]
            }
            Ok(BuildStep::Ignored) => Vec::new(),
            Err(e) => {
                tracing::warn!("refusing packet: {e}");
                store.builder = TreeBuilder::new();
                vec![Packet::empty(PacketKind::Nack)]
            }
        }
    }

    fn replay(&self) -> Vec<Packet> {
        let mut responses = vec![Packet::empty(PacketKind::Ack)];
        match self.lock().committed.as_ref() {
            Some(panel) => {
                responses.extend(plan_units(panel).into_iter().map(|(packet, _)| packet));
            }
            None => responses.push(Packet::empty(PacketKind::EndTransmission)),
        }
        responses
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
