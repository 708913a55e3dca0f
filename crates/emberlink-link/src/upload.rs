//! Host-to-endpoint configuration upload.
//!
//! Walks the tree in strict parent-before-child order, one packet per
//! unit, and stops at the first unit the endpoint refuses. The endpoint
//! rebuilds parent pointers from arrival order alone, so the walk order
//! is load-bearing: panel, then each loop followed by its devices, then
//! each bus followed by its nodes, then each rule header followed by its
//! inputs and outputs, then end-of-transmission.

use crate::error::SessionError;
use crate::progress::ProgressSink;
use crate::session::Session;
use emberlink_proto::{payload, Packet, PacketKind, Panel};
use tokio_util::sync::CancellationToken;

/// How an upload ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every unit, including end-of-transmission, was acknowledged
    Complete,
    /// The endpoint refused a unit, or its acknowledgment timed out
    Failed {
        /// One-based index of the failed unit
        unit: usize,
        /// Human-readable description of the failed unit
        label: String,
    },
    /// The caller cancelled mid-transfer; the session stays connected
    Cancelled,
}

/// Number of packets a full upload of `panel` sends, including the
/// trailing end-of-transmission
#[must_use]
pub fn count_units(panel: &Panel) -> usize {
    let loops: usize = panel
        .loops
        .iter()
        .map(|lp| 1 + lp.devices.len())
        .sum();
    let buses: usize = panel.buses.iter().map(|b| 1 + b.nodes.len()).sum();
    let rules: usize = panel
        .rules
        .iter()
        .map(|r| 1 + r.inputs.len() + r.outputs.len())
        .sum();
    1 + loops + buses + rules + 1
}

/// Upload one configuration tree over a connected session.
///
/// Each unit is sent and individually acknowledged before the next goes
/// out. Progress is reported before each unit as `(done, total)`.
///
/// # Errors
///
/// `SessionError::NotConnected` before any packet is written if the
/// session is not connected; transport and protocol errors from the
/// underlying session otherwise. Cancellation and endpoint refusal are
/// reported through [`UploadOutcome`], not as errors.
pub async fn upload(
    session: &mut Session,
    panel: &Panel,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<UploadOutcome, SessionError> {
    if !session.is_connected() {
        return Err(SessionError::NotConnected);
    }

    let units = plan_units(panel);
    let total = units.len();

    for (index, (packet, label)) in units.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("upload cancelled before unit {}/{}", index + 1, total);
            return Ok(UploadOutcome::Cancelled);
        }
        progress.report(index, total, label);

        match session.send_and_await_ack(packet, cancel).await {
            Ok(true) => {
                tracing::debug!("unit {}/{} acknowledged: {label}", index + 1, total);
            }
            Ok(false) => {
                tracing::warn!("unit {}/{} refused: {label}", index + 1, total);
                return Ok(UploadOutcome::Failed {
                    unit: index + 1,
                    label: label.clone(),
                });
            }
            Err(SessionError::Cancelled) => {
                tracing::info!("upload cancelled at unit {}/{}", index + 1, total);
                return Ok(UploadOutcome::Cancelled);
            }
            Err(e) => return Err(e),
        }
    }

    progress.report(total, total, "complete");
    tracing::info!("upload complete, {total} units");
    Ok(UploadOutcome::Complete)
}

/// Flatten a tree into its transmission order: panel, each loop followed
/// by its devices, each bus followed by its nodes, each rule header
/// followed by its inputs and outputs, then end-of-transmission. Each
/// unit carries a label for progress and failure reporting.
#[must_use]
pub fn plan_units(panel: &Panel) -> Vec<(Packet, String)> {
    let mut units: Vec<(Packet, String)> = Vec::with_capacity(count_units(panel));

    units.push((
        Packet::new(PacketKind::PanelConfig, payload::encode_panel(panel)),
        format!("panel '{}'", panel.name),
    ));
    for lp in &panel.loops {
        units.push((
            Packet::new(
                PacketKind::LoopConfig,
                payload::encode_loop(panel.address, lp),
            ),
            format!("loop {}", lp.number),
        ));
        for device in &lp.devices {
            units.push((
                Packet::new(
                    PacketKind::DeviceConfig,
                    payload::encode_device(panel.address, lp.number, device),
                ),
                format!("loop {} device {}", lp.number, device.address),
            ));
        }
    }
    for bus in &panel.buses {
        units.push((
            Packet::new(
                PacketKind::BusConfig,
                payload::encode_bus(panel.address, bus),
            ),
            format!("bus {}", bus.number),
        ));
        for node in &bus.nodes {
            units.push((
                Packet::new(
                    PacketKind::BusNodeConfig,
                    payload::encode_bus_node(panel.address, bus.number, node),
                ),
                format!("bus {} node {}", bus.number, node.address),
            ));
        }
    }
    for rule in &panel.rules {
        units.push((
            Packet::new(
                PacketKind::CeHeader,
                payload::encode_ce_header(panel.address, rule),
            ),
            format!("rule '{}'", rule.name),
        ));
        for input in &rule.inputs {
            units.push((
                Packet::new(
                    PacketKind::CeInput,
                    payload::encode_ce_input(panel.address, input),
                ),
                format!("rule '{}' input", rule.name),
            ));
        }
        for output in &rule.outputs {
            units.push((
                Packet::new(
                    PacketKind::CeOutput,
                    payload::encode_ce_output(panel.address, output),
                ),
                format!("rule '{}' output", rule.name),
            ));
        }
    }
    units.push((
        Packet::empty(PacketKind::EndTransmission),
        "end of transmission".into(),
    ));

    units
}
