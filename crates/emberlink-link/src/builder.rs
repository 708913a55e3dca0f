//! Incremental configuration tree assembly.
//!
//! Both the host's download path and the simulated endpoint rebuild a
//! [`Panel`] from the same parent-before-child packet stream, so the
//! assembly lives here once. The builder is strict: a child packet with
//! no live parent is a protocol violation, not something to repair.

use crate::error::SessionError;
use emberlink_proto::{payload, Packet, PacketKind, Panel};

/// Result of applying one packet to the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// The packet was decoded and stored in the tree
    Stored(String),
    /// End of transmission; the tree is complete
    Finished,
    /// Control packet or unknown type, nothing stored
    Ignored,
}

/// Assembles a configuration tree from an ordered packet stream.
///
/// Parent pointers track the most recent loop, bus, and rule so that
/// child packets attach without carrying parent identifiers on the wire.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    panel: Option<Panel>,
    current_loop: Option<usize>,
    current_bus: Option<usize>,
    current_rule: Option<usize>,
}

impl TreeBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a panel packet has been applied
    #[must_use]
    pub fn has_panel(&self) -> bool {
        self.panel.is_some()
    }

    /// Consume the builder, yielding the assembled tree if any
    #[must_use]
    pub fn finish(self) -> Option<Panel> {
        self.panel
    }

    /// Apply one packet to the tree under construction.
    ///
    /// # Errors
    ///
    /// `SessionError::Proto` if a configuration payload fails to decode;
    /// `SessionError::Protocol` for a child packet with no live parent
    /// or a second panel packet in one stream.
    pub fn apply(&mut self, packet: &Packet) -> Result<BuildStep, SessionError> {
        let Some(kind) = packet.kind() else {
            tracing::debug!(
                "ignoring packet of unknown type 0x{:02X}",
                packet.type_code()
            );
            return Ok(BuildStep::Ignored);
        };

        match kind {
            PacketKind::PanelConfig => {
                if self.panel.is_some() {
                    return Err(SessionError::Protocol(
                        "second panel packet within one transfer".into(),
                    ));
                }
                let panel = payload::decode_panel(packet.payload())?;
                let label = format!("panel '{}'", panel.name);
                self.panel = Some(panel);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::LoopConfig => {
                let (_, lp) = payload::decode_loop(packet.payload())?;
                let label = format!("loop {}", lp.number);
                let panel = self.require_panel("loop")?;
                panel.loops.push(lp);
                self.current_loop = Some(panel.loops.len() - 1);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::DeviceConfig => {
                let (_, _, device) = payload::decode_device(packet.payload())?;
                let label = format!("device {}", device.address);
                let idx = self
                    .current_loop
                    .ok_or_else(|| orphan("device", "loop"))?;
                let panel = self.require_panel("device")?;
                panel.loops[idx].devices.push(device);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::BusConfig => {
                let (_, bus) = payload::decode_bus(packet.payload())?;
                let label = format!("bus {}", bus.number);
                let panel = self.require_panel("bus")?;
                panel.buses.push(bus);
                self.current_bus = Some(panel.buses.len() - 1);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::BusNodeConfig => {
                let (_, _, node) = payload::decode_bus_node(packet.payload())?;
                let label = format!("bus node {}", node.address);
                let idx = self
                    .current_bus
                    .ok_or_else(|| orphan("bus node", "bus"))?;
                let panel = self.require_panel("bus node")?;
                panel.buses[idx].nodes.push(node);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::CeHeader => {
                let (_, rule) = payload::decode_ce_header(packet.payload())?;
                let label = format!("rule '{}'", rule.name);
                let panel = self.require_panel("rule")?;
                panel.rules.push(rule);
                self.current_rule = Some(panel.rules.len() - 1);
                Ok(BuildStep::Stored(label))
            }
            PacketKind::CeInput => {
                let (_, input) = payload::decode_ce_input(packet.payload())?;
                let idx = self
                    .current_rule
                    .ok_or_else(|| orphan("rule input", "rule"))?;
                let panel = self.require_panel("rule input")?;
                panel.rules[idx].inputs.push(input);
                Ok(BuildStep::Stored("rule input".into()))
            }
            PacketKind::CeOutput => {
                let (_, output) = payload::decode_ce_output(packet.payload())?;
                let idx = self
                    .current_rule
                    .ok_or_else(|| orphan("rule output", "rule"))?;
                let panel = self.require_panel("rule output")?;
                panel.rules[idx].outputs.push(output);
                Ok(BuildStep::Stored("rule output".into()))
            }
            PacketKind::EndTransmission => Ok(BuildStep::Finished),
            PacketKind::Handshake
            | PacketKind::Ack
            | PacketKind::Nack
            | PacketKind::DownloadRequest => Ok(BuildStep::Ignored),
        }
    }

    fn require_panel(&mut self, what: &str) -> Result<&mut Panel, SessionError> {
        self.panel.as_mut().ok_or_else(|| orphan(what, "panel"))
    }
}

fn orphan(what: &str, parent: &str) -> SessionError {
    SessionError::Protocol(format!("{what} packet with no preceding {parent}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberlink_proto::{payload, Bus, BusNode, CeRule, Device, Loop, Panel};

    fn panel_packet() -> Packet {
        let panel = Panel {
            address: 1,
            name: "Main".into(),
            location: "Lobby".into(),
            loop_count: 1,
            zone_count: 4,
            ..Panel::default()
        };
        Packet::new(PacketKind::PanelConfig, payload::encode_panel(&panel))
    }

    #[test]
    fn assembles_nested_tree() {
        let mut builder = TreeBuilder::new();
        builder.apply(&panel_packet()).unwrap();

        let lp = Loop {
            number: 1,
            name: "Ground".into(),
            protocol: 0,
            devices: Vec::new(),
        };
        builder
            .apply(&Packet::new(
                PacketKind::LoopConfig,
                payload::encode_loop(1, &lp),
            ))
            .unwrap();

        let device = Device {
            address: 7,
            type_code: 0x01,
            location: "Hall".into(),
            zone: 2,
        };
        builder
            .apply(&Packet::new(
                PacketKind::DeviceConfig,
                payload::encode_device(1, 1, &device),
            ))
            .unwrap();

        let bus = Bus::default();
        builder
            .apply(&Packet::new(
                PacketKind::BusConfig,
                payload::encode_bus(1, &bus),
            ))
            .unwrap();
        let node = BusNode {
            address: 3,
            name: "Repeater".into(),
            location: "Stairwell".into(),
        };
        builder
            .apply(&Packet::new(
                PacketKind::BusNodeConfig,
                payload::encode_bus_node(1, 0, &node),
            ))
            .unwrap();

        let step = builder
            .apply(&Packet::empty(PacketKind::EndTransmission))
            .unwrap();
        assert_eq!(step, BuildStep::Finished);

        let panel = builder.finish().unwrap();
        assert_eq!(panel.loops.len(), 1);
        assert_eq!(panel.loops[0].devices, vec![device]);
        assert_eq!(panel.buses[0].nodes, vec![node]);
    }

    #[test]
    fn device_before_loop_is_rejected() {
        let mut builder = TreeBuilder::new();
        builder.apply(&panel_packet()).unwrap();

        let device = Device::default();
        let err = builder
            .apply(&Packet::new(
                PacketKind::DeviceConfig,
                payload::encode_device(1, 1, &device),
            ))
            .unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn anything_before_panel_is_rejected() {
        let mut builder = TreeBuilder::new();
        let lp = Loop::default();
        let err = builder
            .apply(&Packet::new(
                PacketKind::LoopConfig,
                payload::encode_loop(1, &lp),
            ))
            .unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn second_panel_is_rejected() {
        let mut builder = TreeBuilder::new();
        builder.apply(&panel_packet()).unwrap();
        let err = builder.apply(&panel_packet()).unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn input_after_rule_attaches_to_it() {
        let mut builder = TreeBuilder::new();
        builder.apply(&panel_packet()).unwrap();

        let rule = CeRule {
            name: "Night mode".into(),
            enabled: true,
            ..CeRule::default()
        };
        builder
            .apply(&Packet::new(
                PacketKind::CeHeader,
                payload::encode_ce_header(1, &rule),
            ))
            .unwrap();

        let input = emberlink_proto::CeInput::TimeOfDay {
            start_hour: 22,
            start_minute: 0,
            end_hour: 6,
            end_minute: 30,
        };
        builder
            .apply(&Packet::new(
                PacketKind::CeInput,
                payload::encode_ce_input(1, &input),
            ))
            .unwrap();

        let panel = builder.finish().unwrap();
        assert_eq!(panel.rules[0].inputs, vec![input]);
    }

    #[test]
    fn control_packets_are_ignored() {
        let mut builder = TreeBuilder::new();
        for kind in [
            PacketKind::Handshake,
            PacketKind::Ack,
            PacketKind::Nack,
            PacketKind::DownloadRequest,
        ] {
            assert_eq!(
                builder.apply(&Packet::empty(kind)).unwrap(),
                BuildStep::Ignored
            );
        }
        assert!(!builder.has_panel());
    }
}
