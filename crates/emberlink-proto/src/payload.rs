//! Per-entity payload codecs.
//!
//! One encode/decode pair per configuration packet kind. Field order is
//! fixed by the wire protocol; every configuration payload opens with the
//! owning panel address even though the receiver reconstructs parentage
//! purely from packet order.
//!
//! Decoders return entities with empty child collections; children arrive
//! as separate packets. Container payloads also carry the child count the
//! sender observed, which receivers may use for progress display but not
//! for parsing.

use crate::error::ProtoError;
use crate::model::{
    Bus, BusKind, BusNode, CeInput, CeOutput, CeRule, ContentType, Device, DeviceRef, HttpMethod,
    LogicGate, Loop, Panel,
};
use crate::wire::{WireReader, WireWriter};
use crate::MAX_NAME_LEN;

/// Rule input address type: field device
pub const INPUT_DEVICE: u8 = 0x01;
/// Rule input address type: time-of-day window
pub const INPUT_TIME_OF_DAY: u8 = 0x02;
/// Rule input address type: absolute date-time trigger
pub const INPUT_DATE_TIME: u8 = 0x03;
/// Rule input address type: inbound API webhook
pub const INPUT_WEBHOOK: u8 = 0x04;

/// Rule output address type: field device
pub const OUTPUT_DEVICE: u8 = 0x10;
/// Rule output address type: SMS send
pub const OUTPUT_SMS: u8 = 0x11;
/// Rule output address type: email send
pub const OUTPUT_EMAIL: u8 = 0x12;
/// Rule output address type: outbound API call
pub const OUTPUT_API: u8 = 0x13;

/// Encode a panel packet payload.
///
/// The two trailing count bytes are the actual loop and bus counts of
/// the tree being sent, not the panel's declared counts.
#[must_use]
pub fn encode_panel(panel: &Panel) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel.address);
    w.write_str(&panel.name, MAX_NAME_LEN);
    w.write_str(&panel.location, MAX_NAME_LEN);
    w.write_u8(panel.loops.len() as u8);
    w.write_u8(panel.buses.len() as u8);
    w.into_payload()
}

/// Decode a panel packet payload into a panel with no children yet.
/// The trailing counts land in the declared-count fields, so a tree
/// that crosses the wire comes back with those fields rewritten.
pub fn decode_panel(payload: &[u8]) -> Result<Panel, ProtoError> {
    let mut r = WireReader::new(payload);
    Ok(Panel {
        address: r.read_u8()?,
        name: r.read_str()?,
        location: r.read_str()?,
        loop_count: r.read_u8()?,
        zone_count: r.read_u8()?,
        ..Panel::default()
    })
}

/// Encode a loop packet payload
#[must_use]
pub fn encode_loop(panel_address: u8, lp: &Loop) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    w.write_u8(lp.number);
    w.write_str(&lp.name, MAX_NAME_LEN);
    w.write_u8(lp.protocol);
    w.write_u8(lp.devices.len() as u8);
    w.into_payload()
}

/// Decode a loop packet payload; returns the owning panel address and the
/// loop with no devices yet
pub fn decode_loop(payload: &[u8]) -> Result<(u8, Loop), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let lp = Loop {
        number: r.read_u8()?,
        name: r.read_str()?,
        protocol: r.read_u8()?,
        devices: Vec::new(),
    };
    let _device_count = r.read_u8()?;
    Ok((panel_address, lp))
}

/// Encode a device packet payload
#[must_use]
pub fn encode_device(panel_address: u8, loop_number: u8, device: &Device) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    w.write_u8(loop_number);
    w.write_u8(device.address);
    w.write_u8(device.type_code);
    w.write_str(&device.location, MAX_NAME_LEN);
    w.write_u8(device.zone);
    w.into_payload()
}

/// Decode a device packet payload; returns (panel address, loop number,
/// device)
pub fn decode_device(payload: &[u8]) -> Result<(u8, u8, Device), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let loop_number = r.read_u8()?;
    let device = Device {
        address: r.read_u8()?,
        type_code: r.read_u8()?,
        location: r.read_str()?,
        zone: r.read_u8()?,
    };
    Ok((panel_address, loop_number, device))
}

/// Encode a bus packet payload
#[must_use]
pub fn encode_bus(panel_address: u8, bus: &Bus) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    w.write_u8(bus.number);
    w.write_str(&bus.name, MAX_NAME_LEN);
    w.write_u8(bus.kind.flag());
    w.write_u8(bus.nodes.len() as u8);
    w.into_payload()
}

/// Decode a bus packet payload; returns the owning panel address and the
/// bus with no nodes yet
pub fn decode_bus(payload: &[u8]) -> Result<(u8, Bus), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let bus = Bus {
        number: r.read_u8()?,
        name: r.read_str()?,
        kind: BusKind::from_flag(r.read_u8()?),
        nodes: Vec::new(),
    };
    let _node_count = r.read_u8()?;
    Ok((panel_address, bus))
}

/// Encode a bus node packet payload
#[must_use]
pub fn encode_bus_node(panel_address: u8, bus_number: u8, node: &BusNode) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    w.write_u8(bus_number);
    w.write_u8(node.address);
    w.write_str(&node.name, MAX_NAME_LEN);
    w.write_str(&node.location, MAX_NAME_LEN);
    w.into_payload()
}

/// Decode a bus node packet payload; returns (panel address, bus number,
/// node)
pub fn decode_bus_node(payload: &[u8]) -> Result<(u8, u8, BusNode), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let bus_number = r.read_u8()?;
    let node = BusNode {
        address: r.read_u8()?,
        name: r.read_str()?,
        location: r.read_str()?,
    };
    Ok((panel_address, bus_number, node))
}

/// Encode a rule header packet payload
#[must_use]
pub fn encode_ce_header(panel_address: u8, rule: &CeRule) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    w.write_str(&rule.name, MAX_NAME_LEN);
    w.write_bool(rule.enabled);
    w.write_u8(rule.gate.code());
    w.write_u8(rule.inputs.len() as u8);
    w.write_u8(rule.outputs.len() as u8);
    w.into_payload()
}

/// Decode a rule header packet payload; returns the owning panel address
/// and the rule with no inputs or outputs yet
pub fn decode_ce_header(payload: &[u8]) -> Result<(u8, CeRule), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let rule = CeRule {
        name: r.read_str()?,
        enabled: r.read_bool()?,
        gate: LogicGate::from_code(r.read_u8()?),
        inputs: Vec::new(),
        outputs: Vec::new(),
    };
    let _input_count = r.read_u8()?;
    let _output_count = r.read_u8()?;
    Ok((panel_address, rule))
}

/// Encode a rule input packet payload
#[must_use]
pub fn encode_ce_input(panel_address: u8, input: &CeInput) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    match input {
        CeInput::Device(device) => {
            w.write_u8(INPUT_DEVICE);
            write_device_ref(&mut w, device);
        }
        CeInput::TimeOfDay {
            start_hour,
            start_minute,
            end_hour,
            end_minute,
        } => {
            w.write_u8(INPUT_TIME_OF_DAY);
            w.write_u8(*start_hour);
            w.write_u8(*start_minute);
            w.write_u8(*end_hour);
            w.write_u8(*end_minute);
            w.write_ext(&[]);
        }
        CeInput::DateTime {
            year,
            month,
            day,
            hour,
            minute,
        } => {
            w.write_u8(INPUT_DATE_TIME);
            w.write_u8(*month);
            w.write_u8(*day);
            w.write_u8(*hour);
            w.write_u8(*minute);
            w.write_ext(&[&year.to_string()]);
        }
        CeInput::Webhook {
            method,
            listen_url,
            expected_path,
            auth_token,
        } => {
            w.write_u8(INPUT_WEBHOOK);
            w.write_u8(method.code());
            w.write_u8(0);
            w.write_u8(0);
            w.write_u8(0);
            w.write_ext(&[listen_url, expected_path, auth_token]);
        }
    }
    w.into_payload()
}

/// Decode a rule input packet payload; returns (panel address, input).
///
/// # Errors
///
/// `ProtoError::UnknownAddressType` if the address type byte is outside
/// the input table.
pub fn decode_ce_input(payload: &[u8]) -> Result<(u8, CeInput), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let address_type = r.read_u8()?;
    let data = [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?];
    let ext = r.read_ext()?;

    let input = match address_type {
        INPUT_DEVICE => CeInput::Device(read_device_ref(data, &ext)),
        INPUT_TIME_OF_DAY => CeInput::TimeOfDay {
            start_hour: data[0],
            start_minute: data[1],
            end_hour: data[2],
            end_minute: data[3],
        },
        INPUT_DATE_TIME => CeInput::DateTime {
            year: ext.first().and_then(|s| s.parse().ok()).unwrap_or(0),
            month: data[0],
            day: data[1],
            hour: data[2],
            minute: data[3],
        },
        INPUT_WEBHOOK => CeInput::Webhook {
            method: HttpMethod::from_code(data[0]),
            listen_url: ext_field(&ext, 0),
            expected_path: ext_field(&ext, 1),
            auth_token: ext_field(&ext, 2),
        },
        other => return Err(ProtoError::UnknownAddressType(other)),
    };
    Ok((panel_address, input))
}

/// Encode a rule output packet payload
#[must_use]
pub fn encode_ce_output(panel_address: u8, output: &CeOutput) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.write_u8(panel_address);
    match output {
        CeOutput::Device(device) => {
            w.write_u8(OUTPUT_DEVICE);
            write_device_ref(&mut w, device);
        }
        CeOutput::Sms {
            phone_number,
            message,
        } => {
            w.write_u8(OUTPUT_SMS);
            w.write_u8(0);
            w.write_u8(0);
            w.write_u8(0);
            w.write_u8(0);
            w.write_ext(&[phone_number, message]);
        }
        CeOutput::Email {
            address,
            subject,
            body,
        } => {
            w.write_u8(OUTPUT_EMAIL);
            w.write_u8(0);
            w.write_u8(0);
            w.write_u8(0);
            w.write_u8(0);
            w.write_ext(&[address, subject, body]);
        }
        CeOutput::ApiCall {
            method,
            content_type,
            url,
            body,
        } => {
            w.write_u8(OUTPUT_API);
            w.write_u8(method.code());
            w.write_u8(content_type.code());
            w.write_u8(0);
            w.write_u8(0);
            w.write_ext(&[url, body]);
        }
    }
    w.into_payload()
}

/// Decode a rule output packet payload; returns (panel address, output).
///
/// # Errors
///
/// `ProtoError::UnknownAddressType` if the address type byte is outside
/// the output table.
pub fn decode_ce_output(payload: &[u8]) -> Result<(u8, CeOutput), ProtoError> {
    let mut r = WireReader::new(payload);
    let panel_address = r.read_u8()?;
    let address_type = r.read_u8()?;
    let data = [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?];
    let ext = r.read_ext()?;

    let output = match address_type {
        OUTPUT_DEVICE => CeOutput::Device(read_device_ref(data, &ext)),
        OUTPUT_SMS => CeOutput::Sms {
            phone_number: ext_field(&ext, 0),
            message: ext_field(&ext, 1),
        },
        OUTPUT_EMAIL => CeOutput::Email {
            address: ext_field(&ext, 0),
            subject: ext_field(&ext, 1),
            body: ext_field(&ext, 2),
        },
        OUTPUT_API => CeOutput::ApiCall {
            method: HttpMethod::from_code(data[0]),
            content_type: ContentType::from_code(data[1]),
            url: ext_field(&ext, 0),
            body: ext_field(&ext, 1),
        },
        other => return Err(ProtoError::UnknownAddressType(other)),
    };
    Ok((panel_address, output))
}

fn write_device_ref(w: &mut WireWriter, device: &DeviceRef) {
    w.write_u8(device.panel);
    w.write_u8(device.loop_or_bus);
    w.write_u8(device.address);
    w.write_u8(device.sub_address);
    w.write_ext(&[&device.type_name, &device.location]);
}

fn read_device_ref(data: [u8; 4], ext: &[String]) -> DeviceRef {
    DeviceRef {
        panel: data[0],
        loop_or_bus: data[1],
        address: data[2],
        sub_address: data[3],
        type_name: ext_field(ext, 0),
        location: ext_field(ext, 1),
    }
}

fn ext_field(ext: &[String], index: usize) -> String {
    ext.get(index).cloned().unwrap_or_default()
}
