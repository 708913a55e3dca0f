//! Configuration tree model.
//!
//! A strict hierarchy rooted at a [`Panel`]: loops contain addressed
//! devices, buses contain nodes, and cause-and-effect rules combine
//! inputs through a logic gate to drive outputs. Children are meaningless
//! without a live parent; the wire protocol carries no parent
//! identifiers, so transfer correctness depends on parent-before-child
//! packet order.

use serde::{Deserialize, Serialize};

/// A fire-alarm control unit, root of one configuration tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Panel {
    /// Panel address on the panel network
    pub address: u8,
    /// Display name, at most 32 encoded bytes
    pub name: String,
    /// Installation location, at most 32 encoded bytes
    pub location: String,
    /// Declared loop count
    pub loop_count: u8,
    /// Declared zone count
    pub zone_count: u8,
    /// Detection loops
    #[serde(default)]
    pub loops: Vec<Loop>,
    /// Communication buses
    #[serde(default)]
    pub buses: Vec<Bus>,
    /// Cause-and-effect rules
    #[serde(default)]
    pub rules: Vec<CeRule>,
}

/// A wired detection circuit containing addressed devices
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Loop {
    /// Loop number on the panel
    pub number: u8,
    /// Display name
    pub name: String,
    /// Loop protocol byte (0 = standard, 1 = advanced)
    pub protocol: u8,
    /// Devices on this loop
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// A single sensor or actuator, addressed within its loop
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    /// Device address within the loop
    pub address: u8,
    /// Device type code, see [`crate::device_types`]
    pub type_code: u8,
    /// Installation location
    pub location: String,
    /// Alarm zone
    pub zone: u8,
}

/// Physical layer of a communication bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BusKind {
    /// CAN bus
    Can,
    /// RS-485 bus
    #[default]
    Rs485,
}

impl BusKind {
    /// Wire flag: CAN = 1, RS-485 = 0
    #[must_use]
    pub fn flag(self) -> u8 {
        match self {
            Self::Can => 1,
            Self::Rs485 => 0,
        }
    }

    /// Decode the wire flag; any nonzero byte is CAN
    #[must_use]
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Self::Can
        } else {
            Self::Rs485
        }
    }
}

/// A secondary communication channel containing nodes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bus {
    /// Bus number on the panel
    pub number: u8,
    /// Display name
    pub name: String,
    /// Physical layer
    pub kind: BusKind,
    /// Nodes on this bus
    #[serde(default)]
    pub nodes: Vec<BusNode>,
}

/// A node on a communication bus
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusNode {
    /// Node address on the bus
    pub address: u8,
    /// Display name
    pub name: String,
    /// Installation location
    pub location: String,
}

/// Logic gate combining a rule's inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogicGate {
    /// Any input active
    #[default]
    Or,
    /// All inputs active
    And,
    /// Exactly one input active
    Xor,
}

impl LogicGate {
    /// Wire code: OR = 0, AND = 1, XOR = 2
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Or => 0x00,
            Self::And => 0x01,
            Self::Xor => 0x02,
        }
    }

    /// Decode the wire code; unknown codes fall back to OR
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::And,
            0x02 => Self::Xor,
            _ => Self::Or,
        }
    }
}

/// HTTP method carried by webhook inputs and API call outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET
    #[default]
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
}

impl HttpMethod {
    /// Wire code: GET = 0, POST = 1, PUT = 2, DELETE = 3
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Get => 0x00,
            Self::Post => 0x01,
            Self::Put => 0x02,
            Self::Delete => 0x03,
        }
    }

    /// Decode the wire code; unknown codes fall back to GET
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Post,
            0x02 => Self::Put,
            0x03 => Self::Delete,
            _ => Self::Get,
        }
    }
}

/// Body content type for API call outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    /// application/json
    #[default]
    Json,
    /// application/xml
    Xml,
    /// text/plain
    Text,
}

impl ContentType {
    /// Wire code: JSON = 0, XML = 1, TEXT = 2
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Json => 0x00,
            Self::Xml => 0x01,
            Self::Text => 0x02,
        }
    }

    /// Decode the wire code; unknown codes fall back to JSON
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Xml,
            0x02 => Self::Text,
            _ => Self::Json,
        }
    }
}

/// Reference to a field device from a rule input or output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Panel address
    pub panel: u8,
    /// Loop number, or 255 for a bus node reference
    pub loop_or_bus: u8,
    /// Device or node address
    pub address: u8,
    /// Sub-address for multi-channel devices
    pub sub_address: u8,
    /// Device type name, round-tripped through the device table
    pub type_name: String,
    /// Installation location
    pub location: String,
}

/// One condition feeding a cause-and-effect rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CeInput {
    /// A field device going into alarm
    Device(DeviceRef),
    /// A daily time-of-day window
    TimeOfDay {
        /// Window start hour (0-23)
        start_hour: u8,
        /// Window start minute (0-59)
        start_minute: u8,
        /// Window end hour (0-23)
        end_hour: u8,
        /// Window end minute (0-59)
        end_minute: u8,
    },
    /// A single absolute trigger instant
    DateTime {
        /// Calendar year
        year: u16,
        /// Calendar month (1-12)
        month: u8,
        /// Day of month (1-31)
        day: u8,
        /// Hour (0-23)
        hour: u8,
        /// Minute (0-59)
        minute: u8,
    },
    /// An inbound API webhook listener
    Webhook {
        /// Expected HTTP method
        method: HttpMethod,
        /// URL the endpoint listens on
        listen_url: String,
        /// Path the request must match
        expected_path: String,
        /// Bearer token the request must carry
        auth_token: String,
    },
}

/// One action driven by a cause-and-effect rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CeOutput {
    /// Activate a field device
    Device(DeviceRef),
    /// Send an SMS message
    Sms {
        /// Destination phone number
        phone_number: String,
        /// Message body
        message: String,
    },
    /// Send an email
    Email {
        /// Destination address
        address: String,
        /// Subject line
        subject: String,
        /// Message body
        body: String,
    },
    /// Make an outbound API call
    ApiCall {
        /// HTTP method
        method: HttpMethod,
        /// Body content type
        content_type: ContentType,
        /// Target URL
        url: String,
        /// Request body
        body: String,
    },
}

/// An automation rule combining inputs through a gate to drive outputs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CeRule {
    /// Display name
    pub name: String,
    /// Whether the rule is active
    pub enabled: bool,
    /// Gate combining the inputs
    pub gate: LogicGate,
    /// Rule inputs
    #[serde(default)]
    pub inputs: Vec<CeInput>,
    /// Rule outputs
    #[serde(default)]
    pub outputs: Vec<CeOutput>,
}
