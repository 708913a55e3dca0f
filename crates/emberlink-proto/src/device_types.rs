//! Bidirectional device type lookup table.
//!
//! Device packets carry a one-byte type code; the editor works with type
//! names. The mapping is a flat data table rather than branching code,
//! with an explicit unknown sentinel: names outside the catalog coerce to
//! [`UNKNOWN_DEVICE_CODE`], which is lossy and expected.

/// Sentinel code for a device type outside the catalog
pub const UNKNOWN_DEVICE_CODE: u8 = 0xFF;

/// Name reported for codes outside the catalog
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Canonical (code, name) catalog
const CATALOG: &[(u8, &str)] = &[
    // Detectors
    (0x01, "Smoke Detector"),
    (0x02, "Heat Detector"),
    (0x03, "Optical Detector"),
    // Call points
    (0x10, "Manual Call Point"),
    (0x11, "Wireless Callpoint"),
    // Sounders
    (0x20, "Base Sounder"),
    (0x21, "Red Sounder"),
    (0x22, "White Sounder"),
    (0x23, "Sounder Beacon"),
    (0x24, "Wireless Base Sounder"),
    (0x25, "Wireless Base With LED"),
    // Beacons
    (0x30, "Beacon"),
    // Modules
    (0x40, "Expander Module"),
    (0x41, "Input Module"),
    (0x42, "Output Module"),
    (0x43, "Remote Indicator"),
    (0x44, "Wireless Expander Module"),
    (0x45, "Wireless Translator"),
    (0x46, "Wireless Translator Module"),
    (0x47, "Single Channel Battery Powered Output"),
    (0x48, "Wireless Single Channel Input Module"),
    // Wireless detectors
    (0x50, "Wireless Heat Detector"),
    (0x51, "Wireless Multi Detector"),
    (0x52, "Wireless Optical Detector"),
];

/// Short names accepted in addition to the canonical ones
const ALIASES: &[(&str, u8)] = &[("callpoint", 0x10), ("sounder", 0x20)];

/// Normalize a name for lookup: lowercase, spaces and underscores removed
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up the wire code for a device type name.
///
/// Matching is case-insensitive and ignores spaces and underscores.
/// Empty or unrecognized names return [`UNKNOWN_DEVICE_CODE`].
#[must_use]
pub fn code_for_name(name: &str) -> u8 {
    let normalized = normalize(name);
    if normalized.is_empty() {
        return UNKNOWN_DEVICE_CODE;
    }
    CATALOG
        .iter()
        .find(|(_, canonical)| normalize(canonical) == normalized)
        .map(|(code, _)| *code)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == normalized)
                .map(|(_, code)| *code)
        })
        .unwrap_or(UNKNOWN_DEVICE_CODE)
}

/// Look up the canonical name for a wire code.
///
/// Codes outside the catalog return [`UNKNOWN_DEVICE_NAME`].
#[must_use]
pub fn name_for_code(code: u8) -> &'static str {
    CATALOG
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_DEVICE_NAME)
}
