//! Project file I/O.
//!
//! A project file is one configuration tree serialized as JSON, the
//! interchange format between the desktop editor and this tool.

use emberlink_proto::Panel;
use std::fs;
use std::path::Path;

/// Load a configuration tree from a JSON project file
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Panel> {
    let contents = fs::read_to_string(&path)?;
    let panel: Panel = serde_json::from_str(&contents)?;
    Ok(panel)
}

/// Save a configuration tree as a JSON project file
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save<P: AsRef<Path>>(path: P, panel: &Panel) -> anyhow::Result<()> {
    let contents = serde_json::to_string_pretty(panel)?;
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Check a tree against the protocol's field limits.
///
/// # Errors
///
/// Returns an error naming the first offending field.
pub fn validate(panel: &Panel) -> anyhow::Result<()> {
    check_name("panel name", &panel.name)?;
    check_name("panel location", &panel.location)?;
    for lp in &panel.loops {
        check_name(&format!("loop {} name", lp.number), &lp.name)?;
        for device in &lp.devices {
            check_name(
                &format!("loop {} device {} location", lp.number, device.address),
                &device.location,
            )?;
        }
    }
    for bus in &panel.buses {
        check_name(&format!("bus {} name", bus.number), &bus.name)?;
        for node in &bus.nodes {
            check_name(&format!("bus {} node {} name", bus.number, node.address), &node.name)?;
            check_name(
                &format!("bus {} node {} location", bus.number, node.address),
                &node.location,
            )?;
        }
    }
    for rule in &panel.rules {
        check_name("rule name", &rule.name)?;
    }
    Ok(())
}

fn check_name(what: &str, value: &str) -> anyhow::Result<()> {
    if value.len() > emberlink_proto::MAX_NAME_LEN {
        anyhow::bail!(
            "{what} is {} bytes, limit is {} (it would be truncated on the wire)",
            value.len(),
            emberlink_proto::MAX_NAME_LEN
        );
    }
    Ok(())
}
