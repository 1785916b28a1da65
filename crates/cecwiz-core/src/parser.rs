//! Device info extraction from cec-ctl reports
//!
//! cec-ctl prints device fields as `Label : value` lines. The same fields
//! appear in two report shapes:
//! - the single-device report (`cec-ctl -d /dev/cecX`), where the logical
//!   address has its own `Logical Address` line
//! - one entry of a `--show-topology` dump, where the logical address only
//!   appears in the `System Information for device N (...)` header
//!
//! Each field is searched independently so the surrounding text and the
//! field order do not matter.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::device::{Device, DeviceType, LogicalAddress, PhysicalAddress};
use crate::error::{Error, Result};

fn field(label: &str) -> Regex {
    Regex::new(&format!(r"(?m){}[ \t]*:[ \t]*(.+)$", label)).expect("valid field regex")
}

static VERSION: LazyLock<Regex> = LazyLock::new(|| field("CEC Version"));
static DEVICE_TYPE: LazyLock<Regex> = LazyLock::new(|| field("Primary Device Type"));
static VENDOR_ID: LazyLock<Regex> = LazyLock::new(|| field("Vendor ID"));
static POWER_STATUS: LazyLock<Regex> = LazyLock::new(|| field("Power Status"));

static PHYSICAL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Physical Address[ \t]*:[ \t]*(\w+\.\w+\.\w+\.\w+)").expect("valid regex")
});
static LOGICAL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Logical Address[ \t]*:[ \t]*(\d+)\b").expect("valid regex"));
static OSD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"OSD Name[ \t]*:[ \t]*'(.+)'").expect("valid regex"));

static TOPOLOGY_LOGICAL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*System Information for device (\d+) (.+):").expect("valid regex")
});
static DEVICE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*System Information for device \d+ \(.+\) from device \d+ \(.+\):")
        .expect("valid regex")
});
pub(crate) static TOPOLOGY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Topology:\s*$").expect("valid regex"));

/// Which report shape a block of text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Output of `cec-ctl -d <handle>` without `--skip-info`
    SingleDevice,
    /// One `System Information` entry of a `--show-topology` dump
    TopologyNode,
}

fn capture<'t>(re: &Regex, text: &'t str, name: &'static str) -> Result<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingField(name))
}

/// Extract a device record from one report block
pub fn parse_device(text: &str, mode: ReportMode) -> Result<Device> {
    let cec_version = capture(&VERSION, text, "CEC Version")?;
    let physical_address: PhysicalAddress =
        capture(&PHYSICAL_ADDRESS, text, "Physical Address")?.parse()?;

    let logical_address: LogicalAddress = match mode {
        ReportMode::SingleDevice => capture(&LOGICAL_ADDRESS, text, "Logical Address")?,
        ReportMode::TopologyNode => capture(&TOPOLOGY_LOGICAL_ADDRESS, text, "Logical Address")?,
    }
    .parse()?;

    let raw_type = capture(&DEVICE_TYPE, text, "Primary Device Type")?;
    let device_type = DeviceType::from_label(raw_type)
        .ok_or_else(|| Error::UnknownDeviceType(raw_type.to_string()))?;

    let vendor_id = capture(&VENDOR_ID, text, "Vendor ID")?;
    let power_status = capture(&POWER_STATUS, text, "Power Status")?;

    let osd_name = OSD_NAME
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    trace!(
        physical_address = %physical_address,
        logical_address = %logical_address,
        device_type = %device_type,
        "Parsed device info"
    );

    Ok(Device {
        cec_version: cec_version.to_string(),
        physical_address,
        logical_address,
        device_type,
        vendor_id: vendor_id.to_string(),
        power_status: power_status.to_string(),
        osd_name,
    })
}

/// Read only the physical address, e.g. to probe whether an adapter is connected
pub fn parse_physical_address(text: &str) -> Result<PhysicalAddress> {
    capture(&PHYSICAL_ADDRESS, text, "Physical Address")?.parse()
}

/// Split a `--show-topology` dump into one text block per device.
///
/// A block starts at a `System Information for device N (...) from device M (...):`
/// header and runs until the next header or the `Topology:` section. Driver
/// info printed before the first header is dropped.
pub fn split_device_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        if TOPOLOGY_HEADER.is_match(line) {
            break;
        }
        if DEVICE_HEADER.is_match(line) {
            if let Some(lines) = current.take() {
                sections.push(lines.join("\n"));
            }
            current = Some(vec![line]);
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some(lines) = current {
        sections.push(lines.join("\n"));
    }

    sections
}

/// Parse every device listed in a `--show-topology` dump
pub fn parse_topology_devices(text: &str) -> Result<Vec<Device>> {
    let devices = split_device_sections(text)
        .iter()
        .map(|section| parse_device(section, ReportMode::TopologyNode))
        .collect::<Result<Vec<_>>>()?;
    debug!("Parsed {} devices from topology dump", devices.len());
    Ok(devices)
}
