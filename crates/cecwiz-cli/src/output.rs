//! Human-readable and JSON rendering of command results

use anyhow::Result;
use cecwiz_core::{ActiveSource, Device, LocalDevice, ResponderExit, TopologyTree};
use serde::Serialize;
use std::fmt::Write;

/// Print `value` as pretty JSON, or the text built by `human`
pub fn emit<T, F>(json: bool, value: &T, human: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = human();
        if !text.is_empty() {
            println!("{}", text.trim_end());
        }
    }
    Ok(())
}

pub fn device_line(device: &Device) -> String {
    format!(
        "{:>2}  {}  {:<10} {:<16} {}",
        device.logical_address,
        device.physical_address,
        device.device_type.label(),
        device.name(),
        device.power_status
    )
}

pub fn device_table(devices: &[Device]) -> String {
    devices.iter().map(device_line).collect::<Vec<_>>().join("\n")
}

pub fn local_device(local: &LocalDevice) -> String {
    format!(
        "Handle:           {}\n\
         Physical address: {}\n\
         Logical address:  {}\n\
         Device type:      {}\n\
         OSD name:         {}\n\
         CEC version:      {}\n\
         Vendor ID:        {}\n\
         Power status:     {}",
        local.handle,
        local.physical_address,
        local.logical_address,
        local.device_type,
        local.osd_name.as_deref().unwrap_or("-"),
        local.cec_version,
        local.vendor_id,
        local.power_status
    )
}

/// Indent every level of the tree by two spaces
pub fn topology(roots: &[TopologyTree]) -> String {
    fn walk(node: &TopologyTree, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.physical_address);
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = String::new();
    for root in roots {
        walk(root, 0, &mut out);
    }
    out
}

pub fn active_sources(sources: &[ActiveSource]) -> String {
    if sources.is_empty() {
        return "No active source reported".to_string();
    }
    sources
        .iter()
        .map(|source| match source.physical_address {
            Some(addr) => format!("{} at {}", source.logical_address, addr),
            None => source.logical_address.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn responder_exit(exit: &ResponderExit) -> String {
    let mut out = format!("Responder stopped at {} ({})", exit.stopped_at.to_rfc3339(), exit);
    for line in exit.stderr.lines() {
        let _ = write!(out, "\n  {}", line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cecwiz_core::Topology;

    #[test]
    fn test_topology_rendering() {
        let topology = Topology::reconstruct(
            "\tTopology:\n\n\t0.0.0.0: TV\n\t    1.0.0.0: Playback\n\t        1.1.0.0: Recorder\n\t    2.0.0.0: Audio\n",
        )
        .unwrap();

        assert_eq!(
            super::topology(&topology.to_tree()),
            "0.0.0.0\n  1.0.0.0\n    1.1.0.0\n  2.0.0.0\n"
        );
    }

    #[test]
    fn test_active_sources_rendering() {
        let sources = vec![ActiveSource {
            logical_address: "4".parse().unwrap(),
            physical_address: Some("1.0.0.0".parse().unwrap()),
        }];
        assert_eq!(active_sources(&sources), "4 at 1.0.0.0");
        assert_eq!(active_sources(&[]), "No active source reported");
    }
}
