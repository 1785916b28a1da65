//! cec-ctl argument synthesis for high-level actions
//!
//! Every function here is pure: it only builds the flag vector that follows
//! `cec-ctl -d <handle>`. Running it is the job of the command runner.

use crate::button::Button;
use crate::device::{DeviceType, LogicalAddress, PhysicalAddress};
use crate::error::{Error, Result};

/// Suppresses the driver info block in cec-ctl output
pub const SKIP_INFO: &str = "--skip-info";

/// Longest OSD name the CEC protocol accepts
pub const MAX_OSD_NAME_LEN: usize = 14;

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// `--to <logical address>`
pub fn to_target(target: LogicalAddress) -> Vec<String> {
    vec!["--to".to_string(), target.to_string()]
}

fn targeted(target: LogicalAddress, rest: Vec<String>) -> Vec<String> {
    let mut command = to_target(target);
    command.extend(rest);
    command
}

/// Emulate a user pressing a remote button.
///
/// Some devices treat a press as a hold until the matching release.
pub fn press_button(target: LogicalAddress, button: Button) -> Vec<String> {
    targeted(
        target,
        vec![
            "--user-control-pressed".to_string(),
            format!("ui-cmd={}", button.as_str()),
        ],
    )
}

/// Release the last pressed button
pub fn release_button(target: LogicalAddress) -> Vec<String> {
    targeted(target, args(["--user-control-released"]))
}

/// Raw CEC message, `opcode` as written by the caller (e.g. `0x44`)
pub fn custom_command(target: LogicalAddress, opcode: &str, payload: Option<&str>) -> Vec<String> {
    let mut cmd = format!("cmd={}", opcode);
    if let Some(payload) = payload.filter(|p| !p.is_empty()) {
        cmd.push_str(",payload=");
        cmd.push_str(payload);
    }
    targeted(target, vec!["--custom-command".to_string(), cmd])
}

pub fn power_status_query(target: LogicalAddress) -> Vec<String> {
    targeted(target, args(["--give-device-power-status"]))
}

/// Put the target in standby
pub fn standby(target: LogicalAddress) -> Vec<String> {
    targeted(target, args(["--standby"]))
}

/// Wake the target and ask it to show our input
pub fn image_view_on(target: LogicalAddress) -> Vec<String> {
    targeted(target, args(["--image-view-on"]))
}

/// Broadcast that `source` started streaming
pub fn active_source(source: PhysicalAddress) -> Vec<String> {
    vec!["--active-source".to_string(), format!("phys-addr={}", source)]
}

/// Broadcast that `source` stopped streaming
pub fn inactive_source(source: PhysicalAddress) -> Vec<String> {
    vec!["--inactive-source".to_string(), format!("phys-addr={}", source)]
}

/// Ask every device to report whether it is the active source
pub fn request_active_source() -> Vec<String> {
    args(["--request-active-source"])
}

pub fn show_topology() -> Vec<String> {
    args(["--show-topology"])
}

/// Configure the local adapter as `device_type`, optionally with an OSD name
pub fn configure(device_type: DeviceType, osd_name: Option<&str>) -> Result<Vec<String>> {
    let mut command = vec![device_type.flag().to_string()];
    if let Some(name) = osd_name.filter(|n| !n.is_empty()) {
        if name.chars().count() > MAX_OSD_NAME_LEN {
            return Err(Error::InvalidConfiguration(format!(
                "OSD name cannot exceed {} characters: '{}'",
                MAX_OSD_NAME_LEN, name
            )));
        }
        command.push("--osd-name".to_string());
        command.push(name.to_string());
    }
    Ok(command)
}
