//! Device types for tracking nodes on the CEC bus

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Four-level HDMI physical address, one hex nibble per level (e.g. `1.0.0.0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalAddress([u8; 4]);

impl PhysicalAddress {
    /// Address of the root display
    pub const ROOT: Self = Self([0, 0, 0, 0]);

    /// Address reported by an adapter with no HDMI link
    pub const NOT_CONNECTED: Self = Self([0xf, 0xf, 0xf, 0xf]);

    pub fn new(levels: [u8; 4]) -> Result<Self> {
        if levels.iter().any(|&l| l > 0xf) {
            return Err(Error::InvalidPhysicalAddress(format!("{:?}", levels)));
        }
        Ok(Self(levels))
    }

    pub fn levels(&self) -> [u8; 4] {
        self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    pub fn is_connected(&self) -> bool {
        *self != Self::NOT_CONNECTED
    }
}

impl std::fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{:x}.{:x}.{:x}.{:x}", a, b, c, d)
    }
}

impl FromStr for PhysicalAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPhysicalAddress(s.to_string());
        let mut levels = [0u8; 4];
        let mut parts = s.trim().split('.');
        for level in levels.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 1 {
                return Err(invalid());
            }
            *level = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(levels))
    }
}

impl Serialize for PhysicalAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Logical address used to target commands at a device (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalAddress(u8);

impl LogicalAddress {
    pub const TV: Self = Self(0);

    /// Broadcast / unregistered address
    pub const BROADCAST: Self = Self(15);

    pub fn new(value: u8) -> Result<Self> {
        if value > 15 {
            return Err(Error::InvalidLogicalAddress(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidLogicalAddress(s.to_string()))?;
        Self::new(value)
    }
}

/// Primary device type as reported by cec-ctl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Tv,
    Recorder,
    Tuner,
    Playback,
    Audio,
    Amplifier,
    Switch,
    Processor,
}

impl Default for DeviceType {
    fn default() -> Self {
        Self::Playback
    }
}

impl DeviceType {
    pub const ALL: [DeviceType; 8] = [
        Self::Tv,
        Self::Recorder,
        Self::Tuner,
        Self::Playback,
        Self::Audio,
        Self::Amplifier,
        Self::Switch,
        Self::Processor,
    ];

    /// Label printed in the `Primary Device Type` field
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tv => "TV",
            Self::Recorder => "Recorder",
            Self::Tuner => "Tuner",
            Self::Playback => "Playback",
            Self::Audio => "Audio",
            Self::Amplifier => "Amplifier",
            Self::Switch => "Switch",
            Self::Processor => "Processor",
        }
    }

    /// cec-ctl flag that configures the local adapter as this type
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Tv => "--tv",
            Self::Recorder => "--record",
            Self::Tuner => "--tuner",
            Self::Playback => "--playback",
            Self::Audio => "--audio",
            Self::Amplifier => "--amplifier",
            Self::Switch => "--switch",
            Self::Processor => "--processor",
        }
    }

    /// Look a type up by its reported label
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        // newer cec-ctl builds print the full name
        if label == "Audio System" {
            return Some(Self::Audio);
        }
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A device on the CEC bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Supported CEC protocol version
    pub cec_version: String,
    /// HDMI port position of the device
    pub physical_address: PhysicalAddress,
    /// Address used to send commands to the device
    pub logical_address: LogicalAddress,
    pub device_type: DeviceType,
    /// Vendor ID, some hardware fakes it
    pub vendor_id: String,
    /// Reported power status (`on`, `standby`, `to-on`, `to-standby`), passed through as-is
    pub power_status: String,
    /// Human-readable name
    pub osd_name: Option<String>,
}

impl Device {
    /// Display name, falling back to the device type label
    pub fn name(&self) -> &str {
        self.osd_name.as_deref().unwrap_or_else(|| self.device_type.label())
    }
}

impl From<&Device> for LogicalAddress {
    fn from(device: &Device) -> Self {
        device.logical_address
    }
}

/// The device we have a `/dev/cecX` handle on, used to talk to every other device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalDevice {
    /// Path of the adapter handle passed to `cec-ctl -d`
    pub handle: String,
    #[serde(flatten)]
    pub device: Device,
}

impl LocalDevice {
    pub fn new(handle: impl Into<String>, device: Device) -> Self {
        Self {
            handle: handle.into(),
            device,
        }
    }
}

impl std::ops::Deref for LocalDevice {
    type Target = Device;

    fn deref(&self) -> &Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_address_parse() {
        let addr: PhysicalAddress = "1.0.2.0".parse().unwrap();
        assert_eq!(addr.levels(), [1, 0, 2, 0]);
        assert_eq!(addr.to_string(), "1.0.2.0");
        assert!(!addr.is_root());

        let sentinel: PhysicalAddress = "f.f.f.f".parse().unwrap();
        assert_eq!(sentinel, PhysicalAddress::NOT_CONNECTED);
        assert!(!sentinel.is_connected());
        assert_eq!(sentinel.to_string(), "f.f.f.f");

        assert!("0.0.0.0".parse::<PhysicalAddress>().unwrap().is_root());
    }

    #[test]
    fn test_physical_address_rejects_malformed() {
        assert!("1.0.0".parse::<PhysicalAddress>().is_err());
        assert!("1.0.0.0.0".parse::<PhysicalAddress>().is_err());
        assert!("10.0.0.0".parse::<PhysicalAddress>().is_err());
        assert!("g.0.0.0".parse::<PhysicalAddress>().is_err());
        assert!(PhysicalAddress::new([0, 16, 0, 0]).is_err());
    }

    #[test]
    fn test_logical_address_bounds() {
        assert_eq!("4".parse::<LogicalAddress>().unwrap().value(), 4);
        assert_eq!(" 15 ".parse::<LogicalAddress>().unwrap(), LogicalAddress::BROADCAST);
        assert!("16".parse::<LogicalAddress>().is_err());
        assert!("x".parse::<LogicalAddress>().is_err());
    }

    #[test]
    fn test_device_type_labels() {
        assert_eq!(DeviceType::from_label("TV"), Some(DeviceType::Tv));
        assert_eq!(DeviceType::from_label("Playback "), Some(DeviceType::Playback));
        assert_eq!(DeviceType::from_label("Audio System"), Some(DeviceType::Audio));
        assert_eq!(DeviceType::from_label("Toaster"), None);
        assert_eq!(DeviceType::Recorder.flag(), "--record");
        assert_eq!(DeviceType::default(), DeviceType::Playback);
    }

    #[test]
    fn test_device_name_fallback() {
        let mut device = Device {
            cec_version: "1.4".to_string(),
            physical_address: PhysicalAddress::ROOT,
            logical_address: LogicalAddress::new(0).unwrap(),
            device_type: DeviceType::Tv,
            vendor_id: "0x00e091".to_string(),
            power_status: "On".to_string(),
            osd_name: None,
        };
        assert_eq!(device.name(), "TV");
        device.osd_name = Some("Living Room".to_string());
        assert_eq!(device.name(), "Living Room");
    }

    #[test]
    fn test_local_device_serializes_flat() {
        let local = LocalDevice::new(
            "/dev/cec0",
            Device {
                cec_version: "2.0".to_string(),
                physical_address: "1.0.0.0".parse().unwrap(),
                logical_address: LogicalAddress::new(4).unwrap(),
                device_type: DeviceType::Playback,
                vendor_id: "0x000c03".to_string(),
                power_status: "On".to_string(),
                osd_name: Some("cecwiz".to_string()),
            },
        );
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["handle"], "/dev/cec0");
        assert_eq!(json["physical_address"], "1.0.0.0");
        assert_eq!(json["logical_address"], 4);
        assert_eq!(json["device_type"], "playback");
        assert_eq!(local.logical_address.value(), 4);
    }
}
