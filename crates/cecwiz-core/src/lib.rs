//! cecwiz Core - Core types, cec-ctl report parsing, and topology reconstruction
//!
//! This crate provides the pure, I/O-free parts of cecwiz:
//! - Device model for nodes on an HDMI-CEC bus
//! - Device info extraction from cec-ctl reports
//! - Topology tree reconstruction from `--show-topology` dumps
//! - cec-ctl argument synthesis and reply interpretation

pub mod button;
pub mod command;
pub mod device;
pub mod error;
pub mod parser;
pub mod response;
pub mod topology;

pub use button::{Button, UnknownButton};
pub use device::{Device, DeviceType, LocalDevice, LogicalAddress, PhysicalAddress};
pub use error::{Error, ResponderExit, Result};
pub use parser::{
    parse_device, parse_physical_address, parse_topology_devices, split_device_sections,
    ReportMode,
};
pub use response::ActiveSource;
pub use topology::{NodeId, Topology, TopologyNode, TopologyTree};
