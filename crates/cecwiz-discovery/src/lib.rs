//! cecwiz Discovery - Adapter autodetection and the bus discovery session
//!
//! This crate ties the external tools to a session:
//! - `handle` finds the connected adapter among the `/dev/cec*` nodes
//! - `wizard` initializes the local device, keeps the responder alive and
//!   learns the devices, topology and main screen of the bus

pub mod handle;
pub mod wizard;

pub use handle::{autodetect_handle, candidate_handles, probe_handle, DEFAULT_DEVICE_DIR};
pub use wizard::{Wizard, WizardConfig};
