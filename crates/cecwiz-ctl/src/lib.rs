//! cecwiz Ctl - cec-ctl and cec-follower process integration
//!
//! This crate runs the external v4l-utils tools on behalf of cecwiz:
//! - `runner` spawns cec-ctl and captures its output
//! - `controller` sends synthesized commands from the local device
//! - `responder` supervises the background cec-follower process

pub mod controller;
pub mod responder;
pub mod runner;

pub use controller::CecController;
pub use responder::{ResponderState, ResponderSupervisor};
pub use runner::{locate_program, CecCtl, CommandOutput, CommandRunner};
