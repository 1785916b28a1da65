//! Interpretation of cec-ctl replies to queries

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::device::{LogicalAddress, PhysicalAddress};
use crate::error::{Error, Result};

static TIMEOUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s+Timeout").expect("valid regex"));
static PWR_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*pwr-state:\s+([\w-]+)").expect("valid regex"));
static RECEIVED_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Received from .+ \((\d+)\)").expect("valid regex"));
static PHYS_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*phys-addr:\s+(\w+\.\w+\.\w+\.\w+)").expect("valid regex"));

/// A device that answered a request for the active source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSource {
    pub logical_address: LogicalAddress,
    pub physical_address: Option<PhysicalAddress>,
}

/// Fail with `ResponseTimeout` when cec-ctl reports the message timed out
pub fn check_timeout(stdout: &str, context: &str) -> Result<()> {
    if TIMEOUT.is_match(stdout) {
        return Err(Error::ResponseTimeout(context.to_string()));
    }
    Ok(())
}

/// Extract the power state token from a `--give-device-power-status` reply
pub fn parse_power_status(stdout: &str) -> Result<String> {
    check_timeout(stdout, "no reply to power status query")?;
    PWR_STATE
        .captures(stdout)
        .map(|caps| caps[1].to_string())
        .ok_or(Error::MissingField("pwr-state"))
}

/// Collect the devices that answered `--request-active-source`.
///
/// Each `Received from ... (N)` line opens an entry; a following
/// `phys-addr:` line belongs to the most recently opened entry.
pub fn parse_active_sources(stdout: &str) -> Result<Vec<ActiveSource>> {
    check_timeout(
        stdout,
        "no active source, or devices loosely follow the CEC standard",
    )?;

    let mut sources: Vec<ActiveSource> = Vec::new();
    for line in stdout.lines() {
        if let Some(caps) = RECEIVED_FROM.captures(line) {
            sources.push(ActiveSource {
                logical_address: caps[1].parse()?,
                physical_address: None,
            });
        } else if let Some(caps) = PHYS_ADDR.captures(line) {
            if let Some(source) = sources.last_mut() {
                source.physical_address = Some(caps[1].parse()?);
            }
        }
    }
    Ok(sources)
}
