//! CEC adapter handle autodetection
//!
//! Every adapter shows up as a `/dev/cecN` node, but only one that is
//! plugged into a powered HDMI sink gets a physical address other than
//! `f.f.f.f`. Probing each node with a single-device report tells them apart.

use cecwiz_core::{parse_physical_address, Error, PhysicalAddress, Result};
use cecwiz_ctl::CommandRunner;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where adapter nodes live on Linux
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

const HANDLE_PREFIX: &str = "cec";

/// List `cec*` entries of `dir`, sorted by path
pub fn candidate_handles(dir: &Path) -> Result<Vec<String>> {
    let mut handles: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(HANDLE_PREFIX))
        .map(|entry| entry.path().display().to_string())
        .collect();
    handles.sort();
    Ok(handles)
}

/// Read the physical address `handle` currently holds.
///
/// Returns `None` when the adapter cannot be queried or reports no address.
pub async fn probe_handle<R: CommandRunner>(runner: &R, handle: &str) -> Option<PhysicalAddress> {
    let output = match runner.run(handle, &[]).await {
        Ok(output) => output,
        Err(e) => {
            warn!(handle = %handle, error = %e, "Failed to probe adapter");
            return None;
        }
    };
    match parse_physical_address(&output.stdout) {
        Ok(addr) => Some(addr),
        Err(e) => {
            debug!(handle = %handle, error = %e, "No physical address in report");
            None
        }
    }
}

/// Find the single connected adapter under `dir`.
///
/// Fails with [`Error::Autodetect`] unless exactly one handle is connected.
pub async fn autodetect_handle<R: CommandRunner>(runner: &R, dir: &Path) -> Result<String> {
    let mut connected = Vec::new();

    for handle in candidate_handles(dir)? {
        match probe_handle(runner, &handle).await {
            Some(addr) if addr.is_connected() => {
                debug!(handle = %handle, phys_addr = %addr, "Adapter connected");
                connected.push(handle);
            }
            Some(_) => debug!(handle = %handle, "Adapter not connected"),
            None => {}
        }
    }

    match connected.len() {
        1 => {
            let handle = connected.remove(0);
            info!(handle = %handle, "Autodetected CEC adapter");
            Ok(handle)
        }
        found => Err(Error::Autodetect { found }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cecwiz_ctl::runner::fake::FakeRunner;
    use tempfile::TempDir;

    fn device_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        dir
    }

    fn report(phys_addr: &str) -> String {
        format!("Driver Info:\n\tPhysical Address           : {}\n", phys_addr)
    }

    #[test]
    fn test_candidate_handles_sorted_and_filtered() {
        let dir = device_dir(&["video0", "cec1", "cec0", "tty0"]);
        let handles = candidate_handles(dir.path()).unwrap();

        let names: Vec<_> = handles
            .iter()
            .map(|h| Path::new(h).file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["cec0", "cec1"]);
    }

    #[test]
    fn test_candidate_handles_missing_dir() {
        assert!(matches!(
            candidate_handles(Path::new("/nonexistent/dev")),
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_autodetect_single_connected() {
        let dir = device_dir(&["cec0", "cec1"]);
        let runner = FakeRunner::default();
        runner.reply(&report("f.f.f.f"));
        runner.reply(&report("1.0.0.0"));

        let handle = autodetect_handle(&runner, dir.path()).await.unwrap();
        assert!(handle.ends_with("cec1"));

        // probes run without --skip-info so the driver info is printed
        assert!(runner.calls().iter().all(|(_, args)| args.is_empty()));
    }

    #[tokio::test]
    async fn test_autodetect_skips_unreadable_adapters() {
        let dir = device_dir(&["cec0", "cec1", "cec2"]);
        let runner = FakeRunner::default();
        runner.fail(1, "Device or resource busy");
        runner.reply("garbage");
        runner.reply(&report("2.0.0.0"));

        let handle = autodetect_handle(&runner, dir.path()).await.unwrap();
        assert!(handle.ends_with("cec2"));
    }

    #[tokio::test]
    async fn test_autodetect_ambiguous() {
        let dir = device_dir(&["cec0", "cec1"]);
        let runner = FakeRunner::default();
        runner.reply(&report("1.0.0.0"));
        runner.reply(&report("2.0.0.0"));

        assert!(matches!(
            autodetect_handle(&runner, dir.path()).await,
            Err(Error::Autodetect { found: 2 })
        ));
    }

    #[tokio::test]
    async fn test_autodetect_none() {
        let dir = device_dir(&["video0"]);
        let runner = FakeRunner::default();

        assert!(matches!(
            autodetect_handle(&runner, dir.path()).await,
            Err(Error::Autodetect { found: 0 })
        ));
        assert!(runner.calls().is_empty());
    }
}
