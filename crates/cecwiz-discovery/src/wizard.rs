//! Discovery session for one CEC adapter
//!
//! The wizard owns everything a session learns about the bus: which adapter
//! it talks through, the local device, the responder process, the devices
//! seen on the bus, the topology snapshot and the main screen. The usual
//! sequence is
//!
//! 1. resolve the adapter handle (given or autodetected)
//! 2. configure and read back the local device
//! 3. start the responder
//! 4. enumerate devices and the topology
//! 5. pick the device at `0.0.0.0` as the main screen
//!
//! [`Wizard::autoconfig`] runs all of it. Responder exits are checked before
//! every bus operation and surface there as [`Error::ResponderStopped`].

use cecwiz_core::{
    command, parse_device, parse_topology_devices, Device, DeviceType, Error, LocalDevice,
    ReportMode, Result, Topology,
};
use cecwiz_ctl::{CecController, CommandRunner, ResponderState, ResponderSupervisor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::handle::{self, DEFAULT_DEVICE_DIR};

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Adapter handle, autodetected when unset
    pub handle: Option<String>,
    pub device_type: DeviceType,
    /// Name shown by other devices, at most 14 characters
    pub osd_name: Option<String>,
    /// Responder executable, `None` to run without one
    pub responder_program: Option<PathBuf>,
    /// Directory searched for `cec*` adapter nodes
    pub device_dir: PathBuf,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            handle: None,
            device_type: DeviceType::default(),
            osd_name: None,
            responder_program: Some(PathBuf::from(ResponderSupervisor::DEFAULT_PROGRAM)),
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
        }
    }
}

pub struct Wizard<R> {
    runner: R,
    config: WizardConfig,
    handle: Option<String>,
    local_device: Option<LocalDevice>,
    responder: Option<ResponderSupervisor>,
    connected_devices: Vec<Device>,
    topology: Option<Topology>,
    main_screen: Option<Device>,
}

impl<R: CommandRunner> Wizard<R> {
    pub fn new(runner: R, config: WizardConfig) -> Self {
        let handle = config.handle.clone();
        Self {
            runner,
            config,
            handle,
            local_device: None,
            responder: None,
            connected_devices: Vec::new(),
            topology: None,
            main_screen: None,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Switch to another adapter. Everything learned through the old one is dropped.
    pub async fn set_handle(&mut self, handle: impl Into<String>) {
        let handle = handle.into();
        if self.handle.as_deref() == Some(handle.as_str()) {
            return;
        }
        self.stop_responder().await;
        self.responder = None;
        self.local_device = None;
        self.connected_devices.clear();
        self.topology = None;
        self.main_screen = None;
        self.handle = Some(handle);
    }

    /// Probe the adapters under the configured device directory and keep
    /// the single connected one
    pub async fn autodetect_handle(&mut self) -> Result<&str> {
        let handle = handle::autodetect_handle(&self.runner, &self.config.device_dir).await?;
        self.set_handle(handle).await;
        self.handle().ok_or(Error::NotInitialized)
    }

    fn require_handle(&self) -> Result<String> {
        self.handle.clone().ok_or(Error::NotInitialized)
    }

    /// Configure the adapter with the session's device type and OSD name,
    /// then read back what it actually claimed. Starts the responder.
    pub async fn init_local_device(&mut self) -> Result<&LocalDevice> {
        let handle = self.require_handle()?;
        let args = command::configure(self.config.device_type, self.config.osd_name.as_deref())?;

        self.runner.run(&handle, &args).await?;
        let report = self.runner.run(&handle, &[]).await?;
        let device = parse_device(&report.stdout, ReportMode::SingleDevice)?;

        info!(
            handle = %handle,
            phys_addr = %device.physical_address,
            log_addr = %device.logical_address,
            device_type = %device.device_type,
            "Local device initialized"
        );
        self.local_device = Some(LocalDevice::new(handle, device));

        self.start_responder()?;
        self.local_device.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn local_device(&self) -> Option<&LocalDevice> {
        self.local_device.as_ref()
    }

    /// Start the responder on the current handle. No-op when it is disabled
    /// or already running.
    pub fn start_responder(&mut self) -> Result<()> {
        let Some(program) = self.config.responder_program.clone() else {
            return Ok(());
        };
        let handle = self.require_handle()?;
        self.responder
            .get_or_insert_with(|| ResponderSupervisor::new(program, handle))
            .start()
    }

    pub async fn stop_responder(&mut self) {
        if let Some(responder) = self.responder.as_mut() {
            responder.stop().await;
        }
    }

    pub fn responder_state(&self) -> ResponderState {
        self.responder
            .as_ref()
            .map(ResponderSupervisor::state)
            .unwrap_or(ResponderState::Stopped)
    }

    /// Raise a pending responder exit. Called before every bus operation.
    pub fn check_responder(&mut self) -> Result<()> {
        match self.responder.as_mut() {
            Some(responder) => responder.poll(),
            None => Ok(()),
        }
    }

    /// Block until the responder exits
    pub async fn wait_responder(&mut self) -> Result<()> {
        match self.responder.as_mut() {
            Some(responder) => responder.wait().await,
            None => Ok(()),
        }
    }

    /// Poll the bus and parse every device it reports
    pub async fn list_connected_devices(&mut self) -> Result<&[Device]> {
        self.check_responder()?;
        let handle = self.require_handle()?;

        let output = self.runner.run(&handle, &command::show_topology()).await?;
        self.connected_devices = parse_topology_devices(&output.stdout)?;

        debug!(handle = %handle, count = self.connected_devices.len(), "Listed connected devices");
        Ok(self.connected_devices.as_slice())
    }

    pub fn connected_devices(&self) -> &[Device] {
        &self.connected_devices
    }

    /// Rebuild the HDMI tree from a fresh topology dump
    pub async fn get_topology(&mut self) -> Result<&Topology> {
        self.check_responder()?;
        let handle = self.require_handle()?;

        let mut args = vec![command::SKIP_INFO.to_string()];
        args.extend(command::show_topology());
        let output = self.runner.run(&handle, &args).await?;
        let topology = Topology::reconstruct(&output.stdout)?;

        debug!(handle = %handle, nodes = topology.len(), "Topology reconstructed");
        Ok(&*self.topology.insert(topology))
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Pick the root display among the listed devices.
    ///
    /// `None` means no device sits at `0.0.0.0`, which is not an error.
    pub fn autodetect_main_screen(&mut self) -> Option<&Device> {
        self.main_screen = self
            .connected_devices
            .iter()
            .find(|device| device.physical_address.is_root())
            .cloned();

        match &self.main_screen {
            Some(screen) => info!(
                log_addr = %screen.logical_address,
                name = %screen.name(),
                "Main screen detected"
            ),
            None => debug!("No device at 0.0.0.0"),
        }
        self.main_screen.as_ref()
    }

    pub fn main_screen(&self) -> Option<&Device> {
        self.main_screen.as_ref()
    }

    /// Run the whole discovery sequence
    pub async fn autoconfig(&mut self) -> Result<()> {
        if self.handle.is_none() {
            self.autodetect_handle().await?;
        }
        self.init_local_device().await?;
        self.list_connected_devices().await?;
        self.get_topology().await?;
        self.autodetect_main_screen();
        Ok(())
    }

    /// Command issuer bound to the local device
    pub fn controller(&mut self) -> Result<CecController<'_, R>> {
        self.check_responder()?;
        let local = self.local_device.as_ref().ok_or(Error::NotInitialized)?;
        Ok(CecController::new(&self.runner, local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cecwiz_ctl::runner::fake::FakeRunner;
    use cecwiz_core::PhysicalAddress;
    use std::time::Duration;

    const LOCAL_REPORT: &str = "Driver Info:
	Physical Address           : 1.0.0.0
	CEC Version                : 2.0
	Vendor ID                  : 0x000c03 (HDMI)
	OSD Name                   : 'Living Room'
	Logical Addresses          : 1 (Allow RC Passthrough)

	  Logical Address          : 4 (Playback Device 1)
	    Primary Device Type    : Playback
	Power Status               : On
";

    const TOPOLOGY_DUMP: &str = "Driver Info:
	Physical Address           : 1.0.0.0

	System Information for device 0 (TV) from device 4 (Playback Device 1):
		CEC Version                : 1.4
		Physical Address           : 0.0.0.0
		Primary Device Type        : TV
		Vendor ID                  : 0x00e091 (LG)
		OSD Name                   : 'TV'
		Power Status               : On

	System Information for device 5 (Audio System) from device 4 (Playback Device 1):
		CEC Version                : 1.4
		Physical Address           : 2.0.0.0
		Primary Device Type        : Audio
		Vendor ID                  : 0x0009b0 (Onkyo)
		Power Status               : Standby

	Topology:

	0.0.0.0: TV
	    1.0.0.0: Playback Device 1
	    2.0.0.0: Audio System
";

    fn config() -> WizardConfig {
        WizardConfig {
            handle: Some("/dev/cec0".to_string()),
            osd_name: Some("Living Room".to_string()),
            responder_program: None,
            ..WizardConfig::default()
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_autoconfig_sequence() {
        let runner = FakeRunner::default();
        runner.reply("");
        runner.reply(LOCAL_REPORT);
        runner.reply(TOPOLOGY_DUMP);
        runner.reply(TOPOLOGY_DUMP);
        let mut wizard = Wizard::new(runner, config());

        wizard.autoconfig().await.unwrap();

        let local = wizard.local_device().unwrap();
        assert_eq!(local.handle, "/dev/cec0");
        assert_eq!(local.logical_address.value(), 4);
        assert_eq!(local.osd_name.as_deref(), Some("Living Room"));

        assert_eq!(wizard.connected_devices().len(), 2);
        assert_eq!(wizard.topology().unwrap().len(), 3);

        let screen = wizard.main_screen().unwrap();
        assert_eq!(screen.physical_address, PhysicalAddress::ROOT);
        assert_eq!(screen.device_type, DeviceType::Tv);

        let calls = wizard.runner().calls();
        assert!(calls.iter().all(|(handle, _)| handle == "/dev/cec0"));
        let calls: Vec<_> = calls.into_iter().map(|(_, args)| args).collect();
        assert_eq!(
            calls,
            [
                args(&["--playback", "--osd-name", "Living Room"]),
                args(&[]),
                args(&["--show-topology"]),
                args(&["--skip-info", "--show-topology"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_main_screen_absent_is_not_an_error() {
        let runner = FakeRunner::default();
        runner.reply(
            "\tSystem Information for device 5 (Audio System) from device 4 (Playback Device 1):
		CEC Version                : 1.4
		Physical Address           : 2.0.0.0
		Primary Device Type        : Audio
		Vendor ID                  : 0x0009b0 (Onkyo)
		Power Status               : Standby
",
        );
        let mut wizard = Wizard::new(runner, config());

        wizard.list_connected_devices().await.unwrap();
        assert!(wizard.autodetect_main_screen().is_none());
        assert!(wizard.main_screen().is_none());
    }

    #[tokio::test]
    async fn test_long_osd_name_rejected_before_running() {
        let runner = FakeRunner::default();
        let mut wizard = Wizard::new(
            runner,
            WizardConfig {
                osd_name: Some("A Very Long Device Name".to_string()),
                ..config()
            },
        );

        assert!(matches!(
            wizard.init_local_device().await,
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(wizard.runner().calls().is_empty());
        assert!(wizard.local_device().is_none());
    }

    #[tokio::test]
    async fn test_operations_need_handle_and_local_device() {
        let runner = FakeRunner::default();
        let mut wizard = Wizard::new(
            runner,
            WizardConfig {
                handle: None,
                ..config()
            },
        );

        assert!(matches!(wizard.get_topology().await, Err(Error::NotInitialized)));
        assert!(matches!(wizard.controller(), Err(Error::NotInitialized)));
    }

    #[tokio::test]
    async fn test_set_handle_drops_session_state() {
        let runner = FakeRunner::default();
        runner.reply("");
        runner.reply(LOCAL_REPORT);
        runner.reply(TOPOLOGY_DUMP);
        let mut wizard = Wizard::new(runner, config());
        wizard.init_local_device().await.unwrap();
        wizard.list_connected_devices().await.unwrap();

        wizard.set_handle("/dev/cec0").await;
        assert!(wizard.local_device().is_some());

        wizard.set_handle("/dev/cec1").await;
        assert_eq!(wizard.handle(), Some("/dev/cec1"));
        assert!(wizard.local_device().is_none());
        assert!(wizard.connected_devices().is_empty());
    }

    #[tokio::test]
    async fn test_controller_sends_from_local_device() {
        let runner = FakeRunner::default();
        runner.reply("");
        runner.reply(LOCAL_REPORT);
        let mut wizard = Wizard::new(runner, config());
        wizard.init_local_device().await.unwrap();

        let tv = cecwiz_core::LogicalAddress::new(0).unwrap();
        wizard.controller().unwrap().send_power_on(tv).await.unwrap();

        let calls = wizard.runner().calls();
        assert_eq!(calls[2].1, args(&["--skip-info", "--to", "0", "--image-view-on"]));
    }

    #[tokio::test]
    async fn test_responder_exit_raised_at_next_operation() {
        let runner = FakeRunner::default();
        runner.reply("");
        runner.reply(LOCAL_REPORT);
        let mut wizard = Wizard::new(
            runner,
            WizardConfig {
                responder_program: Some(PathBuf::from("false")),
                ..config()
            },
        );
        wizard.init_local_device().await.unwrap();

        let error = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Err(e) = wizard.list_connected_devices().await {
                    return e;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(error, Error::ResponderStopped(_)));
        assert_eq!(wizard.responder_state(), ResponderState::Failed);

        // reported once, the session keeps working without a responder
        assert!(wizard.list_connected_devices().await.is_ok());
    }

    #[tokio::test]
    async fn test_autodetect_handle_from_device_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("cec0"), "").unwrap();
        let runner = FakeRunner::default();
        runner.reply(LOCAL_REPORT);
        let mut wizard = Wizard::new(
            runner,
            WizardConfig {
                handle: None,
                device_dir: dir.path().to_path_buf(),
                ..config()
            },
        );

        let handle = wizard.autodetect_handle().await.unwrap();
        assert!(handle.ends_with("cec0"));
    }
}
