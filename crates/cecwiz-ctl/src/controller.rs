//! Commands issued from the local device to the rest of the bus
//!
//! Naming follows the message direction:
//! - `broadcast_*` goes to every device
//! - `ask_*` is a question to one device and returns its answer
//! - `send_*` is an order to one device

use cecwiz_core::command;
use cecwiz_core::response::{parse_active_sources, parse_power_status};
use cecwiz_core::{ActiveSource, Button, LocalDevice, LogicalAddress, Result};
use tracing::{debug, info};

use crate::runner::{CommandOutput, CommandRunner};

/// Issues synthesized cec-ctl commands through the local adapter
pub struct CecController<'a, R> {
    runner: &'a R,
    local: &'a LocalDevice,
}

impl<'a, R: CommandRunner> CecController<'a, R> {
    pub fn new(runner: &'a R, local: &'a LocalDevice) -> Self {
        Self { runner, local }
    }

    pub fn local(&self) -> &LocalDevice {
        self.local
    }

    /// Run cec-ctl from the local device with the driver info suppressed
    pub async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        let mut full = vec![command::SKIP_INFO.to_string()];
        full.extend(args);
        self.runner.run(&self.local.handle, &full).await
    }

    /// Emulate a button press. Devices that treat it as a hold need a
    /// following [`send_button_release`](Self::send_button_release).
    pub async fn send_button_press(
        &self,
        to: impl Into<LogicalAddress>,
        button: Button,
    ) -> Result<CommandOutput> {
        let to = to.into();
        debug!(to = %to, button = %button, "Pressing button");
        self.run(command::press_button(to, button)).await
    }

    pub async fn send_button_release(&self, to: impl Into<LogicalAddress>) -> Result<CommandOutput> {
        self.run(command::release_button(to.into())).await
    }

    /// Press then release `button`.
    ///
    /// Not atomic: if the release fails the press has already been sent and
    /// the error is returned as-is.
    pub async fn send_button_click(&self, to: impl Into<LogicalAddress>, button: Button) -> Result<()> {
        let to = to.into();
        self.send_button_press(to, button).await?;
        self.send_button_release(to).await?;
        Ok(())
    }

    pub async fn send_volume_up(&self, to: impl Into<LogicalAddress>) -> Result<()> {
        self.send_button_click(to, Button::VolumeUp).await
    }

    pub async fn send_volume_down(&self, to: impl Into<LogicalAddress>) -> Result<()> {
        self.send_button_click(to, Button::VolumeDown).await
    }

    /// Send a raw CEC message, e.g. opcode `0x44` with payload `0x41`
    pub async fn send_custom_command(
        &self,
        to: impl Into<LogicalAddress>,
        opcode: &str,
        payload: Option<&str>,
    ) -> Result<CommandOutput> {
        self.run(command::custom_command(to.into(), opcode, payload))
            .await
    }

    /// Returns the reported power state (`on`, `standby`, `to-on`, `to-standby`)
    pub async fn ask_power_status(&self, to: impl Into<LogicalAddress>) -> Result<String> {
        let output = self.run(command::power_status_query(to.into())).await?;
        parse_power_status(&output.stdout)
    }

    /// Put the target in standby. Some devices only really turn off with
    /// [`Button::PowerOffFunction`].
    pub async fn send_power_off(&self, to: impl Into<LogicalAddress>) -> Result<CommandOutput> {
        self.run(command::standby(to.into())).await
    }

    /// Image View On: wakes the target and selects our input
    pub async fn send_power_on(&self, to: impl Into<LogicalAddress>) -> Result<CommandOutput> {
        self.run(command::image_view_on(to.into())).await
    }

    /// Announce that the local device started streaming
    pub async fn broadcast_active_source(&self) -> Result<CommandOutput> {
        info!(phys_addr = %self.local.physical_address, "Broadcasting active source");
        self.run(command::active_source(self.local.physical_address))
            .await
    }

    /// Announce that the local device stopped streaming
    pub async fn broadcast_inactive_source(&self) -> Result<CommandOutput> {
        info!(phys_addr = %self.local.physical_address, "Broadcasting inactive source");
        self.run(command::inactive_source(self.local.physical_address))
            .await
    }

    /// Ask every device whether it is the active source.
    ///
    /// Devices often ignore this, so an empty list does not prove there is
    /// no active source.
    pub async fn broadcast_request_active_source(&self) -> Result<Vec<ActiveSource>> {
        let output = self.run(command::request_active_source()).await?;
        parse_active_sources(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use cecwiz_core::{Device, DeviceType, Error};

    fn local() -> LocalDevice {
        LocalDevice::new(
            "/dev/cec1",
            Device {
                cec_version: "2.0".to_string(),
                physical_address: "1.0.0.0".parse().unwrap(),
                logical_address: LogicalAddress::new(4).unwrap(),
                device_type: DeviceType::Playback,
                vendor_id: "0x000c03".to_string(),
                power_status: "On".to_string(),
                osd_name: None,
            },
        )
    }

    fn tv() -> Device {
        Device {
            cec_version: "1.4".to_string(),
            physical_address: "0.0.0.0".parse().unwrap(),
            logical_address: LogicalAddress::new(0).unwrap(),
            device_type: DeviceType::Tv,
            vendor_id: "0x00e091".to_string(),
            power_status: "On".to_string(),
            osd_name: Some("TV".to_string()),
        }
    }

    #[tokio::test]
    async fn test_volume_up_is_press_then_release() {
        let runner = FakeRunner::default();
        let local = local();
        let controller = CecController::new(&runner, &local);

        controller.send_volume_up(&tv()).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(handle, _)| handle == "/dev/cec1"));
        assert_eq!(
            calls[0].1,
            ["--skip-info", "--to", "0", "--user-control-pressed", "ui-cmd=volume-up"]
        );
        assert_eq!(calls[1].1, ["--skip-info", "--to", "0", "--user-control-released"]);
    }

    #[tokio::test]
    async fn test_release_failure_propagates_without_rollback() {
        let runner = FakeRunner::default();
        runner.reply("");
        runner.fail(1, "Transmit failed");
        let local = local();
        let controller = CecController::new(&runner, &local);

        let result = controller.send_volume_down(&tv()).await;
        assert!(matches!(result, Err(Error::ExternalCommand { code: Some(1), .. })));
        // press went out, nothing was sent to undo it
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_press_failure_skips_release() {
        let runner = FakeRunner::default();
        runner.fail(1, "No such device");
        let local = local();
        let controller = CecController::new(&runner, &local);

        assert!(controller.send_volume_up(&tv()).await.is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_ask_power_status() {
        let runner = FakeRunner::default();
        runner.reply("    REPORT_POWER_STATUS (0x90):\n        pwr-state: on (0x00)\n");
        let local = local();
        let controller = CecController::new(&runner, &local);

        let status = controller.ask_power_status(&tv()).await.unwrap();
        assert_eq!(status, "on");
        assert_eq!(
            runner.calls()[0].1,
            ["--skip-info", "--to", "0", "--give-device-power-status"]
        );
    }

    #[tokio::test]
    async fn test_active_source_uses_local_address() {
        let runner = FakeRunner::default();
        let local = local();
        let controller = CecController::new(&runner, &local);

        controller.broadcast_active_source().await.unwrap();
        controller.broadcast_inactive_source().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].1, ["--skip-info", "--active-source", "phys-addr=1.0.0.0"]);
        assert_eq!(calls[1].1, ["--skip-info", "--inactive-source", "phys-addr=1.0.0.0"]);
    }

    #[tokio::test]
    async fn test_request_active_source_timeout() {
        let runner = FakeRunner::default();
        runner.reply("\tTx, Not Acknowledged (4), Max Retries, Timeout\n");
        let local = local();
        let controller = CecController::new(&runner, &local);

        assert!(matches!(
            controller.broadcast_request_active_source().await,
            Err(Error::ResponseTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_command_to_logical_address() {
        let runner = FakeRunner::default();
        let local = local();
        let controller = CecController::new(&runner, &local);

        controller
            .send_custom_command(LogicalAddress::new(5).unwrap(), "0x44", Some("0x41"))
            .await
            .unwrap();
        assert_eq!(
            runner.calls()[0].1,
            ["--skip-info", "--to", "5", "--custom-command", "cmd=0x44,payload=0x41"]
        );
    }
}
