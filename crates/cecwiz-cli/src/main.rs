//! cecwiz - Main entry point
//!
//! Drives the HDMI-CEC bus through cec-ctl: discovers the adapter and the
//! devices behind it, then sends remote control and power commands.

mod config;
mod output;

use anyhow::{bail, Result};
use cecwiz_core::{Button, Error, LogicalAddress};
use cecwiz_ctl::{CecCtl, CommandRunner};
use cecwiz_discovery::Wizard;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "cecwiz")]
#[command(about = "HDMI-CEC discovery and remote control wizard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cecwiz.toml")]
    config: PathBuf,

    /// CEC adapter node, e.g. /dev/cec0 (autodetected when omitted)
    #[arg(short = 'd', long)]
    handle: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the connected CEC adapter
    Detect,
    /// Configure the local device and show what it claimed
    Info,
    /// List the devices on the bus
    Devices,
    /// Show the HDMI topology tree
    Topology,
    /// Press and release a remote control button
    Press {
        /// Button name, e.g. select, up, volume-up
        button: Button,
        /// Target logical address (defaults to the main screen)
        #[arg(long)]
        to: Option<LogicalAddress>,
    },
    /// Step the volume up or down
    Volume {
        direction: VolumeDirection,
        #[arg(long)]
        to: Option<LogicalAddress>,
    },
    /// Ask a device for its power state
    PowerStatus {
        #[arg(long)]
        to: Option<LogicalAddress>,
    },
    /// Wake a device or put it in standby
    Power {
        state: PowerState,
        #[arg(long)]
        to: Option<LogicalAddress>,
    },
    /// Announce the local device as the active source
    ActiveSource,
    /// Announce that the local device stopped being the active source
    InactiveSource,
    /// Ask which device is the active source
    RequestActiveSource,
    /// Send a raw CEC message
    Custom {
        /// Opcode, e.g. 0x44
        opcode: String,
        /// Payload bytes, e.g. 0x41
        payload: Option<String>,
        #[arg(long)]
        to: Option<LogicalAddress>,
    },
    /// Run the responder until it exits or Ctrl-C
    Follow,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VolumeDirection {
    Up,
    Down,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PowerState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("cecwiz v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override handle if specified
    if let Some(handle) = args.handle {
        config.device.handle = Some(handle);
    }

    let runner = CecCtl::locate(&config.ctl.program)?;
    info!(
        ctl = %runner.program().display(),
        responder = config.responder.enabled,
        "Configuration loaded"
    );

    let mut wizard = Wizard::new(runner, config.to_wizard_config()?);
    let result = run(&mut wizard, args.command, args.json).await;
    wizard.stop_responder().await;
    result
}

async fn run<R: CommandRunner>(wizard: &mut Wizard<R>, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Detect => {
            let handle = wizard.autodetect_handle().await?;
            output::emit(json, handle, || handle.to_string())?;
        }
        Command::Info => {
            let local = connect(wizard).await?;
            output::emit(json, local, || output::local_device(local))?;
        }
        Command::Devices => {
            connect(wizard).await?;
            let devices = wizard.list_connected_devices().await?;
            output::emit(json, devices, || output::device_table(devices))?;
        }
        Command::Topology => {
            connect(wizard).await?;
            let tree = wizard.get_topology().await?.to_tree();
            output::emit(json, &tree, || output::topology(&tree))?;
        }
        Command::Press { button, to } => {
            let to = target(wizard, to).await?;
            wizard.controller()?.send_button_click(to, button).await?;
            info!(to = %to, button = %button, "Button clicked");
        }
        Command::Volume { direction, to } => {
            let to = target(wizard, to).await?;
            let controller = wizard.controller()?;
            match direction {
                VolumeDirection::Up => controller.send_volume_up(to).await?,
                VolumeDirection::Down => controller.send_volume_down(to).await?,
            }
        }
        Command::PowerStatus { to } => {
            let to = target(wizard, to).await?;
            let status = wizard.controller()?.ask_power_status(to).await?;
            output::emit(json, &status, || status.clone())?;
        }
        Command::Power { state, to } => {
            let to = target(wizard, to).await?;
            let controller = wizard.controller()?;
            match state {
                PowerState::On => controller.send_power_on(to).await?,
                PowerState::Off => controller.send_power_off(to).await?,
            };
        }
        Command::ActiveSource => {
            connect(wizard).await?;
            wizard.controller()?.broadcast_active_source().await?;
        }
        Command::InactiveSource => {
            connect(wizard).await?;
            wizard.controller()?.broadcast_inactive_source().await?;
        }
        Command::RequestActiveSource => {
            connect(wizard).await?;
            let sources = wizard.controller()?.broadcast_request_active_source().await?;
            output::emit(json, &sources, || output::active_sources(&sources))?;
        }
        Command::Custom { opcode, payload, to } => {
            let to = target(wizard, to).await?;
            let reply = wizard
                .controller()?
                .send_custom_command(to, &opcode, payload.as_deref())
                .await?;
            output::emit(json, &reply.stdout, || reply.stdout.clone())?;
        }
        Command::Follow => follow(wizard, json).await?,
    }
    Ok(())
}

/// Resolve the adapter and initialize the local device on it
async fn connect<R: CommandRunner>(wizard: &mut Wizard<R>) -> Result<&cecwiz_core::LocalDevice> {
    if wizard.handle().is_none() {
        wizard.autodetect_handle().await?;
    }
    Ok(wizard.init_local_device().await?)
}

/// Explicit target, else the main screen, else the TV address
async fn target<R: CommandRunner>(
    wizard: &mut Wizard<R>,
    to: Option<LogicalAddress>,
) -> Result<LogicalAddress> {
    connect(wizard).await?;
    if let Some(to) = to {
        return Ok(to);
    }
    wizard.list_connected_devices().await?;
    Ok(wizard
        .autodetect_main_screen()
        .map(LogicalAddress::from)
        .unwrap_or(LogicalAddress::TV))
}

async fn follow<R: CommandRunner>(wizard: &mut Wizard<R>, json: bool) -> Result<()> {
    if wizard.config().responder_program.is_none() {
        bail!("The responder is disabled in the configuration");
    }
    connect(wizard).await?;
    println!("Responding on {}, press Ctrl-C to stop", wizard.handle().unwrap_or_default());

    let outcome = tokio::select! {
        result = wizard.wait_responder() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        None => {
            info!("Interrupted");
            Ok(())
        }
        Some(Err(Error::ResponderStopped(exit))) => {
            output::emit(json, &exit, || output::responder_exit(&exit))?;
            bail!("Responder stopped ({})", exit)
        }
        Some(Err(e)) => Err(e.into()),
        Some(Ok(())) => Ok(()),
    }
}
