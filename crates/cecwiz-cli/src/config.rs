//! Configuration loading

use anyhow::Result;
use cecwiz_core::DeviceType;
use cecwiz_ctl::{locate_program, CecCtl, ResponderSupervisor};
use cecwiz_discovery::{WizardConfig, DEFAULT_DEVICE_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ctl: CtlConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtlConfig {
    /// cec-ctl executable, looked up in PATH unless it is a path
    #[serde(default = "default_ctl_program")]
    pub program: String,
}

impl Default for CtlConfig {
    fn default() -> Self {
        Self {
            program: default_ctl_program(),
        }
    }
}

fn default_ctl_program() -> String {
    CecCtl::DEFAULT_PROGRAM.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default = "default_responder_program")]
    pub program: String,
    /// Answer other devices' polls while cecwiz runs
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            program: default_responder_program(),
            enabled: true,
        }
    }
}

fn default_responder_program() -> String {
    ResponderSupervisor::DEFAULT_PROGRAM.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Adapter node such as `/dev/cec0`, autodetected when unset
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    /// Name other devices display for us (14 characters max)
    #[serde(default)]
    pub osd_name: Option<String>,
}

impl Config {
    /// Build the session settings, resolving the responder executable
    pub fn to_wizard_config(&self) -> Result<WizardConfig> {
        let responder_program = if self.responder.enabled {
            Some(locate_program(&self.responder.program)?)
        } else {
            None
        };

        Ok(WizardConfig {
            handle: self.device.handle.clone(),
            device_type: self.device.device_type,
            osd_name: self.device.osd_name.clone(),
            responder_program,
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
        })
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
