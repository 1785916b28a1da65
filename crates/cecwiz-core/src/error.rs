//! Error taxonomy shared by every cecwiz crate

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Exit result of the background responder process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponderExit {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Everything the responder wrote to stderr before exiting
    pub stderr: String,
    /// When the exit was observed
    pub stopped_at: DateTime<Utc>,
}

impl std::fmt::Display for ResponderExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    ExternalCommand {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot locate {0} in PATH")]
    ToolNotFound(String),
    #[error("Cannot find the {0} in report")]
    MissingField(&'static str),
    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),
    #[error("Invalid physical address: {0}")]
    InvalidPhysicalAddress(String),
    #[error("Invalid logical address: {0}")]
    InvalidLogicalAddress(String),
    #[error("Topology line {line} dedents to unknown depth {indent}")]
    UnsupportedIndent { line: usize, indent: usize },
    #[error("Timeout: {0}")]
    ResponseTimeout(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Responder stopped ({0})")]
    ResponderStopped(ResponderExit),
    #[error("Cannot autodetect device. {found} device(s) found")]
    Autodetect { found: usize },
    #[error("No local device, initialize the session first")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, Error>;
