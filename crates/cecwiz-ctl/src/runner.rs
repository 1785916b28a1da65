//! Invocation of the cec-ctl executable

use cecwiz_core::{Error, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

/// Captured result of one cec-ctl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Resolve an executable name through PATH. Paths are checked as given.
pub fn locate_program(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::ToolNotFound(name.to_string()))
}

/// Runs the control executable against an adapter handle.
///
/// Implementations spawn exactly one process per call and never retry.
/// A non-zero exit is reported as [`Error::ExternalCommand`].
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        handle: &str,
        args: &[String],
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// The real `cec-ctl` binary
#[derive(Debug, Clone)]
pub struct CecCtl {
    program: PathBuf,
}

impl CecCtl {
    pub const DEFAULT_PROGRAM: &'static str = "cec-ctl";

    /// Use `program` as given, without a PATH lookup
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `name` through PATH
    pub fn locate(name: &str) -> Result<Self> {
        let program = locate_program(name)?;
        debug!(program = %program.display(), "Located cec-ctl");
        Ok(Self::new(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl CommandRunner for CecCtl {
    async fn run(&self, handle: &str, args: &[String]) -> Result<CommandOutput> {
        let program = self.program.display().to_string();
        debug!(program = %program, handle = %handle, args = ?args, "Running command");

        // arguments go straight to execve, no shell in between
        let output = Command::new(&self.program)
            .arg("-d")
            .arg(handle)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        trace!(stdout = %stdout, "Command output");

        if !output.status.success() {
            return Err(Error::ExternalCommand {
                program,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or_default(),
            stdout,
            stderr,
        })
    }
}

/// In-memory runner for tests of code built on [`CommandRunner`]
#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    use super::{CommandOutput, CommandRunner};
    use cecwiz_core::{Error, Result};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued replies and records every invocation
    #[derive(Default)]
    pub struct FakeRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        replies: Mutex<VecDeque<Result<CommandOutput>>>,
    }

    impl FakeRunner {
        pub fn reply(&self, stdout: &str) {
            self.replies.lock().unwrap().push_back(Ok(CommandOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }));
        }

        pub fn fail(&self, code: i32, stderr: &str) {
            self.replies.lock().unwrap().push_back(Err(Error::ExternalCommand {
                program: "cec-ctl".to_string(),
                code: Some(code),
                stderr: stderr.to_string(),
            }));
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(&self, handle: &str, args: &[String]) -> Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((handle.to_string(), args.to_vec()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::default()))
        }
    }
}
