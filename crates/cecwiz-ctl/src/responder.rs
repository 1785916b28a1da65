//! Supervision of the background cec-follower process
//!
//! Some devices misbehave unless somebody answers their polls on behalf of
//! the local adapter. cec-follower does that, but it has no API: all we can
//! observe is whether it is still alive. Its exit is reported through a
//! oneshot channel that the session checks at its own safe points; the
//! supervisor never restarts the process by itself.

use cecwiz_core::{Error, ResponderExit, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::runner::locate_program;

/// Lifecycle of the supervised responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Stopped,
    /// Only held inside `start()` while the process is being spawned
    Starting,
    Running,
    /// The process exited without being asked to
    Failed,
}

/// Owns at most one responder process bound to an adapter handle
pub struct ResponderSupervisor {
    program: PathBuf,
    handle: String,
    state: ResponderState,
    pid: Option<u32>,
    exit_rx: Option<oneshot::Receiver<ResponderExit>>,
    stop_tx: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl ResponderSupervisor {
    pub const DEFAULT_PROGRAM: &'static str = "cec-follower";

    pub fn new(program: impl Into<PathBuf>, handle: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            handle: handle.into(),
            state: ResponderState::Stopped,
            pid: None,
            exit_rx: None,
            stop_tx: None,
            watcher: None,
        }
    }

    /// Resolve `name` through PATH
    pub fn locate(name: &str, handle: impl Into<String>) -> Result<Self> {
        Ok(Self::new(locate_program(name)?, handle))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ResponderState::Running
    }

    /// OS process ID while running
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Spawn `<program> -d <handle>`. No-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.state == ResponderState::Running {
            return Ok(());
        }

        self.state = ResponderState::Starting;
        let program = self.program.display().to_string();

        let spawned = Command::new(&self.program)
            .arg("-d")
            .arg(&self.handle)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.state = ResponderState::Stopped;
                return Err(Error::Spawn { program, source });
            }
        };

        let stderr = child.stderr.take();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        self.pid = child.id();
        self.exit_rx = Some(exit_rx);
        self.stop_tx = Some(stop_tx);
        self.watcher = Some(tokio::spawn(watch(
            child,
            stderr,
            exit_tx,
            stop_rx,
            program.clone(),
        )));
        self.state = ResponderState::Running;

        info!(program = %program, handle = %self.handle, pid = ?self.pid, "Responder started");
        Ok(())
    }

    /// Check for an unexpected exit without blocking.
    ///
    /// Returns [`Error::ResponderStopped`] once, after which the state is
    /// `Failed` until the caller decides to [`start`](Self::start) again.
    pub fn poll(&mut self) -> Result<()> {
        let Some(rx) = self.exit_rx.as_mut() else {
            return Ok(());
        };
        match rx.try_recv() {
            Ok(exit) => Err(self.fail(exit)),
            Err(TryRecvError::Empty) => Ok(()),
            Err(TryRecvError::Closed) => {
                self.reset(ResponderState::Stopped);
                Ok(())
            }
        }
    }

    /// Wait until the responder exits, returning [`Error::ResponderStopped`]
    /// when it does. Returns `Ok` immediately when nothing is running.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(rx) = self.exit_rx.as_mut() else {
            return Ok(());
        };
        match rx.await {
            Ok(exit) => Err(self.fail(exit)),
            Err(_) => {
                self.reset(ResponderState::Stopped);
                Ok(())
            }
        }
    }

    /// Kill the responder on request. This is not a failure and nothing is reported.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.await;
        }
        self.reset(ResponderState::Stopped);
        debug!(handle = %self.handle, "Responder stopped");
    }

    fn fail(&mut self, exit: ResponderExit) -> Error {
        warn!(handle = %self.handle, code = ?exit.code, "Responder exited unexpectedly");
        self.reset(ResponderState::Failed);
        Error::ResponderStopped(exit)
    }

    fn reset(&mut self, state: ResponderState) {
        self.state = state;
        self.pid = None;
        self.exit_rx = None;
        self.stop_tx = None;
        self.watcher = None;
    }
}

async fn watch(
    mut child: Child,
    stderr: Option<ChildStderr>,
    exit_tx: oneshot::Sender<ResponderExit>,
    stop_rx: oneshot::Receiver<()>,
    program: String,
) {
    let collector = stderr.map(|stderr| tokio::spawn(collect_stderr(stderr, program.clone())));

    let status = tokio::select! {
        status = child.wait() => Some(status),
        // also fires when the supervisor is dropped
        _ = stop_rx => None,
    };

    let Some(status) = status else {
        if let Err(e) = child.kill().await {
            warn!(program = %program, error = %e, "Failed to kill responder");
        }
        return;
    };

    let stderr = match collector {
        Some(collector) => collector.await.unwrap_or_default(),
        None => String::new(),
    };
    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(program = %program, error = %e, "Failed to wait on responder");
            None
        }
    };
    let _ = exit_tx.send(ResponderExit {
        code,
        stderr,
        stopped_at: Utc::now(),
    });
}

async fn collect_stderr(stderr: ChildStderr, program: String) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut collected = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[{}] stderr: {}", program, line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}
