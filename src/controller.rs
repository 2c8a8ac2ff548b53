// ABOUTME: Lifecycle manager owning the engine child process and its three streams
// ABOUTME: Implements the one-way Running -> Terminated transition with graceful exit then forced kill
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::collector::{OutputReader, SharedOutput};
use crate::config::{EngineConfig, SilencePolicy};
use crate::stderr::{StderrPump, StderrSink};
use crate::types::{EngineError, TerminationOutcome};
use crate::writer::SharedInput;

/// Time to wait after closing the engine's input before killing it
pub const PROCESS_KILL_GRACE: Duration = Duration::from_secs(1);

/// Per-process call behavior taken from the launch configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSettings {
    /// What a bounded call does when no output arrives
    pub silence: SilencePolicy,
    /// Continuation marker used to rejoin split output lines
    pub line_continuation: Option<char>,
}

impl From<&EngineConfig> for CallSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            silence: config.silence,
            line_continuation: config.line_continuation,
        }
    }
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            silence: SilencePolicy::default(),
            line_continuation: Some(crate::config::DEFAULT_LINE_CONTINUATION),
        }
    }
}

/// Owns one running engine process
///
/// The process moves from running to terminated exactly once. After that no
/// stream I/O is attempted and every call fails with an illegal-state error.
/// Dropping the last handle of a running process kills it.
pub struct ProcessController {
    pub(crate) shared: Arc<Shared>,
}

/// State shared with background tasks that may outlive a single call
pub(crate) struct Shared {
    child: Mutex<Child>,
    pid: Option<u32>,
    pub(crate) stdin: SharedInput<ChildStdin>,
    pub(crate) stdout: SharedOutput<ChildStdout>,
    stderr_pump: Mutex<Option<StderrPump>>,
    terminated: AtomicBool,
    outcome: OnceLock<TerminationOutcome>,
    pub(crate) settings: CallSettings,
}

impl ProcessController {
    /// Take ownership of a spawned child with piped stdin and stdout
    ///
    /// If `stderr_sink` is given and the child's stderr is piped, a background
    /// task copies stderr into the sink until termination.
    pub fn new(
        mut child: Child,
        stderr_sink: Option<StderrSink>,
        settings: CallSettings,
    ) -> Result<Self, EngineError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::internal("Engine stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::internal("Engine stdout was not piped"))?;
        let stderr_pump = match (stderr_sink, child.stderr.take()) {
            (Some(sink), Some(stream)) => Some(StderrPump::spawn(stream, sink)),
            _ => None,
        };
        let pid = child.id();

        debug!(?pid, ?settings, "Engine process under control");

        Ok(Self {
            shared: Arc::new(Shared {
                child: Mutex::new(child),
                pid,
                stdin: Mutex::new(Some(stdin)),
                stdout: Arc::new(Mutex::new(OutputReader::new(stdout))),
                stderr_pump: Mutex::new(stderr_pump),
                terminated: AtomicBool::new(false),
                outcome: OnceLock::new(),
                settings,
            }),
        })
    }

    /// Whether the process has been terminated
    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    /// Outcome recorded by the first termination, once it has completed
    pub fn termination_outcome(&self) -> Option<TerminationOutcome> {
        self.shared.outcome.get().copied()
    }

    /// OS process id while the process is running
    pub fn process_id(&self) -> Option<u32> {
        if self.is_terminated() {
            None
        } else {
            self.shared.pid
        }
    }

    /// Terminate the process, forcibly if required
    ///
    /// Only the first call does any work; later calls return
    /// [`TerminationOutcome::AlreadyTerminated`].
    pub async fn terminate(&self) -> TerminationOutcome {
        self.shared.terminate().await
    }

    pub(crate) fn ensure_running(&self) -> Result<(), EngineError> {
        if self.is_terminated() {
            return Err(EngineError::terminated());
        }
        Ok(())
    }
}

impl Shared {
    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) async fn terminate(&self) -> TerminationOutcome {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return TerminationOutcome::AlreadyTerminated;
        }

        let outcome = self.shut_down_child().await;
        self.release_stderr().await;

        let _ = self.outcome.set(outcome);
        debug!(pid = ?self.pid, %outcome, "Engine process terminated");
        outcome
    }

    /// Kill without waiting, for use where no runtime is available
    pub(crate) fn kill_now(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.child.try_lock() {
            Ok(mut child) => {
                if let Err(e) = child.start_kill() {
                    warn!(error = %e, "Failed to kill engine process");
                }
            }
            Err(_) => warn!("Engine process busy, leaving kill to drop"),
        }
        let _ = self.outcome.set(TerminationOutcome::ForciblyDestroyed);
    }

    async fn shut_down_child(&self) -> TerminationOutcome {
        let mut child = self.child.lock().await;

        debug!(pid = ?self.pid, "Asking engine to exit by closing its input");
        match self.close_input().await {
            Ok(()) => match timeout(PROCESS_KILL_GRACE, child.wait()).await {
                Ok(Ok(status)) => return TerminationOutcome::ExitedWithCode(status.code().unwrap_or(-1)),
                Ok(Err(e)) => debug!(error = %e, "Failed to wait for engine exit"),
                Err(_) => debug!(grace = ?PROCESS_KILL_GRACE, "Engine did not exit in time"),
            },
            Err(e) => debug!(error = %e, "Could not close engine input"),
        }

        debug!(pid = ?self.pid, "Forcibly killing engine process");
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill engine process");
        }
        TerminationOutcome::ForciblyDestroyed
    }

    /// Close stdin so the engine sees end of input
    ///
    /// A write still holding the stream means the pipe is stuck; that case is
    /// reported as a failure so the caller escalates to a kill.
    async fn close_input(&self) -> io::Result<()> {
        let Ok(mut guard) = self.stdin.try_lock() else {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "engine stdin busy with an in-flight write",
            ));
        };
        match guard.take() {
            Some(mut stdin) => stdin.shutdown().await,
            None => Ok(()),
        }
    }

    async fn release_stderr(&self) {
        let pump = self.stderr_pump.lock().await.take();
        if let Some(pump) = pump {
            pump.close(PROCESS_KILL_GRACE).await;
        }
    }
}
