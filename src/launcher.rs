// ABOUTME: Process launcher that spawns the engine from an EngineConfig
// ABOUTME: Builds the command line and environment, pipes stdio, and hands the child to a controller
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::process::Stdio;

use tokio::io::AsyncWrite;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::EngineConfig;
use crate::controller::{CallSettings, ProcessController};
use crate::discovery::resolve_executable;
use crate::interactive::InteractiveProcess;
use crate::sandbox::{apply_environment, EnvironmentPolicy};
use crate::stderr::StderrSink;
use crate::types::EngineError;

/// Starts interactive engine processes from one configuration
///
/// A launcher can be shared and used to start any number of independent
/// processes.
#[derive(Debug, Clone)]
pub struct EngineLauncher {
    config: EngineConfig,
}

impl EngineLauncher {
    /// Create a launcher for the given configuration
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration processes are launched with
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Launch a process whose stderr is discarded
    // Async so spawning always happens inside a runtime that owns the pipes
    #[allow(clippy::unused_async)]
    pub async fn launch(&self) -> Result<InteractiveProcess, EngineError> {
        self.start(None)
    }

    /// Launch a process whose stderr is copied into `sink`
    ///
    /// The sink is shut down when the process is terminated.
    #[allow(clippy::unused_async)]
    pub async fn launch_with_stderr<W>(&self, sink: W) -> Result<InteractiveProcess, EngineError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.start(Some(Box::new(sink)))
    }

    fn start(&self, stderr_sink: Option<StderrSink>) -> Result<InteractiveProcess, EngineError> {
        let child = self.spawn(stderr_sink.is_some())?;
        let controller =
            ProcessController::new(child, stderr_sink, CallSettings::from(&self.config))?;
        debug!(
            default_timeout = %self.config.effective_default_timeout(),
            "Engine interactive process started and ready for communication"
        );
        Ok(InteractiveProcess::new(
            controller,
            self.config.effective_default_timeout(),
            self.config.soft_reset_command.clone(),
        ))
    }

    fn spawn(&self, pipe_stderr: bool) -> Result<Child, EngineError> {
        let executable = resolve_executable(&self.config.executable_path)?;

        let mut cmd = Command::new(&executable);
        cmd.args(&self.config.args);
        apply_environment(&mut cmd, &EnvironmentPolicy::from_config(&self.config));
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if pipe_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        debug!(
            executable = %executable.display(),
            args = ?self.config.args,
            env = ?self.config.env,
            "Starting engine process"
        );

        cmd.spawn().map_err(|e| {
            EngineError::launch(format!(
                "Failed to spawn engine {}: {e}",
                executable.display()
            ))
        })
    }
}
