// ABOUTME: Interactive process facade exposing the public call surface for one engine
// ABOUTME: Validates input, applies default timeouts, and guards against use after termination
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::SilencePolicy;
use crate::controller::ProcessController;
use crate::types::{CallRequest, CallTimeout, EngineError, InteractiveSession, TerminationOutcome};

/// A launched engine process that accepts one call at a time
///
/// Created by [`EngineLauncher`](crate::EngineLauncher). Calls return the
/// engine's output line; faults return an empty string and leave the process
/// terminated. Once terminated, every call fails with an illegal-state error
/// and the caller should launch a new process.
pub struct InteractiveProcess {
    controller: ProcessController,
    default_timeout: CallTimeout,
    soft_reset_command: String,
}

impl InteractiveProcess {
    /// Wrap a process controller with call defaults
    #[must_use]
    pub fn new(
        controller: ProcessController,
        default_timeout: CallTimeout,
        soft_reset_command: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            default_timeout,
            soft_reset_command: soft_reset_command.into(),
        }
    }

    /// Timeout used by calls that do not pass one
    #[must_use]
    pub const fn default_timeout(&self) -> CallTimeout {
        self.default_timeout
    }

    /// Outcome of the first termination, once it has completed
    pub fn termination_outcome(&self) -> Option<TerminationOutcome> {
        self.controller.termination_outcome()
    }

    /// OS process id while the engine is running
    pub fn process_id(&self) -> Option<u32> {
        self.controller.process_id()
    }

    async fn call(&self, input: &str, timeout: CallTimeout) -> Result<String, EngineError> {
        self.send(&CallRequest::new(input, timeout)?).await
    }

    /// Side-effect call: an engine that prints nothing is not at fault
    async fn call_discarding(&self, input: &str, timeout: CallTimeout) -> Result<(), EngineError> {
        let request = CallRequest::new(input, timeout)?.with_silence(SilencePolicy::Tolerate);
        self.send(&request).await.map(drop)
    }

    async fn send(&self, request: &CallRequest) -> Result<String, EngineError> {
        self.controller.ensure_running()?;
        let input = request.command();
        let timeout = request.timeout();

        let output = self.controller.execute(request).await?;
        debug!(input, %timeout, output = %output, "Engine call finished");
        Ok(output)
    }
}

#[async_trait]
impl InteractiveSession for InteractiveProcess {
    async fn execute_call(&self, input: &str) -> Result<String, EngineError> {
        self.call(input, self.default_timeout).await
    }

    async fn execute_call_with_timeout(
        &self,
        input: &str,
        timeout_secs: i64,
    ) -> Result<String, EngineError> {
        self.call(input, CallTimeout::from_secs(timeout_secs)).await
    }

    async fn execute_call_discard_output(&self, input: &str) -> Result<(), EngineError> {
        self.call_discarding(input, self.default_timeout).await
    }

    async fn execute_call_discard_output_with_timeout(
        &self,
        input: &str,
        timeout_secs: i64,
    ) -> Result<(), EngineError> {
        self.call_discarding(input, CallTimeout::from_secs(timeout_secs)).await
    }

    async fn soft_reset(&self) {
        if let Err(e) = self.execute_call_discard_output(&self.soft_reset_command).await {
            warn!(error = %e, "Soft reset skipped");
        }
    }

    fn is_terminated(&self) -> bool {
        self.controller.is_terminated()
    }

    async fn terminate(&self) -> TerminationOutcome {
        self.controller.terminate().await
    }
}
