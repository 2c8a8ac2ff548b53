// ABOUTME: Call coordinator running write-then-collect as one timed unit against the engine
// ABOUTME: Absorbs write, read, timeout, and cancellation faults by terminating the process
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::collector::{collect_line, Collected};
use crate::config::SilencePolicy;
use crate::controller::{ProcessController, Shared};
use crate::types::{CallRequest, EngineError};
use crate::writer::write_command;

/// Extra time the collection task gets past its own deadline before it is
/// considered hung
const COLLECT_SLACK: Duration = Duration::from_millis(500);

/// Mid-call fault; never surfaced, only logged before termination
#[derive(Debug)]
enum CallFault {
    Communication(io::Error),
    Timeout(String),
    Internal(String),
}

impl fmt::Display for CallFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Communication(e) => write!(f, "communication failure: {e}"),
            Self::Timeout(what) => write!(f, "timeout exceeded: {what}"),
            Self::Internal(what) => write!(f, "collector fault: {what}"),
        }
    }
}

impl ProcessController {
    /// Send one command and return the engine's output for it
    ///
    /// With an unbounded timeout the command is written and an empty string
    /// returned without reading. Any fault during the call terminates the
    /// process and yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns an illegal-state error if the process is already terminated.
    pub async fn execute(&self, request: &CallRequest) -> Result<String, EngineError> {
        self.ensure_running()?;

        let guard = EscalationGuard::arm(&self.shared);
        let output = self.run_call(request).await;
        guard.disarm();
        Ok(output)
    }

    async fn run_call(&self, request: &CallRequest) -> String {
        if let Err(e) = write_command(&self.shared.stdin, request.command()).await {
            self.escalate(CallFault::Communication(e)).await;
        }

        let Some(budget) = request.timeout().budget() else {
            trace!("Unbounded call, not collecting output");
            return String::new();
        };
        if self.is_terminated() {
            return String::new();
        }

        trace!(?budget, "Collecting engine output");
        let silence = request.silence().unwrap_or(self.shared.settings.silence);
        match self.collect(budget, silence).await {
            Ok(output) => output,
            Err(fault) => {
                self.escalate(fault).await;
                String::new()
            }
        }
    }

    async fn collect(&self, budget: Duration, silence: SilencePolicy) -> Result<String, CallFault> {
        let task = tokio::spawn(collect_line(
            Arc::clone(&self.shared.stdout),
            budget,
            self.shared.settings.line_continuation,
        ));
        let _abort = AbortOnDrop(task.abort_handle());

        match timeout(budget.saturating_add(COLLECT_SLACK), task).await {
            Err(_) => Err(CallFault::Timeout(format!(
                "collector still running {COLLECT_SLACK:?} after a {budget:?} budget"
            ))),
            Ok(Err(join)) => Err(CallFault::Internal(join.to_string())),
            Ok(Ok(Err(e))) if e.kind() == io::ErrorKind::TimedOut => {
                Err(CallFault::Timeout(e.to_string()))
            }
            Ok(Ok(Err(e))) => Err(CallFault::Communication(e)),
            Ok(Ok(Ok(Collected::Line(line)))) => Ok(line),
            Ok(Ok(Ok(Collected::Silent))) => match silence {
                SilencePolicy::Tolerate => Ok(String::new()),
                SilencePolicy::Escalate => Err(CallFault::Timeout(format!(
                    "no output within {budget:?}"
                ))),
            },
        }
    }

    async fn escalate(&self, fault: CallFault) {
        warn!(%fault, "Engine call failed, terminating process");
        let outcome = self.shared.terminate().await;
        debug!(%outcome, "Escalation finished");
    }
}

/// Aborts a spawned collection task if the call stops waiting for it
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Terminates the engine if a call is dropped before it completes
///
/// A dropped call future means the caller went away mid-exchange; the
/// engine may hold half a response, so it cannot be reused.
struct EscalationGuard {
    shared: Option<Arc<Shared>>,
}

impl EscalationGuard {
    fn arm(shared: &Arc<Shared>) -> Self {
        Self {
            shared: Some(Arc::clone(shared)),
        }
    }

    fn disarm(mut self) {
        self.shared = None;
    }
}

impl Drop for EscalationGuard {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        if shared.is_terminated() {
            return;
        }

        debug!("Engine call abandoned by its caller, terminating process");
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                shared.terminate().await;
            });
        } else {
            shared.kill_now();
        }
    }
}
