// ABOUTME: Core types for the engine channel: error type, call values, and termination outcomes
// ABOUTME: Provides EngineError, CallRequest, CallTimeout, TerminationOutcome, and the session trait
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

//! # Core Types
//!
//! Value types shared by the launcher, the process controller, and the
//! interactive facade. Nothing here touches a process.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SilencePolicy;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for engine channel operations
///
/// Only structural misuse and launch failures are surfaced through this type.
/// Faults during an in-flight call are absorbed into process termination.
#[derive(Debug, Clone)]
pub struct EngineError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Categories of errors produced by the engine channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The engine process could not be spawned
    Launch,
    /// Malformed command text passed to the call surface
    InvalidArgument,
    /// Operation attempted after the process was terminated
    IllegalState,
    /// Configuration could not be read or parsed
    Config,
    /// Internal error (bug, unexpected state)
    Internal,
}

impl EngineError {
    /// Create a launch error
    pub fn launch(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Launch,
            message: message.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            message: message.into(),
        }
    }

    /// Create an illegal-state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::IllegalState,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }

    /// Error returned for any operation on a terminated process
    pub(crate) fn terminated() -> Self {
        Self::illegal_state("engine process has already been terminated")
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

// ============================================================================
// Call Values
// ============================================================================

/// Longest collection budget a call can ask for (about thirty years)
pub const MAX_CALL_BUDGET: Duration = Duration::from_secs(86_400 * 365 * 30);

/// How long a single call may wait for the engine's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTimeout {
    /// Collect output for at most this long
    Bounded(Duration),
    /// Write the command and return immediately without reading any output
    Unbounded,
}

impl CallTimeout {
    /// Interpret a timeout in whole seconds: positive is bounded (capped at
    /// [`MAX_CALL_BUDGET`]), zero or negative means no output collection at all
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        if secs > 0 {
            let budget = Duration::from_secs(secs as u64);
            if budget.as_secs() > MAX_CALL_BUDGET.as_secs() {
                Self::Bounded(MAX_CALL_BUDGET)
            } else {
                Self::Bounded(budget)
            }
        } else {
            Self::Unbounded
        }
    }

    /// The collection budget, if any
    #[must_use]
    pub const fn budget(&self) -> Option<Duration> {
        match self {
            Self::Bounded(d) => Some(*d),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for CallTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(d) => write!(f, "{}s", d.as_secs_f64()),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// One validated command to send to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    command: String,
    timeout: CallTimeout,
    silence: Option<SilencePolicy>,
}

impl CallRequest {
    /// Validate command text and pair it with a timeout
    ///
    /// Empty text is accepted (it becomes a no-op write). Text containing a
    /// NUL byte is rejected because it cannot be a statement for a text engine.
    pub fn new(command: impl Into<String>, timeout: CallTimeout) -> Result<Self, EngineError> {
        let command = command.into();
        if command.contains('\0') {
            return Err(EngineError::invalid_argument(
                "command text must not contain NUL bytes",
            ));
        }
        Ok(Self {
            command,
            timeout,
            silence: None,
        })
    }

    /// Override the process-wide silence policy for this call only
    #[must_use]
    pub const fn with_silence(mut self, silence: SilencePolicy) -> Self {
        self.silence = Some(silence);
        self
    }

    /// The raw command text
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The call timeout
    #[must_use]
    pub const fn timeout(&self) -> CallTimeout {
        self.timeout
    }

    /// Silence policy requested for this call, if it overrides the process one
    #[must_use]
    pub const fn silence(&self) -> Option<SilencePolicy> {
        self.silence
    }
}

/// Result of a termination attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "code", rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// The process had already been terminated; nothing was done
    AlreadyTerminated,
    /// The process exited on its own within the grace period
    /// (`-1` when it was ended by a signal)
    ExitedWithCode(i32),
    /// The process had to be killed
    ForciblyDestroyed,
}

impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyTerminated => write!(f, "already terminated"),
            Self::ExitedWithCode(code) => write!(f, "exited with code {code}"),
            Self::ForciblyDestroyed => write!(f, "forcibly destroyed"),
        }
    }
}

// ============================================================================
// Session Trait
// ============================================================================

/// Public call surface of an interactive engine process
///
/// One call may be in flight per session at a time. Faults during a call
/// return an empty string and leave the session terminated; check
/// [`is_terminated`](Self::is_terminated) to tell them apart from silence.
#[async_trait]
pub trait InteractiveSession: Send + Sync {
    /// Send a command using the default timeout and return its output
    async fn execute_call(&self, input: &str) -> Result<String, EngineError>;

    /// Send a command with an explicit timeout in seconds (`<= 0` skips collection)
    async fn execute_call_with_timeout(
        &self,
        input: &str,
        timeout_secs: i64,
    ) -> Result<String, EngineError>;

    /// Send a command using the default timeout, discarding its output
    ///
    /// Silence within the timeout is not a fault here: statements run for
    /// their side effects usually print nothing.
    async fn execute_call_discard_output(&self, input: &str) -> Result<(), EngineError>;

    /// Send a command with an explicit timeout, discarding its output
    async fn execute_call_discard_output_with_timeout(
        &self,
        input: &str,
        timeout_secs: i64,
    ) -> Result<(), EngineError>;

    /// Issue the configured reset statement, ignoring its output
    async fn soft_reset(&self);

    /// Whether the underlying process has been terminated
    fn is_terminated(&self) -> bool;

    /// Terminate the underlying process, forcibly if required
    async fn terminate(&self) -> TerminationOutcome;
}
