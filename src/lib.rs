// ABOUTME: Request/response channel to a long-lived engine process over its standard streams
// ABOUTME: Re-exports the launcher, the interactive process facade, configuration, and core types
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

//! # enginelink: Interactive Engine Processes
//!
//! Launches an external computation engine (a computer algebra system such
//! as Maxima, or any line-oriented REPL) and talks to it one statement at a
//! time over stdin/stdout.
//!
//! Each call writes the statement, reads back one logical output line within
//! a timeout, and returns it. A call that overruns, loses the pipe, or is
//! abandoned by its caller terminates the engine instead of leaving it half
//! alive; the caller sees an empty string and
//! [`is_terminated`](types::InteractiveSession::is_terminated) turns `true`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enginelink::{EngineConfig, EngineLauncher, InteractiveSession};
//!
//! # async fn example() -> Result<(), enginelink::EngineError> {
//! let config = EngineConfig::new("maxima")
//!     .with_args(vec!["--very-quiet".to_owned()])
//!     .with_default_call_timeout(5);
//! let process = EngineLauncher::new(config).launch().await?;
//!
//! // `$` statements print nothing; the discard path treats that as success
//! process
//!     .execute_call_discard_output_with_timeout("display2d:false$", 1)
//!     .await?;
//! let result = process.execute_call("expand((y-1)^2);").await?;
//! println!("{result}");
//!
//! process.terminate().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Errors, call values, termination outcomes, session trait
//! - [`config`]: Launch configuration and env/file loading
//! - [`discovery`]: Executable resolution
//! - [`sandbox`]: Engine environment policy
//! - [`launcher`]: Process launcher
//! - [`controller`]: Process lifecycle and termination
//! - [`interactive`]: Public call surface

/// Core types: errors, call values, termination outcomes, session trait
pub mod types;

/// Output collection with deadline-bounded line reads
mod collector;
/// Launch configuration for engine processes
pub mod config;
/// Process lifecycle management and termination
pub mod controller;
/// Call coordination: write, collect, escalate
mod coordinator;
/// Executable resolution
pub mod discovery;
/// Public call surface for a launched engine
pub mod interactive;
/// Engine process launcher
pub mod launcher;
/// Engine environment policy
pub mod sandbox;
/// Engine stderr forwarding
pub mod stderr;
/// Command writes to engine stdin
mod writer;

pub use config::{EngineConfig, SilencePolicy};
pub use controller::ProcessController;
pub use interactive::InteractiveProcess;
pub use launcher::EngineLauncher;
pub use stderr::StderrSink;
pub use types::{
    CallRequest, CallTimeout, EngineError, ErrorKind, InteractiveSession, TerminationOutcome,
};
