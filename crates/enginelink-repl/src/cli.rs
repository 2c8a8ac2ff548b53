// ABOUTME: Command-line arguments for the enginelink REPL
// ABOUTME: Merges an optional TOML config file with flag overrides into an EngineConfig
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::path::PathBuf;

use clap::Parser;
use enginelink::config::{parse_env_pairs, EngineConfig};
use enginelink::{EngineError, SilencePolicy};

/// enginelink-repl: send statements to an interactive engine one call at a time
#[derive(Debug, Parser)]
#[command(name = "enginelink-repl", version, about)]
pub struct Cli {
    /// TOML engine configuration (defaults to the per-user engine.toml when no executable is given)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Engine executable, overriding the configuration file
    #[arg(long)]
    pub executable: Option<PathBuf>,

    /// Argument passed to the engine (repeatable)
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Environment variable for the engine as KEY=VALUE (repeatable)
    #[arg(long = "env")]
    pub env: Vec<String>,

    /// Default call timeout in seconds (0 = 10s fallback, negative = no output collection)
    #[arg(long, allow_hyphen_values = true)]
    pub timeout: Option<i64>,

    /// Return empty output instead of terminating when the engine prints nothing
    #[arg(long)]
    pub tolerate_silence: bool,

    /// Print one JSON object per call instead of plain output
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Resolve the engine configuration from the file and flag overrides
    pub fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        let mut config = match (&self.config, &self.executable) {
            (Some(path), _) => EngineConfig::from_file(path)?,
            (None, Some(executable)) => EngineConfig::new(executable.clone()),
            (None, None) => EngineConfig::load_default()?,
        };

        if let Some(executable) = &self.executable {
            config.executable_path.clone_from(executable);
        }
        if !self.args.is_empty() {
            config.args.clone_from(&self.args);
        }
        config.env.extend(parse_env_pairs(&self.env));
        if let Some(timeout) = self.timeout {
            config.default_call_timeout = timeout;
        }
        if self.tolerate_silence {
            config.silence = SilencePolicy::Tolerate;
        }
        Ok(config)
    }
}
