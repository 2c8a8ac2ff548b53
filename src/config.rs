// ABOUTME: Launch configuration for an interactive engine process
// ABOUTME: Defines EngineConfig, silence policy, env/file loading, and value parsing helpers
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::collections::HashMap;
use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{CallTimeout, EngineError};

/// Fallback call timeout used when the configured default is zero (10 seconds)
pub const DEFAULT_CALL_TIMEOUT_SECS: i64 = 10;

/// Statement sent by a soft reset (Maxima: forget all user definitions)
pub const DEFAULT_SOFT_RESET_COMMAND: &str = "[kill(all),reset()]$";

/// Marker an engine appends to a physical line it split off a longer one
pub const DEFAULT_LINE_CONTINUATION: char = '\\';

/// Environment variable naming the engine executable
const ENV_EXECUTABLE: &str = "ENGINELINK_EXECUTABLE";
/// Environment variable holding comma-separated engine arguments
const ENV_ARGS: &str = "ENGINELINK_ARGS";
/// Environment variable holding comma-separated `KEY=VALUE` pairs for the engine
const ENV_ENV: &str = "ENGINELINK_ENV";
/// Environment variable holding the default call timeout in seconds
const ENV_DEFAULT_TIMEOUT: &str = "ENGINELINK_DEFAULT_TIMEOUT";

/// What a bounded call does when its budget elapses without any output
///
/// Applies to calls that return output. Discard-output calls, and so soft
/// resets, always tolerate silence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilencePolicy {
    /// Treat the silence as a timeout and terminate the process
    #[default]
    Escalate,
    /// Return an empty result and keep the process running
    Tolerate,
}

/// Configuration for launching an engine process
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path (or bare name on `PATH`) of the engine executable
    pub executable_path: PathBuf,
    /// Arguments passed to the executable, in order
    pub args: Vec<String>,
    /// Environment variables set for the engine on top of the inherited ones
    pub env: HashMap<String, String>,
    /// Default call timeout in seconds: `0` uses [`DEFAULT_CALL_TIMEOUT_SECS`],
    /// negative disables output collection
    pub default_call_timeout: i64,
    /// Working directory for the engine
    pub working_directory: Option<PathBuf>,
    /// Host environment keys to pass through; `None` inherits everything
    pub allowed_env_keys: Option<Vec<String>>,
    /// Behavior when a bounded call sees no output at all
    pub silence: SilencePolicy,
    /// Statement issued by a soft reset
    pub soft_reset_command: String,
    /// Continuation marker used to rejoin split output lines
    pub line_continuation: Option<char>,
}

impl EngineConfig {
    /// Create a configuration for the given executable with defaults elsewhere
    #[must_use]
    pub fn new(executable_path: impl Into<PathBuf>) -> Self {
        Self {
            executable_path: executable_path.into(),
            args: Vec::new(),
            env: HashMap::new(),
            default_call_timeout: DEFAULT_CALL_TIMEOUT_SECS,
            working_directory: None,
            allowed_env_keys: None,
            silence: SilencePolicy::default(),
            soft_reset_command: DEFAULT_SOFT_RESET_COMMAND.to_owned(),
            line_continuation: Some(DEFAULT_LINE_CONTINUATION),
        }
    }

    /// Set the executable arguments
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Add one environment variable for the engine
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the default call timeout in seconds
    #[must_use]
    pub const fn with_default_call_timeout(mut self, secs: i64) -> Self {
        self.default_call_timeout = secs;
        self
    }

    /// Set the working directory for the engine
    #[must_use]
    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.working_directory = Some(dir);
        self
    }

    /// Restrict the inherited host environment to these keys
    #[must_use]
    pub fn with_allowed_env_keys(mut self, keys: Vec<String>) -> Self {
        self.allowed_env_keys = Some(keys);
        self
    }

    /// Set the silence policy
    #[must_use]
    pub const fn with_silence(mut self, silence: SilencePolicy) -> Self {
        self.silence = silence;
        self
    }

    /// Set the soft reset statement
    #[must_use]
    pub fn with_soft_reset_command(mut self, command: impl Into<String>) -> Self {
        self.soft_reset_command = command.into();
        self
    }

    /// Set or clear the line continuation marker
    #[must_use]
    pub const fn with_line_continuation(mut self, marker: Option<char>) -> Self {
        self.line_continuation = marker;
        self
    }

    /// Timeout applied when a caller does not pass one
    #[must_use]
    pub const fn effective_default_timeout(&self) -> CallTimeout {
        resolve_default_timeout(self.default_call_timeout)
    }

    /// Build a configuration from `ENGINELINK_*` environment variables
    ///
    /// Environment variables:
    /// - `ENGINELINK_EXECUTABLE`: engine executable (required)
    /// - `ENGINELINK_ARGS`: comma-separated arguments
    /// - `ENGINELINK_ENV`: comma-separated `KEY=VALUE` pairs
    /// - `ENGINELINK_DEFAULT_TIMEOUT`: default call timeout in seconds
    pub fn from_env() -> Result<Self, EngineError> {
        let executable = env::var(ENV_EXECUTABLE).map_err(|_| {
            EngineError::config(format!("{ENV_EXECUTABLE} environment variable is required"))
        })?;

        let mut config = Self::new(executable);
        if let Ok(args) = env::var(ENV_ARGS) {
            config.args = parse_list(&args);
        }
        if let Ok(pairs) = env::var(ENV_ENV) {
            config.env = parse_env_pairs(&parse_list(&pairs));
        }
        if let Ok(timeout) = env::var(ENV_DEFAULT_TIMEOUT) {
            config.default_call_timeout = parse_timeout(&timeout).map_err(|e| {
                EngineError::config(format!("{ENV_DEFAULT_TIMEOUT} is not a valid integer: {e}"))
            })?;
        }
        Ok(config)
    }
}

/// Map a configured default timeout to the one actually applied
///
/// Positive values are used as-is, zero falls back to
/// [`DEFAULT_CALL_TIMEOUT_SECS`], and negative values disable collection.
#[must_use]
pub const fn resolve_default_timeout(configured: i64) -> CallTimeout {
    if configured == 0 {
        CallTimeout::from_secs(DEFAULT_CALL_TIMEOUT_SECS)
    } else {
        CallTimeout::from_secs(configured)
    }
}

/// Parse a comma-separated list, dropping blank entries
#[must_use]
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parse `KEY=VALUE` entries into a map, skipping malformed ones
#[must_use]
pub fn parse_env_pairs(entries: &[String]) -> HashMap<String, String> {
    let mut envs = HashMap::new();
    for entry in entries {
        match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                envs.insert(key.trim().to_owned(), value.to_owned());
            }
            _ => warn!(entry = %entry, "Skipping invalid engine env entry"),
        }
    }
    envs
}

/// Parse a timeout value in seconds (may be zero or negative)
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as an `i64`.
pub fn parse_timeout(input: &str) -> Result<i64, ParseIntError> {
    input.trim().parse::<i64>()
}

#[cfg(feature = "config-file")]
mod file {
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    use serde::Deserialize;
    use tracing::debug;

    use super::{EngineConfig, SilencePolicy};
    use crate::types::EngineError;

    /// Name of the per-user configuration file
    pub const DEFAULT_CONFIG_FILE: &str = "engine.toml";

    /// On-disk shape of `engine.toml`
    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct FileConfig {
        executable: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        default_timeout: Option<i64>,
        working_directory: Option<PathBuf>,
        allowed_env_keys: Option<Vec<String>>,
        silence: Option<SilencePolicy>,
        soft_reset_command: Option<String>,
        line_continuation: Option<String>,
    }

    impl EngineConfig {
        /// Parse a configuration from TOML text
        pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
            let file: FileConfig = toml::from_str(text)
                .map_err(|e| EngineError::config(format!("Invalid engine config: {e}")))?;

            let mut config = Self::new(file.executable).with_args(file.args);
            config.env = file.env;
            if let Some(secs) = file.default_timeout {
                config.default_call_timeout = secs;
            }
            config.working_directory = file.working_directory;
            config.allowed_env_keys = file.allowed_env_keys;
            if let Some(silence) = file.silence {
                config.silence = silence;
            }
            if let Some(reset) = file.soft_reset_command {
                config.soft_reset_command = reset;
            }
            if let Some(marker) = file.line_continuation {
                config.line_continuation = parse_marker(&marker)?;
            }
            Ok(config)
        }

        /// Load a configuration from a TOML file
        pub fn from_file(path: &Path) -> Result<Self, EngineError> {
            let text = fs::read_to_string(path).map_err(|e| {
                EngineError::config(format!("Cannot read {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "Loaded engine config file");
            Self::from_toml_str(&text)
        }

        /// Load `<config dir>/enginelink/engine.toml`
        pub fn load_default() -> Result<Self, EngineError> {
            let path = default_config_path()
                .ok_or_else(|| EngineError::config("No user configuration directory"))?;
            Self::from_file(&path)
        }
    }

    /// Location of the per-user configuration file, if the platform has one
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("enginelink").join(DEFAULT_CONFIG_FILE))
    }

    /// An empty string disables continuation; otherwise exactly one character
    fn parse_marker(marker: &str) -> Result<Option<char>, EngineError> {
        let mut chars = marker.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(None),
            (Some(c), None) => Ok(Some(c)),
            _ => Err(EngineError::config(format!(
                "line_continuation must be a single character, got {marker:?}"
            ))),
        }
    }
}

#[cfg(feature = "config-file")]
pub use file::{default_config_path, DEFAULT_CONFIG_FILE};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resolve_default_timeout() {
        assert_eq!(
            resolve_default_timeout(7),
            CallTimeout::Bounded(Duration::from_secs(7))
        );
        assert_eq!(
            resolve_default_timeout(0),
            CallTimeout::Bounded(Duration::from_secs(10))
        );
        assert_eq!(resolve_default_timeout(-1), CallTimeout::Unbounded);
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new("maxima");
        assert_eq!(config.executable_path, PathBuf::from("maxima"));
        assert!(config.args.is_empty());
        assert_eq!(config.silence, SilencePolicy::Escalate);
        assert_eq!(config.line_continuation, Some('\\'));
        assert_eq!(config.soft_reset_command, DEFAULT_SOFT_RESET_COMMAND);
    }

    #[test]
    fn test_parse_env_pairs_skips_malformed() {
        let entries = parse_list("MAXIMA_PREFIX=/opt/maxima, broken ,=nokey,LANG=C=UTF8");
        let envs = parse_env_pairs(&entries);
        assert_eq!(envs.len(), 2);
        assert_eq!(envs["MAXIMA_PREFIX"], "/opt/maxima");
        assert_eq!(envs["LANG"], "C=UTF8");
    }

    #[test]
    fn test_parse_timeout_accepts_negative() {
        assert_eq!(parse_timeout(" -1 ").unwrap(), -1);
        assert!(parse_timeout("soon").is_err());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_str() {
        let config = EngineConfig::from_toml_str(
            r#"
            executable = "/usr/bin/maxima"
            args = ["--very-quiet", "--disable-readline"]
            default_timeout = 0
            silence = "tolerate"
            line_continuation = ""

            [env]
            MAXIMA_USERDIR = "/tmp/maxima"
            "#,
        )
        .unwrap();
        assert_eq!(config.args, vec!["--very-quiet", "--disable-readline"]);
        assert_eq!(config.env["MAXIMA_USERDIR"], "/tmp/maxima");
        assert_eq!(
            config.effective_default_timeout(),
            CallTimeout::Bounded(Duration::from_secs(10))
        );
        assert_eq!(config.silence, SilencePolicy::Tolerate);
        assert_eq!(config.line_continuation, None);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_from_toml_str_rejects_long_marker() {
        let err = EngineConfig::from_toml_str(
            r#"
            executable = "maxima"
            line_continuation = "\\\\"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::types::ErrorKind::Config);
    }
}
