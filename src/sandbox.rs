// ABOUTME: Environment and working-directory setup for the engine subprocess
// ABOUTME: Layers configured variables over the inherited or whitelisted host environment
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use crate::config::EngineConfig;

/// Environment the engine process will see
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPolicy {
    /// Host keys to pass through; `None` inherits the whole host environment
    pub allowed_env_keys: Option<Vec<String>>,
    /// Variables set for the engine, overriding inherited values
    pub overrides: HashMap<String, String>,
    /// Working directory for the engine
    pub working_directory: Option<PathBuf>,
}

impl EnvironmentPolicy {
    /// Extract the policy from a launch configuration
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            allowed_env_keys: config.allowed_env_keys.clone(),
            overrides: config.env.clone(),
            working_directory: config.working_directory.clone(),
        }
    }
}

/// Apply the environment policy to a command before spawning it
///
/// With a whitelist the host environment is cleared and only the listed keys
/// are re-injected. Configured overrides are applied last either way.
pub fn apply_environment(cmd: &mut Command, policy: &EnvironmentPolicy) {
    let mut missing = Vec::new();
    if let Some(keys) = &policy.allowed_env_keys {
        cmd.env_clear();
        for key in keys {
            if let Ok(value) = env::var(key) {
                cmd.env(key, value);
            } else {
                missing.push(key.as_str());
            }
        }
    }

    cmd.envs(&policy.overrides);

    if let Some(dir) = &policy.working_directory {
        cmd.current_dir(dir);
    }

    debug!(
        whitelisted = policy.allowed_env_keys.is_some(),
        override_count = policy.overrides.len(),
        ?missing,
        "Applied engine environment"
    );
}
