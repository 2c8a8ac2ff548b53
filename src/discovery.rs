// ABOUTME: Executable resolution for the engine launcher
// ABOUTME: Finds bare executable names on PATH and validates explicit paths before spawning
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::EngineError;

/// Resolve the configured engine executable to a concrete path
///
/// Resolution order:
/// 1. A path with more than one component must exist as given
/// 2. A bare name is searched on `PATH` using `which`
///
/// # Errors
///
/// Returns a launch error if the executable cannot be found.
pub fn resolve_executable(configured: &Path) -> Result<PathBuf, EngineError> {
    if configured.as_os_str().is_empty() {
        return Err(EngineError::launch("Engine executable path is empty"));
    }

    if configured.components().count() > 1 {
        if configured.exists() {
            debug!(path = %configured.display(), "Using configured engine path");
            return Ok(configured.to_path_buf());
        }
        return Err(EngineError::launch(format!(
            "Engine executable does not exist: {}",
            configured.display()
        )));
    }

    which::which(configured)
        .inspect(|path| debug!(path = %path.display(), "Resolved engine on PATH"))
        .map_err(|e| {
            EngineError::launch(format!(
                "Engine executable '{}' not found on PATH: {e}",
                configured.display()
            ))
        })
}
