// ABOUTME: Library half of the enginelink REPL binary
// ABOUTME: Exposes argument parsing and the REPL loop for reuse and integration tests
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

/// Command-line arguments and config resolution
pub mod cli;
/// REPL loop over an interactive session
pub mod session;
