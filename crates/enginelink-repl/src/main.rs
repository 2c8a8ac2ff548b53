// ABOUTME: CLI entry point for the enginelink REPL binary
// ABOUTME: Parses arguments, launches the engine, runs the REPL, and reports the termination outcome
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use clap::Parser;
use enginelink::{EngineLauncher, InteractiveSession};

use enginelink_repl::cli::Cli;
use enginelink_repl::session::{run_repl, OutputFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config()?;

    tracing::info!(
        executable = %config.executable_path.display(),
        default_timeout = %config.effective_default_timeout(),
        "Starting engine"
    );

    let process = EngineLauncher::new(config)
        .launch_with_stderr(tokio::io::stderr())
        .await?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };
    let mut stdout = tokio::io::stdout();
    let exit = run_repl(&process, tokio::io::stdin(), &mut stdout, format).await?;

    let outcome = process.terminate().await;
    let outcome = process.termination_outcome().unwrap_or(outcome);
    tracing::info!(?exit, %outcome, "Engine session finished");

    Ok(())
}
