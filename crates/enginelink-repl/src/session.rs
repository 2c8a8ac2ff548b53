// ABOUTME: REPL loop feeding input lines to an interactive engine session
// ABOUTME: Handles :reset and :quit, and renders results as plain text or JSON lines
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::io;

use enginelink::{EngineError, InteractiveSession};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// REPL directive issuing a soft reset
pub const RESET_DIRECTIVE: &str = ":reset";
/// REPL directive ending the session
pub const QUIT_DIRECTIVE: &str = ":quit";
/// Statement terminator asking the engine to print nothing (Maxima `$`)
pub const SILENT_TERMINATOR: char = '$';

/// How results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The raw result line
    Plain,
    /// One JSON object per call
    Json,
}

/// One rendered call in JSON mode
#[derive(Debug, Serialize)]
struct CallRecord<'a> {
    input: &'a str,
    output: &'a str,
    terminated: bool,
}

/// Why the REPL stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// Input was exhausted
    EndOfInput,
    /// The user asked to quit
    Quit,
    /// The engine was terminated by a failed call
    EngineTerminated,
}

/// Feed statements from `input` to `session` until input ends, `:quit`, or
/// the engine dies
///
/// Blank lines are skipped. Each statement is sent as typed; the engine's
/// statement terminator is the user's responsibility. Statements ending in
/// [`SILENT_TERMINATOR`] go through the discard path, so the engine printing
/// nothing for them does not end the session.
pub async fn run_repl<R, W>(
    session: &dyn InteractiveSession,
    input: R,
    output: &mut W,
    format: OutputFormat,
) -> io::Result<ReplExit>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = LinesStream::new(BufReader::new(input).lines());
    let mut calls = 0_usize;

    while let Some(line) = lines.next().await {
        let line = line?;
        let statement = line.trim();
        match statement {
            "" => continue,
            QUIT_DIRECTIVE => {
                info!(calls, "REPL quit requested");
                return Ok(ReplExit::Quit);
            }
            RESET_DIRECTIVE => {
                session.soft_reset().await;
                continue;
            }
            _ => {}
        }

        let result = if statement.ends_with(SILENT_TERMINATOR) {
            session
                .execute_call_discard_output(statement)
                .await
                .map(|()| String::new())
        } else {
            session.execute_call(statement).await
        };
        calls += 1;
        match result {
            Ok(text) => write_result(output, format, statement, &text, session.is_terminated()).await?,
            Err(e) => report_error(output, &e).await?,
        }

        if session.is_terminated() {
            warn!(statement, "Engine terminated during call");
            return Ok(ReplExit::EngineTerminated);
        }
    }
    Ok(ReplExit::EndOfInput)
}

async fn write_result<W>(
    output: &mut W,
    format: OutputFormat,
    input: &str,
    text: &str,
    terminated: bool,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let rendered = match format {
        OutputFormat::Plain => text.to_owned(),
        OutputFormat::Json => serde_json::to_string(&CallRecord {
            input,
            output: text,
            terminated,
        })
        .map_err(io::Error::other)?,
    };
    output.write_all(rendered.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

async fn report_error<W>(output: &mut W, error: &EngineError) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output
        .write_all(format!("error: {error}\n").as_bytes())
        .await?;
    output.flush().await
}
