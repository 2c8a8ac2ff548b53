// ABOUTME: Output collector that reads one logical line of engine output under a deadline
// ABOUTME: Keeps partial bytes across cancellation and rejoins engine-split continuation lines
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::io;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::trace;

use crate::types::MAX_CALL_BUDGET;

/// Buffered engine stdout plus any bytes of a line not yet terminated
///
/// `read_until` appends partial data to `pending` before it can be cancelled,
/// so an interrupted read never drops bytes on the floor.
pub(crate) struct OutputReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputReader<R> {
    pub(crate) fn new(stream: R) -> Self {
        Self {
            inner: BufReader::new(stream),
            pending: Vec::new(),
        }
    }
}

/// Engine stdout shared between the controller and collection tasks
pub(crate) type SharedOutput<R> = Arc<Mutex<OutputReader<R>>>;

/// What a collection attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Collected {
    /// One logical line, trailing whitespace removed
    Line(String),
    /// Nothing at all arrived before the deadline
    Silent,
}

/// Read one logical line from the engine within `budget`
///
/// A physical line ending in `continuation` (after trimming) is joined with
/// the next one without a separator. Errors:
/// - [`io::ErrorKind::TimedOut`] if a line started but did not finish in time,
///   or another reader held the stream for the whole budget
/// - [`io::ErrorKind::UnexpectedEof`] if the engine closed its output
pub(crate) async fn collect_line<R>(
    output: SharedOutput<R>,
    budget: Duration,
    continuation: Option<char>,
) -> io::Result<Collected>
where
    R: AsyncRead + Unpin,
{
    let now = Instant::now();
    let deadline = now
        .checked_add(budget)
        .unwrap_or_else(|| now + MAX_CALL_BUDGET);
    let Ok(mut guard) = timeout_at(deadline, output.lock()).await else {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "engine output stream busy for the whole call budget",
        ));
    };
    let reader = &mut *guard;

    let mut logical = String::new();
    loop {
        let read = timeout_at(deadline, reader.inner.read_until(b'\n', &mut reader.pending)).await;
        let at_eof = match read {
            Err(_) if logical.is_empty() && reader.pending.is_empty() => {
                return Ok(Collected::Silent);
            }
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "engine output line incomplete at deadline",
                ));
            }
            Ok(Err(e)) => return Err(e),
            Ok(Ok(0)) if reader.pending.is_empty() => {
                if logical.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "engine closed its output stream",
                    ));
                }
                return Ok(Collected::Line(logical));
            }
            Ok(Ok(0)) => true,
            Ok(Ok(_)) => false,
        };

        let bytes = mem::take(&mut reader.pending);
        let text = String::from_utf8_lossy(&bytes);
        let line = text.trim_end();
        trace!(line, "engine >>>");

        match continuation.and_then(|marker| line.strip_suffix(marker)) {
            Some(head) if !at_eof => logical.push_str(head),
            Some(head) => {
                logical.push_str(head);
                return Ok(Collected::Line(logical));
            }
            None => {
                logical.push_str(line);
                return Ok(Collected::Line(logical));
            }
        }
    }
}
