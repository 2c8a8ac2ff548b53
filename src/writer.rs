// ABOUTME: Stream writer that sends one command to the engine's stdin
// ABOUTME: Serializes writers through a mutex, writes the raw bytes, and flushes
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::trace;

/// Engine stdin shared between calls; `None` once the stream has been closed
pub(crate) type SharedInput<W> = Mutex<Option<W>>;

/// Write a command verbatim to the engine's input and flush it
///
/// Blank commands are skipped without touching the stream. A closed stream
/// fails with [`io::ErrorKind::BrokenPipe`].
pub(crate) async fn write_command<W>(input: &SharedInput<W>, command: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if command.trim().is_empty() {
        trace!("Skipping write of blank command");
        return Ok(());
    }

    let mut guard = input.lock().await;
    let stream = guard
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "engine stdin is closed"))?;

    trace!(command, "engine <<<");
    stream.write_all(command.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_writes_raw_bytes() {
        let (client, mut server) = tokio::io::duplex(64);
        let input = Mutex::new(Some(client));

        write_command(&input, "1;").await.unwrap();
        write_command(&input, "2+3;").await.unwrap();
        drop(input);

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "1;2+3;");
    }

    #[tokio::test]
    async fn test_blank_command_is_noop() {
        let input: SharedInput<tokio::io::DuplexStream> = Mutex::new(None);
        // Closed stream is never touched for blank input
        write_command(&input, "  \n").await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_stream_is_broken_pipe() {
        let input: SharedInput<tokio::io::DuplexStream> = Mutex::new(None);
        let err = write_command(&input, "1;").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_peer_gone_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let input = Mutex::new(Some(client));
        assert!(write_command(&input, "1;").await.is_err());
    }
}
