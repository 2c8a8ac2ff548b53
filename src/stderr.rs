// ABOUTME: Background pump copying engine stderr into a caller-supplied sink
// ABOUTME: Stops on request during termination and always shuts the sink down
//
// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 enginelink contributors

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Destination for engine stderr output
pub type StderrSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Running copy task from engine stderr into a [`StderrSink`]
pub(crate) struct StderrPump {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StderrPump {
    /// Start copying `stream` into `sink` on the runtime
    pub(crate) fn spawn<R>(stream: R, sink: StderrSink) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        Self {
            stop: Some(stop_tx),
            task: tokio::spawn(pump(stream, sink, stop_rx)),
        }
    }

    /// Stop the pump and wait for it to flush and close the sink
    ///
    /// Output already readable is copied first. If the pump does not finish
    /// within `grace` it is aborted, which drops the sink.
    pub(crate) async fn close(mut self, grace: Duration) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if timeout(grace, &mut self.task).await.is_err() {
            warn!("Engine stderr pump did not stop in time, aborting it");
            self.task.abort();
        }
    }
}

async fn pump<R>(mut stream: R, mut sink: StderrSink, mut stop: oneshot::Receiver<()>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        tokio::select! {
            biased;
            read = stream.read(&mut buf) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Err(e) = sink.write_all(&buf[..n]).await {
                        debug!(error = %e, "Engine stderr sink rejected output");
                        break;
                    }
                }
            },
            _ = &mut stop => break,
        }
    }
    if let Err(e) = sink.shutdown().await {
        debug!(error = %e, "Failed to close engine stderr sink");
    }
}
