use std::sync::Arc;

use cronlytic_core::transport::Transport;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::module::{Module, ModuleCtx};
use crate::server::McpServer;

const OUTBOX: usize = 64;

/// Newline-delimited JSON-RPC over stdin/stdout.
pub struct StdioServer<T: Transport> {
    server: Arc<McpServer<T>>,
}

impl<T: Transport + 'static> StdioServer<T> {
    pub fn new(server: Arc<McpServer<T>>) -> Self {
        Self { server }
    }
}

impl<T: Transport + 'static> Module for StdioServer<T> {
    fn name(&self) -> &'static str { "stdio" }

    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            serve(self.server, reader, tokio::io::stdout(), ctx.shutdown).await?;
            Ok(())
        })
    }
}

/// Read frames until EOF or shutdown. Each request runs on its own task;
/// one writer task owns `writer`, so responses never interleave.
/// Returns the writer once every in-flight response has been written.
pub async fn serve<T, R, W>(
    server: Arc<McpServer<T>>,
    reader: R,
    writer: W,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<W>
where
    T: Transport + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Value>(OUTBOX);
    let out = tokio::spawn(write_loop(rx, writer));

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let server = server.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(resp) = server.handle_line(&line).await {
                        // Writer gone means we are shutting down.
                        let _ = tx.send(resp).await;
                    }
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("stdio stopping");
                    break;
                }
            }
        }
    }

    drop(tx);
    out.await?
}

async fn write_loop<W: AsyncWrite + Unpin>(mut rx: mpsc::Receiver<Value>, mut writer: W) -> anyhow::Result<W> {
    while let Some(msg) = rx.recv().await {
        let mut frame = msg.to_string();
        frame.push('\n');
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        debug!(bytes = frame.len(), "frame written");
    }
    Ok(writer)
}
