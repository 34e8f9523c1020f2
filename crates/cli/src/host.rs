//! JSON-lines host: one request per input line, one reply per output line.
//!
//! Requests run concurrently, so replies may come back out of order; callers
//! match them up by `id`.

use std::sync::Arc;

use {
    anyhow::Context,
    passvault_ipc::Dispatcher,
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    tokio::{
        io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
        sync::mpsc,
    },
    tracing::{debug, info, warn},
};

/// Host-level channel returning the Prometheus text exposition.
pub const METRICS_CHANNEL: &str = "metrics:render";

/// Renders the current metrics snapshot.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Deserialize)]
struct Request {
    /// Echoed back untouched so the caller can correlate replies.
    #[serde(default)]
    id: Value,
    channel: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Serialize)]
struct Reply {
    id: Value,
    result: Value,
}

#[derive(Clone)]
pub struct Host {
    dispatcher: Dispatcher,
    metrics: Option<MetricsRender>,
}

impl Host {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, render: MetricsRender) -> Self {
        self.metrics = Some(render);
        self
    }

    async fn handle(&self, channel: &str, payload: Value) -> Value {
        if channel == METRICS_CHANNEL {
            return match &self.metrics {
                Some(render) => Value::String(render()),
                None => json!({ "error": "Metrics are not enabled" }),
            };
        }
        self.dispatcher.dispatch(channel, payload).await
    }

    /// Serve requests from `reader` until it reaches end of input and every
    /// reply has been written.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

        let read = async move {
            let mut lines = reader.lines();
            let mut received: u64 = 0;

            while let Some(line) = lines.next_line().await.context("failed to read request")? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                received += 1;

                match serde_json::from_str::<Request>(line) {
                    Ok(request) => {
                        debug!(channel = %request.channel, "request received");
                        let host = self.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let result = host.handle(&request.channel, request.payload).await;
                            // The writer only goes away after a write error.
                            let _ = tx.send(Reply {
                                id: request.id,
                                result,
                            });
                        });
                    },
                    Err(e) => {
                        warn!(error = %e, "malformed request line");
                        let _ = tx.send(Reply {
                            id: Value::Null,
                            result: json!({ "error": format!("Invalid request: {e}") }),
                        });
                    },
                }
            }

            info!(requests = received, "input closed");
            anyhow::Ok(())
        };

        let write = async {
            while let Some(reply) = rx.recv().await {
                let mut out = serde_json::to_vec(&reply)?;
                out.push(b'\n');
                writer
                    .write_all(&out)
                    .await
                    .context("failed to write reply")?;
                writer.flush().await?;
            }
            anyhow::Ok(())
        };

        tokio::try_join!(read, write)?;
        Ok(())
    }
}
