//! # TCP Transport
//!
//! Newline-delimited JSON session over TCP: one telemetry payload or
//! response frame per outbound line, one status-probe request per
//! inbound line.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{StatusRequest, Transport};
use crate::config::TransportConfig;
use crate::error::{Result, SleighTelemetryError};

/// Buffered inbound requests before the reader applies backpressure
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// Outbound answer to an inbound request
#[derive(Serialize)]
struct ResponseFrame<'a> {
    rid: u32,
    body: &'a str,
}

/// Broker session over a TCP socket
///
/// The session is created once at startup and torn down at shutdown.
/// A terminal disconnect observed by the read task drops liveness and is
/// logged; no automatic reconnect is attempted here (the orchestrator's
/// periodic connectivity check owns recovery).
pub struct TcpTransport {
    endpoint: String,
    device_id: String,
    connect_timeout: Duration,
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
    live: Arc<AtomicBool>,
    requests: Mutex<Option<mpsc::Receiver<StatusRequest>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.endpoint)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl TcpTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            device_id: config.device_id.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            writer: AsyncMutex::new(None),
            live: Arc::new(AtomicBool::new(false)),
            requests: Mutex::new(None),
            reader_task: Mutex::new(None),
        }
    }

    /// Endpoint this transport connects to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Write one line to the open session
    ///
    /// A write failure drops the session: liveness goes false and the
    /// handle is released.
    async fn send_line(&self, line: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;

        let writer = guard.as_mut().ok_or_else(|| {
            SleighTelemetryError::Transport("no open session".to_string())
        })?;

        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            self.live.store(false, Ordering::SeqCst);
            *guard = None;
            return Err(SleighTelemetryError::Transport(format!(
                "Failed to write to {}: {}",
                self.endpoint, e
            )));
        }

        Ok(())
    }

    /// Read inbound lines until the peer closes or the read fails
    async fn read_loop(
        read_half: OwnedReadHalf,
        request_tx: mpsc::Sender<StatusRequest>,
        live: Arc<AtomicBool>,
    ) {
        let mut lines = BufReader::new(read_half).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<StatusRequest>(&line) {
                    Ok(request) => {
                        if request_tx.send(request).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Ignoring malformed inbound frame: {}", e);
                    }
                },
                Ok(None) => {
                    info!("Transport session closed by peer");
                    break;
                }
                Err(e) => {
                    warn!("Transport read failed: {}", e);
                    break;
                }
            }
        }

        live.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<()> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| {
                SleighTelemetryError::Transport(format!(
                    "Timed out connecting to {}",
                    self.endpoint
                ))
            })?
            .map_err(|e| {
                SleighTelemetryError::Transport(format!(
                    "Failed to connect to {}: {}",
                    self.endpoint, e
                ))
            })?;

        let (read_half, write_half) = stream.into_split();
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);

        *self.writer.lock().await = Some(write_half);
        *self.requests.lock().unwrap() = Some(request_rx);
        self.live.store(true, Ordering::SeqCst);

        let live = Arc::clone(&self.live);
        let reader = tokio::spawn(Self::read_loop(read_half, request_tx, live));
        if let Some(previous) = self.reader_task.lock().unwrap().replace(reader) {
            previous.abort();
        }

        info!(
            "Transport session opened to {} as {}",
            self.endpoint, self.device_id
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.live.store(false, Ordering::SeqCst);

        if let Some(reader) = self.reader_task.lock().unwrap().take() {
            reader.abort();
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            // Best-effort FIN; the session is gone either way
            let _ = writer.shutdown().await;
        }

        info!("Transport session closed");
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    async fn publish(&self, payload: &str) -> Result<()> {
        self.send_line(payload).await
    }

    async fn respond(&self, rid: u32, body: &str) -> Result<()> {
        let frame = serde_json::to_string(&ResponseFrame { rid, body })?;
        self.send_line(&frame).await
    }

    fn take_requests(&self) -> Option<mpsc::Receiver<StatusRequest>> {
        self.requests.lock().unwrap().take()
    }
}
