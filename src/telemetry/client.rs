//! # Telemetry Client
//!
//! Wraps the transport session and the delivery queue into the device's
//! single uplink: synchronous fire-and-forget sends, queued sends that
//! survive transient connectivity loss, and the inbound status probe.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::QueueConfig;
use crate::error::Result;
use crate::queue::{DeliveryHandler, DeliveryQueue};
use crate::transport::Transport;

/// Reply to the remote status probe
#[derive(Serialize)]
struct StatusReply {
    status: bool,
}

/// Queue delivery handler that pushes payloads through the transport
///
/// Not connected means "keep for retry", not failure: the item stays at
/// the head until connectivity returns.
struct SendNowHandler {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl DeliveryHandler<String> for SendNowHandler {
    async fn deliver(&self, item: &String) -> Result<bool> {
        if !self.transport.is_live() {
            return Ok(false);
        }
        self.transport.publish(item).await?;
        Ok(true)
    }
}

/// The device's telemetry uplink
///
/// Construct once at startup and share. Connectivity is tracked through
/// the transport handle's liveness; a dropped session is surfaced via
/// [`is_connected`](TelemetryClient::is_connected) and recovered by the
/// orchestrator's periodic check, never from here.
pub struct TelemetryClient {
    transport: Arc<dyn Transport>,
    queue: DeliveryQueue<String>,
    ready: Arc<AtomicBool>,
    responder: AsyncMutex<Option<JoinHandle<()>>>,
}

impl TelemetryClient {
    /// Build the client around a transport session
    ///
    /// `ready` is the orchestrator-owned ready state reported to remote
    /// status probes.
    pub fn new(
        transport: Arc<dyn Transport>,
        queue_config: &QueueConfig,
        ready: Arc<AtomicBool>,
    ) -> Self {
        let handler = Arc::new(SendNowHandler {
            transport: Arc::clone(&transport),
        });

        Self {
            queue: DeliveryQueue::new(queue_config, handler),
            transport,
            ready,
            responder: AsyncMutex::new(None),
        }
    }

    /// Establish the transport session and register the status-probe
    /// responder
    ///
    /// Failures are logged and leave connectivity false; they never
    /// propagate past this boundary.
    pub async fn connect(&self) {
        info!("Telemetry client connecting...");

        if let Err(e) = self.transport.open().await {
            error!("Failed to open transport session: {}", e);
            return;
        }

        if let Some(mut requests) = self.transport.take_requests() {
            let transport = Arc::clone(&self.transport);
            let ready = Arc::clone(&self.ready);

            let task = tokio::spawn(async move {
                while let Some(request) = requests.recv().await {
                    info!(
                        "Status probe -> rid: {} - payload: {}",
                        request.rid, request.payload
                    );

                    let body = Self::status_reply(ready.load(Ordering::SeqCst));
                    if let Err(e) = transport.respond(request.rid, &body).await {
                        warn!("Failed to answer status probe: {}", e);
                    }
                }
            });

            if let Some(previous) = self.responder.lock().await.replace(task) {
                previous.abort();
            }
        }

        info!("Telemetry client connected");
    }

    /// Stop the delivery worker, then close and release the session
    pub async fn disconnect(&self) {
        self.queue.stop().await;

        if let Some(responder) = self.responder.lock().await.take() {
            responder.abort();
        }

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport session: {}", e);
        }
    }

    /// Whether the transport handle exists and reports live
    pub fn is_connected(&self) -> bool {
        self.transport.is_live()
    }

    /// Synchronous, fire-and-forget send
    ///
    /// Returns `Ok(false)` immediately when not connected. A successful
    /// return does not confirm broker-side acknowledgment.
    pub async fn send_now(&self, payload: &str) -> Result<bool> {
        if !self.is_connected() {
            return Ok(false);
        }

        self.transport.publish(payload).await?;
        Ok(true)
    }

    /// Hand a payload to the delivery queue
    ///
    /// Returns `false` when not connected. Otherwise the queue worker is
    /// lazily started and the payload is accepted; once accepted it is
    /// never dropped by a later disconnect, only held for retry.
    pub async fn enqueue(&self, payload: String) -> bool {
        if !self.is_connected() {
            return false;
        }

        if !self.queue.is_running().await {
            self.queue.start().await;
        }

        self.queue.enqueue(payload);
        true
    }

    /// Number of payloads waiting for delivery
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Compose the status-probe reply body
    ///
    /// A compose failure is logged and answered with an empty body; the
    /// probe must never take the caller down.
    fn status_reply(ready: bool) -> String {
        match serde_json::to_string(&StatusReply { status: ready }) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to compose status reply: {}", e);
                String::new()
            }
        }
    }
}
