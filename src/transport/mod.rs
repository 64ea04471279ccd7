//! # Transport Module
//!
//! Session-level abstraction over the broker uplink.
//!
//! This module handles:
//! - Opening and closing the transport session
//! - Publishing telemetry payloads (fire-and-forget)
//! - Surfacing inbound status-probe requests
//! - Reporting session liveness
//!
//! How a payload physically reaches the broker is not this crate's
//! concern; the concrete implementation here is a newline-delimited JSON
//! session over TCP, and everything above it goes through the
//! [`Transport`] trait.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::Result;

pub mod tcp;

pub use tcp::TcpTransport;

/// Inbound remote method request
///
/// The payload is opaque: it is logged and otherwise ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StatusRequest {
    pub rid: u32,
    #[serde(default)]
    pub payload: String,
}

/// Trait for transport session operations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the session
    async fn open(&self) -> Result<()>;

    /// Tear the session down; liveness drops immediately
    async fn close(&self) -> Result<()>;

    /// Whether the session handle exists and reports live
    fn is_live(&self) -> bool;

    /// Publish one payload; no broker-side acknowledgment is awaited
    async fn publish(&self, payload: &str) -> Result<()>;

    /// Answer an inbound request by request id
    async fn respond(&self, rid: u32, body: &str) -> Result<()>;

    /// Take the inbound request stream
    ///
    /// Available once per successful [`open`](Transport::open); later
    /// calls return `None` until the session is reopened.
    fn take_requests(&self) -> Option<mpsc::Receiver<StatusRequest>>;
}
