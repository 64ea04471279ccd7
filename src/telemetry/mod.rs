//! # Telemetry Module
//!
//! The sleigh telemetry uplink.
//!
//! This module handles:
//! - The wire record format shared with the persistence and dashboard
//!   collaborators
//! - The client wrapping the transport session: connect/disconnect,
//!   synchronous send, queued send with retry, and the remote status
//!   probe

pub mod client;
pub mod record;

pub use client::TelemetryClient;
pub use record::SleighTelemetry;
