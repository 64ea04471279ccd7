//! # Sleigh Telemetry Library
//!
//! On-device telemetry pipeline for the Santa sleigh IoT demo.
//!
//! This library provides the core functionality: complementary-filter
//! orientation estimation, a retrying delivery queue, the telemetry
//! client around the broker transport, and the simulated position
//! source feeding the pipeline.

pub mod app;
pub mod config;
pub mod device;
pub mod error;
pub mod fusion;
pub mod gps;
pub mod queue;
pub mod sensor;
pub mod telemetry;
pub mod transport;
pub mod worker;
