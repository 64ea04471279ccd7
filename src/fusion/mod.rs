//! # Sensor Fusion Module
//!
//! Orientation estimation from raw inertial samples.
//!
//! This module handles:
//! - Complementary filtering of accelerometer and gyroscope data
//! - Smoothed pitch/roll/yaw estimation at a fixed sample rate
//! - Quantization of the estimate into clamped integer telemetry angles

pub mod orientation;

pub use orientation::{OrientationEstimate, OrientationFilter, RawSample, TiltAngles};
