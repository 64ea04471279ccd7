//! # Inertial Sensor Module
//!
//! Synchronous access to raw accelerometer/gyroscope samples. A read is
//! assumed cheap relative to the 10 ms sampling tick. There is no real
//! IMU behind this demo, so the shipped implementation synthesizes a
//! gentle sway with sensor noise on top.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::fusion::RawSample;

/// One-sample synchronous sensor read
#[cfg_attr(test, mockall::automock)]
pub trait ImuReader: Send {
    fn read(&mut self) -> Result<RawSample>;
}

/// Synthetic IMU: slow sinusoidal tilt plus white noise
pub struct SimulatedImu {
    /// Elapsed simulated time, advanced by one sample period per read
    t: f64,
    sample_period: f64,
    rng: StdRng,
}

impl SimulatedImu {
    pub fn new(sample_period_s: f64) -> Self {
        Self {
            t: 0.0,
            sample_period: sample_period_s,
            rng: StdRng::from_os_rng(),
        }
    }
}

impl ImuReader for SimulatedImu {
    fn read(&mut self) -> Result<RawSample> {
        self.t += self.sample_period;

        // Sway periods of ~20-40 s keep the quantized angles moving
        // in and out of the deadband
        let sway_roll = (self.t * 0.3).sin() * 0.6;
        let sway_pitch = (self.t * 0.17).sin() * 0.4;

        let mut noise = || self.rng.random_range(-0.02..0.02);

        Ok(RawSample {
            acc_x: sway_pitch + noise(),
            acc_y: sway_roll + noise(),
            acc_z: 1.0 + noise(),
            gyro_x: sway_roll * 10.0 + noise(),
            gyro_y: sway_pitch * 10.0 + noise(),
            gyro_z: noise() * 5.0,
        })
    }
}
