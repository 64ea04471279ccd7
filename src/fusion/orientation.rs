//! # Orientation Filter
//!
//! Complementary filter blending gyroscope-integrated angles with
//! accelerometer-derived tilt. The gyroscope path is smooth but drifts;
//! the accelerometer path is noisy but drift-free. A fixed weighting
//! coefficient combines the two.

use serde::Serialize;
use std::f64::consts::PI;

use crate::config::FusionConfig;

/// Bias subtracted from the roll estimate before quantization (rest offset)
const ROLL_BIAS: f64 = 16.0;

/// Bias subtracted from the pitch estimate before quantization (rest offset)
const PITCH_BIAS: f64 = 3.0;

/// Quantized tilt angles are clamped to +/- this many degrees
const MAX_TILT_DEG: i32 = 45;

/// Quantized tilt magnitudes below this are forced to zero
const TILT_DEADBAND_DEG: i32 = 5;

/// One raw inertial sample: 3-axis acceleration plus 3-axis angular rate
///
/// Acceleration is in g, angular rate in degrees per second. A sample is
/// consumed by one filter update and not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
}

/// Smoothed orientation estimate in degrees
///
/// Recomputed in place on every filter update from the previous estimate
/// and the newest sample; there is no history buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrientationEstimate {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Integer telemetry angles derived from an [`OrientationEstimate`]
///
/// Bias-corrected, truncated, clamped to [-45, 45] and deadbanded.
/// `z` is always 0 on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TiltAngles {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TiltAngles {
    /// Quantize an orientation estimate into telemetry angles
    pub fn from_estimate(estimate: &OrientationEstimate) -> Self {
        let mut x = (estimate.roll - ROLL_BIAS) as i32;
        let mut y = (estimate.pitch - PITCH_BIAS) as i32;
        let z = 0;

        y = y.clamp(-MAX_TILT_DEG, MAX_TILT_DEG);
        x = x.clamp(-MAX_TILT_DEG, MAX_TILT_DEG);

        // TODO: the pitch deadband zeroes the roll channel as well; the
        // dashboard renders today's wire values, so confirm with the map
        // consumers before touching either branch.
        if x.abs() < TILT_DEADBAND_DEG {
            x = 0;
        }
        if y.abs() < TILT_DEADBAND_DEG {
            x = 0;
        }

        Self { x, y, z }
    }
}

/// Complementary orientation filter
///
/// Stateful: each [`update`](OrientationFilter::update) mutates and
/// returns the single retained estimate. The filter never fails; bad
/// sensor data (NaN/Inf) propagates into the estimate undetected.
pub struct OrientationFilter {
    /// Gyroscope weight, strictly between 0 and 1
    smoothing: f64,
    /// Sample period in seconds
    sample_period: f64,
    estimate: OrientationEstimate,
}

impl OrientationFilter {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            smoothing: config.smoothing,
            sample_period: config.sample_period_s,
            estimate: OrientationEstimate::default(),
        }
    }

    /// Fold one raw sample into the retained estimate
    ///
    /// Roll and pitch blend the gyro-integrated previous angle with the
    /// accelerometer tilt angle. Yaw is a direct gyro passthrough: with
    /// no magnetometer there is nothing to correct the integration
    /// against, so it is not integrated at all.
    pub fn update(&mut self, raw: &RawSample) -> OrientationEstimate {
        let a = self.smoothing;
        let dt = self.sample_period;

        let roll_angle = raw.acc_y.atan2(raw.acc_z) * 180.0 / PI;
        let pitch_angle =
            raw.acc_x.atan2((raw.acc_y * raw.acc_y + raw.acc_z * raw.acc_z).sqrt()) * 180.0 / PI;

        self.estimate.roll = a * (self.estimate.roll + raw.gyro_x * dt) + (1.0 - a) * roll_angle;
        self.estimate.pitch = a * (self.estimate.pitch + raw.gyro_y * dt) + (1.0 - a) * pitch_angle;
        self.estimate.yaw = raw.gyro_z;

        self.estimate
    }

    /// Latest smoothed estimate
    pub fn estimate(&self) -> OrientationEstimate {
        self.estimate
    }

    /// Latest estimate quantized into telemetry angles
    pub fn tilt_angles(&self) -> TiltAngles {
        TiltAngles::from_estimate(&self.estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_sample() -> RawSample {
        RawSample {
            acc_x: 0.0,
            acc_y: 0.0,
            acc_z: 1.0,
            gyro_x: 0.0,
            gyro_y: 0.0,
            gyro_z: 0.0,
        }
    }

    fn default_filter() -> OrientationFilter {
        OrientationFilter::new(&FusionConfig::default())
    }

    #[test]
    fn test_level_device_converges_to_zero() {
        let mut filter = default_filter();

        // Seed some attitude, then hold the device level
        filter.update(&RawSample {
            acc_x: 0.5,
            acc_y: 0.5,
            acc_z: 0.7,
            gyro_x: 40.0,
            gyro_y: -40.0,
            gyro_z: 0.0,
        });

        let sample = level_sample();
        for _ in 0..2000 {
            filter.update(&sample);
        }

        let estimate = filter.estimate();
        assert!(
            estimate.roll.abs() < 1e-3,
            "roll should converge to 0, got {}",
            estimate.roll
        );
        assert!(
            estimate.pitch.abs() < 1e-3,
            "pitch should converge to 0, got {}",
            estimate.pitch
        );
    }

    #[test]
    fn test_single_update_blends_accel_tilt() {
        let mut filter = default_filter();

        // 45 degree roll attitude: equal Y and Z acceleration
        let estimate = filter.update(&RawSample {
            acc_x: 0.0,
            acc_y: 1.0,
            acc_z: 1.0,
            gyro_x: 0.0,
            gyro_y: 0.0,
            gyro_z: 0.0,
        });

        // From a zeroed state one update contributes (1 - A) of the
        // accelerometer angle
        let expected = (1.0 - 0.962) * 45.0;
        assert!(
            (estimate.roll - expected).abs() < 1e-9,
            "expected roll {}, got {}",
            expected,
            estimate.roll
        );
        assert_eq!(estimate.pitch, 0.0);
    }

    #[test]
    fn test_yaw_is_gyro_passthrough() {
        let mut filter = default_filter();

        let mut sample = level_sample();
        sample.gyro_z = 7.5;
        assert_eq!(filter.update(&sample).yaw, 7.5);

        // No integration: the next sample replaces, not accumulates
        sample.gyro_z = -2.25;
        assert_eq!(filter.update(&sample).yaw, -2.25);
    }

    #[test]
    fn test_tilt_angles_always_within_bounds() {
        let extremes = [
            (500.0, 500.0),
            (-500.0, -500.0),
            (90.0, -90.0),
            (16.0, 3.0),
            (0.0, 0.0),
            (f64::MAX, f64::MIN),
        ];

        for (roll, pitch) in extremes {
            let angles = TiltAngles::from_estimate(&OrientationEstimate {
                roll,
                pitch,
                yaw: 0.0,
            });
            assert!(
                (-45..=45).contains(&angles.x),
                "x out of bounds for roll {}: {}",
                roll,
                angles.x
            );
            assert!(
                (-45..=45).contains(&angles.y),
                "y out of bounds for pitch {}: {}",
                pitch,
                angles.y
            );
            assert_eq!(angles.z, 0);
        }
    }

    #[test]
    fn test_bias_subtraction_and_truncation() {
        // Rest attitude maps to zero after bias removal
        let angles = TiltAngles::from_estimate(&OrientationEstimate {
            roll: 16.9,
            pitch: 3.9,
            yaw: 0.0,
        });
        assert_eq!(angles.x, 0);
        assert_eq!(angles.y, 0);

        // Truncation toward zero, not rounding
        let angles = TiltAngles::from_estimate(&OrientationEstimate {
            roll: 26.7, // 10.7 after bias
            pitch: 33.9, // 30.9 after bias
            yaw: 0.0,
        });
        assert_eq!(angles.x, 10);
        assert_eq!(angles.y, 30);
    }

    #[test]
    fn test_small_roll_deadband_zeroes_x() {
        let angles = TiltAngles::from_estimate(&OrientationEstimate {
            roll: 18.0,  // x = 2, inside the deadband
            pitch: 33.0, // y = 30, outside
            yaw: 0.0,
        });
        assert_eq!(angles.x, 0);
        assert_eq!(angles.y, 30);
    }

    #[test]
    fn test_small_pitch_deadband_also_zeroes_x() {
        // The pitch branch zeroes the roll channel and leaves pitch alone
        let angles = TiltAngles::from_estimate(&OrientationEstimate {
            roll: 40.0, // x = 24, outside the deadband on its own
            pitch: 5.0, // y = 2, inside
            yaw: 0.0,
        });
        assert_eq!(angles.x, 0, "x channel is zeroed by the pitch deadband");
        assert_eq!(angles.y, 2, "y channel keeps its small value");
    }

    #[test]
    fn test_deadband_boundary_is_exclusive() {
        // Magnitude exactly 5 is kept
        let angles = TiltAngles::from_estimate(&OrientationEstimate {
            roll: 21.0,  // x = 5
            pitch: 13.0, // y = 10
            yaw: 0.0,
        });
        assert_eq!(angles.x, 5);
        assert_eq!(angles.y, 10);
    }

    #[test]
    fn test_nan_input_propagates() {
        let mut filter = default_filter();

        let mut sample = level_sample();
        sample.acc_z = f64::NAN;
        let estimate = filter.update(&sample);

        assert!(estimate.roll.is_nan());
        assert!(estimate.pitch.is_nan());
    }
}
