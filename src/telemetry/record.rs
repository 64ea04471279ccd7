//! # Telemetry Wire Record
//!
//! The flat JSON payload consumed downstream. The field set and the
//! PascalCase names are a wire contract: the persistence function maps
//! them 1:1 into storage records keyed by `Date`, and the dashboard
//! subscribes to the same stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fusion::TiltAngles;

/// One telemetry record, immutable once constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SleighTelemetry {
    pub date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub gyro_x: i32,
    pub gyro_y: i32,
    pub gyro_z: i32,
    pub gifts_delivered: u32,
}

impl SleighTelemetry {
    /// Assemble a record from the latest position, tilt and gift count,
    /// stamped with the current UTC time
    pub fn new(latitude: f64, longitude: f64, tilt: &TiltAngles, gifts_delivered: u32) -> Self {
        Self {
            date: Utc::now(),
            latitude,
            longitude,
            gyro_x: tilt.x,
            gyro_y: tilt.y,
            gyro_z: tilt.z,
            gifts_delivered,
        }
    }

    /// Serialize to the wire payload
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_wire_payload() {
        let record = SleighTelemetry {
            date: Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap(),
            latitude: 41.9,
            longitude: 12.5,
            gyro_x: 10,
            gyro_y: -10,
            gyro_z: 0,
            gifts_delivered: 42,
        };

        assert_eq!(
            record.to_json().unwrap(),
            r#"{"Date":"2024-12-25T00:00:00Z","Latitude":41.9,"Longitude":12.5,"GyroX":10,"GyroY":-10,"GyroZ":0,"GiftsDelivered":42}"#
        );
    }

    #[test]
    fn test_new_copies_tilt_channels() {
        let tilt = TiltAngles { x: 12, y: -7, z: 0 };
        let record = SleighTelemetry::new(41.9, 12.5, &tilt, 3);

        assert_eq!(record.gyro_x, 12);
        assert_eq!(record.gyro_y, -7);
        assert_eq!(record.gyro_z, 0);
        assert_eq!(record.gifts_delivered, 3);
        assert_eq!(record.latitude, 41.9);
        assert_eq!(record.longitude, 12.5);
    }

    #[test]
    fn test_payload_parses_back() {
        // The persistence collaborator reads the same field names back
        let json = r#"{"Date":"2024-12-25T00:00:00Z","Latitude":41.9,"Longitude":12.5,"GyroX":10,"GyroY":-10,"GyroZ":0,"GiftsDelivered":42}"#;
        let record: SleighTelemetry = serde_json::from_str(json).unwrap();

        assert_eq!(record.latitude, 41.9);
        assert_eq!(record.gyro_y, -10);
        assert_eq!(record.gifts_delivered, 42);
    }
}
