use crate::sensors::Sample;
use serde::{Deserialize, Serialize};

/// Header metadata attached to every emitted sample
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Header {
    /// Unique device identifier
    pub device_id: String,
    /// Sensor identifier (e.g., "imu0")
    pub sensor_id: String,
    /// Driver variant compiled into this build
    pub variant: String,
    /// Reference frame identifier
    pub frame_id: String,
    /// Sequence number for message ordering
    pub seq: u64,
    /// Sample timestamp, monotonic microseconds
    pub t_mono_us: u64,
    /// Message schema version for evolution
    pub schema_v: u16,
}

/// IMU sample as published to consumers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImuMessage {
    pub h: Header,
    /// Acceleration X-axis (m/s²)
    pub ax: f32,
    /// Acceleration Y-axis (m/s²)
    pub ay: f32,
    /// Acceleration Z-axis (m/s²)
    pub az: f32,
    /// Angular velocity X-axis (rad/s)
    pub gx: f32,
    /// Angular velocity Y-axis (rad/s)
    pub gy: f32,
    /// Angular velocity Z-axis (rad/s)
    pub gz: f32,
    /// Magnetic field (μT), absent when no fresh magnetometer data
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mag: Option<[f32; 3]>,
    /// Temperature (°C)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temp: Option<f32>,
}

impl ImuMessage {
    pub fn from_sample(
        device_id: &str,
        sensor_id: &str,
        variant: &str,
        seq: u64,
        sample: &Sample,
    ) -> Self {
        Self {
            h: Header {
                device_id: device_id.to_string(),
                sensor_id: sensor_id.to_string(),
                variant: variant.to_string(),
                frame_id: "base_link".to_string(),
                seq,
                t_mono_us: sample.timestamp_us,
                schema_v: 1,
            },
            ax: sample.accel[0],
            ay: sample.accel[1],
            az: sample.accel[2],
            gx: sample.gyro[0],
            gy: sample.gyro[1],
            gz: sample.gyro[2],
            mag: sample.mag,
            temp: sample.temp,
        }
    }

    /// Single-line JSON, one message per line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
