pub mod calibration;
pub mod fake;
pub mod invensense;
pub mod mpu9150;
pub mod mpu9250;

use crate::config::ImuConfig;
use crate::errors::{ImuError, ImuResult};
use async_trait::async_trait;
use serde::Serialize;

pub use calibration::{Calibration, OffsetEstimator};
pub use fake::FakeImu;
pub use mpu9150::Mpu9150;
pub use mpu9250::Mpu9250;

/// Standard gravity, m/s^2
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// One IMU reading in physical units.
///
/// - `accel`: m/s^2, body frame, includes gravity (+Z reads +1g at rest)
/// - `gyro`: rad/s
/// - `mag`: µT, `None` when the variant has no magnetometer or it had no new data
/// - `temp`: °C
/// - `timestamp_us`: monotonic microseconds since the driver was created
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub mag: Option<[f32; 3]>,
    pub temp: Option<f32>,
    pub timestamp_us: u64,
}

/// Contract every IMU variant honors.
///
/// Consumers program against this trait through the [`crate::Imu`] alias and never
/// need to know which variant is compiled in.
#[async_trait]
pub trait ImuDriver: Send + Sized {
    /// Name of the variant, matching its Cargo feature
    const VARIANT: &'static str;

    /// Build the driver from configuration. Opens the transport but does not talk
    /// to the device.
    fn from_config(config: &ImuConfig) -> ImuResult<Self>;

    /// Verify identity and configure the device. Safe to call again: a repeated
    /// call re-verifies and reconfigures but keeps calibration offsets.
    async fn init(&mut self) -> ImuResult<()>;

    /// Latest measurement, bounded by the configured read timeout
    async fn read(&mut self) -> ImuResult<Sample>;

    /// Estimate and store zero-rate and zero-g offsets from a stationary window
    async fn calibrate(&mut self) -> ImuResult<Calibration>;

    fn calibration(&self) -> &Calibration;

    fn id(&self) -> &str;

    /// Plausibility check on one reading taken at rest
    async fn self_test(&mut self) -> ImuResult<()> {
        let sample = self.read().await?;
        check_plausible(self.id(), &sample)
    }
}

fn check_plausible(sensor: &str, sample: &Sample) -> ImuResult<()> {
    let finite = sample
        .accel
        .iter()
        .chain(sample.gyro.iter())
        .all(|v| v.is_finite());
    if !finite {
        return Err(ImuError::SelfTestFailed {
            sensor: sensor.to_string(),
            reason: "non-finite value in sample".to_string(),
        });
    }

    let magnitude = sample.accel.iter().map(|a| a * a).sum::<f32>().sqrt();
    let g = magnitude / STANDARD_GRAVITY;
    if !(0.5..=1.5).contains(&g) {
        return Err(ImuError::SelfTestFailed {
            sensor: sensor.to_string(),
            reason: format!("acceleration magnitude {:.2}g outside 0.5g..1.5g", g),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(accel: [f32; 3]) -> Sample {
        Sample {
            accel,
            gyro: [0.0; 3],
            mag: None,
            temp: None,
            timestamp_us: 0,
        }
    }

    #[test]
    fn test_plausible_at_rest() {
        assert!(check_plausible("imu0", &sample([0.0, 0.0, STANDARD_GRAVITY])).is_ok());
        assert!(check_plausible("imu0", &sample([6.93, 0.0, 6.93])).is_ok());
    }

    #[test]
    fn test_free_fall_fails() {
        let err = check_plausible("imu0", &sample([0.0, 0.0, 0.1])).unwrap_err();
        assert!(matches!(err, ImuError::SelfTestFailed { .. }));
    }

    #[test]
    fn test_nan_fails() {
        assert!(check_plausible("imu0", &sample([f32::NAN, 0.0, 9.8])).is_err());
    }
}
