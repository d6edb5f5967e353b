//! Stationary offset calibration.
//!
//! The device must be level and at rest while the window is collected: the gravity
//! vector is assumed to lie on +Z. Gyro bias is the mean angular rate, accelerometer
//! offset is the mean acceleration minus `[0, 0, g]`.
//!
//! After calibration a stationary device reads within ±0.05 (m/s^2 or rad/s) of zero
//! on every axis except accelerometer Z, which reads within ±0.05 m/s^2 of g.

use super::STANDARD_GRAVITY;

/// Largest per-axis gyro spread (rad/s) accepted as "stationary"
pub const MOTION_THRESHOLD_RADS: f32 = 0.05;

/// Offsets subtracted from converted readings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    /// rad/s
    pub gyro_bias: [f32; 3],
    /// m/s^2
    pub accel_offset: [f32; 3],
}

impl Calibration {
    pub fn apply_accel(&self, raw: [f32; 3]) -> [f32; 3] {
        sub(raw, self.accel_offset)
    }

    pub fn apply_gyro(&self, raw: [f32; 3]) -> [f32; 3] {
        sub(raw, self.gyro_bias)
    }

    pub fn is_identity(&self) -> bool {
        *self == Calibration::default()
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Accumulates a stationary window of uncalibrated readings.
///
/// Feed readings with [`add_sample`](Self::add_sample) until it returns `true`,
/// then call [`compute`](Self::compute).
#[derive(Debug, Clone)]
pub struct OffsetEstimator {
    required: usize,
    count: usize,
    accel_sum: [f64; 3],
    gyro_sum: [f64; 3],
    gyro_min: [f32; 3],
    gyro_max: [f32; 3],
}

impl OffsetEstimator {
    pub fn new(required: usize) -> Self {
        Self {
            required,
            count: 0,
            accel_sum: [0.0; 3],
            gyro_sum: [0.0; 3],
            gyro_min: [f32::INFINITY; 3],
            gyro_max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Returns `true` once the window is full
    pub fn add_sample(&mut self, accel: [f32; 3], gyro: [f32; 3]) -> bool {
        if self.is_complete() {
            return true;
        }
        for axis in 0..3 {
            self.accel_sum[axis] += accel[axis] as f64;
            self.gyro_sum[axis] += gyro[axis] as f64;
            self.gyro_min[axis] = self.gyro_min[axis].min(gyro[axis]);
            self.gyro_max[axis] = self.gyro_max[axis].max(gyro[axis]);
        }
        self.count += 1;
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.required
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn compute(&self) -> Result<Calibration, String> {
        if self.count == 0 {
            return Err("no samples collected".to_string());
        }

        for axis in 0..3 {
            let spread = self.gyro_max[axis] - self.gyro_min[axis];
            if spread > MOTION_THRESHOLD_RADS {
                return Err(format!(
                    "device moved during calibration: gyro axis {} spread {:.3} rad/s exceeds {} rad/s",
                    axis, spread, MOTION_THRESHOLD_RADS
                ));
            }
        }

        let n = self.count as f64;
        let mean = |sum: [f64; 3]| [(sum[0] / n) as f32, (sum[1] / n) as f32, (sum[2] / n) as f32];
        let accel_mean = mean(self.accel_sum);

        Ok(Calibration {
            gyro_bias: mean(self.gyro_sum),
            accel_offset: [
                accel_mean[0],
                accel_mean[1],
                accel_mean[2] - STANDARD_GRAVITY,
            ],
        })
    }
}
