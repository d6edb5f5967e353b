use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Root configuration struct, one table per concern
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    pub imu: ImuSettings,
    pub fake: FakeSettings,
    pub acquisition: AcquisitionSettings,
}

/// `[imu]` table, shared by every driver variant
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImuSettings {
    pub id: String,
    /// Bus device path, ignored by the fake source
    pub bus: String,
    pub address: u8,
    /// Upper bound for a single `read()`, and for each init transaction
    pub read_timeout_ms: u64,
    pub sample_rate_hz: u16,
    pub magnetometer: bool,
    pub calibration_samples: usize,
    pub calibrate_on_start: bool,
    pub self_test_on_start: bool,
}

impl Default for ImuSettings {
    fn default() -> Self {
        Self {
            id: "imu0".to_string(),
            bus: "/dev/i2c-1".to_string(),
            address: 0x68,
            read_timeout_ms: 20,
            sample_rate_hz: 100,
            magnetometer: true,
            calibration_samples: 200,
            calibrate_on_start: false,
            self_test_on_start: true,
        }
    }
}

impl ImuSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.sample_rate_hz.max(1) as u64)
    }
}

/// `[fake]` table: the synthetic source is configured in raw sensor counts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FakeSettings {
    pub seed: u64,
    pub accel_counts: [i16; 3],
    pub gyro_counts: [i16; 3],
    pub mag_counts: [i16; 3],
    /// Uniform noise amplitude, in counts, added to every axis
    pub noise_counts: i16,
    pub temperature_c: f32,
}

impl Default for FakeSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            // 1g on +Z, level and at rest
            accel_counts: [0, 0, 16384],
            gyro_counts: [0, 0, 0],
            mag_counts: [0, 0, 0],
            noise_counts: 0,
            temperature_c: 25.0,
        }
    }
}

/// `[acquisition]` table for the periodic read loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    pub rate_hz: u32,
    /// Number of control cycles to run, 0 runs forever
    pub cycles: u64,
    pub max_consecutive_failures: u32,
    pub device_id: String,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            rate_hz: 100,
            cycles: 0,
            max_consecutive_failures: 10,
            device_id: "flight_imu".to_string(),
        }
    }
}

impl AcquisitionSettings {
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.rate_hz.max(1) as u64)
    }
}

impl ImuConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.imu.read_timeout_ms == 0 {
            return Err(invalid("imu.read_timeout_ms", "must be greater than zero"));
        }
        if !(4..=1000).contains(&self.imu.sample_rate_hz) {
            return Err(invalid(
                "imu.sample_rate_hz",
                format!("{} is outside 4..=1000", self.imu.sample_rate_hz),
            ));
        }
        if self.imu.calibration_samples == 0 {
            return Err(invalid("imu.calibration_samples", "must be greater than zero"));
        }
        if self.fake.noise_counts < 0 {
            return Err(invalid("fake.noise_counts", "must not be negative"));
        }
        if self.acquisition.rate_hz == 0 {
            return Err(invalid("acquisition.rate_hz", "must be greater than zero"));
        }
        if self.acquisition.max_consecutive_failures == 0 {
            return Err(invalid(
                "acquisition.max_consecutive_failures",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Parses and validates a TOML document
pub fn parse_imu_config(content: &str) -> ConfigResult<ImuConfig> {
    let parsed: ImuConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_imu_config(path: &str) -> ConfigResult<ImuConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
        path: path.to_string(),
        source: e,
    })?;
    parse_imu_config(&content)
}
