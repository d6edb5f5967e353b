//! Register core shared by the InvenSense MPU-9x50 families.
//!
//! Both parts expose the same accel/gyro register block, sample-rate divider and
//! data-ready flag; they differ in identity, temperature formula and the AK89xx
//! magnetometer sitting behind the I2C bypass.

use super::calibration::{Calibration, OffsetEstimator};
use super::STANDARD_GRAVITY;
use crate::bus::RegisterBus;
use crate::config::ImuSettings;
use crate::errors::{BusResult, ImuError, ImuResult};
use tokio::time::{sleep, timeout_at, Duration, Instant};
use tracing::{debug, info};

// Register addresses
pub const SMPLRT_DIV: u8 = 0x19;
pub const CONFIG: u8 = 0x1A;
pub const GYRO_CONFIG: u8 = 0x1B;
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const INT_PIN_CFG: u8 = 0x37;
pub const INT_ENABLE: u8 = 0x38;
pub const INT_STATUS: u8 = 0x3A;
pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const USER_CTRL: u8 = 0x6A;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const PWR_MGMT_2: u8 = 0x6C;
pub const WHO_AM_I: u8 = 0x75;

/// AK89xx magnetometer address once bypass mode is enabled
pub const MAG_ADDRESS: u8 = 0x0C;

const INT_STATUS_RAW_DATA_RDY: u8 = 0x01;
const INT_PIN_CFG_BYPASS_EN: u8 = 0x02;
const PWR_MGMT_1_RESET: u8 = 0x80;
const PWR_MGMT_1_CLKSEL_PLL: u8 = 0x01;
/// DLPF_CFG = 3: ~41 Hz gyro bandwidth, 1 kHz internal rate
const CONFIG_DLPF_41HZ: u8 = 0x03;
const GYRO_FS_250DPS: u8 = 0x00;
const ACCEL_FS_2G: u8 = 0x00;

// Sensitivity values
pub const ACCEL_SENSITIVITY_2G: f32 = 16384.0; // LSB/g
pub const GYRO_SENSITIVITY_250DPS: f32 = 131.0; // LSB/dps

const DATA_READY_POLL: Duration = Duration::from_millis(1);
const RESET_DELAY: Duration = Duration::from_millis(100);
const INTERNAL_RATE_HZ: u16 = 1000;

/// Sample-rate divider for the 1 kHz internal rate, clamped to 4..=1000 Hz
pub fn sample_rate_divider(rate_hz: u16) -> u8 {
    let rate = rate_hz.clamp(4, INTERNAL_RATE_HZ);
    (INTERNAL_RATE_HZ / rate - 1) as u8
}

pub fn accel_counts_to_mps2(counts: [i16; 3]) -> [f32; 3] {
    counts.map(|c| c as f32 / ACCEL_SENSITIVITY_2G * STANDARD_GRAVITY)
}

pub fn gyro_counts_to_rads(counts: [i16; 3]) -> [f32; 3] {
    counts.map(|c| (c as f32 / GYRO_SENSITIVITY_250DPS).to_radians())
}

/// Decoded `ACCEL_XOUT_H..GYRO_ZOUT_L` block (big-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub accel: [i16; 3],
    pub temp: i16,
    pub gyro: [i16; 3],
}

impl RawFrame {
    pub const LEN: usize = 14;

    pub fn parse(buf: &[u8; 14]) -> Self {
        let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);
        Self {
            accel: [word(0), word(2), word(4)],
            temp: word(6),
            gyro: [word(8), word(10), word(12)],
        }
    }
}

/// AK89xx fuse-ROM sensitivity adjustment
pub fn mag_adjustment(asa: u8) -> f32 {
    (asa as f32 - 128.0) / 256.0 + 1.0
}

/// State and bus plumbing common to both MPU families
pub struct InvenSense<B> {
    pub id: String,
    pub address: u8,
    pub bus: B,
    read_timeout: Duration,
    sample_rate_hz: u16,
    calibration_samples: usize,
    pub calibration: Calibration,
    pub initialized: bool,
    epoch: Instant,
}

impl<B: RegisterBus> InvenSense<B> {
    pub fn new(settings: &ImuSettings, bus: B) -> Self {
        Self {
            id: settings.id.clone(),
            address: settings.address,
            bus,
            read_timeout: settings.read_timeout(),
            sample_rate_hz: settings.sample_rate_hz,
            calibration_samples: settings.calibration_samples,
            calibration: Calibration::default(),
            initialized: false,
            epoch: Instant::now(),
        }
    }

    pub fn deadline(&self) -> Instant {
        Instant::now() + self.read_timeout
    }

    pub fn timeout_ms(&self) -> u64 {
        self.read_timeout.as_millis() as u64
    }

    pub fn timestamp_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    pub fn ensure_initialized(&self) -> ImuResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ImuError::NotInitialized {
                sensor: self.id.clone(),
            })
        }
    }

    /// Identity of the chip at `address`, checked against `accepted`
    pub async fn verify_identity(
        &mut self,
        address: u8,
        reg: u8,
        accepted: &[u8],
    ) -> ImuResult<u8> {
        let deadline = self.deadline();
        let actual = self.read_register(address, reg, deadline).await?;
        if !accepted.contains(&actual) {
            return Err(ImuError::DeviceNotFound {
                sensor: self.id.clone(),
                expected: accepted[0],
                actual,
            });
        }
        debug!("[{}] chip at {:#04x} identified as {:#04x}", self.id, address, actual);
        Ok(actual)
    }

    pub async fn read_register(&mut self, address: u8, reg: u8, deadline: Instant) -> ImuResult<u8> {
        let mut buf = [0u8; 1];
        self.read_block(address, reg, &mut buf, deadline).await?;
        Ok(buf[0])
    }

    pub async fn read_block(
        &mut self,
        address: u8,
        reg: u8,
        buf: &mut [u8],
        deadline: Instant,
    ) -> ImuResult<()> {
        let result = timeout_at(deadline, self.bus.read_registers(address, reg, buf)).await;
        self.bounded(result)
    }

    /// Single register write with its own deadline
    pub async fn write_register(&mut self, address: u8, reg: u8, value: u8) -> ImuResult<()> {
        let deadline = self.deadline();
        self.write_register_until(address, reg, value, deadline).await
    }

    pub async fn write_register_until(
        &mut self,
        address: u8,
        reg: u8,
        value: u8,
        deadline: Instant,
    ) -> ImuResult<()> {
        let result = timeout_at(deadline, self.bus.write_register(address, reg, value)).await;
        self.bounded(result)
    }

    fn bounded<T>(&self, result: Result<BusResult<T>, tokio::time::error::Elapsed>) -> ImuResult<T> {
        match result {
            Ok(inner) => Ok(inner?),
            Err(_) => Err(ImuError::Timeout {
                sensor: self.id.clone(),
                timeout_ms: self.timeout_ms(),
            }),
        }
    }

    /// Reset, clock, filter, ranges, rate and data-ready interrupt.
    ///
    /// Leaves the AK89xx reachable at [`MAG_ADDRESS`] through the bypass mux.
    pub async fn configure_core(&mut self) -> ImuResult<()> {
        let address = self.address;
        self.write_register(address, PWR_MGMT_1, PWR_MGMT_1_RESET).await?;
        sleep(RESET_DELAY).await;

        self.write_register(address, PWR_MGMT_1, PWR_MGMT_1_CLKSEL_PLL).await?;
        // Enable all accel and gyro axes
        self.write_register(address, PWR_MGMT_2, 0x00).await?;
        self.write_register(address, CONFIG, CONFIG_DLPF_41HZ).await?;
        self.write_register(address, SMPLRT_DIV, sample_rate_divider(self.sample_rate_hz))
            .await?;
        self.write_register(address, GYRO_CONFIG, GYRO_FS_250DPS).await?;
        self.write_register(address, ACCEL_CONFIG, ACCEL_FS_2G).await?;

        // Disable the internal I2C master and route the aux bus through
        self.write_register(address, USER_CTRL, 0x00).await?;
        self.write_register(address, INT_PIN_CFG, INT_PIN_CFG_BYPASS_EN).await?;
        self.write_register(address, INT_ENABLE, INT_STATUS_RAW_DATA_RDY).await?;

        debug!(
            "[{}] core configured: ±2g, ±250dps, {}Hz",
            self.id, self.sample_rate_hz
        );
        Ok(())
    }

    /// Poll the data-ready flag until it is set or `deadline` passes
    pub async fn wait_data_ready(&mut self, deadline: Instant) -> ImuResult<()> {
        let address = self.address;
        loop {
            let status = self.read_register(address, INT_STATUS, deadline).await?;
            if status & INT_STATUS_RAW_DATA_RDY != 0 {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ImuError::StaleData {
                    sensor: self.id.clone(),
                    timeout_ms: self.timeout_ms(),
                });
            }
            sleep(DATA_READY_POLL.min(deadline - now)).await;
        }
    }

    pub async fn read_frame(&mut self, deadline: Instant) -> ImuResult<RawFrame> {
        self.wait_data_ready(deadline).await?;
        let mut buf = [0u8; RawFrame::LEN];
        let address = self.address;
        self.read_block(address, ACCEL_XOUT_H, &mut buf, deadline).await?;
        Ok(RawFrame::parse(&buf))
    }

    /// Accel and gyro in physical units with calibration applied
    pub fn convert(&self, frame: &RawFrame) -> ([f32; 3], [f32; 3]) {
        (
            self.calibration.apply_accel(accel_counts_to_mps2(frame.accel)),
            self.calibration.apply_gyro(gyro_counts_to_rads(frame.gyro)),
        )
    }

    /// Collect a stationary window and store the resulting offsets
    pub async fn calibrate(&mut self) -> ImuResult<Calibration> {
        self.ensure_initialized()?;
        info!(
            "[{}] calibrating over {} samples, keep the vehicle still",
            self.id, self.calibration_samples
        );

        let mut estimator = OffsetEstimator::new(self.calibration_samples);
        while !estimator.is_complete() {
            let deadline = self.deadline();
            let frame = self.read_frame(deadline).await?;
            estimator.add_sample(
                accel_counts_to_mps2(frame.accel),
                gyro_counts_to_rads(frame.gyro),
            );
        }

        let calibration = estimator.compute().map_err(|reason| ImuError::CalibrationError {
            sensor: self.id.clone(),
            reason,
        })?;
        self.calibration = calibration;
        info!(
            "[{}] calibration stored: gyro_bias={:?} rad/s accel_offset={:?} m/s^2",
            self.id, calibration.gyro_bias, calibration.accel_offset
        );
        Ok(calibration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_divider() {
        assert_eq!(sample_rate_divider(1000), 0);
        assert_eq!(sample_rate_divider(100), 9);
        assert_eq!(sample_rate_divider(4), 249);
        assert_eq!(sample_rate_divider(0), 249);
        assert_eq!(sample_rate_divider(5000), 0);
    }

    #[test]
    fn test_raw_frame_parse() {
        let buf = [
            0x40, 0x00, 0xC0, 0x00, 0x00, 0x01, // accel
            0x01, 0x54, // temp
            0x00, 0x83, 0xFF, 0x7D, 0x00, 0x00, // gyro
        ];
        let frame = RawFrame::parse(&buf);
        assert_eq!(frame.accel, [16384, -16384, 1]);
        assert_eq!(frame.temp, 340);
        assert_eq!(frame.gyro, [131, -131, 0]);
    }

    #[test]
    fn test_count_conversion() {
        let accel = accel_counts_to_mps2([0, 0, 16384]);
        assert!((accel[2] - 9.80665).abs() < 1e-4);

        let gyro = gyro_counts_to_rads([131, 0, 0]);
        assert!((gyro[0] - 1.0f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_mag_adjustment() {
        assert_eq!(mag_adjustment(128), 1.0);
        assert!((mag_adjustment(176) - 1.1875).abs() < 1e-6);
    }
}
