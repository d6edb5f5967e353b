//! Synthetic IMU source for host-side runs and tests.
//!
//! Configured in raw sensor counts and converted with the same ±2g / ±250dps scale
//! factors as the InvenSense parts, so consumers see exactly the units a real
//! variant would produce. Noise comes from a seeded `StdRng` and time from a
//! simulated clock that advances one sample period per read: the same seed always
//! yields the same sequence, and nothing here ever waits.

use super::calibration::Calibration;
use super::invensense::{accel_counts_to_mps2, gyro_counts_to_rads};
use super::{ImuDriver, Sample};
use crate::config::{FakeSettings, ImuConfig};
use crate::errors::{ImuError, ImuResult};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Matches the AK8963 16-bit scale
const MAG_SENSITIVITY: f32 = 0.15; // µT/LSB

pub struct FakeImu {
    id: String,
    settings: FakeSettings,
    magnetometer: bool,
    period_us: u64,
    rng: StdRng,
    tick: u64,
    initialized: bool,
    calibration: Calibration,
}

impl FakeImu {
    pub fn new(id: String, settings: FakeSettings, magnetometer: bool, period: Duration) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self {
            id,
            period_us: period.as_micros() as u64,
            settings,
            magnetometer,
            rng,
            tick: 0,
            initialized: false,
            calibration: Calibration::default(),
        }
    }

    fn noisy(&mut self, counts: [i16; 3]) -> [i16; 3] {
        let amplitude = self.settings.noise_counts.max(0);
        if amplitude == 0 {
            return counts;
        }
        let rng = &mut self.rng;
        counts.map(|c| c.saturating_add(rng.gen_range(-amplitude..=amplitude)))
    }
}

#[async_trait]
impl ImuDriver for FakeImu {
    const VARIANT: &'static str = "fake";

    fn from_config(config: &ImuConfig) -> ImuResult<Self> {
        Ok(Self::new(
            config.imu.id.clone(),
            config.fake.clone(),
            config.imu.magnetometer,
            config.imu.sample_period(),
        ))
    }

    /// Rewinds the generator and the simulated clock to the configured seed
    async fn init(&mut self) -> ImuResult<()> {
        self.rng = StdRng::seed_from_u64(self.settings.seed);
        self.tick = 0;
        self.initialized = true;
        info!(
            "[{}] fake IMU initialized (seed {}, noise ±{} counts)",
            self.id, self.settings.seed, self.settings.noise_counts
        );
        Ok(())
    }

    async fn read(&mut self) -> ImuResult<Sample> {
        if !self.initialized {
            return Err(ImuError::NotInitialized {
                sensor: self.id.clone(),
            });
        }

        let accel = self.noisy(self.settings.accel_counts);
        let gyro = self.noisy(self.settings.gyro_counts);
        let mag = if self.magnetometer {
            let counts = self.noisy(self.settings.mag_counts);
            Some(counts.map(|c| c as f32 * MAG_SENSITIVITY))
        } else {
            None
        };

        let sample = Sample {
            accel: self.calibration.apply_accel(accel_counts_to_mps2(accel)),
            gyro: self.calibration.apply_gyro(gyro_counts_to_rads(gyro)),
            mag,
            temp: Some(self.settings.temperature_c),
            timestamp_us: self.tick * self.period_us,
        };
        self.tick += 1;
        trace!("[{}] {:?}", self.id, sample);
        Ok(sample)
    }

    /// Synthetic data has no bias to remove
    async fn calibrate(&mut self) -> ImuResult<Calibration> {
        debug!("[{}] calibration is a no-op on the fake IMU", self.id);
        Ok(self.calibration)
    }

    fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::STANDARD_GRAVITY;

    fn config(seed: u64, noise_counts: i16) -> ImuConfig {
        let mut config = ImuConfig::default();
        config.fake.seed = seed;
        config.fake.noise_counts = noise_counts;
        config
    }

    async fn run(config: &ImuConfig, n: usize) -> Vec<Sample> {
        let mut imu = FakeImu::from_config(config).unwrap();
        imu.init().await.unwrap();
        let mut samples = Vec::with_capacity(n);
        for _ in 0..n {
            samples.push(imu.read().await.unwrap());
        }
        samples
    }

    #[tokio::test]
    async fn test_same_seed_same_sequence() {
        let config = config(1234, 50);
        let first = run(&config, 100).await;
        let second = run(&config, 100).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_seed_different_sequence() {
        let first = run(&config(1, 50), 20).await;
        let second = run(&config(2, 50), 20).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_reinit_replays_sequence() {
        let config = config(99, 30);
        let mut imu = FakeImu::from_config(&config).unwrap();
        imu.init().await.unwrap();
        let a = imu.read().await.unwrap();
        imu.read().await.unwrap();

        imu.init().await.unwrap();
        assert_eq!(imu.read().await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_one_g_count_reads_standard_gravity() {
        let samples = run(&config(0, 0), 1).await;
        let sample = samples[0];
        assert!(sample.accel[0].abs() < 1e-6);
        assert!(sample.accel[1].abs() < 1e-6);
        assert!((sample.accel[2] - STANDARD_GRAVITY).abs() < 1e-3);
        assert_eq!(sample.gyro, [0.0; 3]);
    }

    #[tokio::test]
    async fn test_noise_stays_within_amplitude() {
        let samples = run(&config(7, 16), 200).await;
        let bound = 16.0 / 16384.0 * STANDARD_GRAVITY + 1e-5;
        for s in &samples {
            assert!(s.accel[0].abs() <= bound);
            assert!((s.accel[2] - STANDARD_GRAVITY).abs() <= bound);
        }
        assert!(samples.iter().any(|s| s.accel[0] != 0.0));
    }

    #[tokio::test]
    async fn test_simulated_clock_advances_one_period() {
        let samples = run(&config(0, 0), 3).await;
        let stamps: Vec<u64> = samples.iter().map(|s| s.timestamp_us).collect();
        assert_eq!(stamps, vec![0, 10_000, 20_000]);
    }

    #[tokio::test]
    async fn test_read_before_init() {
        let mut imu = FakeImu::from_config(&ImuConfig::default()).unwrap();
        assert!(matches!(
            imu.read().await.unwrap_err(),
            ImuError::NotInitialized { .. }
        ));
    }

    #[tokio::test]
    async fn test_calibrate_is_noop_and_self_test_passes() {
        let mut imu = FakeImu::from_config(&ImuConfig::default()).unwrap();
        imu.init().await.unwrap();
        assert!(imu.calibrate().await.unwrap().is_identity());
        imu.self_test().await.unwrap();
    }
}
