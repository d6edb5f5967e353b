use super::calibration::Calibration;
use super::invensense::{self, InvenSense, MAG_ADDRESS, WHO_AM_I};
use super::{ImuDriver, Sample};
use crate::bus::RegisterBus;
use crate::config::{ImuConfig, ImuSettings};
use crate::errors::ImuResult;
use async_trait::async_trait;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, trace};

const WHOAMI_MPU9150: u8 = 0x68;

const TEMP_SENSITIVITY: f32 = 340.0; // LSB/°C
const TEMP_OFFSET: f32 = 35.0; // °C

// AK8975 magnetometer
const AK8975_WIA: u8 = 0x00;
const AK8975_ST1: u8 = 0x02;
const AK8975_HXL: u8 = 0x03;
const AK8975_CNTL: u8 = 0x0A;
const AK8975_ASAX: u8 = 0x10;
const AK8975_DEVICE_ID: u8 = 0x48;
const AK8975_POWER_DOWN: u8 = 0x00;
const AK8975_SINGLE_MEASUREMENT: u8 = 0x01;
const AK8975_FUSE_ROM: u8 = 0x0F;
const AK8975_ST1_DRDY: u8 = 0x01;
const AK8975_ST2_DERR: u8 = 0x04;
const AK8975_ST2_HOFL: u8 = 0x08;
const AK8975_SENSITIVITY: f32 = 0.3; // µT/LSB
const AK8975_MODE_DELAY: Duration = Duration::from_millis(10);

/// InvenSense MPU-9150: MPU-6050 accel/gyro with an AK8975 magnetometer
pub struct Mpu9150<B> {
    core: InvenSense<B>,
    magnetometer: bool,
    mag_adjust: [f32; 3],
}

impl<B: RegisterBus> Mpu9150<B> {
    pub fn new(settings: &ImuSettings, bus: B) -> Self {
        Self {
            core: InvenSense::new(settings, bus),
            magnetometer: settings.magnetometer,
            mag_adjust: [1.0; 3],
        }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.core.bus
    }

    async fn init_magnetometer(&mut self) -> ImuResult<()> {
        self.core
            .verify_identity(MAG_ADDRESS, AK8975_WIA, &[AK8975_DEVICE_ID])
            .await?;

        self.core
            .write_register(MAG_ADDRESS, AK8975_CNTL, AK8975_FUSE_ROM)
            .await?;
        sleep(AK8975_MODE_DELAY).await;

        let mut asa = [0u8; 3];
        let deadline = self.core.deadline();
        self.core
            .read_block(MAG_ADDRESS, AK8975_ASAX, &mut asa, deadline)
            .await?;
        self.mag_adjust = asa.map(invensense::mag_adjustment);

        self.core
            .write_register(MAG_ADDRESS, AK8975_CNTL, AK8975_POWER_DOWN)
            .await?;
        sleep(AK8975_MODE_DELAY).await;
        // The AK8975 has no continuous mode: every measurement is triggered
        self.core
            .write_register(MAG_ADDRESS, AK8975_CNTL, AK8975_SINGLE_MEASUREMENT)
            .await?;

        debug!(
            "[{}] AK8975 ready, sensitivity adjustment {:?}",
            self.core.id, self.mag_adjust
        );
        Ok(())
    }

    async fn read_magnetometer(&mut self, deadline: Instant) -> ImuResult<Option<[f32; 3]>> {
        let st1 = self.core.read_register(MAG_ADDRESS, AK8975_ST1, deadline).await?;
        if st1 & AK8975_ST1_DRDY == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; 7];
        self.core
            .read_block(MAG_ADDRESS, AK8975_HXL, &mut buf, deadline)
            .await?;

        // Start the next conversion so it is ready by the following cycle
        self.core
            .write_register_until(MAG_ADDRESS, AK8975_CNTL, AK8975_SINGLE_MEASUREMENT, deadline)
            .await?;

        if buf[6] & (AK8975_ST2_HOFL | AK8975_ST2_DERR) != 0 {
            debug!(
                "[{}] AK8975 status {:#04x}, dropping reading",
                self.core.id, buf[6]
            );
            return Ok(None);
        }

        let raw = [
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ];
        Ok(Some([
            raw[0] as f32 * AK8975_SENSITIVITY * self.mag_adjust[0],
            raw[1] as f32 * AK8975_SENSITIVITY * self.mag_adjust[1],
            raw[2] as f32 * AK8975_SENSITIVITY * self.mag_adjust[2],
        ]))
    }
}

#[async_trait]
impl<B: RegisterBus> ImuDriver for Mpu9150<B> {
    const VARIANT: &'static str = "mpu9150";

    fn from_config(config: &ImuConfig) -> ImuResult<Self> {
        let bus = B::open(&config.imu.bus)?;
        Ok(Self::new(&config.imu, bus))
    }

    async fn init(&mut self) -> ImuResult<()> {
        // A failed bring-up must not leave the previous session readable
        self.core.initialized = false;
        let address = self.core.address;
        self.core
            .verify_identity(address, WHO_AM_I, &[WHOAMI_MPU9150])
            .await?;

        self.core.configure_core().await?;

        if self.magnetometer {
            self.init_magnetometer().await?;
        }

        self.core.initialized = true;
        info!(
            "[{}] MPU-9150 initialized on {} at {:#04x} (magnetometer: {})",
            self.core.id,
            self.core.bus.path(),
            address,
            self.magnetometer
        );
        Ok(())
    }

    async fn read(&mut self) -> ImuResult<Sample> {
        self.core.ensure_initialized()?;
        let deadline = self.core.deadline();

        let frame = self.core.read_frame(deadline).await?;
        let (accel, gyro) = self.core.convert(&frame);
        let mag = if self.magnetometer {
            self.read_magnetometer(deadline).await?
        } else {
            None
        };

        let sample = Sample {
            accel,
            gyro,
            mag,
            temp: Some(frame.temp as f32 / TEMP_SENSITIVITY + TEMP_OFFSET),
            timestamp_us: self.core.timestamp_us(),
        };
        trace!("[{}] {:?}", self.core.id, sample);
        Ok(sample)
    }

    async fn calibrate(&mut self) -> ImuResult<Calibration> {
        self.core.calibrate().await
    }

    fn calibration(&self) -> &Calibration {
        &self.core.calibration
    }

    fn id(&self) -> &str {
        &self.core.id
    }
}
