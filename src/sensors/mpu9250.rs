use super::calibration::Calibration;
use super::invensense::{self, InvenSense, MAG_ADDRESS, WHO_AM_I};
use super::{ImuDriver, Sample};
use crate::bus::RegisterBus;
use crate::config::{ImuConfig, ImuSettings};
use crate::errors::ImuResult;
use async_trait::async_trait;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, trace};

// Register addresses for the MPU-9250 beyond the shared core
const ACCEL_CONFIG2: u8 = 0x1D;

// Expected WHO_AM_I values
const WHOAMI_MPU9250: u8 = 0x71;
const WHOAMI_MPU9255: u8 = 0x73;

const TEMP_SENSITIVITY: f32 = 333.87; // LSB/°C
const TEMP_OFFSET: f32 = 21.0; // °C

// AK8963 magnetometer
const AK8963_WIA: u8 = 0x00;
const AK8963_ST1: u8 = 0x02;
const AK8963_HXL: u8 = 0x03;
const AK8963_CNTL1: u8 = 0x0A;
const AK8963_ASAX: u8 = 0x10;
const AK8963_DEVICE_ID: u8 = 0x48;
const AK8963_POWER_DOWN: u8 = 0x00;
const AK8963_FUSE_ROM: u8 = 0x0F;
/// 16-bit output, continuous measurement mode 2 (100 Hz)
const AK8963_CONTINUOUS_100HZ: u8 = 0x16;
const AK8963_ST1_DRDY: u8 = 0x01;
const AK8963_ST2_HOFL: u8 = 0x08;
const AK8963_SENSITIVITY: f32 = 0.15; // µT/LSB at 16-bit
const AK8963_MODE_DELAY: Duration = Duration::from_millis(10);

/// InvenSense MPU-9250: MPU-6500 accel/gyro with an AK8963 magnetometer
pub struct Mpu9250<B> {
    core: InvenSense<B>,
    magnetometer: bool,
    /// Fuse-ROM sensitivity adjustment, read during init
    mag_adjust: [f32; 3],
}

impl<B: RegisterBus> Mpu9250<B> {
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
            .verify_identity(MAG_ADDRESS, AK8963_WIA, &[AK8963_DEVICE_ID])
            .await?;

        self.core
            .write_register(MAG_ADDRESS, AK8963_CNTL1, AK8963_POWER_DOWN)
            .await?;
        sleep(AK8963_MODE_DELAY).await;
        self.core
            .write_register(MAG_ADDRESS, AK8963_CNTL1, AK8963_FUSE_ROM)
            .await?;
        sleep(AK8963_MODE_DELAY).await;

        let mut asa = [0u8; 3];
        let deadline = self.core.deadline();
        self.core
            .read_block(MAG_ADDRESS, AK8963_ASAX, &mut asa, deadline)
            .await?;
        self.mag_adjust = asa.map(invensense::mag_adjustment);

        self.core
            .write_register(MAG_ADDRESS, AK8963_CNTL1, AK8963_POWER_DOWN)
            .await?;
        sleep(AK8963_MODE_DELAY).await;
        self.core
            .write_register(MAG_ADDRESS, AK8963_CNTL1, AK8963_CONTINUOUS_100HZ)
            .await?;

        debug!(
            "[{}] AK8963 ready, sensitivity adjustment {:?}",
            self.core.id, self.mag_adjust
        );
        Ok(())
    }

    /// Latest magnetometer reading, `None` if no new data or on overflow
    async fn read_magnetometer(&mut self, deadline: Instant) -> ImuResult<Option<[f32; 3]>> {
        let st1 = self.core.read_register(MAG_ADDRESS, AK8963_ST1, deadline).await?;
        if st1 & AK8963_ST1_DRDY == 0 {
            return Ok(None);
        }

        // HXL..HZH plus ST2; reading ST2 releases the data registers
        let mut buf = [0u8; 7];
        self.core
            .read_block(MAG_ADDRESS, AK8963_HXL, &mut buf, deadline)
            .await?;
        if buf[6] & AK8963_ST2_HOFL != 0 {
            debug!("[{}] AK8963 magnetic overflow, dropping reading", self.core.id);
            return Ok(None);
        }

        let raw = [
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ];
        Ok(Some([
            raw[0] as f32 * AK8963_SENSITIVITY * self.mag_adjust[0],
            raw[1] as f32 * AK8963_SENSITIVITY * self.mag_adjust[1],
            raw[2] as f32 * AK8963_SENSITIVITY * self.mag_adjust[2],
        ]))
    }
}

#[async_trait]
impl<B: RegisterBus> ImuDriver for Mpu9250<B> {
    const VARIANT: &'static str = "mpu9250";

    fn from_config(config: &ImuConfig) -> ImuResult<Self> {
        let bus = B::open(&config.imu.bus)?;
        Ok(Self::new(&config.imu, bus))
    }

    async fn init(&mut self) -> ImuResult<()> {
        // A failed bring-up must not leave the previous session readable
        self.core.initialized = false;
        let address = self.core.address;
        self.core
            .verify_identity(address, WHO_AM_I, &[WHOAMI_MPU9250, WHOAMI_MPU9255])
            .await?;

        self.core.configure_core().await?;
        // Accel DLPF: ~41 Hz bandwidth
        self.core.write_register(address, ACCEL_CONFIG2, 0x03).await?;

        if self.magnetometer {
            self.init_magnetometer().await?;
        }

        self.core.initialized = true;
        info!(
            "[{}] MPU-9250 initialized on {} at {:#04x} (magnetometer: {})",
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
