//! Build-time IMU selection.
//!
//! Exactly one of the `mpu9150`, `mpu9250` or `fake` features binds [`Imu`] to a
//! concrete driver. Consumers only ever name `Imu` and the [`ImuDriver`] contract;
//! switching hardware is a rebuild, never a runtime decision.
//!
//! [`ImuDriver`]: crate::sensors::ImuDriver

#[cfg(not(any(feature = "mpu9150", feature = "mpu9250", feature = "fake")))]
compile_error!(
    "An IMU feature flag must be enabled. Choose one of: mpu9150, mpu9250, fake"
);

#[cfg(any(
    all(feature = "mpu9150", feature = "mpu9250"),
    all(feature = "mpu9150", feature = "fake"),
    all(feature = "mpu9250", feature = "fake"),
))]
compile_error!(
    "Only one IMU feature flag (mpu9150, mpu9250, fake) can be enabled at a time. \
     Real sensors need `--no-default-features --features <sensor>`."
);

#[cfg(all(feature = "mpu9150", not(feature = "mpu9250"), not(feature = "fake")))]
pub type Imu = crate::sensors::Mpu9150<crate::bus::i2c::I2CBus>;

#[cfg(all(feature = "mpu9250", not(feature = "mpu9150"), not(feature = "fake")))]
pub type Imu = crate::sensors::Mpu9250<crate::bus::i2c::I2CBus>;

#[cfg(all(feature = "fake", not(feature = "mpu9150"), not(feature = "mpu9250")))]
pub type Imu = crate::sensors::FakeImu;
