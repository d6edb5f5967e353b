pub mod imu_config;

pub use imu_config::{
    load_imu_config, parse_imu_config, AcquisitionSettings, FakeSettings, ImuConfig, ImuSettings,
};
