// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod imu;
pub mod messages;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use config::{load_imu_config, ImuConfig};
pub use errors::{BusError, ConfigError, ImuError, ImuResult};
pub use imu::Imu;
pub use scheduler::{run_acquisition, AcquisitionStats};
pub use sensors::{Calibration, ImuDriver, Sample};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Bring up the compiled-in IMU and run the acquisition loop, printing one JSON
/// message per sample on stdout.
pub async fn run_imu_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[flight-imu] starting up ({} variant)...", <Imu as ImuDriver>::VARIANT);

    let imu_config_path = format!("{}/imu.toml", config_path);
    let config = load_imu_config(&imu_config_path)?;
    info!("[config] loaded {}", imu_config_path);

    let mut imu = Imu::from_config(&config)?;
    imu.init().await?;

    if config.imu.calibrate_on_start {
        imu.calibrate().await?;
    }
    if config.imu.self_test_on_start {
        imu.self_test().await?;
        info!("[{}] self-test passed", imu.id());
    }

    let stats = run_acquisition(&mut imu, &config.acquisition, |msg| match msg.to_json() {
        Ok(line) => println!("{}", line),
        Err(e) => error!("[output] failed to encode sample {}: {}", msg.h.seq, e),
    })
    .await?;

    info!("[main] done: {:?}", stats);
    Ok(())
}
