//! Consumer-side checks against the generic handle, as built with the default
//! `fake` feature.
#![cfg(feature = "fake")]

use flight_imu::config::parse_imu_config;
use flight_imu::{run_acquisition, Imu, ImuDriver};

const CONFIG: &str = r#"
[imu]
id = "imu_test"
sample_rate_hz = 200

[fake]
seed = 2024
noise_counts = 20
mag_counts = [100, 0, -100]

[acquisition]
rate_hz = 1000
cycles = 10
"#;

async fn collect() -> Vec<flight_imu::messages::ImuMessage> {
    let config = parse_imu_config(CONFIG).unwrap();
    let mut imu = Imu::from_config(&config).unwrap();
    imu.init().await.unwrap();

    let mut messages = Vec::new();
    let stats = run_acquisition(&mut imu, &config.acquisition, |m| messages.push(m))
        .await
        .unwrap();
    assert_eq!(stats.samples, 10);
    messages
}

#[tokio::test]
async fn generic_handle_is_reproducible_end_to_end() {
    let first = collect().await;
    let second = collect().await;
    assert_eq!(first, second);
    assert_eq!(first[0].h.sensor_id, "imu_test");
    assert_eq!(first[1].h.t_mono_us, 5_000);
}

#[tokio::test]
async fn generic_handle_reports_physical_units() {
    let config = parse_imu_config(CONFIG).unwrap();
    let mut imu = Imu::from_config(&config).unwrap();
    imu.init().await.unwrap();
    imu.calibrate().await.unwrap();
    imu.self_test().await.unwrap();

    let sample = imu.read().await.unwrap();
    assert!((sample.accel[2] - 9.80665).abs() < 0.05);
    let mag = sample.mag.unwrap();
    assert!((mag[0] - 15.0).abs() < 5.0);
}
