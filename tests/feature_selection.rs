//! Build-time selection must reject zero or several IMU variants.
//!
//! Each case runs a nested `cargo check`, so these are ignored by default:
//! `cargo test --test feature_selection -- --ignored`.

use std::path::Path;
use std::process::Command;

fn check_with(args: &[&str]) -> (bool, String) {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("feature-selection");
    let output = Command::new(env!("CARGO"))
        .arg("check")
        .arg("--lib")
        .arg("--manifest-path")
        .arg(Path::new(manifest_dir).join("Cargo.toml"))
        .arg("--target-dir")
        .arg(target_dir)
        .args(args)
        .output()
        .expect("failed to spawn cargo");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
#[ignore]
fn no_variant_fails_the_build() {
    let (ok, stderr) = check_with(&["--no-default-features"]);
    assert!(!ok, "build without an IMU variant succeeded");
    assert!(
        stderr.contains("An IMU feature flag must be enabled"),
        "unexpected diagnostics:\n{stderr}"
    );
}

#[test]
#[ignore]
fn two_variants_fail_the_build() {
    let (ok, stderr) = check_with(&["--features", "mpu9250"]);
    assert!(!ok, "build with fake and mpu9250 succeeded");
    assert!(
        stderr.contains("Only one IMU feature flag"),
        "unexpected diagnostics:\n{stderr}"
    );
}

#[test]
#[ignore]
fn single_real_variant_builds() {
    let (ok, stderr) = check_with(&["--no-default-features", "--features", "mpu9250"]);
    assert!(ok, "mpu9250-only build failed:\n{stderr}");
}
