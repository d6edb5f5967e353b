use thiserror::Error;

/// Transport-level failures reported by a register bus
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Bus '{bus}' transaction failed: {reason}")]
    Transaction { bus: String, reason: String },

    #[error("Bus '{bus}' not found or unavailable: {reason}")]
    Unavailable { bus: String, reason: String },
}

/// Runtime errors surfaced by IMU drivers
#[derive(Error, Debug)]
pub enum ImuError {
    #[error("Bus communication failed: {0}")]
    Bus(#[from] BusError),

    #[error("IMU '{sensor}' not found: expected chip ID {expected:#04x}, got {actual:#04x}")]
    DeviceNotFound { sensor: String, expected: u8, actual: u8 },

    #[error("IMU '{sensor}' bus transaction timed out after {timeout_ms}ms")]
    Timeout { sensor: String, timeout_ms: u64 },

    #[error("IMU '{sensor}' produced no fresh data within {timeout_ms}ms")]
    StaleData { sensor: String, timeout_ms: u64 },

    #[error("IMU '{sensor}' used before initialization")]
    NotInitialized { sensor: String },

    #[error("IMU '{sensor}' calibration failed: {reason}")]
    CalibrationError { sensor: String, reason: String },

    #[error("IMU '{sensor}' self-test failed: {reason}")]
    SelfTestFailed { sensor: String, reason: String },

    #[error("IMU '{sensor}' failsafe after {consecutive} consecutive failures: {source}")]
    FailsafeTriggered {
        sensor: String,
        consecutive: u32,
        #[source]
        source: Box<ImuError>,
    },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type aliases for convenience
pub type BusResult<T> = Result<T, BusError>;
pub type ImuResult<T> = Result<T, ImuError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
