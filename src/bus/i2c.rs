use super::RegisterBus;
use crate::errors::{BusError, BusResult};
use async_trait::async_trait;
#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;
#[cfg(target_os = "linux")]
use i2cdev::linux::LinuxI2CDevice;

/// I2C bus implementation
///
/// Transactions are blocking SMBus ioctls. Once one has been issued, the
/// driver's `read_timeout_ms` deadline cannot interrupt it: a stuck
/// transaction is bounded only by the kernel adapter timeout, which is often
/// a second or more. The configured deadline bounds the time spent between
/// transactions, such as data-ready polling.
#[cfg(target_os = "linux")]
pub struct I2CBus {
    device: LinuxI2CDevice,
    path: String,
    /// Slave address the device handle currently points at
    selected: Option<u8>,
}

#[cfg(not(target_os = "linux"))]
pub struct I2CBus {
    path: String,
}

#[cfg(target_os = "linux")]
impl I2CBus {
    fn select(&mut self, address: u8) -> BusResult<()> {
        if self.selected != Some(address) {
            self.device
                .set_slave_address(address as u16)
                .map_err(|e| self.transaction_error(e))?;
            self.selected = Some(address);
        }
        Ok(())
    }

    fn transaction_error(&self, e: impl std::fmt::Display) -> BusError {
        BusError::Transaction {
            bus: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl RegisterBus for I2CBus {
    fn open(path: &str) -> BusResult<Self> {
        let device = LinuxI2CDevice::new(path, 0).map_err(|e| BusError::Unavailable {
            bus: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            device,
            path: path.to_string(),
            selected: None,
        })
    }

    async fn read_registers(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        self.select(address)?;

        if buf.len() == 1 {
            // Use SMBus read byte data for single byte reads
            let byte = self
                .device
                .smbus_read_byte_data(reg)
                .map_err(|e| self.transaction_error(e))?;
            buf[0] = byte;
        } else {
            // Use SMBus block read for multi-byte reads
            let data = self
                .device
                .smbus_read_i2c_block_data(reg, buf.len() as u8)
                .map_err(|e| self.transaction_error(e))?;
            if data.len() != buf.len() {
                return Err(self.transaction_error(format!(
                    "short block read at {:#04x}: wanted {} bytes, got {}",
                    reg,
                    buf.len(),
                    data.len()
                )));
            }
            buf.copy_from_slice(&data);
        }

        Ok(())
    }

    async fn write_register(&mut self, address: u8, reg: u8, value: u8) -> BusResult<()> {
        self.select(address)?;
        self.device
            .smbus_write_byte_data(reg, value)
            .map_err(|e| self.transaction_error(e))
    }

    fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait]
impl RegisterBus for I2CBus {
    fn open(path: &str) -> BusResult<Self> {
        Err(BusError::Unavailable {
            bus: path.to_string(),
            reason: "I2C is only supported on Linux. Build with the `fake` feature instead."
                .to_string(),
        })
    }

    async fn read_registers(&mut self, _address: u8, _reg: u8, _buf: &mut [u8]) -> BusResult<()> {
        Err(BusError::Unavailable {
            bus: self.path.clone(),
            reason: "I2C is only supported on Linux".to_string(),
        })
    }

    async fn write_register(&mut self, _address: u8, _reg: u8, _value: u8) -> BusResult<()> {
        Err(BusError::Unavailable {
            bus: self.path.clone(),
            reason: "I2C is only supported on Linux".to_string(),
        })
    }

    fn path(&self) -> &str {
        &self.path
    }
}
