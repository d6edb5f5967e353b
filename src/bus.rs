pub mod i2c;
#[cfg(test)]
pub mod mock;

use crate::errors::BusResult;
use async_trait::async_trait;

/// Register-oriented transport consumed by the real IMU drivers.
///
/// Implementations report transaction failures through [`BusResult`]; they never
/// retry on their own. Time bounds are enforced by the caller, so an implementation
/// is free to suspend while a transaction is in flight.
#[async_trait]
pub trait RegisterBus: Send {
    /// Open the bus at `path` (e.g. `/dev/i2c-1`).
    fn open(path: &str) -> BusResult<Self>
    where
        Self: Sized;

    /// Read `buf.len()` consecutive registers starting at `reg`.
    async fn read_registers(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> BusResult<()>;

    async fn write_register(&mut self, address: u8, reg: u8, value: u8) -> BusResult<()>;

    /// Bus path, useful for logging and error messages
    fn path(&self) -> &str;
}
