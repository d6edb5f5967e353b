//! In-memory register bus for driver tests
//!
//! Registers are keyed by `(address, register)`. Writes land in the same map, so a
//! driver reads back what it configured, and every write is also logged for
//! verification. Failure and hang injection cover the transport error paths.

use super::RegisterBus;
use crate::errors::{BusError, BusResult};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MockBus {
    path: String,
    registers: HashMap<(u8, u8), u8>,
    writes: Vec<(u8, u8, u8)>,
    reads: usize,
    failing: bool,
    hanging: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            path: "mock".to_string(),
            ..Default::default()
        }
    }

    pub fn set_register(&mut self, address: u8, reg: u8, value: u8) {
        self.registers.insert((address, reg), value);
    }

    pub fn register(&self, address: u8, reg: u8) -> u8 {
        self.registers.get(&(address, reg)).copied().unwrap_or(0)
    }

    /// Store three big-endian i16 values starting at `reg`
    pub fn set_i16x3_be(&mut self, address: u8, reg: u8, values: [i16; 3]) {
        for (i, v) in values.iter().enumerate() {
            let [hi, lo] = v.to_be_bytes();
            self.set_register(address, reg + 2 * i as u8, hi);
            self.set_register(address, reg + 2 * i as u8 + 1, lo);
        }
    }

    /// Store three little-endian i16 values starting at `reg`
    pub fn set_i16x3_le(&mut self, address: u8, reg: u8, values: [i16; 3]) {
        for (i, v) in values.iter().enumerate() {
            let [lo, hi] = v.to_le_bytes();
            self.set_register(address, reg + 2 * i as u8, lo);
            self.set_register(address, reg + 2 * i as u8 + 1, hi);
        }
    }

    /// Every write in order, as `(address, register, value)`
    pub fn writes(&self) -> &[(u8, u8, u8)] {
        &self.writes
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    /// Make every following transaction fail with a transaction error
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Make every following transaction never complete
    pub fn set_hanging(&mut self, hanging: bool) {
        self.hanging = hanging;
    }

    async fn begin(&self, reg: u8) -> BusResult<()> {
        if self.hanging {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(BusError::Transaction {
                bus: self.path.clone(),
                reason: format!("injected failure at register {:#04x}", reg),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RegisterBus for MockBus {
    fn open(path: &str) -> BusResult<Self> {
        Ok(Self {
            path: path.to_string(),
            ..Default::default()
        })
    }

    async fn read_registers(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        self.begin(reg).await?;
        self.reads += 1;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.register(address, reg.wrapping_add(i as u8));
        }
        Ok(())
    }

    async fn write_register(&mut self, address: u8, reg: u8, value: u8) -> BusResult<()> {
        self.begin(reg).await?;
        self.writes.push((address, reg, value));
        self.registers.insert((address, reg), value);
        Ok(())
    }

    fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_are_read_back_and_logged() {
        let mut bus = MockBus::new();
        bus.write_register(0x68, 0x19, 9).await.unwrap();

        let mut buf = [0u8; 1];
        bus.read_registers(0x68, 0x19, &mut buf).await.unwrap();
        assert_eq!(buf[0], 9);
        assert_eq!(bus.writes(), &[(0x68, 0x19, 9)]);
        assert_eq!(bus.read_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut bus = MockBus::new();
        bus.set_failing(true);
        let mut buf = [0u8; 2];
        let err = bus.read_registers(0x68, 0x3B, &mut buf).await.unwrap_err();
        assert!(matches!(err, BusError::Transaction { .. }));
    }

    #[test]
    fn test_big_endian_helper_layout() {
        let mut bus = MockBus::new();
        bus.set_i16x3_be(0x68, 0x3B, [0x4000, -1, 0]);
        assert_eq!(bus.register(0x68, 0x3B), 0x40);
        assert_eq!(bus.register(0x68, 0x3C), 0x00);
        assert_eq!(bus.register(0x68, 0x3D), 0xFF);
        assert_eq!(bus.register(0x68, 0x3E), 0xFF);
    }
}
