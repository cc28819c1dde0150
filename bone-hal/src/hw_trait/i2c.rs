//! I2C hardware abstraction trait.
//!
//! Transfers are raw: no register addressing or combined transactions.
//! Drivers for specific chips build those on top.

use super::Result;

/// I2C bus abstraction
pub trait I2c: Send {
    /// Select the slave device that subsequent transfers address.
    fn set_slave_address(&mut self, address: u16) -> Result<()>;

    /// Write `data` to the selected slave, returning the bytes transferred.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read from the selected slave into `buffer`, returning the bytes received.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write a single byte to the selected slave.
    fn write_byte(&mut self, byte: u8) -> Result<usize> {
        self.write(&[byte])
    }
}
