//! I2C bus handle over i2c-dev.

use std::path::{Path, PathBuf};

use crate::hw_trait::{I2c, IoContext, Result};
use crate::tracing::prelude::*;
use crate::transport::{I2cDev, I2cTransport, SysfsPaths};

/// An open I2C adapter.
///
/// The handle owns the adapter descriptor and closes it when dropped.
/// Transfers go to whichever slave was last selected with
/// [`set_slave_address`](Self::set_slave_address); selecting one first is
/// the caller's responsibility.
#[derive(Debug)]
pub struct I2cBus<T: I2cTransport = I2cDev> {
    bus: u32,
    path: PathBuf,
    slave_address: Option<u16>,
    transport: T,
}

impl I2cBus<I2cDev> {
    /// Open `/dev/i2c-{bus}` for reading and writing.
    pub fn open(bus: u32) -> Result<Self> {
        Self::open_with_paths(bus, &SysfsPaths::default())
    }

    /// Open the adapter device under a custom device root.
    pub fn open_with_paths(bus: u32, paths: &SysfsPaths) -> Result<Self> {
        let path = paths.i2c_dev(bus);
        let transport = I2cDev::open(&path).context("open", &path)?;
        debug!(bus, path = %path.display(), "I2C bus opened");
        Ok(Self {
            bus,
            path,
            slave_address: None,
            transport,
        })
    }
}

impl<T: I2cTransport> I2cBus<T> {
    /// Wrap an already open transport for adapter `bus`.
    pub fn with_transport(bus: u32, transport: T) -> Self {
        Self {
            bus,
            path: SysfsPaths::default().i2c_dev(bus),
            slave_address: None,
            transport,
        }
    }

    pub fn bus(&self) -> u32 {
        self.bus
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Slave last selected through this handle.
    pub fn slave_address(&self) -> Option<u16> {
        self.slave_address
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Select the slave addressed by following transfers.
    pub fn set_slave_address(&mut self, address: u16) -> Result<()> {
        self.transport
            .set_slave_address(address)
            .context("set slave address", &self.path)?;
        debug!(bus = self.bus, address = %format!("0x{:02x}", address), "I2C slave selected");
        self.slave_address = Some(address);
        Ok(())
    }

    /// Write `data` to the selected slave, returning the bytes transferred.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.transport.write(data).context("write", &self.path)?;
        if n < data.len() {
            warn!(bus = self.bus, written = n, requested = data.len(), "Short I2C write");
        }
        Ok(n)
    }

    /// Write one byte to the selected slave.
    pub fn write_byte(&mut self, byte: u8) -> Result<usize> {
        self.write(&[byte])
    }

    /// Read from the selected slave into `buffer`, returning the bytes received.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let n = self.transport.read(buffer).context("read", &self.path)?;
        trace!(bus = self.bus, received = n, "I2C read");
        Ok(n)
    }
}

impl<T: I2cTransport> I2c for I2cBus<T> {
    fn set_slave_address(&mut self, address: u16) -> Result<()> {
        I2cBus::set_slave_address(self, address)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        I2cBus::write(self, data)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        I2cBus::read(self, buffer)
    }
}
