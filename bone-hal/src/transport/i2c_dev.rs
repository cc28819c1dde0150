//! Linux i2c-dev character device transport.
//!
//! Each `/dev/i2c-N` node is one adapter. The slave address is selected
//! with the `I2C_SLAVE` ioctl; plain read()/write() on the descriptor then
//! perform a single I2C read or write transaction with that slave.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

/// `I2C_SLAVE` request code from `<linux/i2c-dev.h>`.
pub const I2C_SLAVE: u32 = 0x0703;

/// Raw access to one I2C adapter.
pub trait I2cTransport: Send {
    /// Select the slave addressed by following transfers.
    fn set_slave_address(&mut self, address: u16) -> io::Result<()>;

    /// Write `data` in one transaction; may transfer fewer bytes.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read into `buf` in one transaction; may receive fewer bytes.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// An open `/dev/i2c-N` descriptor.
///
/// The descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct I2cDev {
    file: File,
}

impl I2cDev {
    /// Open an adapter device for reading and writing.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl I2cTransport for I2cDev {
    fn set_slave_address(&mut self, address: u16) -> io::Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and stays open for
        // the call; I2C_SLAVE takes its argument by value.
        let res = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_SLAVE as _,
                libc::c_ulong::from(address),
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let err = I2cDev::open(&dir.path().join("i2c-9")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_slave_address_rejected_on_regular_file() {
        // A plain file is not an i2c-dev node, so the ioctl must fail
        // without touching the file.
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut dev = I2cDev::open(file.path()).unwrap();
        assert!(dev.set_slave_address(0x50).is_err());
    }
}
