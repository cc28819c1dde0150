//! Sysfs attribute access.
//!
//! Sysfs attributes are not streams. Each value is exchanged as one short
//! ASCII write or read at offset zero, and a read returns the whole value
//! followed by a newline. [`Attribute`] captures exactly that, so a cached
//! descriptor can be reused across calls.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How an attribute is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// An open sysfs attribute.
pub trait Attribute: Send {
    /// Replace the attribute's value with `data`, in a single write.
    fn store(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read up to `buf.len()` bytes of the attribute's current value.
    fn show(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Access to a sysfs tree.
pub trait SysfsBackend: Send + Sync {
    type Attr: Attribute;

    /// Open the attribute at `path`.
    fn open(&self, path: &Path, access: Access) -> io::Result<Self::Attr>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Open `path` for writing, store `data`, and close it again.
    fn write_attr(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.open(path, Access::Write)?.store(data)
    }
}

/// The running kernel's sysfs, through ordinary file operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSysfs;

impl SysfsBackend for HostSysfs {
    type Attr = File;

    fn open(&self, path: &Path, access: Access) -> io::Result<File> {
        let mut options = OpenOptions::new();
        match access {
            Access::Read => options.read(true),
            Access::Write => options.write(true).truncate(true),
            Access::ReadWrite => options.read(true).write(true),
        };
        options.open(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl Attribute for File {
    fn store(&mut self, data: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(0))?;
        // Sysfs consumes each write() as one complete value
        let written = self.write(data)?;
        if written != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, data.len()),
            ));
        }
        Ok(())
    }

    fn show(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.seek(SeekFrom::Start(0))?;
        self.read(buf)
    }
}

/// Translates pin, chip, channel and bus numbers into kernel paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsPaths {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
    iio_device: u32,
}

impl Default for SysfsPaths {
    fn default() -> Self {
        Self::new("/sys", "/dev", 0)
    }
}

impl SysfsPaths {
    pub fn new(
        sysfs_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
        iio_device: u32,
    ) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
            iio_device,
        }
    }

    pub fn gpio_export(&self) -> PathBuf {
        self.gpio_class().join("export")
    }

    pub fn gpio_unexport(&self) -> PathBuf {
        self.gpio_class().join("unexport")
    }

    /// Directory the kernel creates for an exported pin.
    pub fn gpio_dir(&self, pin: u32) -> PathBuf {
        self.gpio_class().join(format!("gpio{pin}"))
    }

    pub fn pwm_chip(&self, chip: u32) -> PathBuf {
        self.sysfs_root.join("class/pwm").join(format!("pwmchip{chip}"))
    }

    pub fn pwm_export(&self, chip: u32) -> PathBuf {
        self.pwm_chip(chip).join("export")
    }

    pub fn pwm_unexport(&self, chip: u32) -> PathBuf {
        self.pwm_chip(chip).join("unexport")
    }

    /// Directory the kernel creates for an exported PWM channel.
    pub fn pwm_dir(&self, chip: u32, channel: u32) -> PathBuf {
        self.pwm_chip(chip).join(format!("pwm{channel}"))
    }

    /// Raw-voltage attribute of an ADC channel on the configured IIO device.
    pub fn adc_raw(&self, channel: u32) -> PathBuf {
        self.sysfs_root
            .join("bus/iio/devices")
            .join(format!("iio:device{}", self.iio_device))
            .join(format!("in_voltage{channel}_raw"))
    }

    pub fn i2c_dev(&self, bus: u32) -> PathBuf {
        self.dev_root.join(format!("i2c-{bus}"))
    }

    fn gpio_class(&self) -> PathBuf {
        self.sysfs_root.join("class/gpio")
    }
}
