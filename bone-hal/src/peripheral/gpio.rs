//! Sysfs GPIO pin driver.
//!
//! A pin is exported by writing its number to `/sys/class/gpio/export`,
//! after which the kernel creates `gpio{N}/` with `direction` and `value`
//! attributes. The `value` descriptor is opened once and reused for every
//! read and write until the pin is unexported or the handle dropped.

use std::path::{Path, PathBuf};

use super::{CachedAttr, ExportControl};
use crate::hw_trait::{
    Direction, ExportState, Exportable, GpioPin, HalError, IoContext, PinValue, Result,
};
use crate::tracing::prelude::*;
use crate::transport::{Access, Attribute, HostSysfs, SysfsBackend, SysfsPaths};

/// One GPIO pin.
pub struct Gpio<B: SysfsBackend = HostSysfs> {
    pin: u32,
    dir_path: PathBuf,
    direction_path: PathBuf,
    direction: Option<Direction>,
    export_state: ExportState,
    control: ExportControl,
    value: CachedAttr<B::Attr>,
    backend: B,
}

impl Gpio<HostSysfs> {
    /// Create a handle for `pin` on the host's sysfs. No I/O is performed.
    pub fn new(pin: u32) -> Self {
        Self::with_backend(pin, HostSysfs, &SysfsPaths::default())
    }
}

impl<B: SysfsBackend> Gpio<B> {
    /// Create a handle for `pin` on an arbitrary backend and path layout.
    pub fn with_backend(pin: u32, backend: B, paths: &SysfsPaths) -> Self {
        let dir_path = paths.gpio_dir(pin);
        Self {
            pin,
            direction_path: dir_path.join("direction"),
            value: CachedAttr::new(dir_path.join("value"), Access::ReadWrite),
            dir_path,
            direction: None,
            export_state: ExportState::Unexported,
            control: ExportControl::new(
                format!("gpio{pin}"),
                pin,
                paths.gpio_dir(pin),
                paths.gpio_export(),
                paths.gpio_unexport(),
            ),
            backend,
        }
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// The pin's sysfs directory (present only while exported).
    pub fn path(&self) -> &Path {
        &self.dir_path
    }

    /// Direction last set through this handle.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn export_state(&self) -> ExportState {
        self.export_state
    }

    /// Whether the kernel currently shows the pin as exported.
    ///
    /// Only a snapshot: another process may change it at any time.
    pub fn is_exported(&self) -> bool {
        self.backend.exists(&self.dir_path)
    }

    /// Configure the pin as an input or an output.
    ///
    /// Fails with an I/O error if the pin is not exported.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.backend
            .write_attr(&self.direction_path, direction.as_sysfs().as_bytes())
            .context("write", &self.direction_path)?;
        debug!(pin = self.pin, direction = ?direction, "GPIO direction set");
        self.direction = Some(direction);
        Ok(())
    }

    /// Export or unexport the pin.
    ///
    /// Requesting the state the pin is already in fails with
    /// [`HalError::State`]; the cached state is corrected to match.
    pub fn set_export_state(&mut self, state: ExportState) -> Result<()> {
        let result = self.control.request(&self.backend, state);
        match &result {
            Ok(()) | Err(HalError::State { .. }) => self.export_state = state,
            Err(_) => {}
        }
        if state == ExportState::Unexported {
            self.value.release();
            self.direction = None;
        }
        result
    }

    /// Drive the pin high or low.
    pub fn write(&mut self, value: PinValue) -> Result<()> {
        self.value
            .with(&self.backend, "write", |attr| attr.store(value.as_sysfs().as_bytes()))?;
        trace!(pin = self.pin, value = ?value, "GPIO write");
        Ok(())
    }

    /// Read the pin's logic level.
    ///
    /// The kernel reports a single digit and a newline; anything else is
    /// rejected as a parse error.
    pub fn read(&mut self) -> Result<PinValue> {
        let mut buf = [0u8; 4];
        let n = self.value.with(&self.backend, "read", |attr| attr.show(&mut buf))?;
        if n != 2 {
            return Err(HalError::Parse {
                path: self.value.path().to_path_buf(),
                reason: format!("expected a digit and newline, read {} bytes", n),
            });
        }
        let value = if buf[0] == b'1' { PinValue::High } else { PinValue::Low };
        trace!(pin = self.pin, value = ?value, "GPIO read");
        Ok(value)
    }
}

impl<B: SysfsBackend> GpioPin for Gpio<B> {
    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        Gpio::set_direction(self, direction)
    }

    fn write(&mut self, value: PinValue) -> Result<()> {
        Gpio::write(self, value)
    }

    fn read(&mut self) -> Result<PinValue> {
        Gpio::read(self)
    }
}

impl<B: SysfsBackend> Exportable for Gpio<B> {
    fn set_export_state(&mut self, state: ExportState) -> Result<()> {
        Gpio::set_export_state(self, state)
    }

    fn export_state(&self) -> ExportState {
        self.export_state
    }
}

impl<B: SysfsBackend> std::fmt::Debug for Gpio<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpio")
            .field("pin", &self.pin)
            .field("direction", &self.direction)
            .field("export_state", &self.export_state)
            .field("value_open", &self.value.is_open())
            .finish()
    }
}
