//! Sysfs and i2c-dev peripheral drivers.
//!
//! Every driver follows the same shape: construct from numbers without any
//! I/O, optionally export, then exchange short ASCII values with the kernel.
//! The pieces of that protocol shared by GPIO and PWM live here.

pub mod adc;
pub mod gpio;
pub mod i2c;
pub mod pwm;

pub use adc::Adc;
pub use gpio::Gpio;
pub use i2c::I2cBus;
pub use pwm::Pwm;

use std::io;
use std::path::{Path, PathBuf};

use crate::hw_trait::{ExportState, HalError, IoContext, Result};
use crate::tracing::prelude::*;
use crate::transport::{Access, Attribute, SysfsBackend};

/// Export/unexport attributes for one pin or channel.
///
/// The request is written unconditionally and the kernel's answer decides
/// the outcome. Checking for the resource's directory first would race with
/// any other process touching the same resource. The directory is only
/// consulted after a rejection, to tell "already in that state" apart from
/// a resource claimed by a kernel driver.
#[derive(Debug, Clone)]
pub(crate) struct ExportControl {
    resource: String,
    id: u32,
    dir: PathBuf,
    export: PathBuf,
    unexport: PathBuf,
}

impl ExportControl {
    pub fn new(
        resource: String,
        id: u32,
        dir: PathBuf,
        export: PathBuf,
        unexport: PathBuf,
    ) -> Self {
        Self {
            resource,
            id,
            dir,
            export,
            unexport,
        }
    }

    /// Request `target` from the kernel.
    ///
    /// On [`HalError::State`] the resource is known to already be in
    /// `target`, so callers may record it as such. Any other failure,
    /// including `EBUSY` from a driver-held resource, is [`HalError::Io`].
    pub fn request<B: SysfsBackend>(&self, backend: &B, target: ExportState) -> Result<()> {
        let (path, op) = match target {
            ExportState::Exported => (&self.export, "export"),
            ExportState::Unexported => (&self.unexport, "unexport"),
        };

        match backend.write_attr(path, self.id.to_string().as_bytes()) {
            Ok(()) => {
                info!(resource = %self.resource, "{}ed", op);
                Ok(())
            }
            Err(e) if rejected_as_redundant(target, &e) && self.is_in(backend, target) => {
                debug!(resource = %self.resource, error = %e, "Kernel rejected {}", op);
                Err(HalError::State {
                    resource: self.resource.clone(),
                    state: target,
                })
            }
            Err(source) => Err(HalError::Io {
                op,
                path: path.clone(),
                source,
            }),
        }
    }

    fn is_in<B: SysfsBackend>(&self, backend: &B, state: ExportState) -> bool {
        backend.exists(&self.dir) == (state == ExportState::Exported)
    }
}

/// Whether `err` is the errno the kernel uses for a resource already in
/// `target`.
///
/// Export of an exported pin or channel fails with `EBUSY`, but so does
/// export of one held by a kernel driver. Unexport of a released one fails
/// with `EINVAL` (GPIO) or `ENODEV` (PWM).
fn rejected_as_redundant(target: ExportState, err: &io::Error) -> bool {
    match (target, err.raw_os_error()) {
        (ExportState::Exported, Some(libc::EBUSY)) => true,
        (ExportState::Unexported, Some(libc::EINVAL | libc::ENODEV)) => true,
        _ => false,
    }
}

/// An attribute descriptor opened on first use and kept until released.
///
/// A failed operation drops the descriptor so the next call reopens it;
/// the attribute may have disappeared with an unexport from elsewhere.
#[derive(Debug)]
pub(crate) struct CachedAttr<A> {
    path: PathBuf,
    access: Access,
    attr: Option<A>,
}

impl<A: Attribute> CachedAttr<A> {
    pub fn new(path: PathBuf, access: Access) -> Self {
        Self {
            path,
            access,
            attr: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.attr.is_some()
    }

    /// Close the descriptor, if open.
    pub fn release(&mut self) {
        self.attr = None;
    }

    /// Run `f` against the open descriptor, opening it first if needed.
    pub fn with<B, T>(
        &mut self,
        backend: &B,
        op: &'static str,
        f: impl FnOnce(&mut A) -> io::Result<T>,
    ) -> Result<T>
    where
        B: SysfsBackend<Attr = A>,
    {
        let mut attr = match self.attr.take() {
            Some(attr) => attr,
            None => backend.open(&self.path, self.access).context("open", &self.path)?,
        };
        let result = f(&mut attr).context(op, &self.path)?;
        self.attr = Some(attr);
        Ok(result)
    }
}
