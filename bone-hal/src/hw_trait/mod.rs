//! Hardware abstraction layer traits.
//!
//! This module defines the peripheral traits (GPIO, PWM, ADC, I2C) that the
//! sysfs-backed drivers in [`crate::peripheral`] implement, along with the
//! small closed enumerations and the error type every driver shares.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub mod adc;
pub mod gpio;
pub mod i2c;
pub mod pwm;

// Re-export traits
pub use adc::AdcInput;
pub use gpio::{Direction, GpioPin, PinValue};
pub use i2c::I2c;
pub use pwm::{PwmOutput, PwmState};

/// Whether a kernel-managed resource (GPIO pin, PWM channel) is currently
/// visible under sysfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    /// The resource's directory exists and its attributes can be used.
    Exported,
    /// The resource is released. This is the state of a freshly created handle.
    #[default]
    Unexported,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Exported => f.write_str("exported"),
            ExportState::Unexported => f.write_str("unexported"),
        }
    }
}

/// Export/unexport lifecycle shared by pins and PWM channels.
pub trait Exportable {
    /// Ask the kernel to export or release the resource.
    ///
    /// Not idempotent: requesting the state the resource is already in fails
    /// with [`HalError::State`].
    fn set_export_state(&mut self, state: ExportState) -> Result<()>;

    /// Export state as last confirmed by the kernel through this handle.
    fn export_state(&self) -> ExportState;
}

/// Common error type for hardware operations
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// Open, read, write or control request failed on a device resource
    #[error("{} failed on {}: {}", .op, .path.display(), .source)]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Resource content did not decode to the expected value
    #[error("Unexpected content in {}: {}", .path.display(), .reason)]
    Parse { path: PathBuf, reason: String },

    /// Export or unexport requested against a resource already in that state
    #[error("{resource} is already {state}")]
    State {
        resource: String,
        state: ExportState,
    },

    /// Invalid parameter or argument
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, HalError>;

/// Attach the operation and path to a bare I/O error.
pub(crate) trait IoContext<T> {
    fn context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| HalError::Io {
            op,
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_operation_and_path() {
        let err: Result<()> = Err(io::Error::from(io::ErrorKind::NotFound))
            .context("open", Path::new("/sys/class/gpio/gpio60/value"));
        let msg = err.unwrap_err().to_string();
        assert!(msg.starts_with("open failed on /sys/class/gpio/gpio60/value"));
    }

    #[test]
    fn test_state_error_message() {
        let err = HalError::State {
            resource: "gpio60".to_string(),
            state: ExportState::Exported,
        };
        assert_eq!(err.to_string(), "gpio60 is already exported");
    }

    #[test]
    fn test_default_export_state() {
        assert_eq!(ExportState::default(), ExportState::Unexported);
    }
}
