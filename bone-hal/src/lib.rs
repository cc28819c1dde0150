//! Single-board-computer peripherals through Linux sysfs and i2c-dev.
//!
//! Four independent drivers, each owning the kernel resource it names:
//!
//! - [`Gpio`]: pin direction and level via `/sys/class/gpio`
//! - [`Pwm`]: period, duty cycle and enable via `/sys/class/pwm`
//! - [`Adc`]: raw and scaled samples via `/sys/bus/iio`
//! - [`I2cBus`]: raw transfers via `/dev/i2c-N`
//!
//! All calls are synchronous and block in the kernel. Nothing is locked
//! internally; give each pin, channel or bus a single owning handle.
//!
//! ```no_run
//! use bone_hal::{Direction, ExportState, Gpio, PinValue};
//!
//! let mut led = Gpio::new(60);
//! led.set_export_state(ExportState::Exported)?;
//! led.set_direction(Direction::Output)?;
//! led.write(PinValue::High)?;
//! # Ok::<(), bone_hal::HalError>(())
//! ```

pub mod config;
pub mod hw_trait;
pub mod peripheral;
pub mod tracing;
pub mod transport;

pub use config::HalConfig;
pub use hw_trait::{
    AdcInput, Direction, ExportState, Exportable, GpioPin, HalError, I2c, PinValue, PwmOutput,
    PwmState, Result,
};
pub use peripheral::{Adc, Gpio, I2cBus, Pwm};
