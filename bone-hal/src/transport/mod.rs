//! Backends the peripheral drivers talk through.
//!
//! Two seams separate the drivers from the host: [`SysfsBackend`] for the
//! attribute files under `/sys`, and [`I2cTransport`] for the `/dev/i2c-N`
//! character devices. The host implementations go straight to the kernel;
//! the in-memory doubles in [`mock`] let the drivers run without hardware.

pub mod i2c_dev;
pub mod sysfs;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export transport implementations
pub use i2c_dev::{I2cDev, I2cTransport, I2C_SLAVE};
pub use sysfs::{Access, Attribute, HostSysfs, SysfsBackend, SysfsPaths};
