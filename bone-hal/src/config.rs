//! Configuration for locating peripherals on the host.
//!
//! Defaults match a stock kernel. Environment variables relocate the roots,
//! which is mostly useful for containers with sysfs mounted elsewhere and for
//! boards whose ADC is not the first IIO device.

use crate::tracing::prelude::*;
use crate::transport::SysfsPaths;

const ENV_SYSFS_ROOT: &str = "BONE_HAL_SYSFS_ROOT";
const ENV_DEV_ROOT: &str = "BONE_HAL_DEV_ROOT";
const ENV_IIO_DEVICE: &str = "BONE_HAL_IIO_DEVICE";

/// Where the kernel exposes the peripherals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalConfig {
    /// Mount point of sysfs.
    pub sysfs_root: String,

    /// Directory holding the `i2c-N` device nodes.
    pub dev_root: String,

    /// Index of the IIO device providing `in_voltageN_raw`.
    pub iio_device: u32,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            sysfs_root: "/sys".to_string(),
            dev_root: "/dev".to_string(),
            iio_device: 0,
        }
    }
}

impl HalConfig {
    /// Build a configuration from the defaults, overridden by the environment.
    ///
    /// # Environment Variables
    ///
    /// - `BONE_HAL_SYSFS_ROOT`: sysfs mount point (default: `/sys`)
    /// - `BONE_HAL_DEV_ROOT`: device node directory (default: `/dev`)
    /// - `BONE_HAL_IIO_DEVICE`: IIO device index (default: 0; ignored if not a number)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var(ENV_SYSFS_ROOT) {
            config.sysfs_root = root;
        }
        if let Ok(root) = std::env::var(ENV_DEV_ROOT) {
            config.dev_root = root;
        }
        if let Ok(value) = std::env::var(ENV_IIO_DEVICE) {
            match value.trim().parse() {
                Ok(device) => config.iio_device = device,
                Err(e) => warn!(value = %value, error = %e, "Ignoring invalid {}", ENV_IIO_DEVICE),
            }
        }

        debug!(
            sysfs_root = %config.sysfs_root,
            dev_root = %config.dev_root,
            iio_device = config.iio_device,
            "Peripheral configuration"
        );
        config
    }

    /// Path builder for drivers created with this configuration.
    pub fn paths(&self) -> SysfsPaths {
        SysfsPaths::new(&self.sysfs_root, &self.dev_root, self.iio_device)
    }
}
