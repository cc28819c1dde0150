//! ADC hardware abstraction trait.

use super::Result;

/// ADC abstraction for reading analog values
pub trait AdcInput: Send {
    /// Read the raw converter value.
    fn read(&self) -> Result<u16>;

    /// Read the raw value multiplied by the channel's scaling factor.
    fn scaled_read(&self) -> Result<f64>;
}
