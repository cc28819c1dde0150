//! GPIO hardware abstraction trait.

use super::Result;

/// GPIO pin value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    Low,
    High,
}

impl PinValue {
    /// Token written to a sysfs `value` attribute.
    pub(crate) fn as_sysfs(self) -> &'static str {
        match self {
            PinValue::High => "1",
            PinValue::Low => "0",
        }
    }
}

impl From<bool> for PinValue {
    fn from(value: bool) -> Self {
        if value { PinValue::High } else { PinValue::Low }
    }
}

impl From<PinValue> for bool {
    fn from(value: PinValue) -> Self {
        matches!(value, PinValue::High)
    }
}

/// GPIO pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// Token written to a sysfs `direction` attribute.
    pub(crate) fn as_sysfs(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }
}

/// GPIO pin abstraction
pub trait GpioPin: Send {
    /// Configure the pin as an input or an output.
    fn set_direction(&mut self, direction: Direction) -> Result<()>;

    /// Drive the pin (must be configured as an output).
    fn write(&mut self, value: PinValue) -> Result<()>;

    /// Read the current logic level of the pin.
    fn read(&mut self) -> Result<PinValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysfs_tokens() {
        assert_eq!(PinValue::High.as_sysfs(), "1");
        assert_eq!(PinValue::Low.as_sysfs(), "0");
        assert_eq!(Direction::Input.as_sysfs(), "in");
        assert_eq!(Direction::Output.as_sysfs(), "out");
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(PinValue::from(true), PinValue::High);
        assert!(!bool::from(PinValue::Low));
    }
}
