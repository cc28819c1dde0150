//! PWM hardware abstraction trait.

use super::Result;

/// Whether a PWM channel is producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PwmState {
    Enabled,
    /// Default when a channel handle is first created.
    #[default]
    Disabled,
}

impl PwmState {
    /// Token written to a sysfs `enable` attribute.
    pub(crate) fn as_sysfs(self) -> &'static str {
        match self {
            PwmState::Enabled => "1",
            PwmState::Disabled => "0",
        }
    }
}

/// PWM output abstraction. All times are in nanoseconds.
pub trait PwmOutput: Send {
    /// Set the length of one PWM cycle.
    fn set_period(&mut self, period_ns: u64) -> Result<()>;

    /// Enable or disable the output.
    fn set_state(&mut self, state: PwmState) -> Result<()>;

    /// Set the duty cycle as a percentage (0-100) of the configured period.
    fn write(&mut self, percentage: f64) -> Result<()>;

    /// Set the active time within each period directly.
    fn set_duty_cycle(&mut self, duty_ns: u64) -> Result<()>;
}
