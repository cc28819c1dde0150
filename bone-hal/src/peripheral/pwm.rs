//! Sysfs PWM channel driver.
//!
//! Channels are exported per chip: writing `N` to `pwmchip{C}/export`
//! creates `pwmchip{C}/pwm{N}/` with `period`, `duty_cycle` and `enable`
//! attributes. All times are decimal nanoseconds.
//!
//! The kernel refuses a duty cycle longer than the period. When the period
//! is known to this handle, such a request is rejected here before any
//! write; when it is not (nothing set through this handle yet), the value
//! is passed through and the kernel decides.

use std::path::{Path, PathBuf};

use super::{CachedAttr, ExportControl};
use crate::hw_trait::{ExportState, Exportable, HalError, IoContext, PwmOutput, PwmState, Result};
use crate::tracing::prelude::*;
use crate::transport::{Access, Attribute, HostSysfs, SysfsBackend, SysfsPaths};

/// One PWM channel of a PWM chip.
pub struct Pwm<B: SysfsBackend = HostSysfs> {
    chip: u32,
    channel: u32,
    dir_path: PathBuf,
    period_ns: Option<u64>,
    duty_ns: u64,
    state: PwmState,
    export_state: ExportState,
    control: ExportControl,
    duty_cycle: CachedAttr<B::Attr>,
    backend: B,
}

impl Pwm<HostSysfs> {
    /// Create a handle for `channel` of `pwmchip{chip}` on the host's sysfs.
    /// No I/O is performed.
    pub fn new(chip: u32, channel: u32) -> Self {
        Self::with_backend(chip, channel, HostSysfs, &SysfsPaths::default())
    }
}

impl<B: SysfsBackend> Pwm<B> {
    pub fn with_backend(chip: u32, channel: u32, backend: B, paths: &SysfsPaths) -> Self {
        let dir_path = paths.pwm_dir(chip, channel);
        Self {
            chip,
            channel,
            duty_cycle: CachedAttr::new(dir_path.join("duty_cycle"), Access::Write),
            dir_path,
            period_ns: None,
            duty_ns: 0,
            state: PwmState::Disabled,
            export_state: ExportState::Unexported,
            control: ExportControl::new(
                format!("pwmchip{chip}/pwm{channel}"),
                channel,
                paths.pwm_dir(chip, channel),
                paths.pwm_export(chip),
                paths.pwm_unexport(chip),
            ),
            backend,
        }
    }

    pub fn chip(&self) -> u32 {
        self.chip
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// The channel's sysfs directory (present only while exported).
    pub fn path(&self) -> &Path {
        &self.dir_path
    }

    /// Period last set through this handle, if any.
    pub fn period(&self) -> Option<u64> {
        self.period_ns
    }

    /// Duty cycle last written through this handle.
    pub fn duty_cycle(&self) -> u64 {
        self.duty_ns
    }

    pub fn state(&self) -> PwmState {
        self.state
    }

    pub fn export_state(&self) -> ExportState {
        self.export_state
    }

    /// Whether the kernel currently shows the channel as exported.
    pub fn is_exported(&self) -> bool {
        self.backend.exists(&self.dir_path)
    }

    /// Export or unexport the channel. Not idempotent, as for GPIO.
    ///
    /// Once the channel is unexported the cached period, duty cycle and
    /// state are forgotten, so a later export starts without them.
    pub fn set_export_state(&mut self, state: ExportState) -> Result<()> {
        let result = self.control.request(&self.backend, state);
        match &result {
            Ok(()) | Err(HalError::State { .. }) => self.export_state = state,
            Err(_) => {}
        }
        if state == ExportState::Unexported {
            self.duty_cycle.release();
            if self.export_state == ExportState::Unexported {
                // The kernel resets the channel when it goes away
                self.period_ns = None;
                self.duty_ns = 0;
                self.state = PwmState::Disabled;
            }
        }
        result
    }

    /// Set the period in nanoseconds.
    ///
    /// A period shorter than the duty cycle last written through this handle
    /// is rejected; lower the duty cycle first.
    pub fn set_period(&mut self, period_ns: u64) -> Result<()> {
        if period_ns < self.duty_ns {
            return Err(HalError::InvalidParameter(format!(
                "period {}ns is shorter than duty cycle {}ns",
                period_ns, self.duty_ns
            )));
        }
        let path = self.dir_path.join("period");
        self.backend
            .write_attr(&path, period_ns.to_string().as_bytes())
            .context("write", &path)?;
        debug!(chip = self.chip, channel = self.channel, period_ns, "PWM period set");
        self.period_ns = Some(period_ns);
        Ok(())
    }

    /// Enable or disable the output.
    pub fn set_state(&mut self, state: PwmState) -> Result<()> {
        let path = self.dir_path.join("enable");
        self.backend
            .write_attr(&path, state.as_sysfs().as_bytes())
            .context("write", &path)?;
        debug!(chip = self.chip, channel = self.channel, state = ?state, "PWM state set");
        self.state = state;
        Ok(())
    }

    /// Set the duty cycle as a percentage of the period.
    ///
    /// The duty cycle written is `round(percentage / 100 * period)`. If no
    /// period has been set through this handle that is zero, whatever the
    /// percentage.
    pub fn write(&mut self, percentage: f64) -> Result<()> {
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(HalError::InvalidParameter(format!(
                "duty cycle percentage {} is outside 0-100",
                percentage
            )));
        }
        let duty_ns = match self.period_ns {
            Some(period_ns) => duty_from_percentage(percentage, period_ns),
            None => {
                warn!(
                    chip = self.chip,
                    channel = self.channel,
                    "PWM period not set, writing zero duty cycle"
                );
                0
            }
        };
        self.store_duty(duty_ns)
    }

    /// Set the duty cycle in nanoseconds.
    pub fn set_duty_cycle(&mut self, duty_ns: u64) -> Result<()> {
        if let Some(period_ns) = self.period_ns {
            if duty_ns > period_ns {
                return Err(HalError::InvalidParameter(format!(
                    "duty cycle {}ns exceeds period {}ns",
                    duty_ns, period_ns
                )));
            }
        }
        self.store_duty(duty_ns)
    }

    fn store_duty(&mut self, duty_ns: u64) -> Result<()> {
        let text = duty_ns.to_string();
        self.duty_cycle
            .with(&self.backend, "write", |attr| attr.store(text.as_bytes()))?;
        trace!(chip = self.chip, channel = self.channel, duty_ns, "PWM duty cycle set");
        self.duty_ns = duty_ns;
        Ok(())
    }
}

/// Duty cycle in nanoseconds for a percentage already known to be in 0-100.
fn duty_from_percentage(percentage: f64, period_ns: u64) -> u64 {
    ((percentage / 100.0) * period_ns as f64).round() as u64
}

impl<B: SysfsBackend> PwmOutput for Pwm<B> {
    fn set_period(&mut self, period_ns: u64) -> Result<()> {
        Pwm::set_period(self, period_ns)
    }

    fn set_state(&mut self, state: PwmState) -> Result<()> {
        Pwm::set_state(self, state)
    }

    fn write(&mut self, percentage: f64) -> Result<()> {
        Pwm::write(self, percentage)
    }

    fn set_duty_cycle(&mut self, duty_ns: u64) -> Result<()> {
        Pwm::set_duty_cycle(self, duty_ns)
    }
}

impl<B: SysfsBackend> Exportable for Pwm<B> {
    fn set_export_state(&mut self, state: ExportState) -> Result<()> {
        Pwm::set_export_state(self, state)
    }

    fn export_state(&self) -> ExportState {
        self.export_state
    }
}

impl<B: SysfsBackend> std::fmt::Debug for Pwm<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pwm")
            .field("chip", &self.chip)
            .field("channel", &self.channel)
            .field("period_ns", &self.period_ns)
            .field("duty_ns", &self.duty_ns)
            .field("state", &self.state)
            .field("export_state", &self.export_state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockSysfs;
    use test_case::test_case;

    const PERIOD: u64 = 500_000;

    fn exported(chip: u32, channel: u32) -> (MockSysfs, Pwm<MockSysfs>, PathBuf) {
        let paths = SysfsPaths::default();
        let fs = MockSysfs::new();
        fs.add_pwm_chip(&paths, chip);
        let mut pwm = Pwm::with_backend(chip, channel, fs.clone(), &paths);
        pwm.set_export_state(ExportState::Exported).unwrap();
        let dir = paths.pwm_dir(chip, channel);
        (fs, pwm, dir)
    }

    #[test]
    fn test_new_defaults() {
        let pwm = Pwm::with_backend(0, 1, MockSysfs::new(), &SysfsPaths::default());
        assert_eq!(pwm.state(), PwmState::Disabled);
        assert_eq!(pwm.duty_cycle(), 0);
        assert_eq!(pwm.period(), None);
        assert_eq!(pwm.export_state(), ExportState::Unexported);
        assert_eq!(pwm.path(), Path::new("/sys/class/pwm/pwmchip0/pwm1"));
    }

    #[test]
    fn test_export_writes_channel_to_chip() {
        let (fs, pwm, dir) = exported(1, 0);
        assert_eq!(fs.writes_to("/sys/class/pwm/pwmchip1/export"), vec!["0"]);
        assert!(fs.exists(&dir));
        assert!(pwm.is_exported());
    }

    #[test]
    fn test_export_twice_is_state_error() {
        let (_fs, mut pwm, _) = exported(0, 0);
        let err = pwm.set_export_state(ExportState::Exported).unwrap_err();
        assert!(matches!(err, HalError::State { state: ExportState::Exported, .. }));
    }

    #[test]
    fn test_unexport_unexported_is_state_error() {
        let (_fs, mut pwm, _) = exported(0, 0);
        pwm.set_export_state(ExportState::Unexported).unwrap();
        let err = pwm.set_export_state(ExportState::Unexported).unwrap_err();
        assert!(matches!(err, HalError::State { state: ExportState::Unexported, .. }));
        assert_eq!(pwm.export_state(), ExportState::Unexported);
    }

    #[test]
    fn test_export_of_driver_held_channel_is_io_error() {
        let paths = SysfsPaths::default();
        let fs = MockSysfs::new();
        fs.add_pwm_chip(&paths, 0);
        fs.hold_by_driver(paths.pwm_dir(0, 2));
        let mut pwm = Pwm::with_backend(0, 2, fs, &paths);

        let err = pwm.set_export_state(ExportState::Exported).unwrap_err();
        assert!(matches!(err, HalError::Io { op: "export", .. }));
        assert_eq!(pwm.export_state(), ExportState::Unexported);
        assert!(!pwm.is_exported());
    }

    #[test]
    fn test_unexport_forgets_channel_settings() {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        pwm.set_duty_cycle(400_000).unwrap();
        pwm.set_state(PwmState::Enabled).unwrap();

        pwm.set_export_state(ExportState::Unexported).unwrap();
        assert_eq!(pwm.period(), None);
        assert_eq!(pwm.duty_cycle(), 0);
        assert_eq!(pwm.state(), PwmState::Disabled);

        // A shorter period is accepted after a fresh export
        pwm.set_export_state(ExportState::Exported).unwrap();
        pwm.set_period(300_000).unwrap();
        assert_eq!(fs.writes_to(dir.join("period")), vec!["500000", "300000"]);
    }

    #[test]
    fn test_exportable_trait_object() {
        let paths = SysfsPaths::default();
        let fs = MockSysfs::new();
        fs.add_pwm_chip(&paths, 0);
        fs.add_gpio_controller(&paths);
        let mut pwm = Pwm::with_backend(0, 1, fs.clone(), &paths);
        let mut gpio = crate::peripheral::Gpio::with_backend(60, fs, &paths);

        let mut resources: Vec<&mut dyn Exportable> = vec![&mut pwm, &mut gpio];
        for resource in resources.iter_mut() {
            resource.set_export_state(ExportState::Exported).unwrap();
            assert_eq!(resource.export_state(), ExportState::Exported);
        }
        assert!(pwm.is_exported());
        assert!(gpio.is_exported());
    }

    #[test]
    fn test_period_and_state_encoding() {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        pwm.set_state(PwmState::Enabled).unwrap();
        pwm.set_state(PwmState::Disabled).unwrap();

        assert_eq!(fs.writes_to(dir.join("period")), vec!["500000"]);
        assert_eq!(fs.writes_to(dir.join("enable")), vec!["1", "0"]);
        assert_eq!(pwm.period(), Some(PERIOD));
        assert_eq!(pwm.state(), PwmState::Disabled);
    }

    #[test_case(0.0, 0; "zero")]
    #[test_case(100.0, PERIOD; "full")]
    #[test_case(50.0, 250_000; "half")]
    #[test_case(33.3, 166_500; "fraction")]
    #[test_case(0.00011, 1; "rounds up")]
    #[test_case(0.00009, 0; "rounds down")]
    fn test_percentage_to_duty_cycle(percentage: f64, expected: u64) {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        pwm.write(percentage).unwrap();

        assert_eq!(pwm.duty_cycle(), expected);
        assert_eq!(fs.writes_to(dir.join("duty_cycle")), vec![expected.to_string()]);
    }

    #[test]
    fn test_write_before_period_yields_zero() {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.write(75.0).unwrap();
        assert_eq!(pwm.duty_cycle(), 0);
        assert_eq!(fs.writes_to(dir.join("duty_cycle")), vec!["0"]);
    }

    #[test_case(-0.1; "negative")]
    #[test_case(100.5; "above full")]
    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "infinite")]
    fn test_write_rejects_bad_percentage(percentage: f64) {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        assert!(matches!(pwm.write(percentage), Err(HalError::InvalidParameter(_))));
        assert!(fs.writes_to(dir.join("duty_cycle")).is_empty());
    }

    #[test]
    fn test_duty_cycle_above_period_rejected() {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();

        pwm.set_duty_cycle(PERIOD).unwrap();
        let err = pwm.set_duty_cycle(PERIOD + 1).unwrap_err();
        assert!(matches!(err, HalError::InvalidParameter(_)));
        assert_eq!(pwm.duty_cycle(), PERIOD);
        assert_eq!(fs.writes_to(dir.join("duty_cycle")), vec!["500000"]);
    }

    #[test]
    fn test_duty_cycle_passes_through_without_period() {
        let (fs, mut pwm, dir) = exported(0, 0);
        pwm.set_duty_cycle(1_000_000).unwrap();
        assert_eq!(fs.writes_to(dir.join("duty_cycle")), vec!["1000000"]);
        assert_eq!(pwm.duty_cycle(), 1_000_000);
    }

    #[test]
    fn test_period_below_duty_cycle_rejected() {
        let (_fs, mut pwm, _) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        pwm.set_duty_cycle(400_000).unwrap();
        assert!(matches!(pwm.set_period(300_000), Err(HalError::InvalidParameter(_))));
        assert_eq!(pwm.period(), Some(PERIOD));
    }

    #[test]
    fn test_duty_descriptor_reused_and_released() {
        let (_fs, mut pwm, _) = exported(0, 0);
        pwm.set_period(PERIOD).unwrap();
        pwm.write(10.0).unwrap();
        pwm.write(20.0).unwrap();
        assert!(pwm.duty_cycle.is_open());

        pwm.set_export_state(ExportState::Unexported).unwrap();
        assert!(!pwm.duty_cycle.is_open());
    }

    #[test]
    fn test_unexported_channel_write_fails() {
        let mut pwm = Pwm::with_backend(0, 0, MockSysfs::new(), &SysfsPaths::default());
        assert!(matches!(pwm.set_period(PERIOD), Err(HalError::Io { .. })));
        assert!(matches!(pwm.set_duty_cycle(0), Err(HalError::Io { op: "open", .. })));
    }
}
