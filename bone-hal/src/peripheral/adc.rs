//! IIO ADC channel reader.
//!
//! Each channel's raw sample is exposed as a newline-terminated decimal in
//! `iio:device{D}/in_voltage{N}_raw`. The attribute is reopened for every
//! read; IIO drivers trigger a conversion on each open-and-read.

use std::path::{Path, PathBuf};

use crate::hw_trait::{AdcInput, HalError, IoContext, Result};
use crate::tracing::prelude::*;
use crate::transport::{Access, Attribute, HostSysfs, SysfsBackend, SysfsPaths};

/// One ADC input with a caller-chosen scaling factor.
#[derive(Debug, Clone)]
pub struct Adc<B: SysfsBackend = HostSysfs> {
    channel: u32,
    scaling_factor: f64,
    path: PathBuf,
    backend: B,
}

impl Adc<HostSysfs> {
    /// Create a reader for `channel` on the host's first IIO device.
    pub fn new(channel: u32, scaling_factor: f64) -> Self {
        Self::with_backend(channel, scaling_factor, HostSysfs, &SysfsPaths::default())
    }
}

impl<B: SysfsBackend> Adc<B> {
    pub fn with_backend(channel: u32, scaling_factor: f64, backend: B, paths: &SysfsPaths) -> Self {
        Self {
            channel,
            scaling_factor,
            path: paths.adc_raw(channel),
            backend,
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw converter value.
    pub fn read(&self) -> Result<u16> {
        let mut attr = self.backend.open(&self.path, Access::Read).context("open", &self.path)?;
        let mut buf = [0u8; 16];
        let n = attr.show(&mut buf).context("read", &self.path)?;

        let raw = parse_raw(&buf[..n]).map_err(|reason| HalError::Parse {
            path: self.path.clone(),
            reason,
        })?;
        trace!(channel = self.channel, raw, "ADC read");
        Ok(raw)
    }

    /// Read the raw value multiplied by the scaling factor.
    pub fn scaled_read(&self) -> Result<f64> {
        Ok(f64::from(self.read()?) * self.scaling_factor)
    }
}

/// Decode `<digits>\n` into a 16-bit value.
fn parse_raw(bytes: &[u8]) -> std::result::Result<u16, String> {
    let digits = match bytes.split_last() {
        Some((b'\n', digits)) => digits,
        Some(_) => return Err("missing trailing newline".to_string()),
        None => return Err("empty read".to_string()),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(format!(
            "not an unsigned decimal: {:?}",
            String::from_utf8_lossy(digits)
        ));
    }
    let text = std::str::from_utf8(digits).map_err(|e| e.to_string())?;
    text.parse().map_err(|_| format!("{} does not fit in 16 bits", text))
}

impl<B: SysfsBackend> AdcInput for Adc<B> {
    fn read(&self) -> Result<u16> {
        Adc::read(self)
    }

    fn scaled_read(&self) -> Result<f64> {
        Adc::scaled_read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockSysfs;
    use test_case::test_case;

    fn adc_with(channel: u32, factor: f64, content: &str) -> Adc<MockSysfs> {
        let paths = SysfsPaths::default();
        let fs = MockSysfs::new();
        fs.add_file(paths.adc_raw(channel), content);
        Adc::with_backend(channel, factor, fs, &paths)
    }

    #[test]
    fn test_channel_four_scaled() {
        let factor = 1.8 / 4095.0;
        let adc = adc_with(4, factor, "2048\n");

        assert_eq!(adc.read().unwrap(), 2048);
        let scaled = adc.scaled_read().unwrap();
        assert!((scaled - 2048.0 * factor).abs() < 1e-12);
        assert_eq!(
            adc.path(),
            Path::new("/sys/bus/iio/devices/iio:device0/in_voltage4_raw")
        );
    }

    #[test]
    fn test_scaled_read_matches_raw_times_factor() {
        for (raw, factor) in [(0u16, 0.5), (1, 1.0), (4095, 1.8 / 4095.0), (65535, -2.0)] {
            let adc = adc_with(0, factor, &format!("{raw}\n"));
            let expected = f64::from(adc.read().unwrap()) * factor;
            assert!((adc.scaled_read().unwrap() - expected).abs() <= f64::EPSILON * expected.abs());
        }
    }

    #[test]
    fn test_reads_every_time() {
        let paths = SysfsPaths::default();
        let fs = MockSysfs::new();
        fs.add_file(paths.adc_raw(1), "10\n");
        let adc = Adc::with_backend(1, 1.0, fs.clone(), &paths);

        assert_eq!(adc.read().unwrap(), 10);
        fs.set_content(paths.adc_raw(1), "11\n");
        assert_eq!(adc.read().unwrap(), 11);
    }

    #[test_case(b"0\n", 0; "zero")]
    #[test_case(b"65535\n", 65535; "max")]
    #[test_case(b"0042\n", 42; "leading zeros")]
    fn test_parse_valid(input: &[u8], expected: u16) {
        assert_eq!(parse_raw(input), Ok(expected));
    }

    #[test_case(b""; "empty")]
    #[test_case(b"\n"; "newline only")]
    #[test_case(b"123"; "no newline")]
    #[test_case(b"65536\n"; "overflow")]
    #[test_case(b"-1\n"; "negative")]
    #[test_case(b"+1\n"; "sign")]
    #[test_case(b"12a\n"; "non digit")]
    #[test_case(b" 12\n"; "whitespace")]
    fn test_parse_invalid(input: &[u8]) {
        assert!(parse_raw(input).is_err());
    }

    #[test]
    fn test_read_reports_parse_error_with_path() {
        let adc = adc_with(2, 1.0, "garbage");
        match adc.read() {
            Err(HalError::Parse { path, .. }) => assert_eq!(path, adc.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_channel_is_io_error() {
        let adc = Adc::with_backend(7, 1.0, MockSysfs::new(), &SysfsPaths::default());
        assert!(matches!(adc.read(), Err(HalError::Io { op: "open", .. })));
    }
}
