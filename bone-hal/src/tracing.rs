//! Logging for the peripheral drivers.
//!
//! The drivers only emit events; they never install a subscriber. A program
//! built on this crate calls one of the `init_*` functions once at startup
//! if it has no subscriber of its own.
//!
//! Modules use `use crate::tracing::prelude::*` for the `trace!()`,
//! `debug!()`, `info!()`, `warn!()`, and `error!()` macros.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// If running under systemd, use journald; otherwise fall back to stdout.
/// Does nothing if a global subscriber is already installed.
pub fn init_journald_or_stdout() {
    if env::var("JOURNAL_STREAM").is_ok() {
        match tracing_journald::layer() {
            Ok(layer) => {
                let _ = tracing_subscriber::registry().with(layer).try_init();
            }
            Err(e) => {
                init_stdout();
                error!(error = %e, "Failed to initialize journald logging, using stdout");
            }
        }
    } else {
        init_stdout();
    }
}

/// Log to stdout, filtering according to `RUST_LOG` with INFO as the
/// default level.
pub fn init_stdout() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_target(true),
        )
        .try_init();
}

// Local time to the nearest second; the default timer prints long UTC
// timestamps.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_stdout();
        init_stdout();
        info!("still logging");
    }

    #[test]
    fn test_local_timer_format() {
        let mut out = String::new();
        LocalTimer.format_time(&mut Writer::new(&mut out)).unwrap();
        // hh:mm:ss
        assert_eq!(out.len(), 8);
        assert_eq!(out.as_bytes()[2], b':');
    }
}
