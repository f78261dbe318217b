//! # Logging
//!
//! Thin helpers over the `log` facade with `env_logger` as backend, plus a
//! rate limiter for the warnings a noisy serial line can produce.

use log::{debug, error, info, log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Initializes the logger with the `env_logger` crate.
///
/// Verbosity is read from `RUST_LOG` and defaults to `info`.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// Logs raw line bytes as hex, for lines that cannot be shown as text.
pub fn log_line_hex(label: &str, raw: &[u8]) {
    if log_enabled!(Level::Debug) {
        debug!("{label} ({} bytes): {}", raw.len(), hex::encode(raw));
    }
}

/// Throttling structure for rate-limiting log messages
///
/// A meter wired through a poor optocoupler can emit hundreds of corrupted
/// lines per minute. The throttle lets the first `cap` messages of each
/// window through and swallows the rest.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    cap: u32,
    count: u32,
    suppressed: u64,
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    ///
    /// # Examples
    /// ```rust
    /// use std::time::Duration;
    /// use teleinfo_rs::logging::LogThrottle;
    ///
    /// // Allow 5 messages per minute
    /// let mut throttle = LogThrottle::new(Duration::from_secs(60), 5);
    /// assert!(throttle.allow());
    /// ```
    pub fn new(window: Duration, cap: u32) -> Self {
        Self {
            window,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Returns `true` if the message should be logged. The counter resets
    /// once the window has expired.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0) > self.window {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Total number of messages swallowed since creation.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), 10)
    }
}
