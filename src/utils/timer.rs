//! Timer utilities
//!
//! Provides timing and duration formatting helpers.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Simple timer for measuring elapsed time
#[derive(Clone, Debug)]
pub struct Timer {
    start: Instant,
    started_at: DateTime<Utc>,
}

impl Timer {
    /// Create and start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Wall clock time the timer was started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Format a duration as `H:MM:SS.ffffff`, prefixed with `N day(s), `
/// from 24 hours on
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let clock = format!(
        "{}:{:02}:{:02}.{:06}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_micros()
    );

    match secs / 86_400 {
        0 => clock,
        1 => format!("1 day, {clock}"),
        days => format!("{days} days, {clock}"),
    }
}
