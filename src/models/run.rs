//! Run report model

use serde::Serialize;
use std::fmt;

use super::WorkItem;

/// Outcome of one runner invocation
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    /// 1-based launch number
    pub ordinal: usize,
    pub item: WorkItem,
    pub offset: usize,
    pub port: u16,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub lines: Vec<String>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.succeeded() { "✓" } else { "✗" };
        write!(
            f,
            "{} #{} {} [port {}, {}ms]",
            symbol, self.ordinal, self.item, self.port, self.duration_ms
        )?;
        match self.exit_code {
            Some(0) => Ok(()),
            Some(code) => write!(f, " - exit code {code}"),
            None => write!(f, " - terminated by signal"),
        }
    }
}
