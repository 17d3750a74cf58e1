//! Statistics reducer
//!
//! Scrapes scenario and step counts out of runner summaries such as
//! `3 scenarios (1 failed, 2 passed)`. This is a best-effort text match:
//! lines that do not look like a summary are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::utils::{format_duration, Timer};

static COUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+) (scenario|step)s?").expect("count regex is valid"));
static PASSED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) passed").expect("passed regex is valid"));

/// Kinds of entities counted in runner summaries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Scenario,
    Step,
}

impl EntityKind {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "scenario" => Some(EntityKind::Scenario),
            "step" => Some(EntityKind::Step),
            _ => None,
        }
    }
}

/// Total and passed count for one entity kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: u64,
    pub passed: u64,
}

impl Tally {
    pub fn failed(&self) -> u64 {
        self.total.saturating_sub(self.passed)
    }
}

/// Aggregated counts over all captured output
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub scenarios: Tally,
    pub steps: Tally,
    /// Runs that completed
    pub runs: usize,
    /// Runs whose process exited non-zero or was killed by a signal
    pub failed_runs: usize,
    #[serde(rename = "runtime", serialize_with = "serialize_runtime")]
    pub elapsed: Duration,
}

impl Statistics {
    /// Reduce the ledger lines, measuring elapsed time from `timer`
    pub fn compute<S: AsRef<str>>(lines: &[S], timer: &Timer) -> Self {
        Self::from_lines(lines, timer.elapsed())
    }

    /// Reduce the ledger lines with a known elapsed time
    pub fn from_lines<S: AsRef<str>>(lines: &[S], elapsed: Duration) -> Self {
        let mut stats = Self {
            elapsed,
            ..Default::default()
        };

        for line in lines {
            stats.record(line.as_ref());
        }

        stats
    }

    /// Attach the process outcomes of the runs behind the ledger
    pub fn with_runs(mut self, runs: usize, failed_runs: usize) -> Self {
        self.runs = runs;
        self.failed_runs = failed_runs;
        self
    }

    fn record(&mut self, line: &str) {
        let Some(captures) = COUNT_REGEX.captures(line) else {
            return;
        };
        let (Ok(count), Some(kind)) = (
            captures[1].parse::<u64>(),
            EntityKind::from_word(&captures[2]),
        ) else {
            return;
        };

        let tally = self.tally_mut(kind);
        tally.total = tally.total.saturating_add(count);

        if let Some(passed) = PASSED_REGEX
            .captures(line)
            .and_then(|c| c[1].parse::<u64>().ok())
        {
            tally.passed = tally.passed.saturating_add(passed);
        }
    }

    fn tally_mut(&mut self, kind: EntityKind) -> &mut Tally {
        match kind {
            EntityKind::Scenario => &mut self.scenarios,
            EntityKind::Step => &mut self.steps,
        }
    }

    /// Every run exited cleanly and every counted scenario and step passed.
    ///
    /// Runs that printed no scenario summary at all do not pass.
    pub fn all_passed(&self) -> bool {
        let nothing_counted = self.runs > 0 && self.scenarios.total == 0;
        self.failed_runs == 0
            && !nothing_counted
            && self.scenarios.failed() == 0
            && self.steps.failed() == 0
    }

    pub fn runtime(&self) -> String {
        format_duration(self.elapsed)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} scenarios ({} passed)",
            self.scenarios.total, self.scenarios.passed
        )?;
        writeln!(f, "{} steps ({} passed)", self.steps.total, self.steps.passed)?;
        write!(f, "runtime: {}", self.runtime())
    }
}

fn serialize_runtime<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(lines: &[&str]) -> Statistics {
        Statistics::from_lines(lines, Duration::ZERO)
    }

    #[test]
    fn test_summary_lines() {
        let stats = stats(&["3 scenarios (2 passed)", "10 steps (10 passed)", "garbage line"]);
        assert_eq!(stats.scenarios, Tally { total: 3, passed: 2 });
        assert_eq!(stats.steps, Tally { total: 10, passed: 10 });
    }

    #[test]
    fn test_missing_passed_fragment() {
        let stats = stats(&["1 scenario", "5 steps (5 passed)"]);
        assert_eq!(stats.scenarios, Tally { total: 1, passed: 0 });
        assert_eq!(stats.steps, Tally { total: 5, passed: 5 });
        assert!(!stats.all_passed());
    }

    #[test]
    fn test_mixed_results_accumulate() {
        let stats = stats(&[
            "Feature: Login",
            "2 scenarios (1 failed, 1 passed)",
            "7 steps (1 failed, 2 skipped, 4 passed)",
            "0m1.234s",
            "1 scenario (1 passed)",
            "3 steps (3 passed)",
        ]);
        assert_eq!(stats.scenarios, Tally { total: 3, passed: 2 });
        assert_eq!(stats.steps, Tally { total: 10, passed: 7 });
        assert_eq!(stats.scenarios.failed(), 1);
    }

    #[test]
    fn test_counts_must_start_the_line() {
        let stats = stats(&[
            "  3 scenarios (3 passed)",
            "Ran 4 steps (4 passed)",
            "3 scenarioss",
        ]);
        assert_eq!(stats.scenarios, Tally { total: 3, passed: 0 });
        assert_eq!(stats.steps, Tally::default());
    }

    #[test]
    fn test_overflowing_count_is_ignored() {
        let stats = stats(&["99999999999999999999999 scenarios (1 passed)"]);
        assert_eq!(stats.scenarios, Tally::default());
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let lines = vec!["2 scenarios (2 passed)".to_string(), "4 steps (3 passed)".to_string()];
        let first = Statistics::from_lines(&lines, Duration::from_secs(1));
        let second = Statistics::from_lines(&lines, Duration::from_secs(1));
        assert_eq!(first, second);
    }

    #[test]
    fn test_display() {
        let stats = Statistics::from_lines(
            &["2 scenarios (1 passed)", "6 steps (5 passed)"],
            Duration::from_millis(61_500),
        );
        assert_eq!(
            stats.to_string(),
            "2 scenarios (1 passed)\n6 steps (5 passed)\nruntime: 0:01:01.500000"
        );
    }

    #[test]
    fn test_serialize_runtime() {
        let stats = Statistics::from_lines(&["1 scenario (1 passed)"], Duration::from_secs(2));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["runtime"], "0:00:02.000000");
        assert_eq!(json["scenarios"]["passed"], 1);
        assert!(stats.all_passed());
    }

    #[test]
    fn test_failed_runs_are_not_passed() {
        let stats = stats(&["1 scenario (1 passed)", "2 steps (2 passed)"]).with_runs(2, 1);
        assert!(!stats.all_passed());

        let stats = stats.with_runs(2, 0);
        assert!(stats.all_passed());
    }

    #[test]
    fn test_runs_without_any_summary_are_not_passed() {
        let stats = stats(&["cucumber: LoadError"]).with_runs(3, 0);
        assert_eq!(stats.scenarios, Tally::default());
        assert!(!stats.all_passed());
    }

    #[test]
    fn test_empty_ledger() {
        let stats = Statistics::compute::<String>(&[], &Timer::start());
        assert_eq!(stats.scenarios, Tally::default());
        assert!(stats.all_passed());
    }
}
