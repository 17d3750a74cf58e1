//! Work item model
//!
//! A work item is the target handed to a single runner invocation: either a
//! whole feature file or a `path:line` scenario reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One unit of dispatchable work
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(String);

impl WorkItem {
    /// Whole feature file
    pub fn feature(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().display().to_string())
    }

    /// Single scenario starting at `line` (1-indexed)
    pub fn scenario(path: impl AsRef<Path>, line: usize) -> Self {
        Self(format!("{}:{}", path.as_ref().display(), line))
    }

    /// Wrap a raw command line target
    pub fn parse(target: &str) -> Self {
        Self(target.to_string())
    }

    /// Split a scenario reference into its path and line
    pub fn scenario_ref(&self) -> Option<(&str, usize)> {
        let (path, line) = self.0.rsplit_once(':')?;
        if path.is_empty() || line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        line.parse().ok().map(|line| (path, line))
    }

    pub fn is_scenario(&self) -> bool {
        self.scenario_ref().is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for WorkItem {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_formatting() {
        let item = WorkItem::scenario("features/login.feature", 12);
        assert_eq!(item.as_str(), "features/login.feature:12");
        assert_eq!(item.scenario_ref(), Some(("features/login.feature", 12)));
    }

    #[test]
    fn test_feature_is_not_scenario() {
        let item = WorkItem::feature("features/login.feature");
        assert!(!item.is_scenario());
        assert_eq!(item.to_string(), "features/login.feature");
    }

    #[test]
    fn test_parse_targets() {
        assert!(WorkItem::parse("a.feature:3").is_scenario());
        assert!(!WorkItem::parse("a.feature:").is_scenario());
        assert!(!WorkItem::parse(":3").is_scenario());
        assert!(!WorkItem::parse("C:/features/a.feature").is_scenario());
    }
}
