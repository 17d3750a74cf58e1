//! Work discovery
//!
//! Finds feature files and the scenarios inside them.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::WorkItem;

/// Extension of feature definition files
const FEATURE_EXTENSION: &str = "feature";

static SCENARIO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Scenario").expect("scenario regex is valid"));

/// Feature files directly inside `dir`, sorted by path
pub fn features(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read feature directory: {}", dir.display()))?;

    let mut features = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|e| e == FEATURE_EXTENSION) {
            features.push(path);
        }
    }

    features.sort();
    Ok(features)
}

/// One `path:line` work item per scenario heading in the feature file
pub fn scenarios(feature: impl AsRef<Path>) -> Result<Vec<WorkItem>> {
    let feature = feature.as_ref();
    let content = std::fs::read_to_string(feature)
        .with_context(|| format!("Failed to read feature file: {}", feature.display()))?;

    Ok(scenarios_in(feature, &content))
}

/// Scenario references for already loaded feature text
pub fn scenarios_in(feature: &Path, content: &str) -> Vec<WorkItem> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| SCENARIO_REGEX.is_match(line))
        .map(|(index, _)| WorkItem::scenario(feature, index + 1))
        .collect()
}

/// Turn command line targets into the work items to dispatch.
///
/// Without targets every feature in `features_dir` is used. Directories
/// expand to their features, scenario references are passed through, and
/// feature files are split into scenarios unless `batch_by_file` is set.
pub fn collect_work_items(
    targets: &[String],
    features_dir: &Path,
    batch_by_file: bool,
) -> Result<Vec<WorkItem>> {
    let mut items = Vec::new();

    if targets.is_empty() {
        for feature in features(features_dir)? {
            items.extend(feature_items(&feature, batch_by_file)?);
        }
        return Ok(items);
    }

    for target in targets {
        let item = WorkItem::parse(target);
        let path = Path::new(target);

        if item.is_scenario() {
            items.push(item);
        } else if path.is_dir() {
            for feature in features(path)? {
                items.extend(feature_items(&feature, batch_by_file)?);
            }
        } else {
            items.extend(feature_items(path, batch_by_file)?);
        }
    }

    Ok(items)
}

fn feature_items(feature: &Path, batch_by_file: bool) -> Result<Vec<WorkItem>> {
    if batch_by_file {
        return Ok(vec![WorkItem::feature(feature)]);
    }

    let found = scenarios(feature)?;
    debug!("{}: {} scenario(s)", feature.display(), found.len());
    Ok(found)
}
