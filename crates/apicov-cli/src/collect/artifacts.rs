//! Artifact directory housekeeping and the zero-coverage report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;

use apicov_core::report::{self, JUNIT_REPORT_FILE, TOTAL_REPORT_FILE};
use apicov_core::{CoveragePercentages, ResourceKey};

use super::CollectError;

/// File name of a kind's HTML report.
pub fn resource_report_file(key: &ResourceKey) -> String {
    format!("{}.html", key.report_file_stem())
}

/// Remove JUnit summaries anywhere under `dir`, and HTML reports this tool
/// wrote on a previous run at its top level. Returns how many files went.
pub fn prune_stale(dir: &Path, kinds: &[ResourceKey]) -> Result<usize, CollectError> {
    let junit = Regex::new(r"^junit_.*\.xml$")?;
    let mut reports: HashSet<String> = kinds.iter().map(resource_report_file).collect();
    reports.insert(TOTAL_REPORT_FILE.to_string());

    let walker = WalkBuilder::new(dir).standard_filters(false).build();

    let mut removed = 0;
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let stale = junit.is_match(&name) || (entry.depth() == 1 && reports.contains(&*name));
        if !stale {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed stale artifact");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale artifact");
            }
        }
    }
    Ok(removed)
}

/// Write a JUnit summary with every kind, and the aggregate, at 0%.
pub fn write_build_failed(dir: &Path, kinds: &[ResourceKey]) -> Result<PathBuf, CollectError> {
    let percentages = CoveragePercentages::zeroed(kinds.iter().map(|key| key.kind.as_str()));
    let path = report::write_report(dir, JUNIT_REPORT_FILE, &report::render_junit(&percentages))?;
    Ok(path)
}
