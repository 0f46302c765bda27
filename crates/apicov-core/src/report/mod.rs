//! Report rendering: per-kind and total HTML pages, and the JUnit XML
//! summary consumed by CI dashboards.
//!
//! Rendering is a pure function of its input. Templates are embedded at
//! compile time using `include_str!`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::coverage::{CoveragePercentages, CoverageValues, ResourceCoverage, TypeCoverage};

// Embed template files at compile time
const RESOURCE_TEMPLATE: &str = include_str!("templates/resource.html");
const TOTAL_TEMPLATE: &str = include_str!("templates/total.html");
const STYLES: &str = include_str!("templates/styles.css");

/// File name of the aggregate HTML report.
pub const TOTAL_REPORT_FILE: &str = "totalcoverage.html";

/// File name of the JUnit summary.
pub const JUNIT_REPORT_FILE: &str = "junit_apicoverage.xml";

/// Name of the per-kind property in the JUnit summary.
pub const JUNIT_COVERAGE_PROPERTY: &str = "coverage";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render one kind's coverage as an HTML page.
pub fn render_resource_html(coverage: &ResourceCoverage) -> String {
    let title = format!("API Coverage: {}", coverage.resource);

    let mut types = String::new();
    for type_coverage in &coverage.types {
        render_type(&mut types, type_coverage);
    }

    RESOURCE_TEMPLATE
        .replace("{{TITLE}}", &html_escape(&title))
        .replace("{{STYLES}}", STYLES)
        .replace("{{SUMMARY}}", &summary_table(&coverage.values))
        .replace("{{TYPES}}", &types)
}

/// Render aggregate coverage values as an HTML page.
pub fn render_total_html(values: &CoverageValues) -> String {
    TOTAL_TEMPLATE
        .replace("{{STYLES}}", STYLES)
        .replace("{{SUMMARY}}", &summary_table(values))
}

/// Render per-kind percentages as JUnit XML: one test case per kind, each
/// carrying a `coverage` property with two decimals.
pub fn render_junit(percentages: &CoveragePercentages) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<testsuites>\n");
    let _ = writeln!(
        out,
        "  <testsuite name=\"apicoverage\" time=\"0\" failures=\"0\" tests=\"{}\">",
        percentages.resource_coverages.len()
    );
    for (kind, percent) in &percentages.resource_coverages {
        let _ = writeln!(
            out,
            "    <testcase class_name=\"apicoverage\" name=\"{}\" time=\"0\">",
            html_escape(kind)
        );
        out.push_str("      <properties>\n");
        let _ = writeln!(
            out,
            "        <property name=\"{}\" value=\"{:.2}\"/>",
            JUNIT_COVERAGE_PROPERTY, percent
        );
        out.push_str("      </properties>\n");
        out.push_str("    </testcase>\n");
    }
    out.push_str("  </testsuite>\n");
    out.push_str("</testsuites>\n");
    out
}

/// Write a rendered report into `dir`, returning the full path.
pub fn write_report(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    let path = dir.join(file_name);
    std::fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
    Ok(path)
}

fn summary_table(values: &CoverageValues) -> String {
    format!(
        "<table class=\"summary\">\n\
         <tr><th>Covered Fields</th><th>Total Fields</th><th>Coverage</th></tr>\n\
         <tr><td>{}</td><td>{}</td><td>{:.2}%</td></tr>\n\
         </table>",
        values.covered_fields, values.total_fields, values.percent_coverage
    )
}

fn render_type(out: &mut String, coverage: &TypeCoverage) {
    let values = coverage.values();
    let _ = writeln!(
        out,
        "<h2>{} <small>({}/{})</small></h2>",
        html_escape(&coverage.type_name),
        values.covered_fields,
        values.total_fields
    );
    if coverage.fields.is_empty() {
        out.push_str("<p>No leaf fields.</p>\n");
        return;
    }

    out.push_str("<table>\n<tr><th>Field</th><th>Covered</th><th>Observed</th><th>Expected</th></tr>\n");
    for field in &coverage.fields {
        let class = if field.ignored {
            "ignored"
        } else if field.is_covered() {
            "covered"
        } else if field.covered > 0 {
            "partial"
        } else {
            "uncovered"
        };
        let counts = if field.ignored {
            "ignored".to_string()
        } else {
            format!("{}/{}", field.covered, field.total)
        };
        let expected = field
            .expected
            .as_ref()
            .map(|values| join_escaped(values))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "<tr class=\"{}\"><td title=\"{}\">{}</td><td>{}</td><td class=\"values\">{}</td><td class=\"values\">{}</td></tr>",
            class,
            html_escape(&field.path),
            html_escape(&field.label),
            counts,
            join_escaped(&field.observed),
            expected
        );
    }
    out.push_str("</table>\n");
}

fn join_escaped(values: &[String]) -> String {
    values
        .iter()
        .map(|v| html_escape(v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
