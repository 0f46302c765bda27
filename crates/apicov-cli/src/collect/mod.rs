//! The collect command: pull coverage from a running webhook and write the
//! report artifacts CI picks up.
//!
//! Per-kind fetch failures are logged and skipped. Failing to fetch the
//! total or the percentages aborts the run.

mod artifacts;
mod client;

pub use artifacts::{prune_stale, resource_report_file, write_build_failed};
pub use client::CoverageClient;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use apicov_core::report::{self, ReportError, JUNIT_REPORT_FILE, TOTAL_REPORT_FILE};
use apicov_core::schema::SchemaError;
use apicov_core::{Catalog, Config, ResourceKey};

use crate::cluster::{self, ClusterError};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Error while requesting GET {uri}: {source}")]
    Http {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid HTTP status received for GET {uri}: {status}")]
    Status { uri: String, status: u16 },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Catalog(#[from] SchemaError),

    #[error("Webhook URI discovery failed: {0}")]
    Discovery(#[from] ClusterError),

    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl CollectError {
    pub fn http(uri: &str, source: reqwest::Error) -> Self {
        CollectError::Http {
            uri: uri.to_string(),
            source,
        }
    }
}

/// What one collect run produced.
#[derive(Debug, Default)]
pub struct CollectSummary {
    /// Per-kind HTML reports written.
    pub reports: Vec<PathBuf>,
    /// Kinds whose report could not be fetched.
    pub failed: Vec<ResourceKey>,
    pub total_report: PathBuf,
    pub junit_report: PathBuf,
}

/// Entry point for `apicov collect`.
pub async fn run(config: &Config, build_failed: bool) -> Result<(), CollectError> {
    let catalog = Catalog::load(config.coverage.catalog_path().as_deref())?;
    let kinds = catalog.keys();
    let dir = PathBuf::from(&config.client.artifacts_dir);

    let pruned = prune_stale(&dir, &kinds)?;
    tracing::info!(dir = %dir.display(), pruned, "cleaned artifacts directory");

    if build_failed {
        tracing::info!("build failed, writing zero coverage");
        let path = write_build_failed(&dir, &kinds)?;
        tracing::info!(path = %path.display(), "wrote resource coverage percentages");
        return Ok(());
    }

    let uri = match &config.client.webhook_uri {
        Some(uri) => uri.clone(),
        None => {
            tracing::info!(
                namespace = %config.webhook.namespace,
                service = %config.webhook.component,
                "autodetecting webhook uri"
            );
            cluster::discover_webhook_uri(&config.webhook).await?
        }
    };
    tracing::info!(uri = %uri, "using webhook uri");

    let client = CoverageClient::new(uri, config.client.request_timeout())?;
    let summary = collect(&client, &dir, &kinds).await?;

    println!(
        "Wrote {} of {} resource reports to {}",
        summary.reports.len(),
        kinds.len(),
        dir.display()
    );
    if !summary.failed.is_empty() {
        println!("  {} kinds could not be fetched (see log)", summary.failed.len());
    }
    println!("  Total: {}", summary.total_report.display());
    println!("  JUnit: {}", summary.junit_report.display());
    Ok(())
}

/// Fetch every report from `client` and write it into `dir`.
pub async fn collect(
    client: &CoverageClient,
    dir: &Path,
    kinds: &[ResourceKey],
) -> Result<CollectSummary, CollectError> {
    let mut summary = CollectSummary::default();

    let progress = ProgressBar::new(kinds.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for key in kinds {
        progress.set_message(key.kind.clone());
        match client.resource_coverage(&key.kind).await {
            Ok(html) => {
                let path = report::write_report(dir, &resource_report_file(key), &html)?;
                tracing::info!(resource = %key, path = %path.display(), "wrote resource coverage");
                summary.reports.push(path);
            }
            Err(e) => {
                tracing::error!(resource = %key, error = %e, "failed retrieving resource coverage");
                summary.failed.push(key.clone());
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    let total = client.total_coverage().await?;
    summary.total_report =
        report::write_report(dir, TOTAL_REPORT_FILE, &report::render_total_html(&total))?;
    tracing::info!(
        path = %summary.total_report.display(),
        percent = total.percent_coverage,
        "wrote total coverage"
    );

    let percentages = client.percentages().await?;
    summary.junit_report =
        report::write_report(dir, JUNIT_REPORT_FILE, &report::render_junit(&percentages))?;
    tracing::info!(path = %summary.junit_report.display(), "wrote resource coverage percentages");

    Ok(summary)
}
