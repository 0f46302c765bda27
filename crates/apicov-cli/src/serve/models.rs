//! Query parameters and response bodies for the webhook server.
//!
//! Coverage payloads themselves are the core types
//! ([`CoverageValues`](apicov_core::CoverageValues),
//! [`CoveragePercentages`](apicov_core::CoveragePercentages)), serialized
//! with the field names collectors already expect.

use serde::{Deserialize, Serialize};

use apicov_core::admission::IntakeStats;

// =============================================================================
// Resource Coverage (for `/resourcecoverage`)
// =============================================================================

/// Query parameters for `/resourcecoverage`.
#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    /// Kind name, e.g. `Deployment`.
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub format: ReportFormat,
}

/// Representation of a per-kind report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

// =============================================================================
// Health (for `/healthz`)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    /// RFC 3339 start time of this process.
    pub started_at: String,
    pub kinds: usize,
    pub intake: IntakeStats,
}
