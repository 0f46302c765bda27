//! HTTP route handlers for the webhook server.
//!
//! Handlers are kept thin: intake decisions, aggregation and rendering all
//! live in `apicov_core`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};

use apicov_core::admission::AdmissionReview;
use apicov_core::report::render_resource_html;
use apicov_core::{CoveragePercentages, CoverageValues};

use super::models::{Health, ReportFormat, ResourceQuery};
use super::AppState;

// =============================================================================
// Admission
// =============================================================================

/// POST `/` - Admission review from the API server.
///
/// The response is decided before the object is queued for recording, and
/// is sent whether or not the queue accepts it.
pub async fn admit(State(state): State<Arc<AppState>>, body: Bytes) -> Json<AdmissionReview> {
    let result = state.engine.intake.handle(&body);
    if let Some(request) = result.forward {
        state.queue.enqueue(request).await;
    }
    Json(result.review)
}

// =============================================================================
// Query API
// =============================================================================

/// GET `/resourcecoverage?resource=<Kind>` - Per-kind report, HTML unless
/// `format=json` is given.
pub async fn resource_coverage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let Some(coverage) = state.engine.aggregator.coverage_by_kind(&query.resource) else {
        tracing::debug!(resource = %query.resource, "coverage requested for unknown kind");
        return (
            StatusCode::NOT_FOUND,
            format!(
                "Resource information not found for resource: {}",
                query.resource
            ),
        )
            .into_response();
    };

    match query.format {
        ReportFormat::Html => Html(render_resource_html(&coverage)).into_response(),
        ReportFormat::Json => Json(coverage).into_response(),
    }
}

/// GET `/totalcoverage` - Field-weighted coverage across every kind.
pub async fn total_coverage(State(state): State<Arc<AppState>>) -> Json<CoverageValues> {
    Json(state.engine.aggregator.total_coverage())
}

/// GET `/resourcepercentagecoverage` - Percent per kind plus `Overall`.
pub async fn percentage_coverage(
    State(state): State<Arc<AppState>>,
) -> Json<CoveragePercentages> {
    Json(state.engine.aggregator.percentages_by_kind())
}

/// GET `/healthz` - Liveness.
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        started_at: state.started_at.to_rfc3339(),
        kinds: state.engine.store.forest().keys().count(),
        intake: state.queue.stats(),
    })
}
