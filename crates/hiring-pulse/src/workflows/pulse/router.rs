use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde_json::json;

use super::digest::AnalysisRequest;
use super::repository::{AuditRepository, RepositoryError, SnapshotRepository};
use super::service::{PulseService, PulseServiceError, QueryRequest};

/// Router builder exposing the digest, query and audit endpoints.
pub fn pulse_router<S, A>(service: Arc<PulseService<S, A>>) -> Router
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    Router::new()
        .route("/api/v1/pulse/digest", post(digest_handler::<S, A>))
        .route("/api/v1/pulse/query", post(query_handler::<S, A>))
        // one parameter name per segment position
        .route(
            "/api/v1/pulse/recommendations/:key",
            get(recommendations_handler::<S, A>),
        )
        .route(
            "/api/v1/pulse/recommendations/:key/complete",
            post(complete_handler::<S, A>),
        )
        .route(
            "/api/v1/pulse/goals/:week_start",
            get(goal_handler::<S, A>),
        )
        .with_state(service)
}

pub(crate) async fn digest_handler<S, A>(
    State(service): State<Arc<PulseService<S, A>>>,
    axum::Json(request): axum::Json<AnalysisRequest>,
) -> Response
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    match service.digest(&request) {
        Ok(digest) => (StatusCode::OK, axum::Json(digest)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn query_handler<S, A>(
    State(service): State<Arc<PulseService<S, A>>>,
    axum::Json(request): axum::Json<QueryRequest>,
) -> Response
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    match service.query(&request) {
        Ok(context) => (StatusCode::OK, axum::Json(context)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recommendations_handler<S, A>(
    State(service): State<Arc<PulseService<S, A>>>,
    Path(date): Path<String>,
) -> Response
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    let date = match parse_date(&date) {
        Ok(date) => date,
        Err(response) => return response,
    };
    match service.recommendations_for(date) {
        Ok(records) => (
            StatusCode::OK,
            axum::Json(json!({
                "date": date,
                "recommendations": records,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<S, A>(
    State(service): State<Arc<PulseService<S, A>>>,
    Path(id): Path<u64>,
) -> Response
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    match service.complete_recommendation(id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn goal_handler<S, A>(
    State(service): State<Arc<PulseService<S, A>>>,
    Path(week_start): Path<String>,
) -> Response
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    let week_start = match parse_date(&week_start) {
        Ok(date) => date,
        Err(response) => return response,
    };
    match service.goal_for(week_start) {
        Ok(goal) => (StatusCode::OK, axum::Json(goal)).into_response(),
        Err(error) => error_response(error),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, Response> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
        let payload = json!({
            "error": format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"),
        });
        (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
    })
}

fn error_response(error: PulseServiceError) -> Response {
    let status = match &error {
        PulseServiceError::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PulseServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PulseServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        PulseServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
