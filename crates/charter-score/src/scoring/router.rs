use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{EntityRef, GroupId, ItemId, PeriodType, ProjectId, WindowRequest};
use super::engine::ScoreError;
use super::period;
use super::repository::{RepositoryError, SnapshotProvider};
use super::service::ScoringService;

/// Router builder exposing the scoring queries over HTTP.
pub fn scoring_router<P>(service: Arc<ScoringService<P>>) -> Router
where
    P: SnapshotProvider + 'static,
{
    Router::new()
        .route("/api/v1/score/:kind/:id", get(score_handler::<P>))
        .route("/api/v1/projects/:id/resume", get(resume_handler::<P>))
        .route("/api/v1/projects/:id/status", get(status_handler::<P>))
        .route("/api/v1/projects/:id/audit", get(audit_handler::<P>))
        .route("/api/v1/items/:id/series", get(series_handler::<P>))
        .route("/api/v1/child-projects", get(child_projects_handler::<P>))
        .route("/api/v1/periods", get(periods_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WindowQuery {
    pub(crate) start: Option<NaiveDate>,
    pub(crate) end: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResumeQuery {
    /// Reporting month as `YYYY-MM`.
    pub(crate) month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusQuery {
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeriodsQuery {
    pub(crate) start: NaiveDate,
    pub(crate) end: NaiveDate,
    #[serde(rename = "type")]
    pub(crate) period_type: PeriodType,
}

pub(crate) async fn score_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
    Path((kind, id)): Path<(String, u64)>,
    Query(query): Query<WindowQuery>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    let entity = match kind.to_ascii_lowercase().as_str() {
        "item" | "items" => EntityRef::Item(ItemId(id)),
        "group" | "groups" => EntityRef::Group(GroupId(id)),
        "project" | "projects" => EntityRef::Project(ProjectId(id)),
        other => {
            return bad_request(format!("unknown entity kind '{other}'"));
        }
    };
    let window = WindowRequest {
        start: query.start,
        end: query.end,
    };

    match service.score(entity, window) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resume_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
    Path(id): Path<u64>,
    Query(query): Query<ResumeQuery>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    let month = match query.month.as_deref() {
        Some(raw) => match parse_month(raw) {
            Some(month) => month,
            None => return bad_request(format!("month '{raw}' must be formatted as YYYY-MM")),
        },
        None => service.context().today,
    };

    match service.project_resume(ProjectId(id), month) {
        Ok(resume) => (StatusCode::OK, axum::Json(resume)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
    Path(id): Path<u64>,
    Query(query): Query<StatusQuery>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    match service.project_status(ProjectId(id), query.today) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
    Path(id): Path<u64>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    match service.weight_audit(ProjectId(id)) {
        Ok(audit) => {
            let summaries: Vec<String> = audit.warnings.iter().map(|w| w.summary()).collect();
            let payload = json!({
                "project_id": audit.project_id,
                "clean": audit.is_clean(),
                "warnings": audit.warnings,
                "summaries": summaries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn series_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
    Path(id): Path<u64>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    match service.item_series(ItemId(id)) {
        Ok(series) => (StatusCode::OK, axum::Json(series)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn child_projects_handler<P>(
    State(service): State<Arc<ScoringService<P>>>,
) -> Response
where
    P: SnapshotProvider + 'static,
{
    match service.child_projects() {
        Ok(children) => (StatusCode::OK, axum::Json(children)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn periods_handler(Query(query): Query<PeriodsQuery>) -> Response {
    let periods = period::generate(query.start, query.end, query.period_type);
    (StatusCode::OK, axum::Json(periods)).into_response()
}

pub(crate) fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) fn error_status(error: &ScoreError) -> StatusCode {
    match error {
        ScoreError::NotFound(_) | ScoreError::Storage(RepositoryError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ScoreError::CycleDetected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScoreError::Storage(RepositoryError::Conflict(_))
        | ScoreError::Storage(RepositoryError::LinkedChildProject { .. }) => StatusCode::CONFLICT,
        ScoreError::Storage(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: ScoreError) -> Response {
    let status = error_status(&error);
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
