//! Report handlers

use crate::error::ServiceError;
use crate::lifecycle::{self, Actor, ListReportsQuery};
use crate::models::*;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::{json_body, path_param, AppState};

/// Submit a new report
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<SubmitReport>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<HealthReport>>), ServiceError> {
    let input = json_body(payload)?;
    let report = lifecycle::submit_report(&state.pool, &actor, input).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(report))))
}

/// List the caller's own reports
pub async fn list_my_reports(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<HealthReport>>>, ServiceError> {
    let reports = lifecycle::list_own_reports(&state.pool, &actor).await?;
    Ok(Json(ApiResponse::success(reports)))
}

/// Get report details (reporter or official)
pub async fn get_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<HealthReport>>, ServiceError> {
    let id = path_param(id)?;
    let report = lifecycle::get_report(&state.pool, &actor, id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Review a report (official)
pub async fn review_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReviewReport>, JsonRejection>,
) -> Result<Json<ApiResponse<HealthReport>>, ServiceError> {
    // Role check comes before the body is even looked at
    actor.require_official()?;
    let id = path_param(id)?;
    let input = json_body(payload)?;

    let report = lifecycle::review_report(&state.pool, &state.mailer, &actor, id, input).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Mark a report resolved (official)
pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<HealthReport>>, ServiceError> {
    let id = path_param(id)?;
    let report = lifecycle::mark_resolved(&state.pool, &state.mailer, &actor, id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// List all reports (official)
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<HealthReport>>>, ServiceError> {
    let page = lifecycle::list_reports(&state.pool, &actor, query).await?;

    tracing::info!(
        "Official {} listed reports (page {}, {} results)",
        actor.username,
        page.page,
        page.items.len()
    );

    Ok(Json(ApiResponse::success(page)))
}

/// Map widget points
pub async fn get_map_points(
    State(state): State<AppState>,
    Extension(_actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<MapPoint>>>, ServiceError> {
    let points = lifecycle::list_map_points(&state.pool).await?;
    Ok(Json(ApiResponse::success(points)))
}
