//! Advisory handlers

use crate::advisories;
use crate::error::ServiceError;
use crate::lifecycle::Actor;
use crate::models::*;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{json_body, path_param, AppState};

#[derive(Debug, Deserialize)]
pub struct ListAdvisoriesQuery {
    pub limit: Option<i64>,
}

/// Active advisories (public)
pub async fn list_active_advisories(
    State(state): State<AppState>,
    Query(query): Query<ListAdvisoriesQuery>,
) -> Result<Json<ApiResponse<Vec<Advisory>>>, ServiceError> {
    let advisories =
        advisories::list_active_advisories(&state.pool, query.limit.unwrap_or(20)).await?;
    Ok(Json(ApiResponse::success(advisories)))
}

/// Issue an advisory (official)
pub async fn issue_advisory(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<IssueAdvisory>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AdvisoryIssued>>), ServiceError> {
    actor.require_official()?;
    let input = json_body(payload)?;

    let issued = advisories::issue_advisory(&state.pool, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(issued))))
}

/// Deactivate an advisory (official)
pub async fn deactivate_advisory(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Advisory>>, ServiceError> {
    let id = path_param(id)?;
    let advisory = advisories::deactivate_advisory(&state.pool, &actor, id).await?;
    Ok(Json(ApiResponse::success(advisory)))
}
