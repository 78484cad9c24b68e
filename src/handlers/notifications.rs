//! Notification handlers

use crate::dispatch;
use crate::error::ServiceError;
use crate::lifecycle::Actor;
use crate::models::*;
use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{path_param, AppState};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// List the caller's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ServiceError> {
    let notifications =
        dispatch::list_notifications(&state.pool, &actor, query.unread_only).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

/// Mark one of the caller's notifications read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Notification>>, ServiceError> {
    let id = path_param(id)?;
    let notification = dispatch::mark_notification_read(&state.pool, &actor, id).await?;
    Ok(Json(ApiResponse::success(notification)))
}
