//! Dashboard and analytics handlers

use crate::analytics::{self, AnalyticsQuery};
use crate::error::ServiceError;
use crate::lifecycle::Actor;
use crate::models::*;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::AppState;

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Landing page statistics (public)
pub async fn get_home_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HomeStats>>, ServiceError> {
    let stats = analytics::home_stats(&state.pool).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// The caller's reports and unread notifications
pub async fn get_my_dashboard(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<ReporterDashboard>>, ServiceError> {
    let dashboard = analytics::reporter_dashboard(&state.pool, &actor).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// Triage counts (official)
pub async fn get_official_dashboard(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<OfficialDashboard>>, ServiceError> {
    let dashboard = analytics::official_dashboard(&state.pool, &actor).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// Chart data for the analytics page
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(_actor): Extension<Actor>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, ServiceError> {
    let summary = analytics::summarize(&state.pool, &query, Utc::now().date_naive()).await?;
    Ok(Json(ApiResponse::success(summary)))
}
