//! HTTP request handlers

pub mod advisories;
pub mod dashboard;
pub mod identity;
pub mod middleware;
pub mod notifications;
pub mod reports;

use crate::error::ServiceError;
use crate::mailer::Mailer;
use crate::validation::ValidationError;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Json,
};
use sqlx::PgPool;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mailer: Mailer,
    pub is_production: bool,
    /// Lowercased header name carrying the authenticated username
    pub identity_header: String,
    pub allow_official_registration: bool,
}

/// Unwrap a JSON body, turning extractor rejections (malformed JSON, unknown
/// enum values, missing fields) into validation errors.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::Malformed(rejection.body_text()).into())
}

/// Unwrap a path parameter, so a malformed id answers with the JSON error
/// envelope like any other validation failure.
pub(crate) fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, ServiceError> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| ValidationError::Malformed(rejection.body_text()).into())
}
