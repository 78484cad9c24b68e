//! Service error taxonomy and its HTTP mapping

use crate::models::ApiResponse;
use crate::validation::ValidationError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Postgres error codes that mean "try again": lock_not_available,
/// serialization_failure and deadlock_detected.
const TRANSIENT_SQLSTATES: &[&str] = &["55P03", "40001", "40P01"];

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Authorization(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage is busy, please retry")]
    TransientStorage(#[source] sqlx::Error),

    #[error("Database error")]
    Storage(#[source] sqlx::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            ServiceError::TransientStorage(err)
        } else {
            ServiceError::Storage(err)
        }
    }
}

/// Whether a storage failure is contention rather than a defect
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| TRANSIENT_SQLSTATES.contains(&&*code))
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether a storage failure is a unique constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Authorization(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::TransientStorage(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ServiceError::Storage(e) => tracing::error!("Database error: {}", e),
            ServiceError::TransientStorage(e) => {
                tracing::warn!("Transient storage failure: {}", e)
            }
            _ => {}
        }

        let body = Json(ApiResponse::<()>::error(self.to_string()));

        if status == StatusCode::SERVICE_UNAVAILABLE {
            (status, [(header::RETRY_AFTER, "1")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
