//! Middleware for caller identity and security headers

use crate::error::ServiceError;
use crate::handlers::AppState;
use crate::lifecycle::Actor;
use crate::models::User;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Resolve the caller from the identity header set by the authentication
/// gateway. The resolved [`Actor`] is available via `Extension<Actor>`.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(username) = identity_from_headers(request.headers(), &state.identity_header) else {
        return ServiceError::Unauthenticated.into_response();
    };

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&username)
        .fetch_optional(&state.pool)
        .await;

    match user {
        Ok(Some(user)) => {
            request.extensions_mut().insert(Actor::from(user));
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("Request for unknown user '{}'", username);
            ServiceError::Unauthenticated.into_response()
        }
        Err(e) => {
            tracing::error!("Database error resolving user: {}", e);
            ServiceError::from(e).into_response()
        }
    }
}

fn identity_from_headers(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Security headers middleware
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if state.is_production {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        );
    }

    response
}
