//! HTTP routing

use crate::handlers::{
    advisories, dashboard, identity,
    middleware::{require_user, security_headers},
    notifications, reports, AppState,
};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let public_routes = Router::new()
        .route("/health", get(dashboard::health))
        .route("/users", post(identity::register_user))
        .route("/stats", get(dashboard::get_home_stats))
        .route("/advisories", get(advisories::list_active_advisories));

    let identified_routes = Router::new()
        .route("/me", get(identity::get_current_user))
        .route("/dashboard", get(dashboard::get_my_dashboard))
        // Reports
        .route(
            "/reports",
            get(reports::list_my_reports).post(reports::submit_report),
        )
        .route("/reports/:id", get(reports::get_report))
        .route("/reports/:id/review", put(reports::review_report))
        .route("/reports/:id/resolve", post(reports::resolve_report))
        .route("/map", get(reports::get_map_points))
        .route("/analytics", get(dashboard::get_analytics))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/:id/read",
            post(notifications::mark_notification_read),
        )
        // Official tools
        .route(
            "/official/dashboard",
            get(dashboard::get_official_dashboard),
        )
        .route("/official/reports", get(reports::list_reports))
        .route("/official/advisories", post(advisories::issue_advisory))
        .route(
            "/official/advisories/:id/deactivate",
            post(advisories::deactivate_advisory),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .nest("/api", public_routes.merge(identified_routes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{file_report, register, storage_pool};
    use crate::lifecycle::Actor;
    use crate::mailer::Mailer;
    use crate::models::Role;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Extension,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// State whose pool never connects; routes under test must answer
    /// without touching storage.
    fn test_state(allow_official_registration: bool) -> AppState {
        AppState {
            pool: sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://nobody@127.0.0.1:1/none")
                .unwrap(),
            mailer: Mailer::disabled(),
            is_production: false,
            identity_header: "x-authenticated-user".to_string(),
            allow_official_registration,
        }
    }

    fn app() -> Router {
        build_router(test_state(false), CorsLayer::permissive())
    }

    fn app_with_pool(pool: sqlx::PgPool) -> Router {
        let state = AppState {
            pool,
            ..test_state(false)
        };
        build_router(state, CorsLayer::permissive())
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert!(response.headers().get("strict-transport-security").is_none());

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_identified_routes_require_identity() {
        for (method, uri) in [
            ("GET", "/api/reports"),
            ("GET", "/api/map"),
            ("GET", "/api/analytics"),
            ("PUT", "/api/reports/7f1f2a52-8c1e-4d8e-9d6b-2d0f5b7c9a11/review"),
            ("POST", "/api/official/advisories"),
            ("POST", "/api/notifications/7f1f2a52-8c1e-4d8e-9d6b-2d0f5b7c9a11/read"),
        ] {
            let response = app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            let body = json_body(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Not authenticated");
        }
    }

    #[tokio::test]
    async fn test_register_official_when_closed() {
        let request = Request::post("/api/users")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"username": "dr.mensah", "role": "official", "organization": "GHS"}"#,
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Official registration is closed");
    }

    #[tokio::test]
    async fn test_register_unknown_role_is_validation_error() {
        let request = Request::post("/api/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "kofi", "role": "superuser"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Malformed request"));
    }

    #[tokio::test]
    async fn test_register_invalid_username() {
        let request = Request::post("/api/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "two words"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app()).await.unwrap();
        });

        let response = reqwest::get(format!("http://{}/api/health", addr))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_malformed_id_gets_json_error() {
        let actor = Actor {
            id: Uuid::new_v4(),
            username: "dr.mensah".to_string(),
            role: Role::Official,
        };
        let app = Router::new()
            .route("/reports/:id", get(reports::get_report))
            .route("/reports/:id/resolve", post(reports::resolve_report))
            .route(
                "/notifications/:id/read",
                post(notifications::mark_notification_read),
            )
            .route(
                "/advisories/:id/deactivate",
                post(advisories::deactivate_advisory),
            )
            .layer(Extension(actor))
            .with_state(test_state(false));

        for (method, uri) in [
            ("GET", "/reports/abc"),
            ("POST", "/reports/abc/resolve"),
            ("POST", "/notifications/42/read"),
            ("POST", "/advisories/not-a-uuid/deactivate"),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
            let body = json_body(response).await;
            assert_eq!(body["success"], false);
            assert!(body["error"]
                .as_str()
                .unwrap()
                .starts_with("Malformed request"));
        }
    }

    #[tokio::test]
    async fn test_map_points_use_envelope() {
        let Some(pool) = storage_pool().await else {
            return;
        };
        let reporter = register(&pool, Role::Public).await;
        file_report(&pool, &reporter, "Riverside District").await;

        let response = app_with_pool(pool)
            .oneshot(
                Request::get("/api/map")
                    .header("x-authenticated-user", &reporter.username)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert!(body["data"].is_array());
    }
}
