//! Climate Health Tracker
//!
//! Citizens report climate-linked illness; health officials triage the
//! reports and broadcast regional advisories.
//!
//! ## Features
//!
//! - **Reporting**: Submit illness reports with location and suspected cause
//! - **Review**: Officials move reports through the review lifecycle
//! - **Notifications**: Status updates and advisory broadcasts per user
//! - **Analytics**: Map points and aggregate charts

mod advisories;
mod analytics;
mod config;
mod db;
mod dispatch;
mod error;
mod handlers;
mod lifecycle;
mod mailer;
mod models;
mod routes;
mod validation;

use handlers::AppState;
use mailer::Mailer;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "climate_health_tracker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Starting Climate Health Tracker");
    tracing::info!("Environment: {:?}", config.environment);

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    if !config.mail_enabled {
        tracing::info!("Email delivery disabled");
    }

    // Create application state
    let state = AppState {
        pool,
        mailer: Mailer::from_config(&config),
        is_production: config.is_production(),
        identity_header: config.identity_header.clone(),
        allow_official_registration: config.allow_official_registration,
    };

    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = routes::build_router(state, cors);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
