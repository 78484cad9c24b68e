//! Application configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database connection URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Row lock wait bound applied to every pooled connection, in milliseconds
    pub lock_timeout_ms: u64,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: Environment,
    /// Header carrying the username set by the upstream authentication gateway
    pub identity_header: String,
    /// Whether users may register themselves with the official role
    pub allow_official_registration: bool,
    /// Sender address for outbound status emails
    pub mail_from: String,
    /// Whether outbound status emails are sent at all
    pub mail_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = Environment::parse(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        );

        // DATABASE_URL wins; otherwise assemble it from the individual components.
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| {
                let host = env::var("DATABASE_HOST")?;
                let port = env::var("DATABASE_PORT").unwrap_or_else(|_| "5432".to_string());
                let user = env::var("DATABASE_USER")?;
                let password = env::var("DATABASE_PASSWORD")?;
                let db = env::var("DATABASE_DB")?;
                Ok(format!(
                    "postgres://{}:{}@{}:{}/{}",
                    user, password, host, port, db
                ))
            })
            .map_err(|_: env::VarError| {
                ConfigError::Missing(
                    "DATABASE_URL, or DATABASE_HOST + DATABASE_USER + DATABASE_PASSWORD + DATABASE_DB is required".to_string(),
                )
            })?;

        let identity_header = env::var("IDENTITY_HEADER")
            .unwrap_or_else(|_| "x-authenticated-user".to_string())
            .trim()
            .to_lowercase();
        if axum::http::HeaderName::from_bytes(identity_header.as_bytes()).is_err() {
            return Err(ConfigError::Invalid(format!(
                "IDENTITY_HEADER '{}' is not a valid header name",
                identity_header
            )));
        }

        let lock_timeout_ms = match env::var("LOCK_TIMEOUT_MS") {
            Ok(value) => value.parse().map_err(|_| {
                ConfigError::Invalid(format!("LOCK_TIMEOUT_MS '{}' is not a number", value))
            })?,
            Err(_) => 5000,
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(10),
            lock_timeout_ms,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["http://localhost:8080".to_string()]),
            environment,
            identity_header,
            // Open by default only outside production
            allow_official_registration: env::var("ALLOW_OFFICIAL_REGISTRATION")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(environment == Environment::Development),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@climate-health-tracker.local".to_string()),
            mail_enabled: env::var("MAIL_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
