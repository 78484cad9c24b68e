//! Database connection pool

use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use std::time::Duration;

/// Create a new database connection pool
///
/// Every connection gets a bounded `lock_timeout`, so a review waiting on a
/// locked report row fails with a retryable error instead of hanging.
pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let lock_timeout_ms = config.lock_timeout_ms;

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let statement = format!("SET lock_timeout = {}", lock_timeout_ms);
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
}

/// Split SQL into statements, properly handling $$ delimited blocks (PL/pgSQL functions)
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_block = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' && chars.peek() == Some(&'$') {
            current.push('$');
            chars.next();
            in_dollar_block = !in_dollar_block;
        } else if c == ';' && !in_dollar_block {
            if has_sql_content(&current) {
                statements.push(current.trim().to_string());
            }
            current.clear();
        }
    }

    if has_sql_content(&current) {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Check if a string has actual SQL content (not just comments)
fn has_sql_content(s: &str) -> bool {
    s.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with("--") && trimmed != ";"
    })
}

/// Run database migrations
///
/// The schema is written to be idempotent (`IF NOT EXISTS`, guarded type
/// creation), so it is applied on every start.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let migration_sql = include_str!("migrations/001_initial.sql");

    for statement in split_sql_statements(migration_sql) {
        sqlx::query(&statement).execute(pool).await.map_err(|e| {
            tracing::error!("Migration statement failed: {}", e);
            e
        })?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Storage fixtures for tests that need a live database.
///
/// These run only when `DATABASE_URL` is set; otherwise [`testing::storage_pool`]
/// returns `None` and the calling test returns early.
#[cfg(test)]
pub mod testing {
    use super::run_migrations;
    use crate::lifecycle::{self, Actor};
    use crate::models::*;
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use tokio::sync::OnceCell;
    use uuid::Uuid;

    static MIGRATED: OnceCell<()> = OnceCell::const_new();

    pub async fn storage_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .expect("DATABASE_URL is set but unreachable");

        MIGRATED
            .get_or_init(|| async {
                run_migrations(&pool).await.expect("migrations failed");
            })
            .await;

        Some(pool)
    }

    /// Insert a user with a unique username
    pub async fn register(pool: &PgPool, role: Role) -> Actor {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(format!("user-{}", Uuid::new_v4()))
        .bind(Option::<String>::None)
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap();

        Actor::from(user)
    }

    pub async fn file_report(pool: &PgPool, reporter: &Actor, location: &str) -> HealthReport {
        let input = SubmitReport {
            disease_type: DiseaseType::Waterborne,
            symptoms: "Diarrhoea and vomiting".to_string(),
            environmental_cause: EnvironmentalCause::WaterContamination,
            location: location.to_string(),
            latitude: None,
            longitude: None,
            affected_count: 1,
            additional_notes: String::new(),
        };

        lifecycle::submit_report(pool, reporter, input).await.unwrap()
    }

    pub async fn notification_count(pool: &PgPool, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_statements() {
        let sql = "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "CREATE TABLE a (id INT);");
        assert_eq!(statements[1], "CREATE TABLE b (id INT);");
    }

    #[test]
    fn test_split_keeps_dollar_blocks_intact() {
        let sql = r#"
DO $$ BEGIN
    CREATE TYPE user_role AS ENUM ('public', 'official');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE users (id UUID);
"#;
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("DO $$"));
        assert!(statements[0].ends_with("END $$;"));
        assert!(statements[0].contains("duplicate_object"));
        assert_eq!(statements[1], "CREATE TABLE users (id UUID);");
    }

    #[test]
    fn test_split_skips_comment_only_chunks() {
        let sql = "-- header comment\n;\nSELECT 1;\n-- trailing comment\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["SELECT 1;".to_string()]);
    }

    #[test]
    fn test_embedded_migration_splits() {
        let statements = split_sql_statements(include_str!("migrations/001_initial.sql"));
        assert!(statements.len() > 5);
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE TABLE IF NOT EXISTS health_reports")));
        assert!(statements.iter().all(|s| has_sql_content(s)));
    }
}
