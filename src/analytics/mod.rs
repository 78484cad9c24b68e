//! Read-only aggregations over reports
//!
//! Every dimension of [`summarize`] is read inside one repeatable-read
//! transaction, so a report counted in one dimension is counted in all of
//! them.

use crate::advisories::list_active_advisories;
use crate::dispatch;
use crate::error::ServiceError;
use crate::lifecycle::{list_own_reports, Actor};
use crate::models::*;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_TOP_LOCATIONS: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
    pub top: Option<i64>,
}

impl AnalyticsQuery {
    pub fn window_days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, 365)
    }

    pub fn top_locations(&self) -> i64 {
        self.top.unwrap_or(DEFAULT_TOP_LOCATIONS).clamp(1, 50)
    }
}

/// Counts by category, time series and top locations from one snapshot
pub async fn summarize(
    pool: &PgPool,
    query: &AnalyticsQuery,
    today: NaiveDate,
) -> Result<AnalyticsSummary, ServiceError> {
    let days = query.window_days();
    let start = window_start(today, days);

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let total_reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM health_reports")
        .fetch_one(&mut *tx)
        .await?;

    let by_disease = sqlx::query_as::<_, (DiseaseType, i64)>(
        "SELECT disease_type, COUNT(*) FROM health_reports GROUP BY disease_type",
    )
    .fetch_all(&mut *tx)
    .await?;

    let by_cause = sqlx::query_as::<_, (EnvironmentalCause, i64)>(
        "SELECT environmental_cause, COUNT(*) FROM health_reports GROUP BY environmental_cause",
    )
    .fetch_all(&mut *tx)
    .await?;

    let by_status = sqlx::query_as::<_, (ReportStatus, i64)>(
        "SELECT status, COUNT(*) FROM health_reports GROUP BY status",
    )
    .fetch_all(&mut *tx)
    .await?;

    let daily = sqlx::query_as::<_, (NaiveDate, i64)>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
        FROM health_reports
        WHERE (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
        GROUP BY day
        "#,
    )
    .bind(start)
    .bind(today)
    .fetch_all(&mut *tx)
    .await?;

    let top_locations = sqlx::query_as::<_, LocationCount>(
        r#"
        SELECT location, COUNT(*) AS count
        FROM health_reports
        GROUP BY location
        ORDER BY count DESC, location ASC
        LIMIT $1
        "#,
    )
    .bind(query.top_locations())
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(AnalyticsSummary {
        total_reports,
        by_disease: category_counts(by_disease, DiseaseType::label),
        by_cause: category_counts(by_cause, EnvironmentalCause::label),
        by_status: category_counts(by_status, ReportStatus::label),
        daily: daily_series(&daily, today, days),
        top_locations,
    })
}

/// First day of a window of `days` days ending on `today`
pub fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days.max(1) - 1)
}

/// Zero-filled daily counts for the `days` days ending on `today`, oldest first
pub fn daily_series(counts: &[(NaiveDate, i64)], today: NaiveDate, days: i64) -> Vec<DailyCount> {
    let by_day: HashMap<NaiveDate, i64> = counts.iter().copied().collect();
    let start = window_start(today, days);

    (0..days.max(1))
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyCount {
                date,
                count: by_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Label category rows and order them by count, largest first
pub fn category_counts<K>(rows: Vec<(K, i64)>, label: fn(&K) -> &'static str) -> Vec<CategoryCount<K>> {
    let mut counts: Vec<CategoryCount<K>> = rows
        .into_iter()
        .map(|(key, count)| CategoryCount {
            label: label(&key),
            key,
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(b.label)));
    counts
}

// =============================================================================
// Dashboards
// =============================================================================

/// Public landing page figures
pub async fn home_stats(pool: &PgPool) -> Result<HomeStats, ServiceError> {
    let (total_reports, resolved_reports): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'resolved')
        FROM health_reports
        "#,
    )
    .fetch_one(pool)
    .await?;

    let active_advisories: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM advisories
        WHERE is_active = true AND (expires_at IS NULL OR expires_at > NOW())
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(HomeStats {
        total_reports,
        resolved_reports,
        active_advisories,
        recent_advisories: list_active_advisories(pool, 5).await?,
    })
}

/// Triage counts for officials
pub async fn official_dashboard(
    pool: &PgPool,
    actor: &Actor,
) -> Result<OfficialDashboard, ServiceError> {
    actor.require_official()?;

    let (pending_count, verified_count, resolved_count): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'pending'),
            COUNT(*) FILTER (WHERE status = 'verified'),
            COUNT(*) FILTER (WHERE status = 'resolved')
        FROM health_reports
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(OfficialDashboard {
        pending_count,
        verified_count,
        resolved_count,
    })
}

/// A reporter's own reports and unread notifications
pub async fn reporter_dashboard(
    pool: &PgPool,
    actor: &Actor,
) -> Result<ReporterDashboard, ServiceError> {
    let reports = list_own_reports(pool, actor).await?;
    let mut unread_notifications = dispatch::list_notifications(pool, actor, true).await?;
    unread_notifications.truncate(5);

    Ok(ReporterDashboard {
        reports,
        unread_notifications,
    })
}
