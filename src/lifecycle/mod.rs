//! Report lifecycle
//!
//! Reports start `pending` and move only through [`review_report`], which an
//! official performs. The prior status is read under a row lock inside the
//! review transaction, so two concurrent reviews of the same report cannot
//! both observe the transition.

use crate::dispatch;
use crate::error::ServiceError;
use crate::mailer::Mailer;
use crate::models::*;
use crate::validation::{validate_review, validate_submit_report, ValidationError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

// =============================================================================
// Acting user
// =============================================================================

/// The authenticated caller, resolved once per request and passed into every
/// operation that needs a capability check.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

impl Actor {
    pub fn is_official(&self) -> bool {
        self.role == Role::Official
    }

    pub fn require_official(&self) -> Result<(), ServiceError> {
        if self.is_official() {
            Ok(())
        } else {
            Err(ServiceError::Authorization("Health official role required"))
        }
    }

    /// Reporters see their own reports; officials see all of them
    pub fn can_view(&self, report: &HealthReport) -> bool {
        self.is_official() || report.reporter_id == self.id
    }
}

// =============================================================================
// Review state machine
// =============================================================================

/// Field values a review writes, computed against the locked prior row
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPlan {
    pub status: ReportStatus,
    pub official_notes: String,
    pub reviewed_by: Uuid,
    pub resolved_at: Option<DateTime<Utc>>,
    pub status_changed: bool,
}

impl ReviewPlan {
    pub fn evaluate(
        prior: &HealthReport,
        actor: &Actor,
        input: &ReviewReport,
        now: DateTime<Utc>,
    ) -> Result<Self, ServiceError> {
        actor.require_official()?;

        let resolved_at = match (input.status, prior.status) {
            (ReportStatus::Resolved, ReportStatus::Resolved) => prior.resolved_at.or(Some(now)),
            (ReportStatus::Resolved, _) => Some(now),
            _ => None,
        };

        Ok(Self {
            status: input.status,
            official_notes: input
                .official_notes
                .as_deref()
                .map(|notes| notes.trim().to_string())
                .unwrap_or_else(|| prior.official_notes.clone()),
            reviewed_by: actor.id,
            resolved_at,
            status_changed: input.status != prior.status,
        })
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Create a `pending` report owned by `actor`
pub async fn submit_report(
    pool: &PgPool,
    actor: &Actor,
    input: SubmitReport,
) -> Result<HealthReport, ServiceError> {
    validate_submit_report(&input)?;

    let report = sqlx::query_as::<_, HealthReport>(
        r#"
        INSERT INTO health_reports
            (reporter_id, disease_type, symptoms, environmental_cause, location,
             latitude, longitude, affected_count, additional_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(actor.id)
    .bind(input.disease_type)
    .bind(input.symptoms.trim())
    .bind(input.environmental_cause)
    .bind(input.location.trim())
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.affected_count)
    .bind(input.additional_notes.trim())
    .fetch_one(pool)
    .await?;

    tracing::info!(
        "User {} submitted report {} ({:?} at {})",
        actor.username,
        report.id,
        report.disease_type,
        report.location
    );

    Ok(report)
}

/// Official review of a report.
///
/// Status, notes, reviewer and `resolved_at` are written atomically. A changed
/// status notifies the reporter in the same transaction and emails them once
/// the transaction has committed.
pub async fn review_report(
    pool: &PgPool,
    mailer: &Mailer,
    actor: &Actor,
    report_id: Uuid,
    input: ReviewReport,
) -> Result<HealthReport, ServiceError> {
    actor.require_official()?;
    validate_review(&input)?;

    let mut tx = pool.begin().await?;

    let prior =
        sqlx::query_as::<_, HealthReport>("SELECT * FROM health_reports WHERE id = $1 FOR UPDATE")
            .bind(report_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::NotFound("Report"))?;

    let plan = ReviewPlan::evaluate(&prior, actor, &input, Utc::now())?;

    let report = sqlx::query_as::<_, HealthReport>(
        r#"
        UPDATE health_reports
        SET status = $1, official_notes = $2, reviewed_by = $3, resolved_at = $4
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(plan.status)
    .bind(&plan.official_notes)
    .bind(plan.reviewed_by)
    .bind(plan.resolved_at)
    .bind(report_id)
    .fetch_one(&mut *tx)
    .await?;

    if let Err(e) = dispatch::notify_report_update(&mut tx, &report, plan.status_changed).await {
        tracing::error!(
            "Notification dispatch failed for report {}: {}",
            report.id,
            e
        );
    }

    tx.commit().await?;

    if plan.status_changed {
        tracing::info!(
            "Official {} moved report {} from {:?} to {:?}",
            actor.username,
            report.id,
            prior.status,
            report.status
        );
        dispatch::spawn_status_email(pool.clone(), mailer.clone(), report.clone());
    } else {
        tracing::info!(
            "Official {} re-saved report {} without a status change",
            actor.username,
            report.id
        );
    }

    Ok(report)
}

/// Shortcut for a review to `resolved`, keeping the stored notes
pub async fn mark_resolved(
    pool: &PgPool,
    mailer: &Mailer,
    actor: &Actor,
    report_id: Uuid,
) -> Result<HealthReport, ServiceError> {
    review_report(
        pool,
        mailer,
        actor,
        report_id,
        ReviewReport {
            status: ReportStatus::Resolved,
            official_notes: None,
        },
    )
    .await
}

/// Fetch a report visible to `actor`
pub async fn get_report(
    pool: &PgPool,
    actor: &Actor,
    report_id: Uuid,
) -> Result<HealthReport, ServiceError> {
    let report = sqlx::query_as::<_, HealthReport>("SELECT * FROM health_reports WHERE id = $1")
        .bind(report_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("Report"))?;

    if !actor.can_view(&report) {
        return Err(ServiceError::Authorization("Access denied"));
    }

    Ok(report)
}

/// Reports submitted by `actor`, newest first
pub async fn list_own_reports(
    pool: &PgPool,
    actor: &Actor,
) -> Result<Vec<HealthReport>, ServiceError> {
    let reports = sqlx::query_as::<_, HealthReport>(
        "SELECT * FROM health_reports WHERE reporter_id = $1 ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(pool)
    .await?;

    Ok(reports)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<ReportStatus>,
    pub search: Option<String>,
}

/// All reports for the official dashboard, optionally filtered by status and
/// location search
pub async fn list_reports(
    pool: &PgPool,
    actor: &Actor,
    query: ListReportsQuery,
) -> Result<PaginatedResponse<HealthReport>, ServiceError> {
    actor.require_official()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = page_offset(page, per_page)?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(dispatch::like_pattern);

    let items = sqlx::query_as::<_, HealthReport>(
        r#"
        SELECT * FROM health_reports
        WHERE ($1::report_status IS NULL OR status = $1)
          AND ($2::text IS NULL OR location ILIKE $2 ESCAPE '\')
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(query.status)
    .bind(&search)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM health_reports
        WHERE ($1::report_status IS NULL OR status = $1)
          AND ($2::text IS NULL OR location ILIKE $2 ESCAPE '\')
        "#,
    )
    .bind(query.status)
    .bind(&search)
    .fetch_one(pool)
    .await?;

    let total_pages = (total + per_page - 1) / per_page;

    Ok(PaginatedResponse {
        items,
        total,
        page,
        per_page,
        total_pages,
    })
}

/// Row offset of a 1-based page; a page too large to address is rejected
fn page_offset(page: i64, per_page: i64) -> Result<i64, ValidationError> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(per_page))
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1.0,
            max: (i64::MAX / per_page) as f64,
        })
}

/// Reports with both coordinates, for the map widget
pub async fn list_map_points(pool: &PgPool) -> Result<Vec<MapPoint>, ServiceError> {
    let points = sqlx::query_as::<_, MapPoint>(
        r#"
        SELECT id, disease_type, location, latitude, longitude, status
        FROM health_reports
        WHERE latitude IS NOT NULL AND longitude IS NOT NULL
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(points)
}
