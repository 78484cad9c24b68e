//! Notification dispatcher
//!
//! Two rules derive notifications from writes:
//!
//! - **report update**: a review that changed a report's status notifies the
//!   reporter, then emails them after the review commits;
//! - **advisory broadcast**: a newly created, active advisory notifies every
//!   user with a report whose location contains the advisory region
//!   (case-insensitive substring).
//!
//! Both rules run inside a savepoint of the triggering transaction. A failed
//! dispatch rolls back only the savepoint, so the triggering write still
//! commits.

use crate::error::ServiceError;
use crate::lifecycle::Actor;
use crate::mailer::{Mailer, OutboundEmail};
use crate::models::*;
use sqlx::{Acquire, PgConnection, PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// Advisory descriptions are cut to this many characters in notifications
const ADVISORY_MESSAGE_CHARS: usize = 200;

/// Matches `notifications.title`
const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to store notifications: {0}")]
    Storage(#[from] sqlx::Error),
}

// =============================================================================
// Rules
// =============================================================================

/// Report-update rule: one notification for the reporter, only when the
/// review changed the status and a reviewer is recorded.
pub fn report_update_rule(report: &HealthReport, status_changed: bool) -> Option<NewNotification> {
    if !status_changed || report.reviewed_by.is_none() {
        return None;
    }

    let label = report.status.label();
    Some(NewNotification {
        user_id: report.reporter_id,
        notification_type: NotificationType::ReportUpdate,
        title: truncate_chars(&format!("Report Status Updated: {}", label), TITLE_MAX_CHARS),
        message: format!(
            "Your report from {} has been updated to {}.",
            report.location, label
        ),
        related_report_id: Some(report.id),
        related_advisory_id: None,
    })
}

/// Email sent to the reporter alongside the report-update notification
pub fn status_update_email(to: &str, report: &HealthReport) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: "Climate Health Tracker: Report Status Update".to_string(),
        body: format!(
            "Your report has been updated to {}.\n\nOfficial Notes: {}",
            report.status.label(),
            report.official_notes
        ),
    }
}

/// Literal, case-insensitive containment of `region` in `location`
pub fn region_matches(location: &str, region: &str) -> bool {
    location.to_lowercase().contains(&region.to_lowercase())
}

/// ILIKE pattern matching `region` anywhere, with wildcards escaped
pub fn like_pattern(region: &str) -> String {
    let mut pattern = String::with_capacity(region.len() + 2);
    pattern.push('%');
    for c in region.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Distinct users owning at least one report whose location matches `region`
pub fn broadcast_recipients<I>(region: &str, reports: I) -> BTreeSet<Uuid>
where
    I: IntoIterator<Item = (Uuid, String)>,
{
    reports
        .into_iter()
        .filter(|(_, location)| region_matches(location, region))
        .map(|(user_id, _)| user_id)
        .collect()
}

/// Advisory-broadcast rule: only an advisory created active is broadcast
pub fn broadcast_rule(advisory: &Advisory) -> bool {
    advisory.is_active
}

/// Broadcast notification for one recipient of an advisory
pub fn advisory_notification(advisory: &Advisory, user_id: Uuid) -> NewNotification {
    NewNotification {
        user_id,
        notification_type: NotificationType::Advisory,
        title: truncate_chars(
            &format!("New Health Advisory: {}", advisory.title),
            TITLE_MAX_CHARS,
        ),
        message: truncate_chars(&advisory.description, ADVISORY_MESSAGE_CHARS),
        related_report_id: None,
        related_advisory_id: Some(advisory.id),
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Apply the report-update rule inside a savepoint of `tx`
pub async fn notify_report_update(
    tx: &mut Transaction<'_, Postgres>,
    report: &HealthReport,
    status_changed: bool,
) -> Result<u64, DispatchError> {
    let Some(notification) = report_update_rule(report, status_changed) else {
        return Ok(0);
    };

    let mut savepoint = (&mut *tx).begin().await?;
    match insert_notifications(&mut savepoint, std::slice::from_ref(&notification)).await {
        Ok(count) => {
            savepoint.commit().await?;
            Ok(count)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

/// Apply the advisory-broadcast rule inside a savepoint of `tx`.
///
/// Must only be called for a freshly inserted advisory; later saves of the
/// same advisory never broadcast.
pub async fn broadcast_advisory(
    tx: &mut Transaction<'_, Postgres>,
    advisory: &Advisory,
) -> Result<u64, DispatchError> {
    if !broadcast_rule(advisory) {
        return Ok(0);
    }

    let mut savepoint = (&mut *tx).begin().await?;
    match deliver_broadcast(&mut savepoint, advisory).await {
        Ok(count) => {
            savepoint.commit().await?;
            Ok(count)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

async fn deliver_broadcast(
    conn: &mut PgConnection,
    advisory: &Advisory,
) -> Result<u64, DispatchError> {
    // ILIKE narrows the scan; region_matches stays the authority
    let candidates = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT reporter_id, location FROM health_reports
        WHERE location ILIKE $1 ESCAPE '\'
        "#,
    )
    .bind(like_pattern(&advisory.region))
    .fetch_all(&mut *conn)
    .await?;

    let notifications: Vec<NewNotification> = broadcast_recipients(&advisory.region, candidates)
        .into_iter()
        .map(|user_id| advisory_notification(advisory, user_id))
        .collect();

    insert_notifications(conn, &notifications).await
}

async fn insert_notifications(
    conn: &mut PgConnection,
    notifications: &[NewNotification],
) -> Result<u64, DispatchError> {
    let mut inserted = 0;

    for notification in notifications {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications
                (user_id, notification_type, title, message, related_report_id, related_advisory_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_report_id)
        .bind(notification.related_advisory_id)
        .execute(&mut *conn)
        .await?;

        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Email the reporter about a committed status change.
///
/// Runs detached from the request; every failure is logged and dropped.
pub fn spawn_status_email(pool: PgPool, mailer: Mailer, report: HealthReport) {
    tokio::spawn(async move {
        let email = sqlx::query_scalar::<_, Option<String>>("SELECT email FROM users WHERE id = $1")
            .bind(report.reporter_id)
            .fetch_optional(&pool)
            .await;

        match email {
            Ok(Some(Some(address))) if !address.trim().is_empty() => {
                mailer.send(status_update_email(address.trim(), &report));
            }
            Ok(_) => {
                tracing::debug!(
                    "Reporter {} has no email address, skipping status email",
                    report.reporter_id
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Could not look up reporter email for report {}: {}",
                    report.id,
                    e
                );
            }
        }
    });
}

// =============================================================================
// Reading notifications
// =============================================================================

/// Notifications addressed to `actor`, newest first
pub async fn list_notifications(
    pool: &PgPool,
    actor: &Actor,
    unread_only: bool,
) -> Result<Vec<Notification>, ServiceError> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND ($2 = false OR is_read = false)
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(actor.id)
    .bind(unread_only)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark a notification read. Idempotent; notifications of other users are
/// reported as missing.
pub async fn mark_notification_read(
    pool: &PgPool,
    actor: &Actor,
    notification_id: Uuid,
) -> Result<Notification, ServiceError> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET is_read = true
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(notification_id)
    .bind(actor.id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("Notification"))
}
