//! Regional health advisories

use crate::dispatch;
use crate::error::ServiceError;
use crate::lifecycle::Actor;
use crate::models::*;
use crate::validation::validate_issue_advisory;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Publish an advisory. An active advisory is broadcast to matching users in
/// the same transaction as the insert.
pub async fn issue_advisory(
    pool: &PgPool,
    actor: &Actor,
    input: IssueAdvisory,
) -> Result<AdvisoryIssued, ServiceError> {
    actor.require_official()?;
    validate_issue_advisory(&input, Utc::now())?;

    let mut tx = pool.begin().await?;

    let advisory = sqlx::query_as::<_, Advisory>(
        r#"
        INSERT INTO advisories
            (title, description, priority, region, related_cause, preventive_measures,
             issued_by, is_active, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(input.priority)
    .bind(input.region.trim())
    .bind(input.related_cause)
    .bind(input.preventive_measures.trim())
    .bind(actor.id)
    .bind(input.is_active)
    .bind(input.expires_at)
    .fetch_one(&mut *tx)
    .await?;

    let notified_users = match dispatch::broadcast_advisory(&mut tx, &advisory).await {
        Ok(count) => count as usize,
        Err(e) => {
            tracing::error!("Advisory broadcast failed for {}: {}", advisory.id, e);
            0
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Official {} issued advisory {} for region '{}' (active: {}, notified {} users)",
        actor.username,
        advisory.id,
        advisory.region,
        advisory.is_active,
        notified_users
    );

    Ok(AdvisoryIssued {
        advisory,
        notified_users,
    })
}

/// Withdraw an advisory. Deactivation never broadcasts.
pub async fn deactivate_advisory(
    pool: &PgPool,
    actor: &Actor,
    advisory_id: Uuid,
) -> Result<Advisory, ServiceError> {
    actor.require_official()?;

    let advisory = sqlx::query_as::<_, Advisory>(
        "UPDATE advisories SET is_active = false WHERE id = $1 RETURNING *",
    )
    .bind(advisory_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound("Advisory"))?;

    tracing::info!(
        "Official {} deactivated advisory {}",
        actor.username,
        advisory.id
    );

    Ok(advisory)
}

/// Active, unexpired advisories, newest first
pub async fn list_active_advisories(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<Advisory>, ServiceError> {
    let advisories = sqlx::query_as::<_, Advisory>(
        r#"
        SELECT * FROM advisories
        WHERE is_active = true AND (expires_at IS NULL OR expires_at > NOW())
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await?;

    Ok(advisories)
}
