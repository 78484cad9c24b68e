//! User registration and profile
//!
//! Credentials live with the authentication gateway; this service stores the
//! profile and role only.

use crate::error::{is_unique_violation, ServiceError};
use crate::lifecycle::Actor;
use crate::models::*;
use crate::validation::{normalize_optional, validate_register_user, ValidationError};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Extension, Json};
use sqlx::PgPool;

use super::{json_body, AppState};

/// Register a user profile. The official role can only be self-assigned
/// while official registration is open.
pub async fn create_user(
    pool: &PgPool,
    input: RegisterUser,
    allow_official_registration: bool,
) -> Result<User, ServiceError> {
    validate_register_user(&input)?;

    if input.role == Role::Official && !allow_official_registration {
        return Err(ServiceError::Authorization(
            "Official registration is closed",
        ));
    }

    // Organization is only meaningful for officials
    let organization = match input.role {
        Role::Official => normalize_optional(input.organization.as_deref()),
        Role::Public => None,
    };

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, role, organization, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(input.username.trim())
    .bind(normalize_optional(input.email.as_deref()))
    .bind(input.role)
    .bind(organization)
    .bind(normalize_optional(input.phone.as_deref()))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::Validation(ValidationError::UsernameTaken)
        } else {
            ServiceError::from(e)
        }
    })?;

    tracing::info!(
        "Registered user {} as {}",
        user.username,
        user.role.label()
    );

    Ok(user)
}

/// Register a new user
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ServiceError> {
    let input = json_body(payload)?;
    let user = create_user(&state.pool, input, state.allow_official_registration).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Get the calling user's profile
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<User>>, ServiceError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(actor.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    Ok(Json(ApiResponse::success(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[tokio::test]
    async fn test_official_registration_closed() {
        let input = RegisterUser {
            username: "dr.mensah".to_string(),
            email: None,
            role: Role::Official,
            organization: Some("District Health Office".to_string()),
            phone: None,
        };

        let result = create_user(&lazy_pool(), input, false).await;
        assert!(matches!(result, Err(ServiceError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_invalid_username_rejected_before_storage() {
        let input = RegisterUser {
            username: "drop table".to_string(),
            email: None,
            role: Role::Public,
            organization: None,
            phone: None,
        };

        let result = create_user(&lazy_pool(), input, true).await;
        assert!(matches!(
            result,
            Err(ServiceError::Validation(ValidationError::InvalidUsername))
        ));
    }
}
