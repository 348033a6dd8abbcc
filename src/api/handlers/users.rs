use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::api::models::users::{UserCreate, UserResponse, UsersListResponse};
use crate::auth::{hash_password, Claims};
use crate::error::{AppError, Result};

use super::AppState;

fn require_admin(claims: &Claims) -> Result<()> {
    if !claims.is_admin {
        return Err(AppError::Forbidden("Admin privileges required".to_string()));
    }
    Ok(())
}

/// GET /users
pub async fn get_all_users(State(state): State<AppState>) -> Result<Json<UsersListResponse>> {
    let users = state.users_repository.get_all().await?;

    Ok(Json(UsersListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// POST /users
/// Admin-only user creation
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(create): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    require_admin(&claims)?;

    let password_hash = hash_password(&create.password)?;
    let user = state
        .users_repository
        .create(&create.username, &password_hash, create.is_admin)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// DELETE /users/{username}
/// Admin-only user removal
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    require_admin(&claims)?;

    state.users_repository.delete(&username).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(is_admin: bool) -> Claims {
        Claims {
            sub: "tester".into(),
            is_admin,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_require_admin_accepts_admin() {
        assert!(require_admin(&claims(true)).is_ok());
    }

    #[test]
    fn test_require_admin_rejects_regular_user() {
        assert!(matches!(
            require_admin(&claims(false)),
            Err(AppError::Forbidden(_))
        ));
    }
}
