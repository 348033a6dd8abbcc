use axum::{extract::State, http::StatusCode, Json};

use crate::api::models::auth::{LoginRequest, LoginResponse, RegisterRequest};
use crate::api::models::users::UserResponse;
use crate::auth::{create_token, hash_password, verify_password};
use crate::error::{AppError, Result};

use super::AppState;

/// POST /login
/// Verifies credentials and issues a JWT carrying the username and admin flag
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .users_repository
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = create_token(
        &user.username,
        user.is_admin,
        &state.auth.jwt_secret,
        state.auth.jwt_expiry_hours,
    )?;

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        is_admin: user.is_admin,
        expires_in: state.auth.jwt_expiry_hours * 3600,
    }))
}

/// POST /register
/// Creates a user; 409 when the username is taken
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let password_hash = hash_password(&payload.password)?;

    let user = state
        .users_repository
        .create(&payload.username, &password_hash, payload.is_admin)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"username":"alice","password":"secret"}"#;
        let request: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.password, "secret");
    }

    #[test]
    fn test_register_request_admin_defaults_false() {
        let json = r#"{"username":"bob","password":"secret"}"#;
        let request: RegisterRequest = serde_json::from_str(json).unwrap();
        assert!(!request.is_admin);
    }

    #[test]
    fn test_login_response_serialization() {
        let response = LoginResponse {
            token: "jwt-token".into(),
            username: "alice".into(),
            is_admin: true,
            expires_in: 86400,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token"], "jwt-token");
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["expiresIn"], 86400);
    }
}
