use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// username
    pub sub: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

pub fn create_token(
    username: &str,
    is_admin: bool,
    secret: &str,
    expiry_hours: u64,
) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: username.to_string(),
        is_admin,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_validate_token() {
        let token = create_token("alice", false, "test-secret-key", 24).unwrap();
        assert!(!token.is_empty());

        let claims = validate_token(&token, "test-secret-key").unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_token_carries_admin_flag() {
        let token = create_token("root", true, "test-secret-key", 1).unwrap();
        let claims = validate_token(&token, "test-secret-key").unwrap();
        assert!(claims.is_admin);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let token = create_token("alice", false, "test-secret-key", 24).unwrap();
        assert!(validate_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_validate_token_expired() {
        let now = Utc::now();
        let claims = Claims {
            sub: "alice".into(),
            is_admin: false,
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-key".as_ref()),
        )
        .unwrap();

        assert!(validate_token(&token, "test-secret-key").is_err());
    }
}
