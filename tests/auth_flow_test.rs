// Integration tests for the authentication building blocks.
// These run without a database: hashing, verification and token issuance
// are pure library calls.

use energysaving_api::auth::{create_token, hash_password, validate_token, verify_password};

#[test]
fn test_auth_flow_integration() {
    // 1. Hash a password
    // 2. Verify the password
    // 3. Create a JWT token carrying the admin flag
    // 4. Validate the JWT token

    let password = "test-password-123";
    let username = "testuser";
    let secret = "test-secret-key";

    let password_hash = hash_password(password).unwrap();
    assert!(!password_hash.is_empty());

    assert!(verify_password(password, &password_hash).unwrap());
    assert!(!verify_password("wrong-password", &password_hash).unwrap());

    let token = create_token(username, false, secret, 24).unwrap();
    assert!(!token.is_empty());

    let claims = validate_token(&token, secret).unwrap();
    assert_eq!(claims.sub, username);
    assert!(!claims.is_admin);
}

#[test]
fn test_admin_flag_round_trips_through_token() {
    let secret = "test-secret-key";

    let admin_token = create_token("root", true, secret, 1).unwrap();
    let claims = validate_token(&admin_token, secret).unwrap();
    assert!(claims.is_admin);

    let user_token = create_token("alice", false, secret, 1).unwrap();
    let claims = validate_token(&user_token, secret).unwrap();
    assert!(!claims.is_admin);
}

#[test]
fn test_token_rejected_across_secrets() {
    let token = create_token("alice", false, "secret-a", 24).unwrap();
    assert!(validate_token(&token, "secret-b").is_err());
}

#[test]
fn test_garbage_token_rejected() {
    assert!(validate_token("not-a-jwt", "secret").is_err());
    assert!(validate_token("", "secret").is_err());
}
