use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::models::Session;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

/// At least 8 characters with an upper, a lower, and a digit.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("password must be at least 8 characters");
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err("password must contain an uppercase letter, a lowercase letter and a digit");
    }
    Ok(())
}

/// QR tokens are prefixed by profile kind: COMP_* for companies, USER_*
/// for customers.
pub fn generate_qr_token(prefix: &str) -> String {
    let stamp = Utc::now().timestamp_millis();
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{stamp}_{}", &nonce[..8])
}

pub fn create_session(
    conn: &Connection,
    account_id: &str,
    ttl_hours: i64,
) -> anyhow::Result<Session> {
    let session = Session {
        token: Uuid::new_v4().to_string(),
        account_id: account_id.to_string(),
        expires_at: Utc::now().naive_utc() + Duration::hours(ttl_hours),
    };
    queries::create_session(conn, &session)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("Secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "Secret123"));
        assert!(!verify_password(&hash, "Secret124"));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("not-a-phc-string", "Secret123"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@nodot"));
        assert!(!is_valid_email("alice@.com"));
        assert!(!is_valid_email("a lice@example.com"));
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short1A").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
    }

    #[test]
    fn test_qr_token_prefix() {
        let token = generate_qr_token("COMP");
        assert!(token.starts_with("COMP_"));
        assert_eq!(token.split('_').count(), 3);
    }
}
