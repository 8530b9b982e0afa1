//! JWT token creation and validation.
//!
//! Local tokens come in access/refresh pairs signed with `JWT_SECRET`.
//! Supabase access tokens are verified separately with `SUPABASE_JWT_SECRET`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ACCESS_TOKEN_LIFETIME_MINUTES: i64 = 60;
pub const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 1;
/// Clock skew tolerated on `iat`, matching the `exp` leeway of `Validation`.
const IAT_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token has wrong type: expected {expected:?}")]
    WrongType { expected: TokenType },

    #[error("token has no subject")]
    MissingSubject,

    #[error("token was issued in the future")]
    IssuedInFuture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Claims we read from a Supabase access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub iat: Option<i64>,
    pub exp: i64,
}

/// `jsonwebtoken` validates `exp` but never `iat`.
fn check_issued_at(iat: Option<i64>) -> Result<(), TokenError> {
    match iat {
        Some(iat) if iat > Utc::now().timestamp() + IAT_LEEWAY_SECS => Err(TokenError::IssuedInFuture),
        _ => Ok(()),
    }
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    token_type: TokenType,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let lifetime = match token_type {
        TokenType::Access => Duration::minutes(ACCESS_TOKEN_LIFETIME_MINUTES),
        TokenType::Refresh => Duration::days(REFRESH_TOKEN_LIFETIME_DAYS),
    };

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        token_type,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn issue_pair(
    secret: &str,
    user_id: Uuid,
    username: &str,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    Ok(TokenPair {
        access: issue_token(secret, user_id, username, TokenType::Access)?,
        refresh: issue_token(secret, user_id, username, TokenType::Refresh)?,
    })
}

/// Validates a local token and checks that it is of the expected type.
pub fn validate_token(secret: &str, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    check_issued_at(Some(data.claims.iat))?;
    if data.claims.token_type != expected {
        return Err(TokenError::WrongType { expected });
    }
    Ok(data.claims)
}

/// Validates a Supabase-issued HS256 token. The audience is not checked.
pub fn validate_supabase_token(secret: &str, token: &str) -> Result<SupabaseClaims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let data = decode::<SupabaseClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    check_issued_at(data.claims.iat)?;

    match data.claims.sub.as_deref() {
        Some(sub) if !sub.is_empty() => Ok(data.claims),
        _ => Err(TokenError::MissingSubject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret-key-for-testing-only";

    fn sign(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let user_id = Uuid::new_v4();
        let pair = issue_pair(SECRET, user_id, "ada").unwrap();

        let claims = validate_token(SECRET, &pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_LIFETIME_MINUTES * 60);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let pair = issue_pair(SECRET, Uuid::new_v4(), "ada").unwrap();
        let err = validate_token(SECRET, &pair.refresh, TokenType::Access).unwrap_err();
        assert!(matches!(err, TokenError::WrongType { .. }));
        assert!(validate_token(SECRET, &pair.refresh, TokenType::Refresh).is_ok());
        assert!(validate_token(SECRET, &pair.access, TokenType::Refresh).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = issue_pair(SECRET, Uuid::new_v4(), "ada").unwrap();
        assert!(validate_token("wrong-secret", &pair.access, TokenType::Access).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(
            json!({
                "sub": Uuid::new_v4(),
                "username": "ada",
                "token_type": "access",
                "iat": now - 7200,
                "exp": now - 3600,
            }),
            SECRET,
        );
        assert!(validate_token(SECRET, &token, TokenType::Access).is_err());
    }

    #[test]
    fn test_supabase_token_with_audience_is_accepted() {
        let exp = Utc::now().timestamp() + 600;
        let token = sign(
            json!({
                "sub": "6f1c2b9e-supabase-user",
                "email": "ada@example.com",
                "aud": "authenticated",
                "role": "authenticated",
                "exp": exp,
            }),
            "supabase-secret",
        );
        let claims = validate_supabase_token("supabase-secret", &token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("6f1c2b9e-supabase-user"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_supabase_token_without_subject_rejected() {
        let exp = Utc::now().timestamp() + 600;
        let token = sign(json!({ "email": "ada@example.com", "exp": exp }), "supabase-secret");
        let err = validate_supabase_token("supabase-secret", &token).unwrap_err();
        assert!(matches!(err, TokenError::MissingSubject));
    }

    #[test]
    fn test_token_issued_in_the_future_rejected() {
        let now = Utc::now().timestamp();
        let token = sign(
            json!({ "sub": "supabase-user", "iat": now + 3600, "exp": now + 7200 }),
            "supabase-secret",
        );
        let err = validate_supabase_token("supabase-secret", &token).unwrap_err();
        assert!(matches!(err, TokenError::IssuedInFuture));

        let local = sign(
            json!({
                "sub": Uuid::new_v4(),
                "username": "ada",
                "token_type": "access",
                "iat": now + 3600,
                "exp": now + 7200,
            }),
            SECRET,
        );
        let err = validate_token(SECRET, &local, TokenType::Access).unwrap_err();
        assert!(matches!(err, TokenError::IssuedInFuture));
    }

    #[test]
    fn test_small_clock_skew_on_iat_is_tolerated() {
        let now = Utc::now().timestamp();
        let token = sign(
            json!({ "sub": "supabase-user", "iat": now + 5, "exp": now + 600 }),
            "supabase-secret",
        );
        assert!(validate_supabase_token("supabase-secret", &token).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_token(SECRET, "not-a-jwt", TokenType::Access).is_err());
        assert!(validate_supabase_token(SECRET, "not-a-jwt").is_err());
    }
}
