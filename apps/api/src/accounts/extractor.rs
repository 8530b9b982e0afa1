//! Resolves `Authorization: Bearer <token>` to a user for protected handlers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::accounts::jwt::{self, TokenType};
use crate::accounts::users;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

/// The authenticated user. Add it as a handler argument to require authentication.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided".to_string())
        })?;

        authenticate(state, token).await.map(AuthUser)
    }
}

/// Extracts the token from a `Bearer` authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Local access tokens are tried first; when that fails and a Supabase secret
/// is configured the token is verified as a Supabase token instead.
async fn authenticate(state: &AppState, token: &str) -> Result<UserRow, AppError> {
    let local_err = match jwt::validate_token(&state.config.jwt_secret, token, TokenType::Access) {
        Ok(claims) => {
            return users::find_by_id(&state.db, claims.sub)
                .await?
                .filter(|u| u.is_active)
                .ok_or_else(|| AppError::Unauthorized("User not found".to_string()));
        }
        Err(e) => e,
    };

    let Some(secret) = state.config.supabase_jwt_secret.as_deref() else {
        return Err(AppError::Unauthorized(format!("Invalid token: {local_err}")));
    };

    let claims = jwt::validate_supabase_token(secret, token).map_err(|e| {
        debug!("Token rejected locally ({local_err}) and by Supabase ({e})");
        AppError::Unauthorized(format!("Invalid token: {e}"))
    })?;

    let sub = claims.sub.unwrap_or_default();
    let email = claims.email.unwrap_or_default();
    let user = users::get_or_create_external(&state.db, &sub, &email).await?;
    if !user.is_active {
        return Err(AppError::Unauthorized("User is inactive".to_string()));
    }
    Ok(user)
}
