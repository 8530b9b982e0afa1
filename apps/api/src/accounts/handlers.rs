//! Axum route handlers for registration, tokens and the current user.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::accounts::extractor::AuthUser;
use crate::accounts::jwt::{self, TokenPair, TokenType};
use crate::accounts::password::{hash_password, validate_new_password, verify_password};
use crate::accounts::users::{self, NewUser, UserUpdate};
use crate::errors::AppError;
use crate::jobgpt::resume::{find_profile, presigned_resume_url};
use crate::models::user::UserSummary;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password2: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserSummary,
    pub resume_name: Option<String>,
    pub resume_updated_at: Option<DateTime<Utc>>,
    pub resume_url: Option<String>,
}

/// Checks a registration request without touching the database.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("username is required".to_string()));
    }
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::Validation("Enter a valid email address.".to_string()));
    }
    if req.password != req.password2 {
        return Err(AppError::Validation(
            "Password fields didn't match.".to_string(),
        ));
    }
    let problems = validate_new_password(&req.password, &req.username);
    if !problems.is_empty() {
        return Err(AppError::Validation(problems.join(" ")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserSummary>), AppError> {
    validate_registration(&req)?;
    let username = req.username.trim();

    if users::find_by_username(&state.db, username).await?.is_some() {
        return Err(AppError::Conflict(
            "A user with that username already exists.".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user = users::create_user(
        &state.db,
        NewUser {
            username,
            email: req.email.trim(),
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            password_hash: &password_hash,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("A user with that username already exists.".to_string())
        }
        other => AppError::Database(other),
    })?;

    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

/// POST /api/auth/login
///
/// Returns an access/refresh token pair.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let invalid =
        || AppError::Unauthorized("No active account found with the given credentials".to_string());

    let user = users::find_by_login(&state.db, req.username.trim())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&req.password, hash) {
        return Err(invalid());
    }

    let pair = jwt::issue_pair(&state.config.jwt_secret, user.id, &user.username)
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(pair))
}

/// POST /api/auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let claims = jwt::validate_token(&state.config.jwt_secret, &req.refresh, TokenType::Refresh)
        .map_err(|e| AppError::Unauthorized(format!("Token is invalid or expired: {e}")))?;

    let access = jwt::issue_token(
        &state.config.jwt_secret,
        claims.sub,
        &claims.username,
        TokenType::Access,
    )
    .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(RefreshResponse { access }))
}

/// POST /api/token/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Value>, AppError> {
    let secret = &state.config.jwt_secret;
    let valid = jwt::validate_token(secret, &req.token, TokenType::Access).is_ok()
        || jwt::validate_token(secret, &req.token, TokenType::Refresh).is_ok();
    if !valid {
        return Err(AppError::Unauthorized(
            "Token is invalid or expired".to_string(),
        ));
    }
    Ok(Json(json!({})))
}

/// GET /api/auth/user
pub async fn handle_get_user(AuthUser(user): AuthUser) -> Json<UserSummary> {
    Json(UserSummary::from(&user))
}

/// PATCH /api/auth/user
pub async fn handle_update_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserSummary>, AppError> {
    if let Some(email) = &req.email {
        if !email.trim().is_empty() && !email.contains('@') {
            return Err(AppError::Validation("Enter a valid email address.".to_string()));
        }
    }
    let update = UserUpdate {
        email: req.email.map(|e| e.trim().to_string()),
        first_name: req.first_name,
        last_name: req.last_name,
    };
    let updated = users::update_user(&state.db, user.id, &update).await?;
    Ok(Json(UserSummary::from(&updated)))
}

/// GET /api/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = find_profile(&state.db, user.id).await?;

    let resume_url = match profile.as_ref().and_then(|p| p.resume_key.as_deref()) {
        Some(key) => Some(presigned_resume_url(&state.s3, &state.config.s3_bucket, key).await?),
        None => None,
    };

    Ok(Json(ProfileResponse {
        user: UserSummary::from(&user),
        resume_name: profile.as_ref().and_then(|p| p.resume_name.clone()),
        resume_updated_at: profile.as_ref().map(|p| p.resume_updated_at),
        resume_url,
    }))
}
