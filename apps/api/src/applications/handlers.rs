//! Axum route handlers for application tracking and Gmail sync.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::accounts::AuthUser;
use crate::applications::statistics::ApplicationStatistics;
use crate::applications::store::{self, ApplicationFields};
use crate::companies::store::{default_company, get_company, get_or_create_company};
use crate::errors::AppError;
use crate::gmail::{self, sync::sync_user_mailbox};
use crate::models::application::{ApplicationRow, ApplicationStatus, SOURCE_MANUAL};
use crate::models::email::GmailAccountRow;
use crate::models::user::UserRow;
use crate::pagination::{PageQuery, PageWindow, Paginated};
use crate::state::AppState;

pub const APPLICATIONS_PER_PAGE: u64 = 10;
const APPLICATIONS_PATH: &str = "/api/applications";

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationPayload {
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationPage {
    #[serde(flatten)]
    pub page: Paginated<ApplicationRow>,
    pub statistics: ApplicationStatistics,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GmailAccountRequest {
    pub email: String,
    pub refresh_token: String,
}

/// Merges a payload over an existing application (PATCH) or builds a new one
/// (POST/PUT). The company has already been resolved by the caller.
pub fn merge_payload(
    existing: Option<&ApplicationRow>,
    payload: ApplicationPayload,
    company_id: Uuid,
) -> Result<ApplicationFields, AppError> {
    let position = payload
        .position
        .map(|p| p.trim().to_string())
        .or_else(|| existing.map(|a| a.position.clone()))
        .unwrap_or_default();
    if position.is_empty() {
        return Err(AppError::Validation("position: This field is required.".to_string()));
    }

    let status = match payload.status {
        Some(raw) => raw.parse::<ApplicationStatus>().map_err(AppError::Validation)?,
        None => existing
            .and_then(|a| a.status.parse().ok())
            .unwrap_or_default(),
    };

    let source = payload
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| existing.map(|a| a.source.clone()))
        .unwrap_or_else(|| SOURCE_MANUAL.to_string());

    Ok(ApplicationFields {
        company_id,
        position,
        status,
        notes: payload
            .notes
            .or_else(|| existing.map(|a| a.notes.clone()))
            .unwrap_or_default(),
        source,
        email_id: existing.and_then(|a| a.email_id.clone()),
        applied_date: payload.applied_date,
    })
}

/// The address to sync: the one given, else the account email.
pub fn resolve_sync_email(requested: Option<String>, user: &UserRow) -> Result<String, AppError> {
    requested
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .or_else(|| Some(user.email.trim().to_string()).filter(|e| !e.is_empty()))
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))
}

/// Picks the company for a write: explicit id, else name (get-or-create),
/// else the existing record's company, else the default company.
async fn resolve_company(
    state: &AppState,
    payload: &ApplicationPayload,
    existing: Option<&ApplicationRow>,
) -> Result<Uuid, AppError> {
    if let Some(id) = payload.company_id {
        return get_company(&state.db, id)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")));
    }
    if let Some(name) = payload.company_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(get_or_create_company(&state.db, &state.http, name).await?.id);
    }
    if let Some(application) = existing {
        return Ok(application.company_id);
    }
    Ok(default_company(&state.db).await?.id)
}

/// Someone else's application is reported exactly like a missing one.
fn owned_by(application: Option<ApplicationRow>, user_id: Uuid, id: Uuid) -> Result<ApplicationRow, AppError> {
    application
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

async fn load_owned(state: &AppState, user: &UserRow, id: Uuid) -> Result<ApplicationRow, AppError> {
    let application = store::get_owned_application(&state.db, id, user.id).await?;
    owned_by(application, user.id, id)
}

async fn reload(state: &AppState, id: Uuid) -> Result<ApplicationRow, AppError> {
    store::get_application(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

fn map_duplicate(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
            "An application for this company, position and date already exists".to_string(),
        ),
        _ => AppError::Database(e),
    }
}

/// GET /api/applications?page=N
pub async fn handle_list_applications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApplicationPage>, AppError> {
    let total = store::count_for_user(&state.db, user.id).await?.max(0) as u64;
    let window = PageWindow::resolve(query.requested(), total, APPLICATIONS_PER_PAGE);
    let results = store::list_for_user(
        &state.db,
        user.id,
        window.per_page as i64,
        window.offset as i64,
    )
    .await?;
    let counts = store::status_counts(&state.db, user.id).await?;

    Ok(Json(ApplicationPage {
        page: Paginated::new(APPLICATIONS_PATH, window, total, results),
        statistics: ApplicationStatistics::from_counts(&counts),
    }))
}

/// POST /api/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ApplicationPayload>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let company_id = resolve_company(&state, &payload, None).await?;
    let fields = merge_payload(None, payload, company_id)?;
    let id = store::insert_application(&state.db, user.id, &fields)
        .await
        .map_err(map_duplicate)?;
    tracing::info!("User {} logged application {id}", user.id);
    Ok((StatusCode::CREATED, Json(reload(&state, id).await?)))
}

/// GET /api/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRow>, AppError> {
    Ok(Json(load_owned(&state, &user, id).await?))
}

/// PUT /api/applications/:id
pub async fn handle_replace_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<Json<ApplicationRow>, AppError> {
    let existing = load_owned(&state, &user, id).await?;
    let company_id = resolve_company(&state, &payload, None).await?;
    let mut fields = merge_payload(None, payload, company_id)?;
    fields.email_id = existing.email_id;
    store::update_application(&state.db, id, &fields)
        .await
        .map_err(map_duplicate)?;
    Ok(Json(reload(&state, id).await?))
}

/// PATCH /api/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<Json<ApplicationRow>, AppError> {
    let existing = load_owned(&state, &user, id).await?;
    let company_id = resolve_company(&state, &payload, Some(&existing)).await?;
    let fields = merge_payload(Some(&existing), payload, company_id)?;
    store::update_application(&state.db, id, &fields)
        .await
        .map_err(map_duplicate)?;
    Ok(Json(reload(&state, id).await?))
}

/// DELETE /api/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned(&state, &user, id).await?;
    store::delete_application(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/applications/sync-gmail
pub async fn handle_sync_gmail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<Value>, AppError> {
    let requested = body.and_then(|Json(req)| req.email);
    let email = resolve_sync_email(requested, &user)?;

    let synced = sync_user_mailbox(&state, user.id, &email).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Successfully synced {} applications", synced.len()),
        "data": synced,
    })))
}

/// PUT /api/gmail/account
pub async fn handle_link_gmail_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<GmailAccountRequest>,
) -> Result<Json<GmailAccountRow>, AppError> {
    let email = req.email.trim();
    let refresh_token = req.refresh_token.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("email: Enter a valid email address.".to_string()));
    }
    if refresh_token.is_empty() {
        return Err(AppError::Validation("refresh_token: This field is required.".to_string()));
    }

    let account = gmail::store::upsert_account(&state.db, user.id, email, refresh_token).await?;
    tracing::info!("Linked Gmail account {email} for user {}", user.id);
    Ok(Json(account))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "ada".into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: None,
            external_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn existing() -> ApplicationRow {
        ApplicationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            company_name: "Initech".into(),
            position: "Data Engineer".into(),
            status: "OA".into(),
            applied_date: Utc::now(),
            last_updated: Utc::now(),
            notes: "Referred by Bob".into(),
            source: "Gmail".into(),
            email_id: Some("m-1".into()),
        }
    }

    #[test]
    fn test_create_defaults() {
        let fields = merge_payload(
            None,
            ApplicationPayload {
                position: Some(" Backend Engineer ".into()),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .unwrap();
        assert_eq!(fields.position, "Backend Engineer");
        assert_eq!(fields.status, ApplicationStatus::Applied);
        assert_eq!(fields.source, SOURCE_MANUAL);
        assert!(fields.email_id.is_none());
        assert!(fields.applied_date.is_none());
    }

    #[test]
    fn test_position_required_on_create() {
        let err = merge_payload(None, ApplicationPayload::default(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("position")));
    }

    #[test]
    fn test_invalid_status_rejected() {
        let payload = ApplicationPayload {
            position: Some("SWE".into()),
            status: Some("ONSITE".into()),
            ..Default::default()
        };
        assert!(matches!(
            merge_payload(None, payload, Uuid::new_v4()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_keeps_existing_fields() {
        let app = existing();
        let fields = merge_payload(
            Some(&app),
            ApplicationPayload {
                status: Some("vo".into()),
                ..Default::default()
            },
            app.company_id,
        )
        .unwrap();
        assert_eq!(fields.status, ApplicationStatus::Vo);
        assert_eq!(fields.position, "Data Engineer");
        assert_eq!(fields.notes, "Referred by Bob");
        assert_eq!(fields.source, "Gmail");
        assert_eq!(fields.email_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn test_sync_email_prefers_request() {
        let u = user("ada@example.com");
        assert_eq!(
            resolve_sync_email(Some(" work@example.com ".into()), &u).unwrap(),
            "work@example.com"
        );
        assert_eq!(resolve_sync_email(Some("".into()), &u).unwrap(), "ada@example.com");
        assert_eq!(resolve_sync_email(None, &u).unwrap(), "ada@example.com");
    }

    #[test]
    fn test_sync_email_required() {
        let err = resolve_sync_email(None, &user("")).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Email is required"));
    }

    #[test]
    fn test_page_envelope_flattens_statistics() {
        let window = PageWindow::resolve(Some(1), 0, APPLICATIONS_PER_PAGE);
        let page = ApplicationPage {
            page: Paginated::new(APPLICATIONS_PATH, window, 0, Vec::new()),
            statistics: ApplicationStatistics::from_counts(&[("OFFER".into(), 1)]),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["count"], 0);
        assert!(json["next"].is_null());
        assert_eq!(json["statistics"]["offer"], 1);
        assert!(json["results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_application_is_not_found() {
        let application = existing();
        let id = application.id;

        let err = owned_by(Some(application.clone()), Uuid::new_v4(), id).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = owned_by(None, application.user_id, id).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let owner = application.user_id;
        assert_eq!(owned_by(Some(application), owner, id).unwrap().id, id);
    }
}
