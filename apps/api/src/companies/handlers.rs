//! Axum route handlers for the Company API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::accounts::AuthUser;
use crate::applications::store::list_for_company_name;
use crate::companies::identify::{identify_company, CompanyInfo};
use crate::companies::store::{self, CompanyFields};
use crate::errors::AppError;
use crate::models::application::ApplicationRow;
use crate::models::company::CompanyRow;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CompanyPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    pub name: String,
}

fn validate_url(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Ok(());
    }
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::Validation(format!("{field}: Enter a valid URL."))),
    }
}

/// Merges a payload over an existing company (PATCH) or over empty defaults
/// (POST/PUT). The resulting name must be non-empty.
pub fn merge_payload(existing: Option<&CompanyRow>, payload: CompanyPayload) -> Result<CompanyFields, AppError> {
    let pick = |new: Option<String>, old: Option<&String>| -> String {
        new.map(|s| s.trim().to_string())
            .or_else(|| old.cloned())
            .unwrap_or_default()
    };

    let fields = CompanyFields {
        name: pick(payload.name, existing.map(|c| &c.name)),
        description: pick(payload.description, existing.map(|c| &c.description)),
        industry: pick(payload.industry, existing.map(|c| &c.industry)),
        website: pick(payload.website, existing.map(|c| &c.website)),
        logo_url: pick(payload.logo_url, existing.map(|c| &c.logo_url)),
        location: pick(payload.location, existing.map(|c| &c.location)),
    };

    if fields.name.is_empty() {
        return Err(AppError::Validation("name: This field is required.".to_string()));
    }
    validate_url("website", &fields.website)?;
    validate_url("logo_url", &fields.logo_url)?;
    Ok(fields)
}

/// GET /api/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyRow>>, AppError> {
    Ok(Json(store::list_companies(&state.db).await?))
}

/// GET /api/companies/:id
pub async fn handle_get_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyRow>, AppError> {
    store::get_company(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))
}

/// POST /api/companies
pub async fn handle_create_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CompanyPayload>,
) -> Result<(StatusCode, Json<CompanyRow>), AppError> {
    let fields = merge_payload(None, payload)?;
    let company = store::insert_company(&state.db, &fields).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// PUT /api/companies/:id
pub async fn handle_replace_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompanyPayload>,
) -> Result<Json<CompanyRow>, AppError> {
    let fields = merge_payload(None, payload)?;
    store::replace_company(&state.db, id, &fields)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))
}

/// PATCH /api/companies/:id
pub async fn handle_update_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompanyPayload>,
) -> Result<Json<CompanyRow>, AppError> {
    let existing = store::get_company(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))?;
    let fields = merge_payload(Some(&existing), payload)?;
    store::replace_company(&state.db, id, &fields)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Company {id} not found")))
}

/// DELETE /api/companies/:id
pub async fn handle_delete_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !store::delete_company(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Company {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/companies/by-name/:name/applications
///
/// The caller's applications at the named company.
pub async fn handle_company_applications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    tracing::info!("Listing applications at {name} for user {}", user.id);
    Ok(Json(list_for_company_name(&state.db, user.id, &name).await?))
}

/// POST /api/companies/identify
pub async fn handle_identify_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<IdentifyRequest>,
) -> Result<Json<CompanyInfo>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    Ok(Json(identify_company(&state.llm, &state.http, name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn existing() -> CompanyRow {
        CompanyRow {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            description: "Anvils".into(),
            industry: "Manufacturing".into(),
            website: "https://www.acme.com".into(),
            logo_url: String::new(),
            location: "Desert, AZ".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_requires_name() {
        let err = merge_payload(None, CompanyPayload::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let company = existing();
        let fields = merge_payload(
            Some(&company),
            CompanyPayload {
                location: Some("  Phoenix, AZ ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(fields.name, "Acme");
        assert_eq!(fields.description, "Anvils");
        assert_eq!(fields.location, "Phoenix, AZ");
    }

    #[test]
    fn test_invalid_website_rejected() {
        let err = merge_payload(
            None,
            CompanyPayload {
                name: Some("Acme".into()),
                website: Some("acme dot com".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("website")));
    }

    #[test]
    fn test_blank_urls_allowed() {
        let fields = merge_payload(
            None,
            CompanyPayload {
                name: Some("Acme".into()),
                website: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(fields.website.is_empty());
    }
}
