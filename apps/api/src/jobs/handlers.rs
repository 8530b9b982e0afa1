//! Axum route handlers for the Job API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::accounts::AuthUser;
use crate::companies::store::get_company;
use crate::errors::AppError;
use crate::jobs::store::{self, JobFields};
use crate::models::job::{EmploymentType, JobRow, JobStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub company: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobPayload {
    pub title: Option<String>,
    pub company: Option<Uuid>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub employment_type: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

fn required(field: &str, value: String) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field}: This field is required.")));
    }
    Ok(value.trim().to_string())
}

/// Merges a payload over an existing job (PATCH) or builds a new one (POST/PUT).
pub fn merge_payload(existing: Option<&JobRow>, payload: JobPayload) -> Result<JobFields, AppError> {
    let text = |new: Option<String>, old: Option<&String>| -> String {
        new.or_else(|| old.cloned()).unwrap_or_default()
    };

    let company_id = payload
        .company
        .or(existing.map(|j| j.company_id))
        .ok_or_else(|| AppError::Validation("company: This field is required.".to_string()))?;

    let employment_type = match payload.employment_type {
        Some(raw) => raw.parse::<EmploymentType>().map_err(AppError::Validation)?,
        None => existing
            .and_then(|j| j.employment_type.parse().ok())
            .unwrap_or_default(),
    };
    let status = match payload.status {
        Some(raw) => raw.parse::<JobStatus>().map_err(AppError::Validation)?,
        None => existing
            .and_then(|j| j.status.parse().ok())
            .unwrap_or_default(),
    };

    Ok(JobFields {
        title: required("title", text(payload.title, existing.map(|j| &j.title)))?,
        company_id,
        description: required(
            "description",
            text(payload.description, existing.map(|j| &j.description)),
        )?,
        requirements: text(payload.requirements, existing.map(|j| &j.requirements)),
        location: required("location", text(payload.location, existing.map(|j| &j.location)))?,
        salary_range: text(payload.salary_range, existing.map(|j| &j.salary_range)),
        employment_type,
        status,
        deadline: payload.deadline.or(existing.and_then(|j| j.deadline)),
    })
}

async fn ensure_company(state: &AppState, company_id: Uuid) -> Result<(), AppError> {
    get_company(&state.db, company_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Company {company_id} not found")))
}

async fn load_job(state: &AppState, id: Uuid) -> Result<JobRow, AppError> {
    store::get_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// GET /api/jobs?company=<id>
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(store::list_jobs(&state.db, query.company).await?))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(load_job(&state, id).await?))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<JobPayload>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let fields = merge_payload(None, payload)?;
    ensure_company(&state, fields.company_id).await?;
    let id = store::insert_job(&state.db, &fields).await?;
    Ok((StatusCode::CREATED, Json(load_job(&state, id).await?)))
}

/// PUT /api/jobs/:id
pub async fn handle_replace_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPayload>,
) -> Result<Json<JobRow>, AppError> {
    let fields = merge_payload(None, payload)?;
    ensure_company(&state, fields.company_id).await?;
    if !store::replace_job(&state.db, id, &fields).await? {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(Json(load_job(&state, id).await?))
}

/// PATCH /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPayload>,
) -> Result<Json<JobRow>, AppError> {
    let existing = load_job(&state, id).await?;
    let fields = merge_payload(Some(&existing), payload)?;
    if fields.company_id != existing.company_id {
        ensure_company(&state, fields.company_id).await?;
    }
    store::replace_job(&state.db, id, &fields).await?;
    Ok(Json(load_job(&state, id).await?))
}

/// DELETE /api/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !store::delete_job(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/jobs/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    load_job(&state, id).await?;
    store::add_applicant(&state.db, id, user.id).await?;
    tracing::info!("User {} applied to job {id}", user.id);
    Ok(Json(json!({ "status": "application submitted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> JobPayload {
        JobPayload {
            title: Some("Backend Engineer".into()),
            company: Some(Uuid::new_v4()),
            description: Some("Build APIs".into()),
            location: Some("Remote".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_job_defaults() {
        let fields = merge_payload(None, payload()).unwrap();
        assert_eq!(fields.employment_type, EmploymentType::FullTime);
        assert_eq!(fields.status, JobStatus::Open);
        assert!(fields.requirements.is_empty());
    }

    #[test]
    fn test_missing_company_rejected() {
        let mut p = payload();
        p.company = None;
        assert!(matches!(merge_payload(None, p), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut p = payload();
        p.title = Some("  ".into());
        let err = merge_payload(None, p).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("title")));
    }

    #[test]
    fn test_unknown_employment_type_rejected() {
        let mut p = payload();
        p.employment_type = Some("GIG".into());
        assert!(merge_payload(None, p).is_err());
    }

    #[test]
    fn test_patch_keeps_existing_values() {
        let existing = JobRow {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            company_id: Uuid::new_v4(),
            company_name: "Acme".into(),
            description: "Build APIs".into(),
            requirements: "Rust".into(),
            location: "Remote".into(),
            salary_range: "$150k".into(),
            employment_type: "CONTRACT".into(),
            status: "DRAFT".into(),
            applicants: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deadline: None,
        };
        let fields = merge_payload(
            Some(&existing),
            JobPayload {
                status: Some("open".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(fields.company_id, existing.company_id);
        assert_eq!(fields.employment_type, EmploymentType::Contract);
        assert_eq!(fields.status, JobStatus::Open);
        assert_eq!(fields.requirements, "Rust");
    }
}
