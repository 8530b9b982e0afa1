//! Axum route handlers for JobGPT.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::accounts::handlers::ProfileResponse;
use crate::accounts::AuthUser;
use crate::errors::AppError;
use crate::jobgpt::generator;
use crate::jobgpt::resume::{self, ResumeMatch};
use crate::models::user::UserSummary;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct WhyCompanyRequest {
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
pub struct WhyRoleRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub role_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ThankYouRequest {
    #[serde(default)]
    pub interviewer_name: String,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ResumeMatchRequest {
    #[serde(default)]
    pub job_description: String,
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(value)
}

/// POST /api/jobgpt/prompt
pub async fn handle_prompt(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<PromptRequest>,
) -> Result<Json<Value>, AppError> {
    let prompt = required("prompt", &req.prompt)?;
    let result = generator::generate_response(&state.llm, prompt).await?;
    Ok(Json(json!({ "prompt": result })))
}

/// POST /api/jobgpt/why-company
pub async fn handle_why_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<WhyCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    let company = required("company_name", &req.company_name)?;
    let result = generator::generate_why_company(&state.llm, company).await?;
    Ok(Json(json!({ "why_company": result })))
}

/// POST /api/jobgpt/why-role
pub async fn handle_why_role(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<WhyRoleRequest>,
) -> Result<Json<Value>, AppError> {
    let company = required("company_name", &req.company_name)?;
    let role = required("role_name", &req.role_name)?;
    let result = generator::generate_why_role(&state.llm, company, role).await?;
    Ok(Json(json!({ "why_role": result })))
}

/// POST /api/jobgpt/thank-you
pub async fn handle_thank_you(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<ThankYouRequest>,
) -> Result<Json<Value>, AppError> {
    let interviewer = required("interviewer_name", &req.interviewer_name)?;
    let company = required("company_name", &req.company_name)?;
    let result = generator::generate_thank_you_letter(&state.llm, interviewer, company).await?;
    Ok(Json(json!({ "thank_you_letter": result })))
}

/// POST /api/jobgpt/resume/upload (multipart, field `resume`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let filename = field.file_name().unwrap_or("resume.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("resume: No file was submitted.".to_string()))?;

    let profile = resume::store_resume(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        user.id,
        &filename,
        bytes,
    )
    .await?;

    let resume_url = match profile.resume_key.as_deref() {
        Some(key) => Some(resume::presigned_resume_url(&state.s3, &state.config.s3_bucket, key).await?),
        None => None,
    };

    Ok(Json(ProfileResponse {
        user: UserSummary::from(&user),
        resume_name: profile.resume_name,
        resume_updated_at: Some(profile.resume_updated_at),
        resume_url,
    }))
}

/// POST /api/jobgpt/resume/match
pub async fn handle_match_resume(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ResumeMatchRequest>,
) -> Result<Json<ResumeMatch>, AppError> {
    let job_description = required("job_description", &req.job_description)?;
    let result = resume::match_resume(
        &state.db,
        &state.s3,
        &state.config.s3_bucket,
        &state.llm,
        user.id,
        job_description,
    )
    .await?;
    tracing::info!("Resume match for user {}: score {}", user.id, result.match_score);
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required("prompt", "  hi  ").unwrap(), "hi");
        let err = required("company_name", "   ").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "company_name cannot be empty"));
    }

    #[test]
    fn test_missing_fields_deserialize_as_blank() {
        let req: WhyRoleRequest = serde_json::from_str(r#"{"company_name": "Stripe"}"#).unwrap();
        assert!(required("role_name", &req.role_name).is_err());
    }
}
