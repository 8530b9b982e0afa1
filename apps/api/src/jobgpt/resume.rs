//! Resume storage and resume/job-description matching.

use std::time::Duration;

use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client as S3Client};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::prompts::{RESUME_MATCH_ROLE, RESUME_MATCH_TEMPLATE};
use crate::companies::identify::truncate_chars;
use crate::errors::AppError;
use crate::llm_client::{
    prompts::{fill, json_system},
    LlmClient,
};
use crate::models::profile::UserProfileRow;

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
const PRESIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);
/// Resume and job description text sent to the model are cut to this many characters.
const MATCH_TEXT_LIMIT: usize = 12_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeMatch {
    pub match_score: u32,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Raw model output. The score may arrive as a float or out of range.
#[derive(Debug, Deserialize)]
struct RawResumeMatch {
    match_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl From<RawResumeMatch> for ResumeMatch {
    fn from(raw: RawResumeMatch) -> Self {
        let score = if raw.match_score.is_finite() {
            raw.match_score.round().clamp(0.0, 100.0) as u32
        } else {
            0
        };
        ResumeMatch {
            match_score: score,
            strengths: raw.strengths,
            gaps: raw.gaps,
            suggestions: raw.suggestions,
        }
    }
}

pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    resume_key: &str,
    resume_name: &str,
) -> Result<UserProfileRow, sqlx::Error> {
    sqlx::query_as::<_, UserProfileRow>(
        r#"
        INSERT INTO user_profiles (user_id, resume_key, resume_name, resume_updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            resume_key = EXCLUDED.resume_key,
            resume_name = EXCLUDED.resume_name,
            resume_updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(resume_key)
    .bind(resume_name)
    .fetch_one(pool)
    .await
}

/// Keeps the file name usable as part of an object key.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned
    }
}

pub fn resume_key(user_id: Uuid, filename: &str) -> String {
    format!("resumes/{user_id}/{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}

/// Size and PDF signature check for an uploaded resume.
pub fn validate_resume(bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("resume: The submitted file is empty.".to_string()));
    }
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(format!(
            "resume: File too large ({} bytes, limit {MAX_RESUME_BYTES})",
            bytes.len()
        )));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(AppError::Validation("resume: Only PDF files are accepted.".to_string()));
    }
    Ok(())
}

/// Stores the PDF and points the user's profile at it.
pub async fn store_resume(
    pool: &PgPool,
    s3: &S3Client,
    bucket: &str,
    user_id: Uuid,
    filename: &str,
    bytes: Bytes,
) -> Result<UserProfileRow, AppError> {
    validate_resume(&bytes)?;
    let key = resume_key(user_id, filename);

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type("application/pdf")
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Resume upload failed: {e}")))?;
    info!("Uploaded resume to s3://{bucket}/{key}");

    Ok(upsert_profile(pool, user_id, &key, filename).await?)
}

pub async fn presigned_resume_url(s3: &S3Client, bucket: &str, key: &str) -> Result<String, AppError> {
    let config = PresigningConfig::expires_in(PRESIGNED_URL_TTL)
        .map_err(|e| AppError::S3(format!("Invalid presigning config: {e}")))?;
    let request = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(config)
        .await
        .map_err(|e| AppError::S3(format!("Presigning failed: {e}")))?;
    Ok(request.uri().to_string())
}

async fn download_resume(s3: &S3Client, bucket: &str, key: &str) -> Result<Vec<u8>, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("Resume download failed: {e}")))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::S3(format!("Resume download failed: {e}")))?;
    Ok(data.into_bytes().to_vec())
}

/// Text of a PDF. Parsing runs on the blocking pool.
pub async fn extract_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Validation(format!("Could not read the stored resume: {e}")))?;
    Ok(text.trim().to_string())
}

pub fn build_match_prompt(resume: &str, job_description: &str) -> String {
    fill(
        RESUME_MATCH_TEMPLATE,
        &[
            ("resume", &truncate_chars(resume, MATCH_TEXT_LIMIT)),
            ("job_description", &truncate_chars(job_description, MATCH_TEXT_LIMIT)),
        ],
    )
}

/// Compares the user's stored resume with a job description.
pub async fn match_resume(
    pool: &PgPool,
    s3: &S3Client,
    bucket: &str,
    llm: &LlmClient,
    user_id: Uuid,
    job_description: &str,
) -> Result<ResumeMatch, AppError> {
    let key = find_profile(pool, user_id)
        .await?
        .and_then(|p| p.resume_key)
        .ok_or_else(|| AppError::NotFound("No resume on file. Upload one first.".to_string()))?;

    let bytes = download_resume(s3, bucket, &key).await?;
    let resume_text = extract_text(bytes).await?;
    if resume_text.is_empty() {
        return Err(AppError::Validation(
            "The stored resume contains no extractable text".to_string(),
        ));
    }

    let raw: RawResumeMatch = llm
        .call_json(
            &build_match_prompt(&resume_text, job_description),
            &json_system(RESUME_MATCH_ROLE),
        )
        .await
        .map_err(|e| AppError::Llm(format!("Failed to match resume: {e}")))?;

    Ok(raw.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Resume (2024).pdf"), "My_Resume__2024_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(sanitize_filename("..."), "resume.pdf");
    }

    #[test]
    fn test_resume_key_layout() {
        let user = Uuid::new_v4();
        let key = resume_key(user, "cv.pdf");
        let prefix = format!("resumes/{user}/");
        assert!(key.starts_with(&prefix));
        let rest = &key[prefix.len()..];
        // <uuid>-cv.pdf
        assert!(rest.ends_with("-cv.pdf"));
        assert!(Uuid::parse_str(&rest[..36]).is_ok());
    }

    #[test]
    fn test_validate_resume() {
        assert!(validate_resume(b"%PDF-1.7\n...").is_ok());
        assert!(validate_resume(b"").is_err());
        assert!(validate_resume(b"PK\x03\x04 docx").is_err());

        let mut big = b"%PDF-".to_vec();
        big.resize(MAX_RESUME_BYTES + 1, b' ');
        let err = validate_resume(&big).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("too large")));
    }

    #[test]
    fn test_match_score_is_clamped_and_rounded() {
        let raw: RawResumeMatch =
            serde_json::from_str(r#"{"match_score": 87.6, "strengths": ["Rust"]}"#).unwrap();
        let m = ResumeMatch::from(raw);
        assert_eq!(m.match_score, 88);
        assert_eq!(m.strengths, vec!["Rust"]);
        assert!(m.gaps.is_empty());

        let raw: RawResumeMatch = serde_json::from_str(r#"{"match_score": 140}"#).unwrap();
        assert_eq!(ResumeMatch::from(raw).match_score, 100);
    }

    #[test]
    fn test_match_prompt_includes_both_texts() {
        let prompt = build_match_prompt("Rust, Postgres", "We need Go");
        assert!(prompt.contains("Rust, Postgres"));
        assert!(prompt.contains("We need Go"));
        assert!(!prompt.contains("{resume}"));
    }

    #[test]
    fn test_match_prompt_keeps_placeholder_text_in_resume() {
        let prompt = build_match_prompt("Fluent in {job_description} templating", "We need Go");
        assert!(prompt.contains("Fluent in {job_description} templating"));
        assert_eq!(prompt.matches("We need Go").count(), 1);
        assert!(prompt.contains("\"match_score\""));
    }
}
