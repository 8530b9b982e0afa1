use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{EmploymentType, JobRow, JobStatus};

const SELECT_JOB: &str = r#"
    SELECT j.id, j.title, j.company_id, c.name AS company_name, j.description,
           j.requirements, j.location, j.salary_range, j.employment_type, j.status,
           ARRAY(SELECT a.user_id FROM job_applicants a WHERE a.job_id = j.id) AS applicants,
           j.created_at, j.updated_at, j.deadline
    FROM jobs j
    JOIN companies c ON c.id = j.company_id
"#;

#[derive(Debug, Clone)]
pub struct JobFields {
    pub title: String,
    pub company_id: Uuid,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub salary_range: String,
    pub employment_type: EmploymentType,
    pub status: JobStatus,
    pub deadline: Option<DateTime<Utc>>,
}

pub async fn list_jobs(pool: &PgPool, company_id: Option<Uuid>) -> Result<Vec<JobRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_JOB} WHERE ($1::uuid IS NULL OR j.company_id = $1) ORDER BY j.created_at DESC"
    );
    sqlx::query_as::<_, JobRow>(&sql)
        .bind(company_id)
        .fetch_all(pool)
        .await
}

pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>, sqlx::Error> {
    let sql = format!("{SELECT_JOB} WHERE j.id = $1");
    sqlx::query_as::<_, JobRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_job(pool: &PgPool, fields: &JobFields) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO jobs
            (title, company_id, description, requirements, location,
             salary_range, employment_type, status, deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(&fields.title)
    .bind(fields.company_id)
    .bind(&fields.description)
    .bind(&fields.requirements)
    .bind(&fields.location)
    .bind(&fields.salary_range)
    .bind(fields.employment_type.as_str())
    .bind(fields.status.as_str())
    .bind(fields.deadline)
    .fetch_one(pool)
    .await
}

pub async fn replace_job(pool: &PgPool, id: Uuid, fields: &JobFields) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET
            title = $2, company_id = $3, description = $4, requirements = $5,
            location = $6, salary_range = $7, employment_type = $8, status = $9,
            deadline = $10, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&fields.title)
    .bind(fields.company_id)
    .bind(&fields.description)
    .bind(&fields.requirements)
    .bind(&fields.location)
    .bind(&fields.salary_range)
    .bind(fields.employment_type.as_str())
    .bind(fields.status.as_str())
    .bind(fields.deadline)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_job(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Adds the user to the job's applicants. Applying twice is a no-op.
pub async fn add_applicant(pool: &PgPool, job_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO job_applicants (job_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(job_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
