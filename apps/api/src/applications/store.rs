use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};

const SELECT_APPLICATION: &str = r#"
    SELECT a.id, a.user_id, a.company_id, c.name AS company_name, a.position,
           a.status, a.applied_date, a.last_updated, a.notes, a.source, a.email_id
    FROM application_records a
    JOIN companies c ON c.id = a.company_id
"#;

#[derive(Debug, Clone)]
pub struct ApplicationFields {
    pub company_id: Uuid,
    pub position: String,
    pub status: ApplicationStatus,
    pub notes: String,
    pub source: String,
    pub email_id: Option<String>,
    /// `None` means now.
    pub applied_date: Option<DateTime<Utc>>,
}

pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM application_records WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// One page of the user's applications, newest first.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_APPLICATION} WHERE a.user_id = $1 ORDER BY a.applied_date DESC LIMIT $2 OFFSET $3"
    );
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

/// `(status, count)` over all of the user's applications.
pub async fn status_counts(pool: &PgPool, user_id: Uuid) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT status, COUNT(*) FROM application_records WHERE user_id = $1 GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_company_name(
    pool: &PgPool,
    user_id: Uuid,
    company_name: &str,
) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_APPLICATION} WHERE a.user_id = $1 AND c.name = $2 ORDER BY a.applied_date DESC"
    );
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(user_id)
        .bind(company_name)
        .fetch_all(pool)
        .await
}

pub async fn get_application(pool: &PgPool, id: Uuid) -> Result<Option<ApplicationRow>, sqlx::Error> {
    let sql = format!("{SELECT_APPLICATION} WHERE a.id = $1");
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_owned_application(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    let sql = format!("{SELECT_APPLICATION} WHERE a.id = $1 AND a.user_id = $2");
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email_id(
    pool: &PgPool,
    user_id: Uuid,
    email_id: &str,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    let sql = format!("{SELECT_APPLICATION} WHERE a.user_id = $1 AND a.email_id = $2 LIMIT 1");
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(user_id)
        .bind(email_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_company_position(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
    position: &str,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_APPLICATION} WHERE a.user_id = $1 AND a.company_id = $2 AND a.position = $3 \
         ORDER BY a.applied_date DESC LIMIT 1"
    );
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(user_id)
        .bind(company_id)
        .bind(position)
        .fetch_optional(pool)
        .await
}

pub async fn insert_application(
    pool: &PgPool,
    user_id: Uuid,
    fields: &ApplicationFields,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO application_records
            (user_id, company_id, position, status, notes, source, email_id, applied_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(fields.company_id)
    .bind(&fields.position)
    .bind(fields.status.as_str())
    .bind(&fields.notes)
    .bind(&fields.source)
    .bind(&fields.email_id)
    .bind(fields.applied_date)
    .fetch_one(pool)
    .await
}

/// Overwrites the editable fields. `applied_date` is kept when `None`.
pub async fn update_application(
    pool: &PgPool,
    id: Uuid,
    fields: &ApplicationFields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE application_records SET
            company_id = $2, position = $3, status = $4, notes = $5, source = $6,
            email_id = $7, applied_date = COALESCE($8, applied_date), last_updated = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(fields.company_id)
    .bind(&fields.position)
    .bind(fields.status.as_str())
    .bind(&fields.notes)
    .bind(&fields.source)
    .bind(&fields.email_id)
    .bind(fields.applied_date)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Fills `email_id` and `source` where they are still empty. `None` leaves
/// the column untouched.
pub async fn fill_empty_fields(
    pool: &PgPool,
    id: Uuid,
    email_id: Option<&str>,
    source: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE application_records
        SET email_id = CASE WHEN COALESCE(email_id, '') = '' THEN COALESCE($2, email_id) ELSE email_id END,
            source = CASE WHEN source = '' THEN COALESCE($3, source) ELSE source END,
            last_updated = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(email_id)
    .bind(source)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_application(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM application_records WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
