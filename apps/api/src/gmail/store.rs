use sqlx::PgPool;
use uuid::Uuid;

use super::client::MailMessage;
use crate::models::email::{EmailThreadRow, GmailAccountRow};

/// Links (or relinks) a Gmail address to the user.
pub async fn upsert_account(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    refresh_token: &str,
) -> Result<GmailAccountRow, sqlx::Error> {
    sqlx::query_as::<_, GmailAccountRow>(
        r#"
        INSERT INTO gmail_accounts (user_id, email, refresh_token)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, email)
        DO UPDATE SET refresh_token = EXCLUDED.refresh_token, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(refresh_token)
    .fetch_one(pool)
    .await
}

pub async fn find_account(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
) -> Result<Option<GmailAccountRow>, sqlx::Error> {
    sqlx::query_as::<_, GmailAccountRow>(
        "SELECT * FROM gmail_accounts WHERE user_id = $1 AND lower(email) = lower($2)",
    )
    .bind(user_id)
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Returns the thread row for `(application, gmail thread)`, creating it with
/// `subject` when absent. An existing subject is left alone.
pub async fn get_or_create_thread(
    pool: &PgPool,
    application_id: Uuid,
    thread_id: &str,
    subject: &str,
) -> Result<EmailThreadRow, sqlx::Error> {
    sqlx::query_as::<_, EmailThreadRow>(
        r#"
        INSERT INTO email_threads (application_id, thread_id, subject)
        VALUES ($1, $2, $3)
        ON CONFLICT (application_id, thread_id)
        DO UPDATE SET last_updated = NOW()
        RETURNING *
        "#,
    )
    .bind(application_id)
    .bind(thread_id)
    .bind(subject)
    .fetch_one(pool)
    .await
}

/// Stores a message unless one with the same Gmail id already exists.
/// Returns whether a row was inserted.
pub async fn insert_message(
    pool: &PgPool,
    thread_row_id: Uuid,
    message: &MailMessage,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO email_messages
            (thread_id, message_id, sender, recipient, subject, body, sent_at, raw_payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (message_id) DO NOTHING
        "#,
    )
    .bind(thread_row_id)
    .bind(&message.message_id)
    .bind(&message.sender)
    .bind(&message.recipient)
    .bind(&message.subject)
    .bind(&message.body)
    .bind(message.sent_at)
    .bind(&message.raw_payload)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
