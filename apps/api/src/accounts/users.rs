use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::user::UserRow;

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Looks a user up by username first, then by email.
pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRow>, sqlx::Error> {
    if let Some(user) = find_by_username(pool, login).await? {
        return Ok(Some(user));
    }
    sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE lower(email) = lower($1) AND email <> '' ORDER BY created_at LIMIT 1",
    )
    .bind(login)
    .fetch_optional(pool)
    .await
}

pub async fn create_user(pool: &PgPool, new_user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.password_hash)
    .fetch_one(pool)
    .await?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Returns the user provisioned for a Supabase subject, creating it on first sight.
pub async fn get_or_create_external(pool: &PgPool, sub: &str, email: &str) -> Result<UserRow> {
    if let Some(user) = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE external_id = $1")
        .bind(sub)
        .fetch_optional(pool)
        .await?
    {
        return Ok(user);
    }

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (username, email, external_id)
        VALUES ($1, $2, $1)
        ON CONFLICT (username) DO UPDATE SET external_id = EXCLUDED.external_id
        RETURNING *
        "#,
    )
    .bind(sub)
    .bind(email)
    .fetch_one(pool)
    .await?;

    info!("Provisioned user {} from Supabase token", user.id);
    Ok(user)
}

pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn update_user(pool: &PgPool, user_id: Uuid, update: &UserUpdate) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users SET
            email = COALESCE($2, email),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(update.email.as_deref())
    .bind(update.first_name.as_deref())
    .bind(update.last_name.as_deref())
    .fetch_one(pool)
    .await
}
