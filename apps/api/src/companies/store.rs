use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::companies::logo::{discover_logo, guess_website};
use crate::models::company::{CompanyRow, DEFAULT_COMPANY_NAME};

/// Column values for inserting or replacing a company.
#[derive(Debug, Clone, Default)]
pub struct CompanyFields {
    pub name: String,
    pub description: String,
    pub industry: String,
    pub website: String,
    pub logo_url: String,
    pub location: String,
}

pub async fn list_companies(pool: &PgPool) -> Result<Vec<CompanyRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn get_company(pool: &PgPool, id: Uuid) -> Result<Option<CompanyRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<CompanyRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>(
        "SELECT * FROM companies WHERE name = $1 ORDER BY created_at LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn insert_company(pool: &PgPool, fields: &CompanyFields) -> Result<CompanyRow, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>(
        r#"
        INSERT INTO companies (name, description, industry, website, logo_url, location)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.industry)
    .bind(&fields.website)
    .bind(&fields.logo_url)
    .bind(&fields.location)
    .fetch_one(pool)
    .await
}

pub async fn replace_company(
    pool: &PgPool,
    id: Uuid,
    fields: &CompanyFields,
) -> Result<Option<CompanyRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>(
        r#"
        UPDATE companies SET
            name = $2, description = $3, industry = $4,
            website = $5, logo_url = $6, location = $7,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.industry)
    .bind(&fields.website)
    .bind(&fields.logo_url)
    .bind(&fields.location)
    .fetch_optional(pool)
    .await
}

pub async fn delete_company(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn set_logo(pool: &PgPool, id: Uuid, logo_url: &str) -> Result<CompanyRow, sqlx::Error> {
    sqlx::query_as::<_, CompanyRow>(
        "UPDATE companies SET logo_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(logo_url)
    .fetch_one(pool)
    .await
}

/// Returns the company with this name, back-filling a missing logo, or creates
/// it with a guessed website and whatever logo can be discovered.
pub async fn get_or_create_company(
    pool: &PgPool,
    http: &reqwest::Client,
    name: &str,
) -> Result<CompanyRow> {
    let name = name.trim();

    if let Some(company) = find_by_name(pool, name).await? {
        if company.logo_url.is_empty() {
            let website = (!company.website.is_empty()).then_some(company.website.as_str());
            if let Some(logo) = discover_logo(http, name, website).await {
                return Ok(set_logo(pool, company.id, &logo).await?);
            }
        }
        return Ok(company);
    }

    let website = guess_website(name);
    let logo_url = discover_logo(http, name, Some(&website))
        .await
        .unwrap_or_default();

    let company = insert_company(
        pool,
        &CompanyFields {
            name: name.to_string(),
            website,
            logo_url,
            ..Default::default()
        },
    )
    .await?;

    info!("Created company {} ({})", company.name, company.id);
    Ok(company)
}

/// The placeholder company for records that name none.
pub async fn default_company(pool: &PgPool) -> Result<CompanyRow, sqlx::Error> {
    if let Some(company) = find_by_name(pool, DEFAULT_COMPANY_NAME).await? {
        return Ok(company);
    }
    insert_company(
        pool,
        &CompanyFields {
            name: DEFAULT_COMPANY_NAME.to_string(),
            description: "Default company for legacy records".to_string(),
            industry: "Unknown".to_string(),
            location: "Unknown".to_string(),
            ..Default::default()
        },
    )
    .await
}
