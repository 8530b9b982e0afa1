use sqlx::PgPool;

use crate::db::contains_pattern;
use crate::models::posting::JobPostingRow;

pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
    Ok(sqlx::query("DELETE FROM job_postings")
        .execute(pool)
        .await?
        .rows_affected())
}

pub async fn insert_posting(pool: &PgPool, posting: &JobPostingRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO job_postings
            (id, company_name, locations, title, date_posted, terms, active, url,
             is_visible, source, company_url, date_updated, sponsorship)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(posting.id)
    .bind(&posting.company_name)
    .bind(&posting.locations)
    .bind(&posting.title)
    .bind(posting.date_posted)
    .bind(&posting.terms)
    .bind(posting.active)
    .bind(&posting.url)
    .bind(posting.is_visible)
    .bind(&posting.source)
    .bind(&posting.company_url)
    .bind(posting.date_updated)
    .bind(&posting.sponsorship)
    .execute(pool)
    .await?;
    Ok(())
}

// Visible, active postings; `company` is a case-insensitive substring filter
// bound as a `contains_pattern`.
const VISIBLE_FILTER: &str = r#"
    WHERE is_visible AND active
      AND ($1::text IS NULL OR company_name ILIKE $1 ESCAPE '\')
"#;

pub async fn count_visible(pool: &PgPool, company: Option<&str>) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM job_postings {VISIBLE_FILTER}");
    sqlx::query_scalar(&sql)
        .bind(company.map(contains_pattern))
        .fetch_one(pool)
        .await
}

pub async fn list_visible(
    pool: &PgPool,
    company: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<JobPostingRow>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM job_postings {VISIBLE_FILTER} ORDER BY date_posted DESC LIMIT $2 OFFSET $3"
    );
    sqlx::query_as::<_, JobPostingRow>(&sql)
        .bind(company.map(contains_pattern))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}
