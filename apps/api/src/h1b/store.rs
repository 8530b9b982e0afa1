use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::contains_pattern;
use crate::models::h1b::{H1bRecord, StatusCount};

const COLUMNS: &str = "case_number, case_status, received_date, decision_date, visa_class, \
    job_title, soc_code, soc_title, full_time_position, begin_date, end_date, employer_name, \
    employer_city, employer_state, employer_postal_code, worksite_city, worksite_state, \
    worksite_postal_code, wage_rate_of_pay_from, wage_rate_of_pay_to, wage_unit_of_pay, \
    prevailing_wage";

/// Multi-row insert. Fails as a whole if any row violates a constraint.
pub async fn insert_batch(pool: &PgPool, records: &[H1bRecord]) -> Result<u64, sqlx::Error> {
    if records.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO h1b_applications ({COLUMNS}) "));
    qb.push_values(records, |mut row, r| {
        row.push_bind(r.case_number.clone())
            .push_bind(r.case_status.clone())
            .push_bind(r.received_date)
            .push_bind(r.decision_date)
            .push_bind(r.visa_class.clone())
            .push_bind(r.job_title.clone())
            .push_bind(r.soc_code.clone())
            .push_bind(r.soc_title.clone())
            .push_bind(r.full_time_position.clone())
            .push_bind(r.begin_date)
            .push_bind(r.end_date)
            .push_bind(r.employer_name.clone())
            .push_bind(r.employer_city.clone())
            .push_bind(r.employer_state.clone())
            .push_bind(r.employer_postal_code.clone())
            .push_bind(r.worksite_city.clone())
            .push_bind(r.worksite_state.clone())
            .push_bind(r.worksite_postal_code.clone())
            .push_bind(r.wage_rate_of_pay_from)
            .push_bind(r.wage_rate_of_pay_to)
            .push_bind(r.wage_unit_of_pay.clone())
            .push_bind(r.prevailing_wage);
    });
    Ok(qb.build().execute(pool).await?.rows_affected())
}

pub async fn insert_one(pool: &PgPool, record: &H1bRecord) -> Result<u64, sqlx::Error> {
    insert_batch(pool, std::slice::from_ref(record)).await
}

// Optional employer (substring, case-insensitive) and case status (exact,
// case-insensitive) filters. `$1` is a `contains_pattern`.
const FILTER: &str = r#"
    WHERE ($1::text IS NULL OR employer_name ILIKE $1 ESCAPE '\')
      AND ($2::text IS NULL OR upper(case_status) = upper($2))
"#;

pub async fn count(pool: &PgPool, employer: Option<&str>, status: Option<&str>) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM h1b_applications {FILTER}");
    sqlx::query_scalar(&sql)
        .bind(employer.map(contains_pattern))
        .bind(status)
        .fetch_one(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    employer: Option<&str>,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<H1bRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM h1b_applications {FILTER} \
         ORDER BY decision_date DESC NULLS LAST, case_number LIMIT $3 OFFSET $4"
    );
    sqlx::query_as::<_, H1bRecord>(&sql)
        .bind(employer.map(contains_pattern))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn status_counts(pool: &PgPool) -> Result<Vec<StatusCount>, sqlx::Error> {
    sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT case_status, COUNT(*) AS count
        FROM h1b_applications
        GROUP BY case_status
        ORDER BY count DESC, case_status
        "#,
    )
    .fetch_all(pool)
    .await
}
