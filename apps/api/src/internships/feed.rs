//! The public internship listings feed: fetch, Redis cache, pagination, and
//! the `populate-jobs` import.

use anyhow::{Context, Result};
use redis::AsyncCommands;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::store;
use crate::errors::AppError;
use crate::models::posting::JobPostingRow;
use crate::pagination::{PageWindow, Paginated};
use crate::state::AppState;

pub const INTERNSHIPS_PER_PAGE: u64 = 100;
pub const INTERNSHIPS_PATH: &str = "/api/internships";
const CACHE_KEY: &str = "offersplus:internship_feed";
const DEFAULT_SPONSORSHIP: &str = "Unknown";

/// Downloads the raw feed body.
pub async fn fetch_feed_body(http: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    http.get(url).send().await?.error_for_status()?.text().await
}

pub fn parse_feed(body: &str) -> Result<Vec<Value>, serde_json::Error> {
    serde_json::from_str(body)
}

async fn read_cache(client: &redis::Client) -> redis::RedisResult<Option<String>> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.get(CACHE_KEY).await
}

async fn write_cache(client: &redis::Client, body: &str, ttl_secs: u64) -> redis::RedisResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.set_ex(CACHE_KEY, body, ttl_secs).await
}

/// The feed items, from Redis when cached. Cache errors fall through to a
/// direct fetch.
pub async fn load_feed(state: &AppState) -> Result<Vec<Value>, AppError> {
    match read_cache(&state.redis).await {
        Ok(Some(body)) => match parse_feed(&body) {
            Ok(items) => {
                debug!("Internship feed served from cache ({} items)", items.len());
                return Ok(items);
            }
            Err(e) => warn!("Discarding unparseable cached internship feed: {e}"),
        },
        Ok(None) => {}
        Err(e) => warn!("Internship cache read failed: {e}"),
    }

    let body = fetch_feed_body(&state.http, &state.config.internship_feed_url)
        .await
        .map_err(|e| AppError::Upstream(format!("Internship feed unavailable: {e}")))?;
    let items = parse_feed(&body)
        .map_err(|e| AppError::Upstream(format!("Internship feed is not valid JSON: {e}")))?;

    if let Err(e) = write_cache(&state.redis, &body, state.config.internship_cache_ttl_secs).await {
        warn!("Internship cache write failed: {e}");
    }
    Ok(items)
}

/// Slices one page out of the full feed.
pub fn page_of(items: Vec<Value>, requested: Option<i64>) -> Paginated<Value> {
    let total = items.len();
    let window = PageWindow::resolve(requested, total as u64, INTERNSHIPS_PER_PAGE);
    let (start, end) = window.bounds(total);
    let results = items.into_iter().skip(start).take(end - start).collect();
    Paginated::new(INTERNSHIPS_PATH, window, total as u64, results)
}

/// Shape of one feed entry as consumed by the import.
#[derive(Debug, Deserialize)]
struct FeedItem {
    id: String,
    company_name: String,
    locations: Vec<String>,
    title: String,
    date_posted: i64,
    #[serde(default)]
    terms: Vec<String>,
    active: bool,
    url: String,
    is_visible: bool,
    source: String,
    #[serde(default)]
    company_url: Option<String>,
    date_updated: i64,
    #[serde(default)]
    sponsorship: Option<String>,
}

/// Converts a feed entry into a posting row.
pub fn to_posting(item: &Value) -> Result<JobPostingRow, String> {
    let item: FeedItem = serde_json::from_value(item.clone()).map_err(|e| e.to_string())?;
    let id = Uuid::parse_str(&item.id).map_err(|e| format!("invalid id {:?}: {e}", item.id))?;

    Ok(JobPostingRow {
        id,
        company_name: item.company_name,
        locations: item.locations,
        title: item.title,
        date_posted: item.date_posted,
        terms: item.terms,
        active: item.active,
        url: item.url,
        is_visible: item.is_visible,
        source: item.source,
        company_url: item.company_url.unwrap_or_default(),
        date_updated: item.date_updated,
        sponsorship: item
            .sponsorship
            .unwrap_or_else(|| DEFAULT_SPONSORSHIP.to_string()),
    })
}

/// Replaces every job posting with the current feed. Returns how many were created.
pub async fn populate_job_postings(pool: &PgPool, http: &reqwest::Client, url: &str) -> Result<usize> {
    let body = fetch_feed_body(http, url)
        .await
        .with_context(|| format!("Failed to fetch internship feed from {url}"))?;
    let items = parse_feed(&body).context("Internship feed is not a JSON array")?;

    let removed = store::delete_all(pool).await?;
    info!("Removed {removed} existing job postings");

    let mut created = 0usize;
    for item in &items {
        let label = item.get("id").and_then(Value::as_str).unwrap_or("unknown");
        let posting = match to_posting(item) {
            Ok(posting) => posting,
            Err(e) => {
                error!("Error creating job {label}: {e}");
                continue;
            }
        };
        if let Err(e) = store::insert_posting(pool, &posting).await {
            error!("Error creating job {label}: {e}");
            continue;
        }
        created += 1;
        if created % 100 == 0 {
            info!("Created {created} job postings...");
        }
    }

    info!("Successfully created {created} job postings");
    Ok(created)
}
