use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A listing mirrored from the public internship feed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub company_name: String,
    pub locations: Vec<String>,
    pub title: String,
    /// Unix timestamp (seconds).
    pub date_posted: i64,
    pub terms: Vec<String>,
    pub active: bool,
    pub url: String,
    pub is_visible: bool,
    pub source: String,
    pub company_url: String,
    /// Unix timestamp (seconds).
    pub date_updated: i64,
    pub sponsorship: String,
}
