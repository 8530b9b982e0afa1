use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_COMPANY_NAME: &str = "Unknown Company";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub industry: String,
    pub website: String,
    pub logo_url: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
