use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailThreadRow {
    pub id: Uuid,
    pub application_id: Uuid,
    /// Gmail thread id.
    pub thread_id: String,
    pub subject: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GmailAccountRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
