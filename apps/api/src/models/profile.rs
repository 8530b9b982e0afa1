use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Object key of the uploaded resume in the resume bucket.
    pub resume_key: Option<String>,
    pub resume_name: Option<String>,
    pub resume_updated_at: DateTime<Utc>,
}
