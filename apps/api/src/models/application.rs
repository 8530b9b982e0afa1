use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SOURCE_MANUAL: &str = "Manual";
pub const SOURCE_GMAIL: &str = "Gmail";
pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Where an application stands in the hiring pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Oa,
    Phone,
    Vo,
    Offer,
    Rejected,
    Accepted,
    Declined,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Oa,
        ApplicationStatus::Phone,
        ApplicationStatus::Vo,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
        ApplicationStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Oa => "OA",
            ApplicationStatus::Phone => "PHONE",
            ApplicationStatus::Vo => "VO",
            ApplicationStatus::Offer => "OFFER",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("\"{s}\" is not a valid application status"))
    }
}

/// An application joined with its company name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub position: String,
    pub status: String,
    pub applied_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub notes: String,
    pub source: String,
    pub email_id: Option<String>,
}
