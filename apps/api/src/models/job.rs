use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "FULL_TIME",
            EmploymentType::PartTime => "PART_TIME",
            EmploymentType::Contract => "CONTRACT",
            EmploymentType::Internship => "INTERNSHIP",
        }
    }
}

impl FromStr for EmploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL_TIME" => Ok(EmploymentType::FullTime),
            "PART_TIME" => Ok(EmploymentType::PartTime),
            "CONTRACT" => Ok(EmploymentType::Contract),
            "INTERNSHIP" => Ok(EmploymentType::Internship),
            _ => Err(format!("\"{s}\" is not a valid employment type")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Open,
    Closed,
    Draft,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Closed => "CLOSED",
            JobStatus::Draft => "DRAFT",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(JobStatus::Open),
            "CLOSED" => Ok(JobStatus::Closed),
            "DRAFT" => Ok(JobStatus::Draft),
            _ => Err(format!("\"{s}\" is not a valid job status")),
        }
    }
}

/// A job joined with its company name and applicant ids.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "company")]
    pub company_id: Uuid,
    pub company_name: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub salary_range: String,
    pub employment_type: String,
    pub status: String,
    pub applicants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
}
