use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One LCA disclosure record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct H1bRecord {
    pub case_number: String,
    pub case_status: Option<String>,
    pub received_date: Option<DateTime<Utc>>,
    pub decision_date: Option<DateTime<Utc>>,
    pub visa_class: Option<String>,
    pub job_title: Option<String>,
    pub soc_code: Option<String>,
    pub soc_title: Option<String>,
    pub full_time_position: Option<String>,
    pub begin_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub employer_name: Option<String>,
    pub employer_city: Option<String>,
    pub employer_state: Option<String>,
    pub employer_postal_code: Option<String>,
    pub worksite_city: Option<String>,
    pub worksite_state: Option<String>,
    pub worksite_postal_code: Option<String>,
    pub wage_rate_of_pay_from: Option<f64>,
    pub wage_rate_of_pay_to: Option<f64>,
    pub wage_unit_of_pay: Option<String>,
    pub prevailing_wage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusCount {
    pub case_status: Option<String>,
    pub count: i64,
}
