//! Bulk import of parsed LCA disclosure JSON (`import-h1b`).

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};

use super::store;
use crate::models::h1b::H1bRecord;

pub const DEFAULT_BATCH_SIZE: usize = 100;
/// 22 bound columns per row must stay under Postgres' 65535 parameter limit.
pub const MAX_BATCH_SIZE: usize = 2_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub uploaded: usize,
    pub errors: usize,
}

/// Why an insert failed.
#[derive(Debug)]
pub enum InsertFailure {
    Duplicate,
    Other(String),
}

impl From<sqlx::Error> for InsertFailure {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => InsertFailure::Duplicate,
            _ => InsertFailure::Other(e.to_string()),
        }
    }
}

/// Destination for converted records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert_batch(&self, records: &[H1bRecord]) -> Result<u64, InsertFailure>;
    async fn insert_one(&self, record: &H1bRecord) -> Result<u64, InsertFailure>;
}

pub struct PgRecordSink<'a>(pub &'a PgPool);

#[async_trait]
impl RecordSink for PgRecordSink<'_> {
    async fn insert_batch(&self, records: &[H1bRecord]) -> Result<u64, InsertFailure> {
        Ok(store::insert_batch(self.0, records).await?)
    }

    async fn insert_one(&self, record: &H1bRecord) -> Result<u64, InsertFailure> {
        Ok(store::insert_one(self.0, record).await?)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// ISO date or datetime string to a UTC timestamp. Naive values are taken as UTC.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A number, or a string holding one.
pub fn parse_wage(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Maps one source record (upper-case keys) onto a row.
pub fn convert_record(record: &Value) -> Result<H1bRecord, String> {
    let obj = record.as_object().ok_or("record is not a JSON object")?;
    let field = |key: &str| obj.get(key).filter(|v| !is_blank(v));

    let text = |key: &str| field(key).and_then(as_text);
    let date = |key: &str| field(key).and_then(parse_date);
    let wage = |key: &str| field(key).and_then(parse_wage);

    let case_number = text("CASE_NUMBER").ok_or("CASE_NUMBER is missing")?;

    Ok(H1bRecord {
        case_number,
        case_status: text("CASE_STATUS"),
        received_date: date("RECEIVED_DATE"),
        decision_date: date("DECISION_DATE"),
        visa_class: text("VISA_CLASS"),
        job_title: text("JOB_TITLE"),
        soc_code: text("SOC_CODE"),
        soc_title: text("SOC_TITLE"),
        full_time_position: text("FULL_TIME_POSITION"),
        begin_date: date("BEGIN_DATE"),
        end_date: date("END_DATE"),
        employer_name: text("EMPLOYER_NAME"),
        employer_city: text("EMPLOYER_CITY"),
        employer_state: text("EMPLOYER_STATE"),
        employer_postal_code: text("EMPLOYER_POSTAL_CODE"),
        worksite_city: text("WORKSITE_CITY"),
        worksite_state: text("WORKSITE_STATE"),
        worksite_postal_code: text("WORKSITE_POSTAL_CODE"),
        wage_rate_of_pay_from: wage("WAGE_RATE_OF_PAY_FROM"),
        wage_rate_of_pay_to: wage("WAGE_RATE_OF_PAY_TO"),
        wage_unit_of_pay: text("WAGE_UNIT_OF_PAY"),
        prevailing_wage: wage("PREVAILING_WAGE"),
    })
}

/// Converts every record, logging and dropping the ones that cannot be mapped.
pub fn convert_all(data: &[Value]) -> Vec<H1bRecord> {
    data.iter()
        .enumerate()
        .filter_map(|(i, record)| match convert_record(record) {
            Ok(converted) => Some(converted),
            Err(e) => {
                warn!("Skipping record {i}: {e}");
                None
            }
        })
        .collect()
}

/// Inserts in batches. A batch that fails on a duplicate key is retried one
/// record at a time and the duplicates are skipped; any other batch failure
/// counts the whole batch as errors.
pub async fn upload_records(
    sink: &dyn RecordSink,
    records: &[H1bRecord],
    batch_size: usize,
) -> ImportSummary {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let total_batches = records.len().div_ceil(batch_size);
    let mut summary = ImportSummary {
        processed: records.len(),
        ..Default::default()
    };

    for (index, batch) in records.chunks(batch_size).enumerate() {
        let batch_num = index + 1;
        info!("Uploading batch {batch_num}/{total_batches} ({} records)", batch.len());

        match sink.insert_batch(batch).await {
            Ok(inserted) => summary.uploaded += inserted as usize,
            Err(InsertFailure::Other(e)) => {
                warn!("Batch {batch_num} failed: {e}");
                summary.errors += batch.len();
            }
            Err(InsertFailure::Duplicate) => {
                info!("Batch {batch_num} hit duplicate keys, inserting records individually");
                for record in batch {
                    match sink.insert_one(record).await {
                        Ok(_) => summary.uploaded += 1,
                        Err(InsertFailure::Duplicate) => summary.errors += 1,
                        Err(InsertFailure::Other(e)) => {
                            warn!("Error inserting {}: {e}", record.case_number);
                            summary.errors += 1;
                        }
                    }
                }
            }
        }
    }

    summary
}

/// Loads the JSON array of raw records stored at `path`.
pub async fn read_records(path: &Path) -> Result<Vec<Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    info!("Loaded {} records from {}", data.len(), path.display());
    Ok(data)
}

/// Reads a JSON array of records from `path` and uploads it.
pub async fn import_file(pool: &PgPool, path: &Path, batch_size: usize) -> Result<ImportSummary> {
    let data = read_records(path).await?;

    let records = convert_all(&data);
    info!("Converted {} records", records.len());

    let summary = upload_records(&PgRecordSink(pool), &records, batch_size).await;
    let rate = if summary.processed == 0 {
        0.0
    } else {
        summary.uploaded as f64 / summary.processed as f64 * 100.0
    };
    info!(
        processed = summary.processed,
        uploaded = summary.uploaded,
        errors = summary.errors,
        "H1B import finished ({rate:.1}% uploaded)"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn test_convert_record_types() {
        let record = json!({
            "CASE_NUMBER": "I-200-24001-000001",
            "CASE_STATUS": "Certified",
            "RECEIVED_DATE": "2024-01-02",
            "DECISION_DATE": "2024-01-09T00:00:00.000",
            "BEGIN_DATE": "not a date",
            "END_DATE": 1704067200000u64,
            "EMPLOYER_NAME": "  ",
            "EMPLOYER_POSTAL_CODE": 94105,
            "WAGE_RATE_OF_PAY_FROM": "125000.50",
            "WAGE_RATE_OF_PAY_TO": 150000,
            "PREVAILING_WAGE": "n/a",
            "FULL_TIME_POSITION": "Y"
        });
        let r = convert_record(&record).unwrap();
        assert_eq!(r.case_number, "I-200-24001-000001");
        assert_eq!(r.received_date.unwrap().to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert_eq!(r.decision_date.unwrap().to_rfc3339(), "2024-01-09T00:00:00+00:00");
        assert!(r.begin_date.is_none());
        assert!(r.end_date.is_none());
        assert!(r.employer_name.is_none());
        assert_eq!(r.employer_postal_code.as_deref(), Some("94105"));
        assert_eq!(r.wage_rate_of_pay_from, Some(125000.5));
        assert_eq!(r.wage_rate_of_pay_to, Some(150000.0));
        assert!(r.prevailing_wage.is_none());
        assert!(r.visa_class.is_none());
    }

    #[test]
    fn test_rfc3339_dates_are_normalised_to_utc() {
        let dt = parse_date(&json!("2024-03-01T08:00:00-05:00")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T13:00:00+00:00");
        assert!(parse_date(&json!("2024-03-01 09:30:00")).is_some());
    }

    #[test]
    fn test_missing_case_number_is_rejected() {
        assert!(convert_record(&json!({"CASE_STATUS": "Denied"})).is_err());
        assert!(convert_record(&json!(["not", "an", "object"])).is_err());
        assert_eq!(convert_all(&[json!({}), json!({"CASE_NUMBER": "A"})]).len(), 1);
    }

    /// Rejects any batch containing an already-stored case number.
    #[derive(Default)]
    struct FakeSink {
        stored: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl RecordSink for FakeSink {
        async fn insert_batch(&self, records: &[H1bRecord]) -> Result<u64, InsertFailure> {
            let mut stored = self.stored.lock().unwrap();
            if records.iter().any(|r| stored.contains(&r.case_number)) {
                return Err(InsertFailure::Duplicate);
            }
            for r in records {
                stored.insert(r.case_number.clone());
            }
            Ok(records.len() as u64)
        }

        async fn insert_one(&self, record: &H1bRecord) -> Result<u64, InsertFailure> {
            let mut stored = self.stored.lock().unwrap();
            if !stored.insert(record.case_number.clone()) {
                return Err(InsertFailure::Duplicate);
            }
            Ok(1)
        }
    }

    fn record(case: &str) -> H1bRecord {
        H1bRecord {
            case_number: case.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_batch_falls_back_to_single_inserts() {
        let sink = FakeSink::default();
        sink.stored.lock().unwrap().insert("C3".to_string());

        let records: Vec<H1bRecord> = ["C1", "C2", "C3", "C4", "C5"].into_iter().map(record).collect();
        let summary = upload_records(&sink, &records, 2).await;

        // [C1, C2] ok; [C3, C4] duplicate -> C4 alone; [C5] ok.
        assert_eq!(
            summary,
            ImportSummary {
                processed: 5,
                uploaded: 4,
                errors: 1
            }
        );
        assert_eq!(sink.stored.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_treated_as_one() {
        let sink = FakeSink::default();
        let records = vec![record("A"), record("B")];
        let summary = upload_records(&sink, &records, 0).await;
        assert_eq!(summary.uploaded, 2);
    }

    #[tokio::test]
    async fn test_read_records_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"CASE_NUMBER": "I-1"}}, {{"CASE_NUMBER": "I-2"}}]"#).unwrap();

        let data = read_records(file.path()).await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(convert_all(&data).len(), 2);
    }

    #[tokio::test]
    async fn test_read_records_rejects_non_array() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"CASE_NUMBER": "I-1"}}"#).unwrap();

        assert!(read_records(file.path()).await.is_err());
    }
}
