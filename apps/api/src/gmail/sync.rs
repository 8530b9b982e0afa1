use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::classifier::EmailClassifier;
use super::client::{GmailClient, MailMessage, Mailbox, MAX_MESSAGES, SEARCH_QUERY};
use super::{store, GmailError};
use crate::applications::store::{
    fill_empty_fields, find_by_company_position, find_by_email_id, insert_application,
    ApplicationFields,
};
use crate::companies::store::get_or_create_company;
use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus, SOURCE_GMAIL, UNKNOWN_POSITION};
use crate::state::AppState;

/// One application touched by a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedApplication {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub thread_count: usize,
}

/// A thread whose first message reads as an application confirmation and
/// names a company.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub company_name: String,
    pub position: String,
    pub messages: Vec<MailMessage>,
}

impl Candidate {
    fn first(&self) -> &MailMessage {
        &self.messages[0]
    }
}

/// Searches the mailbox and classifies each thread by its first message.
/// Threads that fail to load are logged and skipped.
pub async fn collect_candidates(
    mailbox: &dyn Mailbox,
    classifier: &EmailClassifier,
) -> Result<Vec<Candidate>, GmailError> {
    let thread_ids = mailbox.search_threads(SEARCH_QUERY, MAX_MESSAGES).await?;
    let mut candidates = Vec::new();

    for thread_id in thread_ids {
        let messages = match mailbox.fetch_thread(&thread_id).await {
            Ok(messages) if !messages.is_empty() => messages,
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping Gmail thread {thread_id}: {e}");
                continue;
            }
        };

        let analysis = classifier.analyze(&messages[0].subject, &messages[0].body);
        if !analysis.is_application {
            continue;
        }
        let Some(company_name) = analysis.company_name else {
            continue;
        };

        candidates.push(Candidate {
            company_name,
            position: analysis
                .job_title
                .unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
            messages,
        });
    }

    Ok(candidates)
}

/// What a sync run does with the application record of one candidate.
#[derive(Debug, Clone)]
pub enum UpsertPlan {
    /// No matching record: create one from the first message.
    Create(ApplicationFields),
    /// A matching record exists; only its empty fields are filled.
    Update {
        id: Uuid,
        position: String,
        email_id: Option<String>,
        source: Option<String>,
    },
}

/// Picks the record tied to the first message id, else the one for the same
/// company and position, else plans a new `APPLIED` record dated by the first
/// message.
pub fn plan_upsert(
    by_email: Option<ApplicationRow>,
    by_position: Option<ApplicationRow>,
    company_id: Uuid,
    candidate: &Candidate,
) -> UpsertPlan {
    let first = candidate.first();
    match by_email.or(by_position) {
        Some(application) => UpsertPlan::Update {
            id: application.id,
            email_id: application
                .email_id
                .as_deref()
                .unwrap_or_default()
                .is_empty()
                .then(|| first.message_id.clone()),
            source: application
                .source
                .trim()
                .is_empty()
                .then(|| SOURCE_GMAIL.to_string()),
            position: application.position,
        },
        None => UpsertPlan::Create(ApplicationFields {
            company_id,
            position: candidate.position.clone(),
            status: ApplicationStatus::Applied,
            notes: String::new(),
            source: SOURCE_GMAIL.to_string(),
            email_id: Some(first.message_id.clone()),
            applied_date: Some(first.sent_at),
        }),
    }
}

/// Writes one candidate: company, application, thread and messages.
async fn persist_candidate(
    pool: &PgPool,
    http: &reqwest::Client,
    user_id: Uuid,
    candidate: &Candidate,
) -> Result<SyncedApplication, AppError> {
    let first = candidate.first();
    let company = get_or_create_company(pool, http, &candidate.company_name).await?;

    let by_email = find_by_email_id(pool, user_id, &first.message_id).await?;
    let by_position = match by_email {
        Some(_) => None,
        None => find_by_company_position(pool, user_id, company.id, &candidate.position).await?,
    };

    let (application_id, position) = match plan_upsert(by_email, by_position, company.id, candidate) {
        UpsertPlan::Create(fields) => {
            let id = insert_application(pool, user_id, &fields).await?;
            (id, fields.position)
        }
        UpsertPlan::Update {
            id,
            position,
            email_id,
            source,
        } => {
            if email_id.is_some() || source.is_some() {
                fill_empty_fields(pool, id, email_id.as_deref(), source.as_deref()).await?;
            }
            (id, position)
        }
    };

    let thread =
        store::get_or_create_thread(pool, application_id, &first.thread_id, &first.subject).await?;
    for message in &candidate.messages {
        store::insert_message(pool, thread.id, message).await?;
    }

    Ok(SyncedApplication {
        id: application_id,
        company: company.name,
        position,
        thread_count: candidate.messages.len(),
    })
}

/// Persists every candidate for the user, in mailbox order.
pub async fn apply_candidates(
    pool: &PgPool,
    http: &reqwest::Client,
    user_id: Uuid,
    candidates: &[Candidate],
) -> Result<Vec<SyncedApplication>, AppError> {
    let mut synced = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        synced.push(persist_candidate(pool, http, user_id, candidate).await?);
    }
    Ok(synced)
}

/// Full sync of the Gmail account `email` linked to the user.
pub async fn sync_user_mailbox(
    state: &AppState,
    user_id: Uuid,
    email: &str,
) -> Result<Vec<SyncedApplication>, AppError> {
    let account = store::find_account(&state.db, user_id, email)
        .await?
        .ok_or_else(|| GmailError::NotLinked(email.to_string()))?;

    let client = GmailClient::connect(state.http.clone(), &state.config, &account.refresh_token).await?;
    let classifier = EmailClassifier::new().map_err(|e| AppError::Internal(e.into()))?;

    let candidates = collect_candidates(&client, &classifier).await?;
    let synced = apply_candidates(&state.db, &state.http, user_id, &candidates).await?;

    info!(
        "Gmail sync for user {user_id} ({email}): {} application threads",
        synced.len()
    );
    Ok(synced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    struct FakeMailbox {
        order: Vec<String>,
        threads: HashMap<String, Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailbox for FakeMailbox {
        async fn search_threads(&self, query: &str, _limit: usize) -> Result<Vec<String>, GmailError> {
            assert_eq!(query, SEARCH_QUERY);
            Ok(self.order.clone())
        }

        async fn fetch_thread(&self, thread_id: &str) -> Result<Vec<MailMessage>, GmailError> {
            self.threads.get(thread_id).cloned().ok_or(GmailError::Api {
                status: 404,
                message: "not found".into(),
            })
        }
    }

    fn message(thread: &str, id: &str, subject: &str, body: &str) -> MailMessage {
        MailMessage {
            message_id: id.into(),
            thread_id: thread.into(),
            sender: "jobs@example.com".into(),
            recipient: "ada@example.com".into(),
            subject: subject.into(),
            body: body.into(),
            sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            raw_payload: serde_json::Value::Null,
        }
    }

    fn mailbox() -> FakeMailbox {
        let mut threads = HashMap::new();
        threads.insert(
            "t-confirm".to_string(),
            vec![
                message(
                    "t-confirm",
                    "m-1",
                    "Thank you for your application",
                    "Your application for the role of Data Engineer on our team is in review at Initech",
                ),
                message("t-confirm", "m-2", "Re: next steps", "Let's schedule a call."),
            ],
        );
        threads.insert(
            "t-nocompany".to_string(),
            vec![message("t-nocompany", "m-3", "Application received", "We got it.")],
        );
        threads.insert(
            "t-newsletter".to_string(),
            vec![message("t-newsletter", "m-4", "Job alert", "New positions near you")],
        );
        threads.insert(
            "t-untitled".to_string(),
            vec![message("t-untitled", "m-5", "Application confirmation from Globex", "")],
        );
        FakeMailbox {
            order: ["t-confirm", "t-missing", "t-nocompany", "t-newsletter", "t-untitled"]
                .map(String::from)
                .to_vec(),
            threads,
        }
    }

    #[tokio::test]
    async fn test_candidates_filter_and_extract() {
        let classifier = EmailClassifier::new().unwrap();
        let candidates = collect_candidates(&mailbox(), &classifier).await.unwrap();

        assert_eq!(candidates.len(), 2);

        let confirm = &candidates[0];
        assert_eq!(confirm.company_name, "Initech");
        assert_eq!(confirm.position, "of Data Engineer on our team is in review at Initech");
        assert_eq!(confirm.messages.len(), 2);
        assert_eq!(confirm.first().message_id, "m-1");

        let untitled = &candidates[1];
        assert_eq!(untitled.company_name, "Globex");
        assert_eq!(untitled.position, UNKNOWN_POSITION);
    }

    fn candidate() -> Candidate {
        Candidate {
            company_name: "Initech".into(),
            position: "Data Engineer".into(),
            messages: vec![message("t-1", "m-1", "Thank you for your application", "")],
        }
    }

    fn record(email_id: Option<&str>, source: &str) -> ApplicationRow {
        ApplicationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            company_name: "Initech".into(),
            position: "Data Engineer (Platform)".into(),
            status: "OA".into(),
            applied_date: Utc::now(),
            last_updated: Utc::now(),
            notes: String::new(),
            source: source.into(),
            email_id: email_id.map(String::from),
        }
    }

    #[test]
    fn test_plan_creates_applied_record_from_first_message() {
        let company_id = Uuid::new_v4();
        let candidate = candidate();
        match plan_upsert(None, None, company_id, &candidate) {
            UpsertPlan::Create(fields) => {
                assert_eq!(fields.company_id, company_id);
                assert_eq!(fields.position, "Data Engineer");
                assert_eq!(fields.status, ApplicationStatus::Applied);
                assert_eq!(fields.source, SOURCE_GMAIL);
                assert_eq!(fields.email_id.as_deref(), Some("m-1"));
                assert_eq!(fields.applied_date, Some(candidate.first().sent_at));
            }
            other => panic!("expected a new record, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_prefers_match_by_email_id() {
        let by_email = record(Some("m-1"), "Gmail");
        let by_position = record(None, "Manual");
        let expected = by_email.id;

        match plan_upsert(Some(by_email), Some(by_position), Uuid::new_v4(), &candidate()) {
            UpsertPlan::Update {
                id,
                email_id,
                source,
                ..
            } => {
                assert_eq!(id, expected);
                assert!(email_id.is_none());
                assert!(source.is_none());
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_falls_back_to_company_and_position() {
        let by_position = record(None, "");
        let expected = by_position.id;

        match plan_upsert(None, Some(by_position), Uuid::new_v4(), &candidate()) {
            UpsertPlan::Update {
                id,
                position,
                email_id,
                source,
            } => {
                assert_eq!(id, expected);
                assert_eq!(position, "Data Engineer (Platform)");
                assert_eq!(email_id.as_deref(), Some("m-1"));
                assert_eq!(source.as_deref(), Some(SOURCE_GMAIL));
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_keeps_existing_email_id_and_source() {
        let existing = record(Some("m-older"), "Manual");

        match plan_upsert(None, Some(existing), Uuid::new_v4(), &candidate()) {
            UpsertPlan::Update { email_id, source, .. } => {
                assert!(email_id.is_none());
                assert!(source.is_none());
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }
}
