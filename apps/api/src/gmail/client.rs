//! Gmail REST client. Authenticates with a stored refresh token and reads
//! messages and threads from the user's mailbox.

use async_trait::async_trait;
use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine as _,
};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::GmailError;
use crate::config::Config;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Messages whose subject looks job related.
pub const SEARCH_QUERY: &str = r#"subject:"application" OR subject:"job" OR subject:"position""#;
/// Upper bound on message ids collected across result pages.
pub const MAX_MESSAGES: usize = 500;
const PAGE_SIZE: usize = 100;

/// Gmail emits unpadded base64url; accept either.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One decoded message of a thread.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub message_id: String,
    pub thread_id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub raw_payload: Value,
}

/// Read access to a mailbox. Implemented by [`GmailClient`]; tests substitute
/// an in-memory mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Distinct thread ids of messages matching `query`, in result order.
    async fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<String>, GmailError>;

    /// All messages of a thread, oldest first.
    async fn fetch_thread(&self, thread_id: &str) -> Result<Vec<MailMessage>, GmailError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    #[serde(rename = "threadId")]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawThread {
    id: String,
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    #[serde(rename = "internalDate")]
    internal_date: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<RawHeader>,
    #[serde(default)]
    body: RawBody,
    parts: Option<Vec<RawPart>>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawBody {
    data: Option<String>,
}

pub struct GmailClient {
    http: Client,
    access_token: String,
}

impl GmailClient {
    /// Exchanges the refresh token for an access token.
    pub async fn connect(http: Client, config: &Config, refresh_token: &str) -> Result<Self, GmailError> {
        let (Some(client_id), Some(client_secret)) =
            (&config.google_client_id, &config.google_client_secret)
        else {
            return Err(GmailError::NotConfigured);
        };

        let response = http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;

        Ok(Self {
            http,
            access_token: token.access_token,
        })
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, GmailError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, GmailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(GmailError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<String>, GmailError> {
        let url = format!("{GMAIL_API_BASE}/messages");
        let page_size = PAGE_SIZE.to_string();
        let mut thread_ids = Vec::new();
        let mut seen = 0usize;
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("q", query), ("maxResults", page_size.as_str())];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let page: MessageList = self.get(&url, &params).await?.json().await?;

            seen += page.messages.len();
            push_distinct(&mut thread_ids, page.messages.into_iter().map(|m| m.thread_id));

            match page.next_page_token {
                Some(token) if seen < limit => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Gmail search matched {seen} messages in {} threads", thread_ids.len());
        Ok(thread_ids)
    }

    async fn fetch_thread(&self, thread_id: &str) -> Result<Vec<MailMessage>, GmailError> {
        let url = format!("{GMAIL_API_BASE}/threads/{thread_id}");
        let thread: Value = self.get(&url, &[("format", "full")]).await?.json().await?;
        parse_thread(thread)
    }
}

fn push_distinct(into: &mut Vec<String>, ids: impl IntoIterator<Item = String>) {
    for id in ids {
        if !into.contains(&id) {
            into.push(id);
        }
    }
}

/// Decodes a `threads.get` response into messages.
pub fn parse_thread(thread: Value) -> Result<Vec<MailMessage>, GmailError> {
    let thread: RawThread =
        serde_json::from_value(thread).map_err(|e| GmailError::Payload(e.to_string()))?;

    thread
        .messages
        .into_iter()
        .map(|message| parse_message(&thread.id, message))
        .collect()
}

fn parse_message(thread_id: &str, message: RawMessage) -> Result<MailMessage, GmailError> {
    let part: RawPart = serde_json::from_value(message.payload.clone())
        .map_err(|e| GmailError::Payload(format!("message {}: {e}", message.id)))?;

    let header = |name: &str| -> String {
        part.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    };

    let mut texts = Vec::new();
    collect_plain_text(&part, &mut texts);

    let sent_at = message
        .internal_date
        .as_deref()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(|| {
            warn!("Message {} has no usable internalDate", message.id);
            Utc::now()
        });

    Ok(MailMessage {
        sender: header("From"),
        recipient: header("To"),
        subject: header("Subject"),
        body: texts.join("\n"),
        sent_at,
        message_id: message.id,
        thread_id: thread_id.to_string(),
        raw_payload: message.payload,
    })
}

/// Depth-first walk collecting decoded `text/plain` leaves.
fn collect_plain_text(part: &RawPart, out: &mut Vec<String>) {
    if let Some(children) = &part.parts {
        for child in children {
            collect_plain_text(child, out);
        }
        return;
    }
    if part.mime_type != "text/plain" {
        return;
    }
    let Some(data) = part.body.data.as_deref().filter(|d| !d.is_empty()) else {
        return;
    };
    match URL_SAFE_LENIENT.decode(data) {
        Ok(bytes) => out.push(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => debug!("Skipping undecodable text/plain part: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(text)
    }

    fn fixture() -> Value {
        json!({
            "id": "thread-1",
            "messages": [
                {
                    "id": "msg-1",
                    "threadId": "thread-1",
                    "internalDate": "1700000000000",
                    "payload": {
                        "mimeType": "multipart/mixed",
                        "headers": [
                            {"name": "From", "value": "jobs@acme.com"},
                            {"name": "To", "value": "ada@example.com"},
                            {"name": "Subject", "value": "Thank you for your application"}
                        ],
                        "parts": [
                            {
                                "mimeType": "multipart/alternative",
                                "parts": [
                                    {"mimeType": "text/plain", "body": {"data": encode("Hello Ada,")}},
                                    {"mimeType": "text/html", "body": {"data": encode("<p>Hello</p>")}}
                                ]
                            },
                            {"mimeType": "text/plain", "body": {"data": encode("We received it?")}}
                        ]
                    }
                },
                {
                    "id": "msg-2",
                    "threadId": "thread-1",
                    "internalDate": "1700000360000",
                    "payload": {
                        "mimeType": "text/plain",
                        "headers": [{"name": "subject", "value": "Re: next steps"}],
                        "body": {"data": encode("Scheduling")}
                    }
                }
            ]
        })
    }

    #[test]
    fn test_parse_thread_headers_and_body() {
        let messages = parse_thread(fixture()).unwrap();
        assert_eq!(messages.len(), 2);

        let first = &messages[0];
        assert_eq!(first.message_id, "msg-1");
        assert_eq!(first.thread_id, "thread-1");
        assert_eq!(first.sender, "jobs@acme.com");
        assert_eq!(first.recipient, "ada@example.com");
        assert_eq!(first.subject, "Thank you for your application");
        assert_eq!(first.body, "Hello Ada,\nWe received it?");
        assert_eq!(first.sent_at.timestamp(), 1_700_000_000);
        assert_eq!(first.raw_payload["mimeType"], "multipart/mixed");
    }

    #[test]
    fn test_single_part_message_and_header_case() {
        let messages = parse_thread(fixture()).unwrap();
        let second = &messages[1];
        assert_eq!(second.subject, "Re: next steps");
        assert_eq!(second.body, "Scheduling");
        assert_eq!(second.sender, "");
    }

    #[test]
    fn test_padded_base64_is_accepted() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode("ab");
        assert!(padded.ends_with('='));
        let part = RawPart {
            mime_type: "text/plain".into(),
            body: RawBody { data: Some(padded) },
            ..Default::default()
        };
        let mut out = Vec::new();
        collect_plain_text(&part, &mut out);
        assert_eq!(out, vec!["ab".to_string()]);
    }

    #[test]
    fn test_malformed_thread_is_payload_error() {
        let err = parse_thread(json!({"messages": "nope"})).unwrap_err();
        assert!(matches!(err, GmailError::Payload(_)));
    }

    #[test]
    fn test_push_distinct_keeps_first_occurrence_order() {
        let mut ids = vec!["a".to_string()];
        push_distinct(&mut ids, ["b", "a", "c", "b"].map(String::from));
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
