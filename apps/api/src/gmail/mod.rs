//! Gmail sync: pulls application confirmation emails from a linked Gmail
//! account and turns them into application records with their threads.

pub mod classifier;
pub mod client;
pub mod store;
pub mod sync;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("Gmail sync is not configured (GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET missing)")]
    NotConfigured,

    #[error("No Gmail account linked for {0}")]
    NotLinked(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed Gmail payload: {0}")]
    Payload(String),
}
