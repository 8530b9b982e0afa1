//! Company identification: a web search for context plus an LLM extraction pass.

use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::companies::logo::{discover_logo, BROWSER_USER_AGENT};
use crate::companies::prompts::{IDENTIFY_PROMPT_TEMPLATE, IDENTIFY_ROLE};
use crate::errors::AppError;
use crate::llm_client::prompts::{fill, json_system};
use crate::llm_client::{LlmClient, LlmError};

/// Search context sent to the model is capped at this many characters.
pub const SEARCH_CONTEXT_LIMIT: usize = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Visible text of an HTML page, whitespace-collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text: Vec<&str> = document
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect();
    text.join(" ")
}

/// Truncates on a character boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Fetches a search results page about the company. Returns an empty string on failure.
pub async fn search_company_info(http: &Client, company_name: &str) -> String {
    let result = http
        .get("https://www.google.com/search")
        .query(&[("q", format!("{company_name} company about"))])
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await;

    match result {
        Ok(resp) => match resp.text().await {
            Ok(html) => html_to_text(&html),
            Err(e) => {
                error!("Error reading company search results: {e}");
                String::new()
            }
        },
        Err(e) => {
            error!("Error searching company info: {e}");
            String::new()
        }
    }
}

pub fn build_identify_prompt(company_name: &str, search_text: &str) -> String {
    fill(
        IDENTIFY_PROMPT_TEMPLATE,
        &[
            ("company_name", company_name),
            ("search_results", &truncate_chars(search_text, SEARCH_CONTEXT_LIMIT)),
        ],
    )
}

/// Identifies company details and attaches a discovered logo when one exists.
pub async fn identify_company(
    llm: &LlmClient,
    http: &Client,
    company_name: &str,
) -> Result<CompanyInfo, AppError> {
    let search_text = search_company_info(http, company_name).await;
    let prompt = build_identify_prompt(company_name, &search_text);

    let mut info: CompanyInfo = llm
        .call_json(&prompt, &json_system(IDENTIFY_ROLE))
        .await
        .map_err(|e| match e {
            LlmError::Parse(_) => AppError::Llm("Failed to parse company information".to_string()),
            other => AppError::from(other),
        })?;

    if info.name.trim().is_empty() {
        info.name = company_name.to_string();
    }

    let website = (!info.website.is_empty()).then_some(info.website.as_str());
    info.logo_url = discover_logo(http, &info.name, website).await;

    info!("Identified company {}", info.name);
    Ok(info)
}
