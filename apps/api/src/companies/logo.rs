//! Best-effort company logo discovery.
//!
//! Order: `og:image` meta, `image`/`twitter:image` meta, the first `<img>` whose
//! src mentions "logo", then Google's favicon service. Every failure falls through.

use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::debug;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// `https://www.<lowercased name without spaces>.com`
pub fn guess_website(company_name: &str) -> String {
    let slug: String = company_name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("https://www.{slug}.com")
}

pub fn google_favicon_url(website: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={website}&sz=128")
}

/// Looks for a logo in a fetched page. Relative image paths are resolved against `base`.
pub fn find_logo_in_html(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    let og = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    if let Some(content) = first_content(&document, &og) {
        return Some(content);
    }

    let named = Selector::parse(r#"meta[name="image"], meta[name="twitter:image"]"#).ok()?;
    if let Some(content) = first_content(&document, &named) {
        return Some(content);
    }

    let img = Selector::parse("img[src]").ok()?;
    document
        .select(&img)
        .filter_map(|el| el.value().attr("src"))
        .find(|src| src.to_lowercase().contains("logo"))
        .and_then(|src| base.join(src).ok())
        .map(|url| url.to_string())
}

fn first_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Fetches the company site and tries each discovery method in turn.
pub async fn discover_logo(http: &Client, company_name: &str, website: Option<&str>) -> Option<String> {
    let website = website
        .filter(|w| !w.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| guess_website(company_name));

    match fetch_page(http, &website).await {
        Ok((base, html)) => {
            if let Some(logo) = find_logo_in_html(&html, &base) {
                return Some(logo);
            }
        }
        Err(e) => debug!("Failed to fetch {website} for logo discovery: {e}"),
    }

    let favicon = google_favicon_url(&website);
    match http
        .head(&favicon)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) if resp.status().as_u16() == 200 => Some(favicon),
        Ok(resp) => {
            debug!("Google favicon lookup for {website} returned {}", resp.status());
            None
        }
        Err(e) => {
            debug!("Failed to get Google favicon for {website}: {e}");
            None
        }
    }
}

async fn fetch_page(http: &Client, website: &str) -> Result<(Url, String), reqwest::Error> {
    let response = http
        .get(website)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await?;
    let base = response.url().clone();
    let html = response.text().await?;
    Ok((base, html))
}
