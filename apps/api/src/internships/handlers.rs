use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::internships::{feed, store};
use crate::models::posting::JobPostingRow;
use crate::pagination::{urlencode, PageQuery, PageWindow, Paginated};
use crate::state::AppState;

pub const POSTINGS_PER_PAGE: u64 = 100;
const POSTINGS_PATH: &str = "/api/job-postings";

#[derive(Debug, Default, Deserialize)]
pub struct PostingQuery {
    pub company: Option<String>,
    pub page: Option<String>,
}

impl PostingQuery {
    fn company(&self) -> Option<&str> {
        self.company.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page.clone(),
        }
    }
}

/// GET /api/internships?page=N
pub async fn handle_internships(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Value>>, AppError> {
    let items = feed::load_feed(&state).await?;
    Ok(Json(feed::page_of(items, query.requested())))
}

/// GET /api/job-postings?company=&page=
pub async fn handle_job_postings(
    State(state): State<AppState>,
    Query(query): Query<PostingQuery>,
) -> Result<Json<Paginated<JobPostingRow>>, AppError> {
    let company = query.company();
    let total = store::count_visible(&state.db, company).await?.max(0) as u64;
    let window = PageWindow::resolve(query.page().requested(), total, POSTINGS_PER_PAGE);
    let results = store::list_visible(
        &state.db,
        company,
        window.per_page as i64,
        window.offset as i64,
    )
    .await?;

    let path = match company {
        Some(c) => format!("{POSTINGS_PATH}?company={}", urlencode(c)),
        None => POSTINGS_PATH.to_string(),
    };
    Ok(Json(Paginated::new(&path, window, total, results)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_company_is_no_filter() {
        let q = PostingQuery {
            company: Some("  ".into()),
            page: None,
        };
        assert!(q.company().is_none());
    }
}
