use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::h1b::store;
use crate::models::h1b::{H1bRecord, StatusCount};
use crate::pagination::{urlencode, PageQuery, PageWindow, Paginated};
use crate::state::AppState;

pub const H1B_PER_PAGE: u64 = 50;
const H1B_PATH: &str = "/api/h1b";

#[derive(Debug, Default, Deserialize)]
pub struct H1bQuery {
    pub employer: Option<String>,
    pub status: Option<String>,
    pub page: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl H1bQuery {
    /// Path with the active filters, used as the base of page links.
    fn link_base(&self) -> String {
        let params: Vec<String> = [("employer", non_blank(&self.employer)), ("status", non_blank(&self.status))]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| format!("{key}={}", urlencode(v))))
            .collect();
        if params.is_empty() {
            H1B_PATH.to_string()
        } else {
            format!("{H1B_PATH}?{}", params.join("&"))
        }
    }
}

/// GET /api/h1b?employer=&status=&page=
pub async fn handle_list_h1b(
    State(state): State<AppState>,
    Query(query): Query<H1bQuery>,
) -> Result<Json<Paginated<H1bRecord>>, AppError> {
    let employer = non_blank(&query.employer);
    let status = non_blank(&query.status);

    let total = store::count(&state.db, employer, status).await?.max(0) as u64;
    let requested = PageQuery {
        page: query.page.clone(),
    }
    .requested();
    let window = PageWindow::resolve(requested, total, H1B_PER_PAGE);
    let results = store::list(
        &state.db,
        employer,
        status,
        window.per_page as i64,
        window.offset as i64,
    )
    .await?;

    Ok(Json(Paginated::new(&query.link_base(), window, total, results)))
}

/// GET /api/h1b/stats
pub async fn handle_h1b_stats(State(state): State<AppState>) -> Result<Json<Vec<StatusCount>>, AppError> {
    Ok(Json(store::status_counts(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_base_without_filters() {
        assert_eq!(H1bQuery::default().link_base(), "/api/h1b");
    }

    #[test]
    fn test_link_base_keeps_filters() {
        let q = H1bQuery {
            employer: Some("Jane Street".into()),
            status: Some("Certified".into()),
            page: Some("2".into()),
        };
        assert_eq!(q.link_base(), "/api/h1b?employer=Jane+Street&status=Certified");

        let q = H1bQuery {
            employer: Some(" ".into()),
            status: Some("Denied".into()),
            page: None,
        };
        assert_eq!(q.link_base(), "/api/h1b?status=Denied");
    }
}
