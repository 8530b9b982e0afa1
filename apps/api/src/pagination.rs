//! Page-number pagination shared by the list endpoints.

use serde::{Deserialize, Serialize};

/// `?page=` query parameter. Kept as a string so that junk input falls back
/// to the first page instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn requested(&self) -> Option<i64> {
        self.page.as_deref().and_then(|p| p.trim().parse::<i64>().ok())
    }
}

/// A resolved page window over `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Resolves a requested page. Missing or non-numeric pages select the
    /// first page; pages below one or past the end select the last page. An
    /// empty collection still has one (empty) page.
    pub fn resolve(requested: Option<i64>, total: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);
        let page = match requested {
            None => 1,
            Some(p) if p < 1 => num_pages,
            Some(p) => (p as u64).min(num_pages),
        };
        PageWindow {
            page,
            num_pages,
            per_page,
            offset: (page - 1) * per_page,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Slice bounds of this page within a collection of `total` items.
    pub fn bounds(&self, total: usize) -> (usize, usize) {
        let start = (self.offset as usize).min(total);
        let end = (start + self.per_page as usize).min(total);
        (start, end)
    }
}

/// Standard paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: u64,
    pub page: u64,
    pub num_pages: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T: Serialize> Paginated<T> {
    /// Builds the envelope with `next`/`previous` links of the form `{path}?page=N`
    /// (`&page=N` when `path` already carries a query).
    pub fn new(path: &str, window: PageWindow, count: u64, results: Vec<T>) -> Self {
        let sep = if path.contains('?') { '&' } else { '?' };
        Self {
            count,
            page: window.page,
            num_pages: window.num_pages,
            next: window
                .has_next()
                .then(|| format!("{path}{sep}page={}", window.page + 1)),
            previous: window
                .has_previous()
                .then(|| format!("{path}{sep}page={}", window.page - 1)),
            results,
        }
    }
}

/// Form-encodes a single query-string value.
pub fn urlencode(value: &str) -> String {
    reqwest::Url::parse_with_params("http://localhost/", &[("v", value)])
        .ok()
        .and_then(|u| u.query().map(|q| q.trim_start_matches("v=").to_string()))
        .unwrap_or_default()
}
