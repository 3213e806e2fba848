/// Page-number pagination
///
/// `?page=N&page_size=M`, page numbers starting at 1. Responses are wrapped
/// in an envelope:
///
/// ```json
/// { "count": 250, "next": 3, "previous": 1, "results": ... }
/// ```
///
/// An unparsable `page_size` falls back to the default; an unparsable or
/// out-of-range `page` is a 404.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Raw pagination parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// A resolved page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }

    /// Rejects pages past the end; page 1 always exists
    pub fn check(&self, count: i64) -> Result<(), ApiError> {
        if self.number > 1 && self.offset() >= count {
            return Err(ApiError::NotFound("Invalid page.".to_string()));
        }
        Ok(())
    }
}

impl PageParams {
    pub fn resolve(&self) -> Result<Page, ApiError> {
        let number = match self.page.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            None => 1,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ApiError::NotFound("Invalid page.".to_string()))?,
        };

        let size = self
            .page_size
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        // Pages whose bounds do not fit in an i64 are past any real count
        (number - 1)
            .checked_mul(size)
            .and_then(|offset| offset.checked_add(size))
            .ok_or_else(|| ApiError::NotFound("Invalid page.".to_string()))?;

        Ok(Page { number, size })
    }
}

/// Paginated response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Total number of items across all pages
    pub count: i64,

    /// Next page number, if any
    pub next: Option<i64>,

    /// Previous page number, if any
    pub previous: Option<i64>,

    pub results: T,
}

impl<T> Paginated<T> {
    pub fn new(count: i64, page: Page, results: T) -> Self {
        let next = (page.offset() + page.size < count).then_some(page.number + 1);
        let previous = (page.number > 1).then_some(page.number - 1);

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Slices one page out of an in-memory list
pub fn slice<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .cloned()
        .collect()
}
