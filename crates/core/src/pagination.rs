//! Page-number pagination used by every list endpoint.
//!
//! List endpoints take `?page=&limit=` (1-based page). The repository layer
//! turns a [`PageRequest`] into `LIMIT/OFFSET` and the handler wraps the rows
//! together with [`PageMeta`] in a [`Paginated`] envelope.

use serde::Serialize;

/// Default page when `?page=` is missing.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size when `?limit=` is missing.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Maximum page size a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 50;

/// Clamp a user-provided limit to `[1, max]`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided page number to at least 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(DEFAULT_PAGE).max(1)
}

/// A normalised page request. Construct through [`PageRequest::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: clamp_page(page),
            limit: clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        }
    }

    /// Row offset of the first item on this page. Saturates for absurd page
    /// numbers, which then simply yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Build the metadata block for a result set of `total` matching rows.
    pub fn meta(&self, total: i64) -> PageMeta {
        let total = total.max(0);
        let total_pages = (total + self.limit - 1) / self.limit;
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            total_pages,
            has_next: self.page < total_pages,
            has_prev: self.page > 1,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned next to every page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// `{ "data": [...], "pagination": {...} }` envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            data,
            pagination: request.meta(total),
        }
    }
}
