//! Pagination parameters and paged results.

use serde::{Deserialize, Serialize};

/// Caller-facing pagination parameters.
///
/// Pages are 1-based; the derived skip/take pair is
/// `skip = (page - 1) * size`, `take = size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: i64,
    /// Rows per page.
    pub size: i64,
    /// When set, the total-count query is skipped and this value is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_override: Option<i64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: 15,
            total_override: None,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page,
            size,
            total_override: None,
        }
    }

    /// Provide the total row count up front, skipping the count query.
    pub fn with_total(mut self, total: i64) -> Self {
        self.total_override = Some(total);
        self
    }

    /// Rows to skip; a page below 1 clamps to the first page.
    pub fn skip(&self) -> i64 {
        (self.page.max(1) - 1) * self.size
    }

    /// Rows to take.
    pub fn take(&self) -> i64 {
        self.size
    }
}

/// One page of results plus the total row count across all pages.
#[derive(Debug, Clone, Serialize)]
pub struct PagedList<T> {
    pub page: i64,
    pub size: i64,
    pub total: i64,
    pub items: Vec<T>,
}
