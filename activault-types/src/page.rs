//! Pagination parameters and results shared by all list queries.

use serde::{Deserialize, Serialize};

/// One-based page request. Out-of-range values are clamped rather than
/// rejected, matching the behavior callers already rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 10;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Clamps page to >= 1 and page_size to a sane default.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: if self.page_size == 0 {
                Self::DEFAULT_SIZE
            } else {
                self.page_size
            },
        }
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        let p = self.normalized();
        i64::from(p.page - 1) * i64::from(p.page_size)
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.normalized().page_size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_SIZE,
        }
    }
}

/// A page of results together with the total matching row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub list: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn new(total: i64, page: Page, list: Vec<T>) -> Self {
        let page = page.normalized();
        Self {
            total,
            page: page.page,
            page_size: page.page_size,
            list,
        }
    }
}
