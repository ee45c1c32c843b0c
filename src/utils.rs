use serde::{Deserialize, Serialize};

/// Page-based pagination query parameters. Pages are 1-indexed; page 0 or a
/// missing parameter both mean the first page.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    page: u64,
}

impl PaginationParams {
    pub fn from_page(page: u64) -> Self {
        Self { page }
    }

    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self, page_size: u32) -> i64 {
        i64::from(page_size)
    }

    pub fn offset(&self, page_size: u32) -> i64 {
        ((self.page() - 1) as i64) * i64::from(page_size)
    }
}

/// Envelope for paginated list responses.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}
