use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    /// Maximum number of items to return (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

impl PaginationQuery {
    pub fn get_limit(&self) -> i64 {
        page_limit(self.limit)
    }

    pub fn get_offset(&self) -> i64 {
        page_offset(self.offset)
    }
}

pub fn page_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

pub fn page_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
