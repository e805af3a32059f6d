use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw `page` / `limit` query parameters.
///
/// Kept as strings so a non-numeric value falls back to the default instead
/// of being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

impl Pagination {
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Result<Self, AppError> {
        let page = parse_or(page, DEFAULT_PAGE);
        let limit = parse_or(limit, DEFAULT_LIMIT);

        let invalid = || AppError::BadRequest("Invalid pagination parameters".to_string());

        if page < 1 || limit < 1 {
            return Err(invalid());
        }

        let limit = limit.min(MAX_LIMIT);
        // The offset must fit in an i64 for the database.
        (page - 1).checked_mul(limit).ok_or_else(invalid)?;

        Ok(Self { page, limit })
    }

    /// Rows to skip. `from_raw` guarantees this does not overflow.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

impl TryFrom<&PageParams> for Pagination {
    type Error = AppError;

    fn try_from(params: &PageParams) -> Result<Self, Self::Error> {
        Pagination::from_raw(params.page.as_deref(), params.limit.as_deref())
    }
}
