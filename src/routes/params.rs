//! Path-based paging parameters shared by the card listing endpoints.
//!
//! Page and limit arrive as path segments rather than query strings, so each
//! endpoint exposes one route per optional trailing segment and funnels the
//! raw values through [`Paging`] for normalization.

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 500;

/// Minimum number of characters accepted by the name search endpoint.
pub const MIN_SEARCH_LENGTH: usize = 3;

/// Normalized page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: u32,
    limit: u32,
}

impl Paging {
    /// Build paging from raw path values, falling back to the given default limit.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
        }
    }

    /// One-based page index.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of cards per page.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset for `OFFSET`.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_segments_are_missing() {
        let paging = Paging::new(None, None, DEFAULT_LIST_LIMIT);
        assert_eq!(paging.page(), 1);
        assert_eq!(paging.limit(), 100);
        assert_eq!(paging.offset(), 0);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let paging = Paging::new(Some(0), Some(20), DEFAULT_SEARCH_LIMIT);
        assert_eq!(paging.page(), 1);
        assert_eq!(paging.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let paging = Paging::new(Some(3), Some(25), DEFAULT_LIST_LIMIT);
        assert_eq!(paging.offset(), 50);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(Paging::new(Some(1), Some(0), 20).limit(), 1);
        assert_eq!(Paging::new(Some(1), Some(100_000), 20).limit(), MAX_LIMIT);
    }
}
