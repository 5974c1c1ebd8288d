use serde::{Deserialize, Serialize};

/// Ordering of the leftovers listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeftoverSort {
    /// Largest remaining stock first.
    #[default]
    Quantity,
    /// Alphabetical by ingredient name.
    Name,
}

/// Builder for the paginated leftovers query.
///
/// Pages are 1-based. Out-of-range inputs are clamped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeftoverQuery {
    pub sort_by: LeftoverSort,
    pub page: usize,
    pub page_size: usize,
}

impl LeftoverQuery {
    pub const DEFAULT_PAGE_SIZE: usize = 10;
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Creates a query for the first page with the default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordering.
    pub fn sort_by(mut self, sort_by: LeftoverSort) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Selects a page; zero is treated as the first page.
    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size; zero falls back to the default.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = match page_size {
            0 => Self::DEFAULT_PAGE_SIZE,
            n => n.min(Self::MAX_PAGE_SIZE),
        };
        self
    }

    /// Number of rows to skip. Saturates for absurdly large pages.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for LeftoverQuery {
    fn default() -> Self {
        Self {
            sort_by: LeftoverSort::default(),
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Returns true if more rows exist after this page.
    pub fn has_next_page(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults() {
        let query = LeftoverQuery::new();
        assert_eq!(query.sort_by, LeftoverSort::Quantity);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, LeftoverQuery::DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn query_builder_clamps_inputs() {
        let query = LeftoverQuery::new().page(0).page_size(0);
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, LeftoverQuery::DEFAULT_PAGE_SIZE);

        let query = LeftoverQuery::new().page(3).page_size(1000);
        assert_eq!(query.page_size, LeftoverQuery::MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 200);
    }

    #[test]
    fn page_reports_next_page() {
        let page = Page {
            items: vec![1, 2],
            page: 1,
            page_size: 2,
            total: 3,
        };
        assert!(page.has_next_page());

        let last = Page {
            items: vec![3],
            page: 2,
            page_size: 2,
            total: 3,
        };
        assert!(!last.has_next_page());
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let query = LeftoverQuery::new().page(usize::MAX).page_size(50);
        assert_eq!(query.offset(), usize::MAX);

        let page: Page<u8> = Page {
            items: vec![],
            page: usize::MAX,
            page_size: 50,
            total: 3,
        };
        assert!(!page.has_next_page());
    }
}
