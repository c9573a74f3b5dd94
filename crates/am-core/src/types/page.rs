//! Paginated responses.

use serde::{Deserialize, Serialize};

use super::QueryParams;

/// One page of a server-side paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// Total number of records across pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Number of pages.
    pub pages: u32,
    /// Whether a following page exists.
    pub has_next: bool,
    /// Whether a preceding page exists.
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Builds a page from the records of `page` and the overall total.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_core::Page;
    ///
    /// let page = Page::new(vec!["a", "b"], 2, 2, 5);
    /// assert_eq!(page.pages, 3);
    /// assert!(page.has_next);
    /// assert!(page.has_prev);
    /// ```
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, size: u32, total: u64) -> Self {
        let info = PageInfo::compute(page, size, total);
        Self {
            items,
            total,
            page: info.page,
            size: info.size,
            pages: info.pages,
            has_next: info.has_next,
            has_prev: info.has_prev,
        }
    }

    /// Returns the pagination metadata without the records.
    #[must_use]
    pub const fn info(&self) -> PageInfo {
        PageInfo {
            page: self.page,
            size: self.size,
            total: self.total,
            pages: self.pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }

    /// Maps the records, keeping the metadata.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageInfo {
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Total number of records.
    pub total: u64,
    /// Number of pages.
    pub pages: u32,
    /// Whether a following page exists.
    pub has_next: bool,
    /// Whether a preceding page exists.
    pub has_prev: bool,
}

impl PageInfo {
    /// Computes metadata the way the backend does.
    #[must_use]
    pub fn compute(page: u32, size: u32, total: u64) -> Self {
        let size = size.max(1);
        let pages = u32::try_from(total.div_ceil(u64::from(size))).unwrap_or(u32::MAX);
        let page = page.max(1);
        Self {
            page,
            size,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

impl Default for PageInfo {
    fn default() -> Self {
        Self::compute(1, 10, 0)
    }
}

/// Requested page and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParams {
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
}

impl PageParams {
    /// Creates page parameters.
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Returns the zero-based offset of the first record.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.size as u64
    }

    /// Returns the query string parameters.
    #[must_use]
    pub fn to_params(self) -> QueryParams {
        vec![("page", self.page.to_string()), ("size", self.size.to_string())]
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, size: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_backend_json() {
        let json = r#"{"items": [1, 2], "total": 12, "page": 1, "size": 10, "pages": 2, "has_next": true, "has_prev": false}"#;
        let page: Page<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_info_defaults() {
        let info = PageInfo::default();
        assert_eq!(info.page, 1);
        assert_eq!(info.size, 10);
        assert_eq!(info.total, 0);
        assert_eq!(info.pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_prev);
    }

    #[test]
    fn test_last_page_has_no_next() {
        let info = PageInfo::compute(3, 10, 25);
        assert_eq!(info.pages, 3);
        assert!(!info.has_next);
        assert!(info.has_prev);
    }

    #[test]
    fn test_params_offset() {
        assert_eq!(PageParams::new(1, 25).offset(), 0);
        assert_eq!(PageParams::new(3, 25).offset(), 50);
        assert_eq!(PageParams::default().to_params(), vec![("page", "1".to_owned()), ("size", "10".to_owned())]);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], 1, 3, 9).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20, 30]);
        assert_eq!(page.pages, 3);
    }
}
