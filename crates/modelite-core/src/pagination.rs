//! Page arithmetic for windowed result display.
//!
//! A [`Pagination`] is computed from a total row count and is immutable;
//! [`Pagination::prev`] and [`Pagination::next`] build sibling values.

use crate::error::{Error, Result};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Page window over `total` rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    per_page: usize,
    total: usize,
    nb_pages: usize,
}

impl Pagination {
    /// Compute pagination without bounds checking.
    ///
    /// `per_page` is clamped to at least 1.
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        let per_page = per_page.max(1);
        Self {
            page,
            per_page,
            total,
            nb_pages: total.div_ceil(per_page),
        }
    }

    /// Compute pagination and check that `page` lies in `[1, nb_pages]`.
    ///
    /// The check is skipped when there is nothing to paginate (`total == 0`).
    ///
    /// ```
    /// use modelite_core::Pagination;
    ///
    /// let p = Pagination::compute(10, 10, 95)?;
    /// assert_eq!(p.nb_pages(), 10);
    /// assert_eq!(p.offset(), 90);
    /// assert!(Pagination::compute(11, 10, 95).is_err());
    /// # Ok::<(), modelite_core::Error>(())
    /// ```
    pub fn compute(page: usize, per_page: usize, total: usize) -> Result<Self> {
        if per_page == 0 {
            return Err(Error::Query("per_page must be greater than zero".to_string()));
        }
        let pagination = Self::new(page, per_page, total);
        pagination.check_bounds()?;
        Ok(pagination)
    }

    /// Fail with [`Error::PageOutOfBound`] if the page is outside `[1, nb_pages]`
    pub fn check_bounds(&self) -> Result<()> {
        if self.nb_pages > 0 && (self.page < 1 || self.page > self.nb_pages) {
            return Err(Error::PageOutOfBound {
                page: self.page,
                nb_pages: self.nb_pages,
            });
        }
        Ok(())
    }

    /// Current page, 1-based
    pub fn page(&self) -> usize {
        self.page
    }

    /// Rows per page
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Rows matched by the whole query
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of pages, 0 when nothing matched
    pub fn nb_pages(&self) -> usize {
        self.nb_pages
    }

    /// Number of rows to skip for this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// Whether a page precedes this one
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        self.page < self.nb_pages
    }

    /// Number of the previous page
    pub fn prev_page(&self) -> Option<usize> {
        self.has_prev().then(|| self.page - 1)
    }

    /// Number of the next page
    pub fn next_page(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// Pagination of the previous page
    pub fn prev(&self) -> Option<Pagination> {
        self.prev_page()
            .map(|page| Pagination::new(page, self.per_page, self.total))
    }

    /// Pagination of the next page
    pub fn next(&self) -> Option<Pagination> {
        self.next_page()
            .map(|page| Pagination::new(page, self.per_page, self.total))
    }

    /// Page numbers to render as navigation, with `None` marking gaps.
    pub fn iter_pages(&self, window: PageWindow) -> PageIter {
        PageIter {
            window,
            page: self.page,
            nb_pages: self.nb_pages,
            num: 1,
            last: 0,
            pending: None,
        }
    }
}

impl Serialize for Pagination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Pagination", 5)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("per_page", &self.per_page)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("nb_pages", &self.nb_pages)?;
        state.serialize_field("offset", &self.offset())?;
        state.end()
    }
}

/// Which page numbers [`Pagination::iter_pages`] renders.
///
/// A page is shown if it is within `left_edge` of the first page, within
/// `left_current` before or `right_current` after the current page, or
/// within `right_edge` of the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Pages always shown at the start
    pub left_edge: usize,
    /// Pages shown before the current one
    pub left_current: usize,
    /// Pages shown after the current one, the current page included
    pub right_current: usize,
    /// Pages always shown at the end
    pub right_edge: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            left_edge: 2,
            left_current: 2,
            right_current: 5,
            right_edge: 2,
        }
    }
}

impl PageWindow {
    fn includes(&self, num: usize, page: usize, nb_pages: usize) -> bool {
        num <= self.left_edge
            || (num + self.left_current + 1 > page && num < page + self.right_current)
            || num + self.right_edge > nb_pages
    }
}

/// Lazy iterator returned by [`Pagination::iter_pages`]
#[derive(Debug, Clone)]
pub struct PageIter {
    window: PageWindow,
    page: usize,
    nb_pages: usize,
    num: usize,
    last: usize,
    pending: Option<usize>,
}

impl Iterator for PageIter {
    type Item = Option<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(num) = self.pending.take() {
            return Some(Some(num));
        }
        while self.num <= self.nb_pages {
            let num = self.num;
            self.num += 1;
            if !self.window.includes(num, self.page, self.nb_pages) {
                continue;
            }
            let gap = self.last + 1 != num;
            self.last = num;
            if gap {
                self.pending = Some(num);
                return Some(None);
            }
            return Some(Some(num));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let p = Pagination::compute(1, 10, 95).unwrap();
        assert_eq!(p.nb_pages(), 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(Pagination::compute(10, 10, 95).unwrap().offset(), 90);
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(matches!(
            Pagination::compute(11, 10, 95),
            Err(Error::PageOutOfBound { page: 11, nb_pages: 10 })
        ));
        assert!(matches!(
            Pagination::compute(0, 10, 95),
            Err(Error::PageOutOfBound { .. })
        ));
    }

    #[test]
    fn test_empty_total_skips_bounds_check() {
        let p = Pagination::compute(3, 10, 0).unwrap();
        assert_eq!(p.nb_pages(), 0);
        assert!(p.iter_pages(PageWindow::default()).next().is_none());
    }

    #[test]
    fn test_zero_per_page_rejected() {
        assert!(matches!(Pagination::compute(1, 0, 10), Err(Error::Query(_))));
    }

    #[test]
    fn test_prev_next() {
        let p = Pagination::new(1, 10, 25);
        assert!(p.prev().is_none());
        let next = p.next().unwrap();
        assert_eq!(next.page(), 2);
        assert_eq!(next.next().unwrap().page(), 3);
        assert!(next.next().unwrap().next().is_none());
        assert_eq!(p.page(), 1);
    }

    #[test]
    fn test_iter_pages_window() {
        let p = Pagination::new(10, 10, 200);
        let pages: Vec<Option<usize>> = p.iter_pages(PageWindow::default()).collect();
        let mut expected = vec![Some(1), Some(2), None];
        expected.extend((8..=14).map(Some));
        expected.extend([None, Some(19), Some(20)]);
        assert_eq!(pages, expected);
    }

    #[test]
    fn test_iter_pages_without_gaps() {
        let p = Pagination::new(1, 10, 40);
        let pages: Vec<Option<usize>> = p.iter_pages(PageWindow::default()).collect();
        assert_eq!(pages, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_serialize_includes_offset() {
        let json = serde_json::to_value(Pagination::new(3, 10, 95)).unwrap();
        assert_eq!(json["offset"], 20);
        assert_eq!(json["nb_pages"], 10);
    }
}
