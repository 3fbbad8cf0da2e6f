//! Page navigation for paginated lists.

use stockpile_core::Pagination;

/// Current and last page of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: u32,
    pub last: u32,
}

impl PageInfo {
    pub fn new(current: u32, last: u32) -> Self {
        Self { current, last }
    }

    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.last
    }

    /// Previous page, never below 1.
    pub fn prev(&self) -> u32 {
        self.current.saturating_sub(1).max(1)
    }

    /// Next page, never past the last page. A current page already past
    /// the end stays where it is.
    pub fn next(&self) -> u32 {
        self.current.saturating_add(1).min(self.last.max(self.current))
    }
}

impl From<&Pagination> for PageInfo {
    fn from(pagination: &Pagination) -> Self {
        Self::new(pagination.current_page, pagination.last_page)
    }
}
