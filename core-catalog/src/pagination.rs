//! Page arithmetic for the catalog view. Pages are 1-based.

use serde::{Deserialize, Serialize};

/// Number of pages needed for `total` items. Zero items means zero pages.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as u32
}

/// A page of items plus the metadata needed to render pagination controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Items across all pages
    pub total: u64,
    /// Current page (1-based)
    pub page: u32,
    pub total_pages: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// # Examples
    ///
    /// ```
    /// use core_catalog::pagination::Page;
    ///
    /// let page = Page::new(vec![1, 2, 3], 37, 3, 15);
    /// assert_eq!(page.total_pages, 3);
    /// assert!(!page.has_next());
    /// assert!(page.has_previous());
    /// ```
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total,
            page,
            total_pages: total_pages(total, page_size),
            page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.page, self.total_pages)
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

/// Navigation state for pagination controls.
///
/// Every move returns the new page when it changed, `None` when the target
/// is out of range or already current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    total_pages: u32,
}

impl PageCursor {
    pub fn new(current: u32, total_pages: u32) -> Self {
        Self {
            current: current.max(1),
            total_pages,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn go_to(&mut self, page: u32) -> Option<u32> {
        if page < 1 || page > self.total_pages || page == self.current {
            return None;
        }
        self.current = page;
        Some(page)
    }

    pub fn first(&mut self) -> Option<u32> {
        self.go_to(1)
    }

    pub fn last(&mut self) -> Option<u32> {
        self.go_to(self.total_pages)
    }

    pub fn next(&mut self) -> Option<u32> {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> Option<u32> {
        self.go_to(self.current.saturating_sub(1))
    }
}
