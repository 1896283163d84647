//! Pagination cursor over the server's note list.

/// Next page to request and whether the server has reported one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current_page: u32,
    has_more_pages: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            current_page: 1,
            has_more_pages: true,
        }
    }
}

impl PageCursor {
    /// Page the next fetch will request.
    pub const fn current_page(self) -> u32 {
        self.current_page
    }

    pub const fn has_more_pages(self) -> bool {
        self.has_more_pages
    }

    /// Start over from page one.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move to the server-reported next page, or stop when there is none.
    ///
    /// A cursor that does not move forward also stops, so a misbehaving
    /// server cannot keep pagination alive forever.
    pub fn advance(&mut self, next_page: Option<u32>) {
        match next_page {
            Some(next) if next > self.current_page => self.current_page = next,
            Some(next) => {
                tracing::warn!(
                    "Server reported next page {} after page {}; stopping pagination",
                    next,
                    self.current_page
                );
                self.has_more_pages = false;
            }
            None => self.has_more_pages = false,
        }
    }
}
