//! Page window over a history listing.
//!
//! A [`Pagination`] describes which slice of a listing is being shown:
//! `offset` is the index of the first record on the page (never a page
//! number), `page_size` is how many records fit on a page and `total` is how
//! many records match the listing. It is built fresh per request and never
//! mutated afterwards.

use super::errors::{DomainError, DomainResult};

/// Number of page links rendered on each side of the current page.
const PAGE_LINK_RADIUS: u64 = 2;

/// Immutable description of the current page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    offset: u64,
    total: u64,
    page_size: u64,
}

/// One entry of the "page N of M" navigation strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    /// Link to the previous window (one-based page number).
    Previous(u64),
    /// A numbered page; `current` marks the page being shown.
    Page { number: u64, current: bool },
    /// Elided run of pages.
    Gap,
    /// Link to the next window (one-based page number).
    Next(u64),
}

impl Pagination {
    /// A window holding only the newest record.
    pub const ONE_ITEM: Pagination = Pagination {
        offset: 0,
        total: 1,
        page_size: 1,
    };

    /// Window starting at `offset`.
    ///
    /// Negative offsets are treated as 0 and offsets past the end are clamped
    /// to the last record. An empty listing always yields offset 0.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidArgument`] if `page_size <= 0`.
    pub fn page_starting_at(offset: i64, total: u64, page_size: i64) -> DomainResult<Self> {
        let page_size = positive_page_size(page_size)?;

        if total == 0 {
            return Ok(Self {
                offset: 0,
                total: 0,
                page_size,
            });
        }

        let offset = u64::try_from(offset).unwrap_or(0).min(total - 1);

        Ok(Self {
            offset,
            total,
            page_size,
        })
    }

    /// Window for a one-based page number.
    ///
    /// Page numbers below 1 select the first page; page numbers past the last
    /// page select the last page, so the offset stays page-aligned.
    pub fn page_by_number(page_number: i64, total: u64, page_size: i64) -> DomainResult<Self> {
        let size = positive_page_size(page_size)?;
        let last_page = total.div_ceil(size).max(1);
        let page = u64::try_from(page_number).unwrap_or(1).clamp(1, last_page);
        let offset = (page - 1).saturating_mul(size);

        Self::page_starting_at(i64::try_from(offset).unwrap_or(i64::MAX), total, page_size)
    }

    /// Page-aligned window containing the record at `offset`.
    pub fn page_for(offset: i64, total: u64, page_size: i64) -> DomainResult<Self> {
        let size = positive_page_size(page_size)?;
        let index = u64::try_from(offset).unwrap_or(0) / size;

        Self::page_by_number(
            i64::try_from(index).unwrap_or(i64::MAX).saturating_add(1),
            total,
            page_size,
        )
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Zero-based index of the page containing `offset`.
    pub fn current_page(&self) -> u64 {
        self.offset / self.page_size
    }

    /// One-based page number, for "page N of M".
    pub fn page_number(&self) -> u64 {
        self.current_page() + 1
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.page_size) < self.total
    }

    pub fn previous_offset(&self) -> Option<u64> {
        self.has_previous()
            .then(|| self.offset.saturating_sub(self.page_size))
    }

    pub fn next_offset(&self) -> Option<u64> {
        self.has_next().then(|| self.offset + self.page_size)
    }

    pub fn previous_page(&self) -> Option<u64> {
        self.previous_offset()
            .map(|offset| offset / self.page_size + 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        self.next_offset().map(|offset| offset / self.page_size + 1)
    }

    /// Navigation strip: previous link, first page, a window of pages around
    /// the current one, last page, next link. Gaps mark elided pages.
    ///
    /// Empty when everything fits on a single page.
    pub fn page_links(&self) -> Vec<PageLink> {
        let total_pages = self.total_pages();
        if total_pages <= 1 {
            return Vec::new();
        }

        let current = self.page_number();
        let first = current.saturating_sub(PAGE_LINK_RADIUS).max(1);
        let last = (current + PAGE_LINK_RADIUS).min(total_pages);

        let mut links = Vec::new();

        if let Some(page) = self.previous_page() {
            links.push(PageLink::Previous(page));
        }

        if first > 1 {
            links.push(PageLink::Page {
                number: 1,
                current: false,
            });
            if first > 2 {
                links.push(PageLink::Gap);
            }
        }

        for number in first..=last {
            links.push(PageLink::Page {
                number,
                current: number == current,
            });
        }

        if last < total_pages {
            if last + 1 < total_pages {
                links.push(PageLink::Gap);
            }
            links.push(PageLink::Page {
                number: total_pages,
                current: false,
            });
        }

        if let Some(page) = self.next_page() {
            links.push(PageLink::Next(page));
        }

        links
    }
}

fn positive_page_size(page_size: i64) -> DomainResult<u64> {
    u64::try_from(page_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| {
            DomainError::InvalidArgument(format!(
                "page size must be positive, got {}",
                page_size
            ))
        })
}
