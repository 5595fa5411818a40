//! Fixed-size page-number pagination.

/// Default number of posts per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A 1-based page request. Page numbers below 1 are clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn first(size: u32) -> Self {
        Self::new(1, size)
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u32 {
        self.size
    }
}

/// One page of an ordered collection plus total-count metadata.
///
/// A request beyond the last page yields an empty `items` vector, not an
/// error; templates render it as an empty listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            number: request.number,
            size: request.size,
            total,
        }
    }

    pub fn num_pages(&self) -> u32 {
        let size = u64::from(self.size.max(1));
        let pages = self.total.div_ceil(size);
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.number) * u64::from(self.size) < self.total
    }
}

/// Slice an in-memory ordered collection. The database repositories push
/// the equivalent LIMIT/OFFSET into SQL.
pub fn paginate<T: Clone>(collection: &[T], request: PageRequest) -> Page<T> {
    let total = collection.len() as u64;
    let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let items = if start >= collection.len() {
        Vec::new()
    } else {
        let end = start.saturating_add(request.limit() as usize).min(collection.len());
        collection[start..end].to_vec()
    };
    Page::new(items, request, total)
}
