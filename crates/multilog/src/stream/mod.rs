//! Lazy cursors over paginated query results.
//!
//! Queries (filters, alert lookups) return a first [`StreamHandle`]: a page of
//! data, a continuation [`IteratorDescriptor`] and a `has_more` flag. The
//! streams in this module wrap that handle and fetch follow-up pages through a
//! [`PageFetcher`] only when the caller asks for a unit the current page
//! cannot supply.
//!
//! # State Machine
//!
//! ```text
//!            consume unit (page not empty)
//!           ┌───────────┐
//!           v           │
//!       ┌─────────┐─────┘   page consumed, has_more=false    ┌──────┐
//!  ───> │ HasData │ ────────────────────────────────────────> │ Done │
//!       └─────────┘                                           └──────┘
//!         ^     │ page consumed, has_more=true                   ^
//!         │     v                                                │
//!       ┌──────────────────────────────┐  fetched page empty,    │
//!       │ ExhaustedPageMoreAvailable   │  has_more=false ────────┘
//!       └──────────────────────────────┘
//!         │ fetch error
//!         v
//!       ┌────────┐
//!       │ Failed │  (terminal)
//!       └────────┘
//! ```
//!
//! Cancellation is cooperative: drop the stream to stop. A page fetch already
//! issued runs to completion on the server.

mod alerts;
mod records;

pub use alerts::AlertStream;
pub use records::RecordStream;

use crate::error::Result;
use tracing::debug;

/// Opaque continuation token identifying a server-side result iterator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IteratorDescriptor {
    /// Server-assigned iterator id.
    pub id: i64,
    /// Iterator kind as reported by the server.
    pub iterator_type: i32,
    /// Element type as reported by the server.
    pub data_type: i32,
    /// Server handler owning the iterator.
    pub handler_id: i32,
}

/// One page of a paginated result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHandle {
    /// Continuation token for the next page.
    pub descriptor: IteratorDescriptor,
    /// Page payload: whole records, or newline-delimited alert text.
    pub data: Vec<u8>,
    /// Number of entries the server reports in `data`.
    pub num_entries: u32,
    /// Whether the server holds further pages.
    pub has_more: bool,
}

impl StreamHandle {
    /// Creates a handle.
    pub fn new(descriptor: IteratorDescriptor, data: Vec<u8>, has_more: bool) -> Self {
        Self {
            descriptor,
            data,
            num_entries: 0,
            has_more,
        }
    }
}

/// Source of continuation pages.
pub trait PageFetcher {
    /// Fetches the page following the one identified by `descriptor`.
    fn get_more(
        &mut self,
        multilog_id: i64,
        descriptor: &IteratorDescriptor,
    ) -> Result<StreamHandle>;
}

/// Position of a stream in its page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// The current page has unread bytes.
    HasData,
    /// The current page is consumed and the server holds more pages.
    ExhaustedPageMoreAvailable,
    /// The current page is consumed and the server holds no more pages.
    Done,
    /// A page fetch or decode failed; the stream yields nothing further.
    Failed,
}

impl StreamState {
    fn derive(unread: bool, has_more: bool) -> Self {
        match (unread, has_more) {
            (true, _) => Self::HasData,
            (false, true) => Self::ExhaustedPageMoreAvailable,
            (false, false) => Self::Done,
        }
    }
}

/// Continuation bookkeeping shared by both stream variants.
struct Pager<'c, F: PageFetcher + ?Sized> {
    multilog_id: i64,
    fetcher: &'c mut F,
    descriptor: IteratorDescriptor,
    has_more: bool,
    pages_fetched: usize,
}

impl<'c, F: PageFetcher + ?Sized> Pager<'c, F> {
    fn new(multilog_id: i64, fetcher: &'c mut F, handle: &StreamHandle) -> Self {
        Self {
            multilog_id,
            fetcher,
            descriptor: handle.descriptor.clone(),
            has_more: handle.has_more,
            pages_fetched: 0,
        }
    }

    /// Fetches the next page and returns its payload.
    fn fetch(&mut self) -> Result<Vec<u8>> {
        let handle = self.fetcher.get_more(self.multilog_id, &self.descriptor)?;
        self.pages_fetched += 1;
        debug!(
            "Fetched page {} of {} bytes for multilog {} (has_more={})",
            self.pages_fetched,
            handle.data.len(),
            self.multilog_id,
            handle.has_more
        );
        self.descriptor = handle.descriptor;
        self.has_more = handle.has_more;
        Ok(handle.data)
    }
}
