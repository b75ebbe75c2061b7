//! Record variant of the result stream.

use super::{PageFetcher, Pager, StreamHandle, StreamState};
use crate::error::{ClientError, Result};
use crate::schema::{Record, Schema};
use std::ops::Range;

/// A lazy, forward-only cursor over the records of a query result.
///
/// [`next_record`](Self::next_record) yields records borrowing the current
/// page; the [`Iterator`] impl yields records owning a copy of their bytes,
/// which stay valid after the stream (and its borrow of the fetcher) is gone.
pub struct RecordStream<'s, 'c, F: PageFetcher + ?Sized> {
    schema: &'s Schema,
    pager: Pager<'c, F>,
    page: Vec<u8>,
    cursor: usize,
    state: StreamState,
}

impl<'s, 'c, F: PageFetcher + ?Sized> RecordStream<'s, 'c, F> {
    /// Wraps the first page of a query result.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DecodingError`] if the page does not hold a
    /// whole number of records.
    pub fn new(
        multilog_id: i64,
        schema: &'s Schema,
        fetcher: &'c mut F,
        handle: StreamHandle,
    ) -> Result<Self> {
        check_page(schema, &handle.data)?;
        let pager = Pager::new(multilog_id, fetcher, &handle);
        let state = StreamState::derive(!handle.data.is_empty(), handle.has_more);
        Ok(Self {
            schema,
            pager,
            page: handle.data,
            cursor: 0,
            state,
        })
    }

    /// Returns true while records may remain, locally or on the server.
    pub fn has_more(&self) -> bool {
        matches!(
            self.state,
            StreamState::HasData | StreamState::ExhaustedPageMoreAvailable
        )
    }

    /// Returns the current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the number of continuation pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pager.pages_fetched
    }

    /// Returns the next record, borrowing the current page.
    ///
    /// Fetches the next page first if the current one is consumed and the
    /// server reported more. After an error the stream is failed and returns
    /// `Ok(None)` from then on.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        match self.next_range()? {
            Some(range) => Ok(Some(self.schema.apply(&self.page[range])?)),
            None => Ok(None),
        }
    }

    fn next_range(&mut self) -> Result<Option<Range<usize>>> {
        loop {
            match self.state {
                StreamState::HasData => break,
                StreamState::Done | StreamState::Failed => return Ok(None),
                StreamState::ExhaustedPageMoreAvailable => {
                    if let Err(e) = self.load_next_page() {
                        self.state = StreamState::Failed;
                        return Err(e);
                    }
                }
            }
        }

        let start = self.cursor;
        self.cursor += self.schema.record_size();
        self.state = StreamState::derive(self.cursor < self.page.len(), self.pager.has_more);
        Ok(Some(start..self.cursor))
    }

    fn load_next_page(&mut self) -> Result<()> {
        let page = self.pager.fetch()?;
        check_page(self.schema, &page)?;
        self.page = page;
        self.cursor = 0;
        self.state = StreamState::derive(!self.page.is_empty(), self.pager.has_more);
        Ok(())
    }
}

impl<'s, 'c, F: PageFetcher + ?Sized> Iterator for RecordStream<'s, 'c, F> {
    type Item = Result<Record<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        let schema: &'s Schema = self.schema;
        match self.next_range() {
            Ok(Some(range)) => Some(schema.apply_owned(self.page[range].to_vec())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn check_page(schema: &Schema, page: &[u8]) -> Result<()> {
    if page.len() % schema.record_size() != 0 {
        return Err(ClientError::DecodingError(format!(
            "page of {} bytes is not a multiple of record size {}",
            page.len(),
            schema.record_size()
        )));
    }
    Ok(())
}
