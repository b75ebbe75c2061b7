//! Alert variant of the result stream.

use super::{PageFetcher, Pager, StreamHandle, StreamState};
use crate::error::{ClientError, Result};

/// A lazy, forward-only cursor over newline-delimited alert lines.
///
/// A line split across a page boundary is reassembled and yielded once.
/// Empty lines are skipped. On the last page a trailing line without a
/// terminating newline is still yielded.
pub struct AlertStream<'c, F: PageFetcher + ?Sized> {
    pager: Pager<'c, F>,
    buf: Vec<u8>,
    pos: usize,
    state: StreamState,
}

impl<'c, F: PageFetcher + ?Sized> AlertStream<'c, F> {
    /// Wraps the first page of an alert query.
    pub fn new(multilog_id: i64, fetcher: &'c mut F, handle: StreamHandle) -> Self {
        let pager = Pager::new(multilog_id, fetcher, &handle);
        let state = StreamState::derive(!handle.data.is_empty(), handle.has_more);
        Self {
            pager,
            buf: handle.data,
            pos: 0,
            state,
        }
    }

    /// Returns true while alerts may remain, locally or on the server.
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

    /// Returns the next alert line without its newline.
    ///
    /// After an error the stream is failed and returns `Ok(None)` from then on.
    pub fn next_alert(&mut self) -> Result<Option<String>> {
        match self.advance() {
            Ok(line) => Ok(line),
            Err(e) => {
                self.state = StreamState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<String>> {
        loop {
            match self.state {
                StreamState::Done | StreamState::Failed => return Ok(None),
                StreamState::ExhaustedPageMoreAvailable => {
                    self.load_next_page()?;
                    continue;
                }
                StreamState::HasData => {}
            }

            let rest = &self.buf[self.pos..];
            let end = match rest.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    let line = self.pos..self.pos + i;
                    self.pos += i + 1;
                    line
                }
                // Partial line: wait for the rest of it.
                None if self.pager.has_more => {
                    self.load_next_page()?;
                    continue;
                }
                None => {
                    let line = self.pos..self.buf.len();
                    self.pos = self.buf.len();
                    line
                }
            };
            self.state = StreamState::derive(self.pos < self.buf.len(), self.pager.has_more);

            if end.is_empty() {
                continue;
            }
            let line = std::str::from_utf8(&self.buf[end])
                .map_err(|e| ClientError::DecodingError(format!("alert is not UTF-8: {}", e)))?;
            return Ok(Some(line.to_string()));
        }
    }

    /// Appends the next page behind any unconsumed tail.
    fn load_next_page(&mut self) -> Result<()> {
        let page = self.pager.fetch()?;
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.buf.extend_from_slice(&page);
        self.state = StreamState::derive(!self.buf.is_empty(), self.pager.has_more);
        Ok(())
    }
}

impl<F: PageFetcher + ?Sized> Iterator for AlertStream<'_, F> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_alert().transpose()
    }
}
