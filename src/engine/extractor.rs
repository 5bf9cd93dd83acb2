//! Raw page extractor
//!
//! Reads back the pages of one collection and turns each into tool rows.
//! A page that does not decode aborts the run; nothing is skipped. Rows
//! the pages no longer account for are purged in the first transaction.

use super::types::{Cancellation, SyncStats};
use crate::error::{Error, Result};
use crate::store::{BoxedRecord, Purge, RawPage, Store, DEFAULT_CHUNK_SIZE};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

/// Extracts the raw pages of one collection
#[derive(Debug)]
pub struct ApiExtractor<'a> {
    store: &'a Store,
    cancel: &'a Cancellation,
    table: &'static str,
    params: String,
    chunk_size: usize,
    purges: Vec<Purge>,
}

impl<'a> ApiExtractor<'a> {
    /// Create an extractor over `table` pages stored under `params`
    pub fn new(
        store: &'a Store,
        cancel: &'a Cancellation,
        table: &'static str,
        params: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cancel,
            table,
            params: params.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            purges: Vec::new(),
        }
    }

    /// Delete rows ahead of the first page, in order of the calls
    #[must_use]
    pub fn purge(mut self, purges: impl IntoIterator<Item = Purge>) -> Self {
        self.purges.extend(purges);
        self
    }

    /// Set the number of pages read per chunk
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Decode every page as `T` and write what `extract` returns for it
    ///
    /// The rows of one page land in one transaction.
    pub fn extract<T, F>(&self, mut extract: F) -> Result<SyncStats>
    where
        T: DeserializeOwned,
        F: FnMut(T, &RawPage) -> Result<Vec<BoxedRecord>>,
    {
        self.extract_replacing::<T, _>(|payload, page| Ok((Vec::new(), extract(payload, page)?)))
    }

    /// Like [`extract`](Self::extract), with purges of each page's own
    ///
    /// A page's purges run after the extractor-wide ones and before its rows.
    pub fn extract_replacing<T, F>(&self, mut extract: F) -> Result<SyncStats>
    where
        T: DeserializeOwned,
        F: FnMut(T, &RawPage) -> Result<(Vec<Purge>, Vec<BoxedRecord>)>,
    {
        let start = Instant::now();
        self.store.ensure_raw_table(self.table)?;

        let mut stats = SyncStats::new();
        let mut purges = self.purges.clone();
        let mut cursor = self
            .store
            .raw_cursor(self.table, &self.params, self.chunk_size);
        while let Some(pages) = cursor.next_chunk()? {
            for page in &pages {
                self.cancel.check()?;
                let payload: T = serde_json::from_str(&page.data).map_err(|e| {
                    Error::decode(format!(
                        "{} page {} ({}): {e}",
                        self.table, page.page_id, page.url
                    ))
                })?;
                let (page_purges, rows) = extract(payload, page)?;
                purges.extend(page_purges);
                stats.add_page();
                stats.add_output(self.store.purge_and_write(&purges, &rows)?);
                purges.clear();
            }
            debug!("Extracted {} pages from {}", pages.len(), self.table);
        }
        self.store.purge_and_write(&purges, &[])?;

        stats.set_duration(start.elapsed().as_millis() as u64);
        Ok(stats)
    }
}
