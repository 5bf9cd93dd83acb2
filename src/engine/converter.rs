//! Stateful domain converter
//!
//! Drives tool rows through a typed [`Transform`] into domain rows and keeps
//! a since-cursor per (connection, board, converter) so the next run may
//! only look at rows changed after it.

use super::types::{Cancellation, SyncStats};
use crate::error::{Error, Result};
use crate::state::SubtaskStateManager;
use crate::store::{
    format_timestamp, BoxedRecord, Purge, Query, Record, SqlValue, Store, DEFAULT_CHUNK_SIZE,
};
use crate::types::SyncMode;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::debug;

/// Conversion of one tool table into domain rows
pub trait Transform: Send + Sync {
    /// Tool row read by this transform
    type Input: Record;

    /// Name the cursor is stored under
    fn name(&self) -> &'static str;

    /// Board-scoped scan of the input, without the cursor filter
    fn query(&self) -> Query;

    /// Qualified last-modified column the cursor filters on
    fn incremental_column(&self) -> Option<&'static str> {
        None
    }

    /// Domain rows for one input row
    fn convert(&self, input: &Self::Input) -> Result<Vec<BoxedRecord>>;

    /// Last-modified value of one input row
    fn last_modified(&self, _input: &Self::Input) -> Option<DateTime<Utc>> {
        None
    }

    /// Output rows removed ahead of the first chunk
    ///
    /// Whatever the pass writes back survives, so only rows whose source
    /// has gone upstream disappear. An incremental pass reads a subset of
    /// the inputs and must not purge what it will not rewrite.
    fn purges(&self, _full_pass: bool) -> Vec<Purge> {
        Vec::new()
    }

    /// Output rows removed ahead of the rows of one input, on any pass
    fn input_purges(&self, _input: &Self::Input) -> Vec<Purge> {
        Vec::new()
    }
}

/// Runs transforms for one board
#[derive(Debug)]
pub struct StatefulConverter<'a> {
    store: &'a Store,
    cancel: &'a Cancellation,
    connection_id: u64,
    board_id: u64,
    fingerprint: String,
    mode: SyncMode,
    chunk_size: usize,
}

impl<'a> StatefulConverter<'a> {
    /// Create a converter for one board
    pub fn new(
        store: &'a Store,
        cancel: &'a Cancellation,
        connection_id: u64,
        board_id: u64,
        mode: SyncMode,
    ) -> Self {
        Self {
            store,
            cancel,
            connection_id,
            board_id,
            fingerprint: String::new(),
            mode,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the config fingerprint; a change forces a full pass
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Set the number of input rows read per chunk
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Convert every selected input row
    ///
    /// The outputs of each chunk land in one transaction, behind the purges
    /// of its inputs. The transform's pass purges join the first transaction.
    /// The cursor is saved only when every row converted.
    pub fn run<T: Transform>(&self, transform: &T) -> Result<SyncStats> {
        let start = Instant::now();
        let manager = SubtaskStateManager::open(
            self.store,
            self.connection_id,
            self.board_id,
            transform.name(),
            &self.fingerprint,
            self.mode,
        )?;

        let mut query = transform.query();
        let mut stats = SyncStats::new();
        if let (Some(since), Some(column)) = (manager.since(), transform.incremental_column()) {
            query = query.filter(
                format!("{column} >= ?"),
                vec![SqlValue::Text(format_timestamp(&since))],
            );
            stats.incremental = true;
        }

        let mut purges = transform.purges(!stats.incremental);
        let mut observed: Option<DateTime<Utc>> = None;
        let mut cursor = self.store.cursor::<T::Input>(&query, self.chunk_size);
        while let Some(rows) = cursor.next_chunk()? {
            let mut outputs = Vec::new();
            for row in &rows {
                self.cancel.check()?;
                purges.extend(transform.input_purges(row));
                outputs.extend(
                    transform
                        .convert(row)
                        .map_err(|e| Error::convert(T::Input::TABLE, e.to_string()))?,
                );
                if let Some(modified) = transform.last_modified(row) {
                    observed = observed.max(Some(modified));
                }
            }
            stats.add_input(rows.len());
            stats.add_output(self.store.purge_and_write(&purges, &outputs)?);
            purges.clear();
            debug!(
                "{}: converted {} rows into {} outputs",
                transform.name(),
                rows.len(),
                outputs.len()
            );
        }

        // a pass over no rows still purges
        self.store.purge_and_write(&purges, &[])?;

        manager.close(observed)?;
        stats.set_duration(start.elapsed().as_millis() as u64);
        Ok(stats)
    }
}
