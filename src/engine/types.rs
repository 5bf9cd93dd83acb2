//! Engine types

use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-issued stop signal, checked between pages and rows
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Create a signal that is not set
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder to stop
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the signal is set
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once the signal is set
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Key of one collection in a raw table
///
/// Serialized to the `params` column, so field names and order are part of
/// the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawParams {
    /// Connection id
    pub connection_id: u64,
    /// Board id
    pub board_id: u64,
}

impl RawParams {
    /// Params of a board collection
    pub fn new(connection_id: u64, board_id: u64) -> Self {
        Self {
            connection_id,
            board_id,
        }
    }

    /// Stored form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Statistics from one subtask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Pages fetched or read back
    pub pages: usize,
    /// Input records seen
    pub records_in: usize,
    /// Rows written
    pub records_out: usize,
    /// Whether the input was filtered by a cursor
    pub incremental: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages += 1;
    }

    /// Add input records
    pub fn add_input(&mut self, count: usize) {
        self.records_in += count;
    }

    /// Add written rows
    pub fn add_output(&mut self, count: usize) {
        self.records_out += count;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
