//! State manager implementation
//!
//! Loads the previous state of a converter, picks the run mode and writes
//! the advanced cursor back once the converter finished without error.

use super::types::SubtaskState;
use crate::error::Result;
use crate::store::{Query, Store};
use crate::types::SyncMode;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Run-mode decision and cursor bookkeeping for one converter run
#[derive(Debug)]
pub struct SubtaskStateManager {
    store: Store,
    /// State as loaded, `None` before the first successful run
    previous: Option<SubtaskState>,
    /// State saved on close
    current: SubtaskState,
    incremental: bool,
}

impl SubtaskStateManager {
    /// Load state and decide whether this run may be incremental
    ///
    /// Incremental requires a prior successful run, an incremental request
    /// and an unchanged config fingerprint.
    pub fn open(
        store: &Store,
        connection_id: u64,
        board_id: u64,
        subtask: &str,
        fingerprint: &str,
        mode: SyncMode,
    ) -> Result<Self> {
        store.migrate::<SubtaskState>()?;

        let mut current = SubtaskState::new(connection_id, board_id, subtask);
        let query = Query::new()
            .filter_eq("plugin", &current.plugin)
            .filter_eq("connection_id", &connection_id)
            .filter_eq("board_id", &board_id)
            .filter_eq("subtask", &current.subtask);
        let previous = store.query::<SubtaskState>(&query)?.into_iter().next();

        let incremental = mode.is_incremental()
            && previous
                .as_ref()
                .is_some_and(|p| p.config == fingerprint && p.since.is_some());

        debug!(
            "Subtask {subtask} for board {board_id}: {} run (previous state: {})",
            if incremental { "incremental" } else { "full" },
            previous.is_some()
        );

        current.config = fingerprint.to_string();
        current.is_incremental = incremental;
        current.since = previous.as_ref().and_then(|p| p.since);

        Ok(Self {
            store: store.clone(),
            previous,
            current,
            incremental,
        })
    }

    /// Whether input should be filtered by the cursor
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Cursor of the previous run, only set for incremental runs
    pub fn since(&self) -> Option<DateTime<Utc>> {
        if self.incremental {
            self.previous.as_ref().and_then(|p| p.since)
        } else {
            None
        }
    }

    /// State as loaded
    pub fn previous(&self) -> Option<&SubtaskState> {
        self.previous.as_ref()
    }

    /// Save the state after a successful run
    ///
    /// The cursor moves to the newest last-modified value seen; a run that
    /// saw no rows keeps the previous cursor.
    pub fn close(mut self, observed: Option<DateTime<Utc>>) -> Result<SubtaskState> {
        self.current.since = match (observed, self.current.since) {
            (Some(seen), Some(prev)) => Some(seen.max(prev)),
            (seen, prev) => seen.or(prev),
        };
        self.current.finished_at = Some(Utc::now());
        self.store.upsert(std::slice::from_ref(&self.current))?;
        Ok(self.current)
    }
}
