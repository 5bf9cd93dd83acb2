//! Persisted state row

use crate::didgen::PLUGIN_NAME;
use crate::store::table;
use chrono::{DateTime, Utc};

table! {
    /// Progress of one converter for one board
    pub struct SubtaskState => "_subtask_states", key(plugin, connection_id, board_id, subtask) {
        pub plugin: String,
        pub connection_id: u64,
        pub board_id: u64,
        pub subtask: String,
        /// Newest last-modified value converted so far
        pub since: Option<DateTime<Utc>>,
        /// Whether the run that saved this row was incremental
        pub is_incremental: bool,
        /// Fingerprint of the config the run converted with
        pub config: String,
        pub finished_at: Option<DateTime<Utc>>,
    }
}

impl SubtaskState {
    /// Empty state for a subtask of this plugin
    pub fn new(connection_id: u64, board_id: u64, subtask: &str) -> Self {
        Self {
            plugin: PLUGIN_NAME.to_string(),
            connection_id,
            board_id,
            subtask: subtask.to_string(),
            ..Self::default()
        }
    }
}
