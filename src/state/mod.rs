//! Subtask state
//!
//! Converters remember, per (connection, board, subtask), the newest
//! last-modified value they converted. The next run may then convert only
//! rows modified since that cursor.
//!
//! # Overview
//!
//! - `SubtaskState` - one persisted row in `_subtask_states`
//! - `SubtaskStateManager` - decides the run mode and saves on success

mod manager;
mod types;

pub use manager::SubtaskStateManager;
pub use types::SubtaskState;

#[cfg(test)]
mod manager_tests;
