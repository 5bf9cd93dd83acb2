//! Tests for SubtaskStateManager

use super::*;
use crate::store::Store;
use crate::types::SyncMode;
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

fn ts(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
}

fn open(store: &Store, fingerprint: &str, mode: SyncMode) -> SubtaskStateManager {
    SubtaskStateManager::open(store, 1, 8, "convertIssues", fingerprint, mode).unwrap()
}

// ============================================================================
// Mode selection
// ============================================================================

#[test]
fn test_first_run_is_full() {
    let store = Store::open_in_memory().unwrap();
    let manager = open(&store, "{}", SyncMode::Incremental);
    assert!(!manager.is_incremental());
    assert!(manager.since().is_none());
    assert!(manager.previous().is_none());
}

#[test]
fn test_incremental_after_success() {
    let store = Store::open_in_memory().unwrap();
    open(&store, "{}", SyncMode::Incremental)
        .close(Some(ts(3)))
        .unwrap();

    let manager = open(&store, "{}", SyncMode::Incremental);
    assert!(manager.is_incremental());
    assert_eq!(manager.since(), Some(ts(3)));
}

#[test]
fn test_full_refresh_request_ignores_cursor() {
    let store = Store::open_in_memory().unwrap();
    open(&store, "{}", SyncMode::FullRefresh)
        .close(Some(ts(3)))
        .unwrap();

    let manager = open(&store, "{}", SyncMode::FullRefresh);
    assert!(!manager.is_incremental());
    assert!(manager.since().is_none());
}

#[test]
fn test_changed_config_forces_full() {
    let store = Store::open_in_memory().unwrap();
    open(&store, r#"{"Bug":{}}"#, SyncMode::Incremental)
        .close(Some(ts(3)))
        .unwrap();

    let manager = open(&store, r#"{"Task":{}}"#, SyncMode::Incremental);
    assert!(!manager.is_incremental());
}

#[test]
fn test_state_is_scoped_per_subtask_and_board() {
    let store = Store::open_in_memory().unwrap();
    open(&store, "{}", SyncMode::Incremental)
        .close(Some(ts(3)))
        .unwrap();

    let other_subtask =
        SubtaskStateManager::open(&store, 1, 8, "convertWorklogs", "{}", SyncMode::Incremental)
            .unwrap();
    assert!(!other_subtask.is_incremental());

    let other_board =
        SubtaskStateManager::open(&store, 1, 9, "convertIssues", "{}", SyncMode::Incremental)
            .unwrap();
    assert!(!other_board.is_incremental());
}

// ============================================================================
// Cursor bookkeeping
// ============================================================================

#[test]
fn test_cursor_advances_to_observed_max() {
    let store = Store::open_in_memory().unwrap();
    open(&store, "{}", SyncMode::Incremental)
        .close(Some(ts(3)))
        .unwrap();
    let saved = open(&store, "{}", SyncMode::Incremental)
        .close(Some(ts(9)))
        .unwrap();
    assert_eq!(saved.since, Some(ts(9)));
    assert!(saved.is_incremental);
    assert!(saved.finished_at.is_some());
}

#[test]
fn test_empty_run_keeps_cursor() {
    let store = Store::open_in_memory().unwrap();
    open(&store, "{}", SyncMode::Incremental)
        .close(Some(ts(3)))
        .unwrap();
    let saved = open(&store, "{}", SyncMode::Incremental).close(None).unwrap();
    assert_eq!(saved.since, Some(ts(3)));
}

#[test]
fn test_unclosed_run_saves_nothing() {
    let store = Store::open_in_memory().unwrap();
    {
        let _manager = open(&store, "{}", SyncMode::Incremental);
    }
    assert_eq!(store.count("_subtask_states").unwrap(), 0);
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.duckdb");
    let location = path.to_str().unwrap();

    {
        let store = Store::open(location).unwrap();
        open(&store, "{}", SyncMode::Incremental)
            .close(Some(ts(5)))
            .unwrap();
    }

    let store = Store::open(location).unwrap();
    let manager = open(&store, "{}", SyncMode::Incremental);
    assert_eq!(manager.since(), Some(ts(5)));
}
