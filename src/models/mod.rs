//! Tool-layer model
//!
//! - [`apiv2`] - payload shapes of the remote REST API
//! - tables - the `_tool_freshrelease_*` rows extractors write
//!
//! Raw page tables are created on demand by the collectors; the names are
//! listed here so collectors and extractors agree on them.

pub mod apiv2;
mod tables;

pub use tables::*;

use crate::error::Result;
use crate::store::Store;

/// Raw pages of the board endpoint
pub const RAW_BOARD_TABLE: &str = "_raw_freshrelease_api_boards";
/// Raw pages of the board issue endpoint
pub const RAW_ISSUE_TABLE: &str = "_raw_freshrelease_api_issues";
/// Raw pages of the comment endpoint
pub const RAW_COMMENT_TABLE: &str = "_raw_freshrelease_api_issue_comments";
/// Raw pages of the changelog endpoint
pub const RAW_CHANGELOG_TABLE: &str = "_raw_freshrelease_api_issue_changelogs";
/// Raw pages of the worklog endpoint
pub const RAW_WORKLOG_TABLE: &str = "_raw_freshrelease_api_worklogs";
/// Raw pages of the remote link endpoint
pub const RAW_REMOTELINK_TABLE: &str = "_raw_freshrelease_api_remotelinks";
/// Raw pages of the sprint endpoint
pub const RAW_SPRINT_TABLE: &str = "_raw_freshrelease_api_sprints";
/// Raw pages of the user endpoint
pub const RAW_USER_TABLE: &str = "_raw_freshrelease_api_users";
/// Raw pages of the issue type endpoint
pub const RAW_ISSUE_TYPE_TABLE: &str = "_raw_freshrelease_api_issue_types";
/// Raw pages of the status endpoint
pub const RAW_STATUS_TABLE: &str = "_raw_freshrelease_api_status";

/// Create every tool table
pub fn migrate(store: &Store) -> Result<()> {
    store.migrate::<FreshreleaseBoard>()?;
    store.migrate::<FreshreleaseIssue>()?;
    store.migrate::<FreshreleaseBoardIssue>()?;
    store.migrate::<FreshreleaseSprintIssue>()?;
    store.migrate::<FreshreleaseIssueLabel>()?;
    store.migrate::<FreshreleaseAccount>()?;
    store.migrate::<FreshreleaseIssueRelationship>()?;
    store.migrate::<FreshreleaseIssueComment>()?;
    store.migrate::<FreshreleaseIssueChangelogs>()?;
    store.migrate::<FreshreleaseIssueChangelogItems>()?;
    store.migrate::<FreshreleaseWorklog>()?;
    store.migrate::<FreshreleaseRemotelink>()?;
    store.migrate::<FreshreleaseIssueCommit>()?;
    store.migrate::<FreshreleaseSprint>()?;
    store.migrate::<FreshreleaseBoardSprint>()?;
    store.migrate::<FreshreleaseIssueType>()?;
    store.migrate::<FreshreleaseStatus>()?;
    Ok(())
}

#[cfg(test)]
mod tests;
