//! Tool-layer tables
//!
//! Rows in the remote API's own shape, namespaced by connection id. The
//! extractors write them; the converters only read them.

use crate::store::table;
use chrono::{DateTime, Utc};

table! {
    /// A board and the project it belongs to
    pub struct FreshreleaseBoard => "_tool_freshrelease_boards", key(connection_id, board_id) {
        pub connection_id: u64,
        pub board_id: u64,
        pub project_id: u64,
        pub name: String,
        pub self_url: String,
        pub board_type: String,
    }
}

table! {
    /// An issue with its derived fields
    pub struct FreshreleaseIssue => "_tool_freshrelease_issues", key(connection_id, issue_id) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub project_id: u64,
        pub project_name: String,
        pub self_url: String,
        pub icon_url: String,
        pub issue_key: String,
        pub summary: String,
        pub description: String,
        pub issue_type: String,
        pub type_id: String,
        pub status_name: String,
        pub status_key: String,
        pub epic_key: String,
        pub story_point: Option<f64>,
        pub original_estimate_minutes: Option<i64>,
        pub aggregate_estimate_minutes: Option<i64>,
        pub remaining_estimate_minutes: Option<i64>,
        pub spent_minutes: Option<i64>,
        pub lead_time_minutes: Option<i64>,
        pub creator_account_id: String,
        pub creator_display_name: String,
        pub assignee_account_id: String,
        pub assignee_display_name: String,
        pub priority_id: u64,
        pub priority_name: String,
        pub parent_id: u64,
        pub parent_key: String,
        pub sprint_id: u64,
        pub sprint_name: String,
        pub components: String,
        pub subtask: bool,
        pub resolution_date: Option<DateTime<Utc>>,
        pub created: Option<DateTime<Utc>>,
        pub updated: Option<DateTime<Utc>>,
        pub comment_total: i64,
        pub worklog_total: i64,
    }
}

table! {
    /// Issue membership of a board
    pub struct FreshreleaseBoardIssue => "_tool_freshrelease_board_issues", key(connection_id, board_id, issue_id) {
        pub connection_id: u64,
        pub board_id: u64,
        pub issue_id: u64,
    }
}

table! {
    /// Issue membership of a sprint
    pub struct FreshreleaseSprintIssue => "_tool_freshrelease_sprint_issues", key(connection_id, sprint_id, issue_id) {
        pub connection_id: u64,
        pub sprint_id: u64,
        pub issue_id: u64,
    }
}

table! {
    /// A label on an issue
    pub struct FreshreleaseIssueLabel => "_tool_freshrelease_issue_labels", key(connection_id, issue_id, label_name) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub label_name: String,
    }
}

table! {
    /// A remote user
    ///
    /// Merged on write: stubs carrying only the id never clear details an
    /// earlier full row wrote.
    pub struct FreshreleaseAccount => "_tool_freshrelease_accounts", key(connection_id, account_id), mode = Merge {
        pub connection_id: u64,
        pub account_id: String,
        pub account_type: String,
        pub name: String,
        pub email: String,
        pub avatar_url: String,
        pub timezone: String,
    }
}

table! {
    /// An issue link
    pub struct FreshreleaseIssueRelationship => "_tool_freshrelease_issue_relationships", key(connection_id, issue_id, issue_link_id) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub issue_link_id: u64,
        pub issue_link_type_id: String,
        pub issue_link_type_name: String,
        pub inward: String,
        pub outward: String,
        pub inward_issue_id: u64,
        pub inward_issue_key: String,
        pub outward_issue_id: u64,
        pub outward_issue_key: String,
    }
}

table! {
    /// A comment on an issue
    pub struct FreshreleaseIssueComment => "_tool_freshrelease_issue_comments", key(connection_id, issue_id, comment_id) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub comment_id: u64,
        pub self_url: String,
        pub body: String,
        pub creator_account_id: String,
        pub creator_display_name: String,
        pub created: Option<DateTime<Utc>>,
        pub updated: Option<DateTime<Utc>>,
        pub issue_updated: Option<DateTime<Utc>>,
    }
}

table! {
    /// A changelog entry
    pub struct FreshreleaseIssueChangelogs => "_tool_freshrelease_issue_changelogs", key(connection_id, changelog_id) {
        pub connection_id: u64,
        pub changelog_id: u64,
        pub issue_id: u64,
        pub author_account_id: String,
        pub author_display_name: String,
        pub author_active: bool,
        pub created: Option<DateTime<Utc>>,
        pub issue_updated: Option<DateTime<Utc>>,
    }
}

table! {
    /// One field change of a changelog entry
    pub struct FreshreleaseIssueChangelogItems => "_tool_freshrelease_issue_changelog_items", key(connection_id, changelog_id, field) {
        pub connection_id: u64,
        pub changelog_id: u64,
        pub field: String,
        pub field_type: String,
        pub from_value: String,
        pub from_string: String,
        pub to_value: String,
        pub to_string: String,
    }
}

table! {
    /// A worklog entry
    pub struct FreshreleaseWorklog => "_tool_freshrelease_worklogs", key(connection_id, issue_id, worklog_id) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub worklog_id: u64,
        pub author_id: String,
        pub update_author_id: String,
        pub time_spent: String,
        pub time_spent_seconds: i64,
        pub started: Option<DateTime<Utc>>,
        pub updated: Option<DateTime<Utc>>,
        pub issue_updated: Option<DateTime<Utc>>,
    }
}

table! {
    /// A remote link attached to an issue
    pub struct FreshreleaseRemotelink => "_tool_freshrelease_remotelinks", key(connection_id, remotelink_id) {
        pub connection_id: u64,
        pub remotelink_id: u64,
        pub issue_id: u64,
        pub self_url: String,
        pub title: String,
        pub url: String,
        pub raw_json: String,
        pub issue_updated: Option<DateTime<Utc>>,
    }
}

table! {
    /// A commit mined from a remote link
    ///
    /// Repository columns are empty when only the SHA pattern matched.
    pub struct FreshreleaseIssueCommit => "_tool_freshrelease_issue_commits", key(connection_id, issue_id, commit_sha) {
        pub connection_id: u64,
        pub issue_id: u64,
        pub commit_sha: String,
        pub commit_url: String,
        pub repo_url: String,
        pub host: String,
        pub namespace: String,
        pub repo_name: String,
    }
}

table! {
    /// A sprint
    pub struct FreshreleaseSprint => "_tool_freshrelease_sprints", key(connection_id, sprint_id) {
        pub connection_id: u64,
        pub sprint_id: u64,
        pub self_url: String,
        pub state: String,
        pub name: String,
        pub start_date: Option<DateTime<Utc>>,
        pub end_date: Option<DateTime<Utc>>,
        pub complete_date: Option<DateTime<Utc>>,
        pub origin_board_id: u64,
    }
}

table! {
    /// Sprint membership of a board
    pub struct FreshreleaseBoardSprint => "_tool_freshrelease_board_sprints", key(connection_id, board_id, sprint_id) {
        pub connection_id: u64,
        pub board_id: u64,
        pub sprint_id: u64,
    }
}

table! {
    /// An issue type
    pub struct FreshreleaseIssueType => "_tool_freshrelease_issue_types", key(connection_id, type_id) {
        pub connection_id: u64,
        pub type_id: String,
        pub self_url: String,
        pub name: String,
        pub description: String,
        pub icon_url: String,
        pub subtask: bool,
    }
}

table! {
    /// A workflow status
    pub struct FreshreleaseStatus => "_tool_freshrelease_statuses", key(connection_id, status_id) {
        pub connection_id: u64,
        pub status_id: String,
        pub self_url: String,
        pub name: String,
        pub status_category: String,
    }
}
