//! Shared domain tables
//!
//! Vendor-neutral rows keyed by generated ids. Other connectors write to
//! the same tables, so rows are always upserted by id and never truncated.

use crate::error::Result;
use crate::store::{table, Store};
use chrono::{DateTime, Utc};

/// Standard type forced on subtasks
pub const SUBTASK: &str = "SUBTASK";

table! {
    /// A person in any tool
    pub struct Account => "accounts", key(id) {
        pub id: String,
        pub user_name: String,
        pub full_name: String,
        pub email: String,
        pub avatar_url: String,
    }
}

table! {
    /// A board
    pub struct Board => "boards", key(id) {
        pub id: String,
        pub name: String,
        pub url: String,
        pub board_type: String,
    }
}

table! {
    /// A ticket
    pub struct Issue => "issues", key(id) {
        pub id: String,
        pub url: String,
        pub icon_url: String,
        pub issue_key: String,
        pub title: String,
        pub description: String,
        pub epic_key: String,
        pub issue_type: String,
        pub original_type: String,
        pub status: String,
        pub original_status: String,
        pub story_point: Option<f64>,
        pub original_estimate_minutes: Option<i64>,
        pub time_spent_minutes: Option<i64>,
        pub time_remaining_minutes: Option<i64>,
        pub lead_time_minutes: Option<i64>,
        pub creator_id: String,
        pub creator_name: String,
        pub assignee_id: String,
        pub assignee_name: String,
        pub parent_issue_id: String,
        pub priority: String,
        pub original_project: String,
        pub component: String,
        pub resolution_date: Option<DateTime<Utc>>,
        pub created_date: Option<DateTime<Utc>>,
        pub updated_date: Option<DateTime<Utc>>,
    }
}

table! {
    /// Issue membership of a board
    pub struct BoardIssue => "board_issues", key(board_id, issue_id) {
        pub board_id: String,
        pub issue_id: String,
    }
}

table! {
    /// Current assignee of an issue
    pub struct IssueAssignee => "issue_assignees", key(issue_id, assignee_id) {
        pub issue_id: String,
        pub assignee_id: String,
        pub assignee_name: String,
    }
}

table! {
    /// A label on an issue
    pub struct IssueLabel => "issue_labels", key(issue_id, label_name) {
        pub issue_id: String,
        pub label_name: String,
    }
}

table! {
    /// A comment on an issue
    pub struct IssueComment => "issue_comments", key(id) {
        pub id: String,
        pub issue_id: String,
        pub body: String,
        pub account_id: String,
        pub created_date: Option<DateTime<Utc>>,
        pub updated_date: Option<DateTime<Utc>>,
    }
}

table! {
    /// Time logged against an issue
    pub struct IssueWorklog => "issue_worklogs", key(id) {
        pub id: String,
        pub issue_id: String,
        pub author_id: String,
        pub time_spent_minutes: i64,
        pub started_date: Option<DateTime<Utc>>,
        pub logged_date: Option<DateTime<Utc>>,
    }
}

table! {
    /// One field change of an issue
    pub struct IssueChangelog => "issue_changelogs", key(id) {
        pub id: String,
        pub issue_id: String,
        pub author_id: String,
        pub author_name: String,
        pub field_id: String,
        pub field_name: String,
        pub original_from_value: String,
        pub original_to_value: String,
        pub from_value: String,
        pub to_value: String,
        pub created_date: Option<DateTime<Utc>>,
    }
}

table! {
    /// A typed link between two issues
    pub struct IssueRelationship => "issue_relationships", key(source_issue_id, target_issue_id) {
        pub source_issue_id: String,
        pub target_issue_id: String,
        pub original_type: String,
    }
}

table! {
    /// A sprint
    pub struct Sprint => "sprints", key(id) {
        pub id: String,
        pub name: String,
        pub url: String,
        pub status: String,
        pub original_status: String,
        pub started_date: Option<DateTime<Utc>>,
        pub ended_date: Option<DateTime<Utc>>,
        pub completed_date: Option<DateTime<Utc>>,
        pub original_board_id: String,
    }
}

table! {
    /// Sprint membership of a board
    pub struct BoardSprint => "board_sprints", key(board_id, sprint_id) {
        pub board_id: String,
        pub sprint_id: String,
    }
}

table! {
    /// Issue membership of a sprint
    pub struct SprintIssue => "sprint_issues", key(sprint_id, issue_id) {
        pub sprint_id: String,
        pub issue_id: String,
    }
}

table! {
    /// A commit referenced by an issue
    pub struct IssueCommit => "issue_commits", key(issue_id, commit_sha) {
        pub issue_id: String,
        pub commit_sha: String,
    }
}

table! {
    /// A commit referenced by an issue, with its repository
    pub struct IssueRepoCommit => "issue_repo_commits", key(issue_id, commit_sha) {
        pub issue_id: String,
        pub commit_sha: String,
        pub repo_url: String,
        pub host: String,
        pub namespace: String,
        pub repo_name: String,
    }
}

/// Create every domain table
pub fn migrate(store: &Store) -> Result<()> {
    store.migrate::<Account>()?;
    store.migrate::<Board>()?;
    store.migrate::<Issue>()?;
    store.migrate::<BoardIssue>()?;
    store.migrate::<IssueAssignee>()?;
    store.migrate::<IssueLabel>()?;
    store.migrate::<IssueComment>()?;
    store.migrate::<IssueWorklog>()?;
    store.migrate::<IssueChangelog>()?;
    store.migrate::<IssueRelationship>()?;
    store.migrate::<Sprint>()?;
    store.migrate::<BoardSprint>()?;
    store.migrate::<SprintIssue>()?;
    store.migrate::<IssueCommit>()?;
    store.migrate::<IssueRepoCommit>()?;
    Ok(())
}

/// Map a remote sprint state to the domain one
pub fn sprint_status(state: &str) -> &'static str {
    match state.to_ascii_lowercase().as_str() {
        "closed" => "CLOSED",
        "active" => "ACTIVE",
        _ => "FUTURE",
    }
}
