//! Extractors
//!
//! Turn the raw pages of each collection into tool rows. Accounts embedded
//! anywhere in a payload are written alongside the rows that carry them.

use super::purge::{
    tool_board_rows, tool_changelogs, tool_issue_rows, tool_rows_of_issues, tool_unshared_rows,
};
use super::{ready, BoardIssueRef, SubtaskContext, SubtaskMeta};
use crate::engine::SyncStats;
use crate::error::{Error, Result};
use crate::models::{
    apiv2, FreshreleaseBoardIssue, FreshreleaseBoardSprint, FreshreleaseIssue,
    FreshreleaseIssueChangelogItems, FreshreleaseIssueComment, FreshreleaseIssueCommit,
    FreshreleaseIssueLabel, FreshreleaseIssueRelationship, FreshreleaseRemotelink,
    FreshreleaseSprintIssue, FreshreleaseWorklog, RAW_CHANGELOG_TABLE,
    RAW_COMMENT_TABLE, RAW_ISSUE_TABLE, RAW_ISSUE_TYPE_TABLE, RAW_REMOTELINK_TABLE,
    RAW_SPRINT_TABLE, RAW_STATUS_TABLE, RAW_USER_TABLE, RAW_WORKLOG_TABLE,
};
use crate::store::{boxed, BoxedRecord, Purge, RawPage, Record};
use futures::future::BoxFuture;
use serde_json::Value;

pub(super) const EXTRACT_STATUS: SubtaskMeta =
    SubtaskMeta::new("extractStatus", "extract Freshrelease statuses", extract_status);

pub(super) const EXTRACT_ISSUE_TYPES: SubtaskMeta = SubtaskMeta::new(
    "extractIssueTypes",
    "extract Freshrelease issue types",
    extract_issue_types,
);

pub(super) const EXTRACT_ISSUES: SubtaskMeta =
    SubtaskMeta::new("extractIssues", "extract Freshrelease issues", extract_issues);

pub(super) const EXTRACT_ISSUE_COMMENTS: SubtaskMeta = SubtaskMeta::new(
    "extractIssueComments",
    "extract Freshrelease issue comments",
    extract_issue_comments,
);

pub(super) const EXTRACT_ISSUE_CHANGELOGS: SubtaskMeta = SubtaskMeta::new(
    "extractIssueChangelogs",
    "extract Freshrelease issue changelogs",
    extract_issue_changelogs,
);

pub(super) const EXTRACT_WORKLOGS: SubtaskMeta =
    SubtaskMeta::new("extractWorklogs", "extract Freshrelease work logs", extract_worklogs);

pub(super) const EXTRACT_REMOTELINKS: SubtaskMeta = SubtaskMeta::new(
    "extractRemotelinks",
    "extract Freshrelease remote links and the commits they point at",
    extract_remotelinks,
);

pub(super) const EXTRACT_SPRINTS: SubtaskMeta =
    SubtaskMeta::new("extractSprints", "extract Freshrelease sprints", extract_sprints);

pub(super) const EXTRACT_ACCOUNTS: SubtaskMeta = SubtaskMeta::new(
    "extractAccounts",
    "extract Freshrelease account details",
    extract_accounts,
);

fn extract_status(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_STATUS_TABLE)
            .extract(|statuses: Vec<apiv2::Status>, _| {
                Ok(statuses
                    .iter()
                    .map(|s| boxed(s.to_tool_layer(conn)))
                    .collect())
            }),
    )
}

fn extract_issue_types(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_ISSUE_TYPE_TABLE)
            .extract(|types: Vec<apiv2::IssueType>, _| {
                Ok(types.iter().map(|t| boxed(t.to_tool_layer(conn))).collect())
            }),
    )
}

/// Tables filled from the issue payload itself, besides the issue row
const ISSUE_CHILD_TABLES: [&str; 3] = [
    FreshreleaseIssueLabel::TABLE,
    FreshreleaseSprintIssue::TABLE,
    FreshreleaseIssueRelationship::TABLE,
];

/// The board membership is replaced here, so issues the board no longer
/// lists lose their rows unless another board still holds them. Listed
/// issues have their child rows replaced page by page.
fn extract_issues(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    let board = ctx.board_id();
    let story_point_field = ctx.scope_config.story_point_field.as_str();
    let mut purges: Vec<Purge> = ISSUE_CHILD_TABLES
        .iter()
        .map(|table| tool_unshared_rows(ctx, table))
        .collect();
    purges.push(tool_unshared_rows(ctx, FreshreleaseIssue::TABLE));
    purges.push(tool_board_rows(ctx, FreshreleaseBoardIssue::TABLE));
    ready(
        ctx.extractor(RAW_ISSUE_TABLE)
            .purge(purges)
            .extract_replacing(|page: apiv2::Page<apiv2::Issue>, _| {
                let issues = page.into_items();
                let ids: Vec<u64> = issues.iter().map(|issue| issue.id).collect();
                let purges = if ids.is_empty() {
                    Vec::new()
                } else {
                    ISSUE_CHILD_TABLES
                        .iter()
                        .map(|table| tool_rows_of_issues(ctx, table, &ids))
                        .collect()
                };

                let mut rows = Vec::new();
                for issue in issues {
                    let extracted = issue.to_tool_layer(conn, board, story_point_field);
                    rows.push(boxed(extracted.issue));
                    rows.push(boxed(extracted.board_issue));
                    rows.extend(extracted.accounts.into_iter().map(boxed));
                    rows.extend(extracted.labels.into_iter().map(boxed));
                    rows.extend(extracted.sprints.into_iter().map(boxed));
                    rows.extend(extracted.sprint_issues.into_iter().map(boxed));
                    rows.extend(extracted.relationships.into_iter().map(boxed));
                }
                Ok((purges, rows))
            }),
    )
}

fn extract_issue_comments(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_COMMENT_TABLE)
            .purge([tool_issue_rows(ctx, FreshreleaseIssueComment::TABLE)])
            .extract(|page: apiv2::Page<apiv2::Comment>, raw| {
                let parent = parent_issue(raw)?;
                let mut rows = Vec::new();
                for comment in page.into_items() {
                    let (row, accounts) =
                        comment.to_tool_layer(conn, parent.issue_id, parent.updated);
                    rows.push(boxed(row));
                    rows.extend(accounts.into_iter().map(boxed));
                }
                Ok(rows)
            }),
    )
}

fn extract_issue_changelogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_CHANGELOG_TABLE)
            .purge(tool_changelogs(ctx, FreshreleaseIssueChangelogItems::TABLE))
            .extract(|page: apiv2::Page<apiv2::Changelog>, raw| {
                let parent = parent_issue(raw)?;
                let mut rows = Vec::new();
                for changelog in page.into_items() {
                    let (row, author) =
                        changelog.to_tool_layer(conn, parent.issue_id, parent.updated);
                    rows.push(boxed(row));
                    rows.extend(author.map(boxed));
                    for item in &changelog.items {
                        rows.push(boxed(item.to_tool_layer(conn, changelog.id)));
                        rows.extend(item.extract_users(conn).into_iter().map(boxed));
                    }
                }
                Ok(rows)
            }),
    )
}

fn extract_worklogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_WORKLOG_TABLE)
            .purge([tool_issue_rows(ctx, FreshreleaseWorklog::TABLE)])
            .extract(|page: apiv2::Page<apiv2::Worklog>, raw| {
                let parent = parent_issue(raw)?;
                let mut rows = Vec::new();
                for worklog in page.into_items() {
                    let (row, accounts) =
                        worklog.to_tool_layer(conn, parent.issue_id, parent.updated);
                    rows.push(boxed(row));
                    rows.extend(accounts.into_iter().map(boxed));
                }
                Ok(rows)
            }),
    )
}

fn extract_remotelinks(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_REMOTELINK_TABLE)
            .purge([
                tool_issue_rows(ctx, FreshreleaseRemotelink::TABLE),
                tool_issue_rows(ctx, FreshreleaseIssueCommit::TABLE),
            ])
            .extract(|links: Vec<Value>, raw| {
                let parent = parent_issue(raw)?;
                let mut rows = Vec::new();
                for value in links {
                    let raw_json = value.to_string();
                    let link: apiv2::RemoteLink = serde_json::from_value(value).map_err(|e| {
                        Error::decode(format!("remote link of issue {}: {e}", parent.issue_id))
                    })?;
                    let url = link.object.url.clone();
                    rows.push(boxed(link.to_tool_layer(
                        conn,
                        parent.issue_id,
                        raw_json,
                        parent.updated,
                    )));
                    rows.extend(mine_commits(ctx, parent.issue_id, &url));
                }
                Ok(rows)
            }),
    )
}

/// Commit rows for one link URL
///
/// The SHA-only row goes first so a repository match on the same commit
/// replaces it within the batch.
fn mine_commits(ctx: &SubtaskContext, issue_id: u64, url: &str) -> Vec<BoxedRecord> {
    let mut rows = Vec::new();
    if let Some(commit_sha) = ctx.matcher.commit_sha(url) {
        rows.push(boxed(FreshreleaseIssueCommit {
            connection_id: ctx.connection_id(),
            issue_id,
            commit_sha,
            commit_url: url.to_string(),
            ..FreshreleaseIssueCommit::default()
        }));
    }
    if let Some(commit) = ctx.matcher.match_repo(url) {
        rows.push(boxed(FreshreleaseIssueCommit {
            connection_id: ctx.connection_id(),
            issue_id,
            commit_sha: commit.commit_sha,
            commit_url: url.to_string(),
            repo_url: commit.repo_url,
            host: commit.host,
            namespace: commit.namespace,
            repo_name: commit.repo_name,
        }));
    }
    rows
}

fn extract_sprints(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    let board = ctx.board_id();
    ready(
        ctx.extractor(RAW_SPRINT_TABLE)
            .purge([tool_board_rows(ctx, FreshreleaseBoardSprint::TABLE)])
            .extract(|page: apiv2::Page<apiv2::Sprint>, _| {
                let mut rows = Vec::new();
                for sprint in page.into_items() {
                    rows.push(boxed(FreshreleaseBoardSprint {
                        connection_id: conn,
                        board_id: board,
                        sprint_id: sprint.id,
                    }));
                    rows.push(boxed(sprint.to_tool_layer(conn)));
                }
                Ok(rows)
            }),
    )
}

fn extract_accounts(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    let conn = ctx.connection_id();
    ready(
        ctx.extractor(RAW_USER_TABLE)
            .extract(|account: apiv2::Account, _| {
                Ok(account.to_tool_layer(conn).into_iter().map(boxed).collect())
            }),
    )
}

/// Issue a per-issue page was collected for
fn parent_issue(page: &RawPage) -> Result<BoardIssueRef> {
    serde_json::from_str(&page.input)
        .map_err(|e| Error::decode(format!("page {} has no parent issue: {e}", page.page_id)))
}
