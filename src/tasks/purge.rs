//! Board-scoped deletes
//!
//! A board run owns the rows hanging off the issues of its board, and the
//! rows of issues that sit on no board at all. Extractors and full converter
//! passes delete that set in the transaction that writes it again, so rows
//! the server stopped returning do not outlive the run that noticed.
//!
//! Board membership is read from `_tool_freshrelease_board_issues`, which
//! `extractIssues` rewrites before anything downstream runs. Incremental
//! converter passes only sweep rows of issues that left every board.

use super::{SubtaskContext, BOARD_IDS, ISSUE_IDS};
use crate::domain::BoardIssue;
use crate::models::{FreshreleaseBoardIssue, FreshreleaseIssueChangelogs};
use crate::store::{Purge, Record, SqlField, SqlValue};

// ============================================================================
// Tool layer
// ============================================================================

/// Rows of a tool table keyed by `(connection_id, issue_id)`
///
/// Covers issues of this board and issues on no board.
pub(super) fn tool_issue_rows(ctx: &SubtaskContext, table: &str) -> Purge {
    let (scope, scope_params) = tool_scope(ctx, "issue_id");
    let mut params = vec![ctx.connection_id().to_value()];
    params.extend(scope_params);
    Purge::new(table, format!("connection_id = ? AND {scope}"), params)
}

/// Changelog entries and their items, items first
pub(super) fn tool_changelogs(ctx: &SubtaskContext, items_table: &str) -> Vec<Purge> {
    let changelogs = FreshreleaseIssueChangelogs::TABLE;
    let (scope, scope_params) = tool_scope(ctx, "issue_id");
    let conn = ctx.connection_id().to_value();
    let mut params = vec![conn.clone(), conn];
    params.extend(scope_params);
    vec![
        Purge::new(
            items_table,
            format!(
                "connection_id = ? AND changelog_id IN \
                 (SELECT changelog_id FROM {changelogs} WHERE connection_id = ? AND {scope})"
            ),
            params,
        ),
        tool_issue_rows(ctx, changelogs),
    ]
}

/// Rows of a tool table whose issue no other board holds
///
/// Used while the board membership itself is being replaced, so an issue
/// that moved to another board keeps its rows.
pub(super) fn tool_unshared_rows(ctx: &SubtaskContext, table: &str) -> Purge {
    let bi = FreshreleaseBoardIssue::TABLE;
    let conn = ctx.connection_id().to_value();
    Purge::new(
        table,
        format!(
            "connection_id = ? AND issue_id NOT IN \
             (SELECT issue_id FROM {bi} WHERE connection_id = ? AND board_id != ?)"
        ),
        vec![conn.clone(), conn, ctx.board_id().to_value()],
    )
}

/// Rows of a tool table for a known set of issues
pub(super) fn tool_rows_of_issues(ctx: &SubtaskContext, table: &str, issues: &[u64]) -> Purge {
    let placeholders = vec!["?"; issues.len()].join(", ");
    let mut params = vec![ctx.connection_id().to_value()];
    params.extend(issues.iter().map(SqlField::to_value));
    Purge::new(
        table,
        format!("connection_id = ? AND issue_id IN ({placeholders})"),
        params,
    )
}

/// Rows of a tool table keyed by `(connection_id, board_id, ..)`
pub(super) fn tool_board_rows(ctx: &SubtaskContext, table: &str) -> Purge {
    Purge::new(
        table,
        "connection_id = ? AND board_id = ?",
        vec![ctx.connection_id().to_value(), ctx.board_id().to_value()],
    )
}

/// `column` names an issue of this board, or an issue on no board
fn tool_scope(ctx: &SubtaskContext, column: &str) -> (String, Vec<SqlValue>) {
    let bi = FreshreleaseBoardIssue::TABLE;
    let conn = ctx.connection_id().to_value();
    (
        format!(
            "({column} IN (SELECT issue_id FROM {bi} WHERE connection_id = ? AND board_id = ?) \
             OR {column} NOT IN (SELECT issue_id FROM {bi} WHERE connection_id = ?))"
        ),
        vec![conn.clone(), ctx.board_id().to_value(), conn],
    )
}

// ============================================================================
// Domain layer
// ============================================================================

/// Rows of a domain table whose `column` holds an issue id
///
/// A full pass clears this board's issues too, an incremental one only the
/// issues on no board.
pub(super) fn domain_issue_rows(
    ctx: &SubtaskContext,
    table: &str,
    column: &str,
    full_pass: bool,
) -> Purge {
    let (orphans, mut params) = orphan_scope(ctx, column);
    if !full_pass {
        return Purge::new(table, orphans, params);
    }
    let (members, member_params) = membership(ctx, "board_id = ?");
    params.extend(member_params);
    params.push(ctx.board_id().to_value());
    Purge::new(table, format!("({orphans} OR {column} IN ({members}))"), params)
}

/// Domain issues and this board's membership
///
/// A full pass drops every issue no other board holds, the rewrite puts
/// back the ones still listed. An incremental pass drops what left.
pub(super) fn domain_issues(
    ctx: &SubtaskContext,
    issues_table: &str,
    full_pass: bool,
) -> Vec<Purge> {
    let board = domain_board_id(ctx);
    if full_pass {
        let (others, mut params) = membership(ctx, "board_id != ?");
        params.push(ctx.board_id().to_value());
        let mut issue_params = vec![issue_pattern(ctx)];
        issue_params.extend(params);
        return vec![
            Purge::new(
                issues_table,
                format!("id LIKE ? AND id NOT IN ({others})"),
                issue_params,
            ),
            Purge::new(BoardIssue::TABLE, "board_id = ?", vec![board]),
        ];
    }

    let (orphans, orphan_params) = orphan_scope(ctx, "id");
    let (members, mut member_params) = membership(ctx, "board_id = ?");
    member_params.push(ctx.board_id().to_value());
    let mut params = vec![board];
    params.extend(member_params);
    vec![
        Purge::new(issues_table, orphans, orphan_params),
        Purge::new(
            BoardIssue::TABLE,
            format!("board_id = ? AND issue_id NOT IN ({members})"),
            params,
        ),
    ]
}

/// Rows of a domain table keyed by board
pub(super) fn domain_board_rows(ctx: &SubtaskContext, table: &str) -> Purge {
    Purge::new(table, "board_id = ?", vec![domain_board_id(ctx)])
}

/// Rows of a domain table for one issue
pub(super) fn domain_rows_of_issue(table: &str, column: &str, issue_id: &str) -> Purge {
    Purge::new(
        table,
        format!("{column} = ?"),
        vec![SqlValue::Text(issue_id.to_string())],
    )
}

/// Domain issue ids of the tool membership rows matching `filter`
///
/// The connection is bound here; the caller binds `filter`'s placeholders.
fn membership(ctx: &SubtaskContext, filter: &str) -> (String, Vec<SqlValue>) {
    (
        format!(
            "SELECT CAST(? AS VARCHAR) || CAST(issue_id AS VARCHAR) FROM {} \
             WHERE connection_id = ? AND {filter}",
            FreshreleaseBoardIssue::TABLE
        ),
        vec![
            SqlValue::Text(ISSUE_IDS.prefix(ctx.connection_id())),
            ctx.connection_id().to_value(),
        ],
    )
}

/// `column` holds an issue of this connection that no board lists
fn orphan_scope(ctx: &SubtaskContext, column: &str) -> (String, Vec<SqlValue>) {
    let (members, member_params) = membership(ctx, "TRUE");
    let mut params = vec![issue_pattern(ctx)];
    params.extend(member_params);
    (
        format!("({column} LIKE ? AND {column} NOT IN ({members}))"),
        params,
    )
}

fn domain_board_id(ctx: &SubtaskContext) -> SqlValue {
    SqlValue::Text(BOARD_IDS.generate(ctx.connection_id(), ctx.board_id()))
}

fn issue_pattern(ctx: &SubtaskContext) -> SqlValue {
    SqlValue::Text(format!("{}%", ISSUE_IDS.prefix(ctx.connection_id())))
}
