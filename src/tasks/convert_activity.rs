//! Activity converters
//!
//! Comments, worklogs and changelogs. All three are collected per issue and
//! carry the issue's update time, which is what their cursors follow.

use super::purge::domain_issue_rows;
use super::{
    account_id, ready, SubtaskContext, SubtaskMeta, CHANGELOG_IDS, COMMENT_IDS, ISSUE_IDS,
    SPRINT_IDS, WORKLOG_IDS,
};
use crate::domain::{IssueChangelog, IssueComment, IssueWorklog};
use crate::engine::{SyncStats, Transform};
use crate::error::Result;
use crate::mapping;
use crate::models::{
    FreshreleaseIssue, FreshreleaseIssueChangelogItems, FreshreleaseIssueChangelogs,
    FreshreleaseIssueComment, FreshreleaseStatus, FreshreleaseWorklog,
};
use crate::store::{boxed, BoxedRecord, Purge, Query, Record, SqlField};
use crate::types::DomainType;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::HashMap;
use tracing::debug;

pub(super) const CONVERT_ISSUE_COMMENTS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueComments",
    "convert Freshrelease issue comments",
    convert_issue_comments,
)
.emits(&[DomainType::Ticket]);

pub(super) const CONVERT_WORKLOGS: SubtaskMeta =
    SubtaskMeta::new("convertWorklogs", "convert Freshrelease work logs", convert_worklogs)
        .emits(&[DomainType::Ticket]);

pub(super) const CONVERT_ISSUE_CHANGELOGS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueChangelogs",
    "convert Freshrelease issue changelogs",
    convert_issue_changelogs,
)
.emits(&[DomainType::Ticket]);

// ============================================================================
// Comments
// ============================================================================

struct CommentTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for CommentTransform<'_> {
    type Input = FreshreleaseIssueComment;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_COMMENTS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssueComment::TABLE)
    }

    fn incremental_column(&self) -> Option<&'static str> {
        Some("_tool_freshrelease_issue_comments.issue_updated")
    }

    fn convert(&self, input: &FreshreleaseIssueComment) -> Result<Vec<BoxedRecord>> {
        let conn = input.connection_id;
        Ok(vec![boxed(IssueComment {
            id: COMMENT_IDS.generate_parts(conn, &[&input.issue_id, &input.comment_id]),
            issue_id: ISSUE_IDS.generate(conn, input.issue_id),
            body: input.body.clone(),
            account_id: account_id(conn, &input.creator_account_id),
            created_date: input.created,
            updated_date: input.updated,
        })])
    }

    fn last_modified(&self, input: &FreshreleaseIssueComment) -> Option<DateTime<Utc>> {
        input.issue_updated
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, IssueComment::TABLE, "issue_id", full_pass)]
    }
}

fn convert_issue_comments(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&CommentTransform { ctx }))
}

// ============================================================================
// Worklogs
// ============================================================================

struct WorklogTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for WorklogTransform<'_> {
    type Input = FreshreleaseWorklog;

    fn name(&self) -> &'static str {
        CONVERT_WORKLOGS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseWorklog::TABLE)
    }

    fn incremental_column(&self) -> Option<&'static str> {
        Some("_tool_freshrelease_worklogs.issue_updated")
    }

    fn convert(&self, input: &FreshreleaseWorklog) -> Result<Vec<BoxedRecord>> {
        let conn = input.connection_id;
        Ok(vec![boxed(IssueWorklog {
            id: WORKLOG_IDS.generate_parts(conn, &[&input.issue_id, &input.worklog_id]),
            issue_id: ISSUE_IDS.generate(conn, input.issue_id),
            author_id: account_id(conn, &input.author_id),
            time_spent_minutes: input.time_spent_seconds / 60,
            started_date: input.started,
            logged_date: input.updated,
        })])
    }

    fn last_modified(&self, input: &FreshreleaseWorklog) -> Option<DateTime<Utc>> {
        input.issue_updated
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, IssueWorklog::TABLE, "issue_id", full_pass)]
    }
}

fn convert_worklogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&WorklogTransform { ctx }))
}

// ============================================================================
// Changelogs
// ============================================================================

/// Converts each changelog entry into one row per changed field
struct ChangelogTransform<'a> {
    ctx: &'a SubtaskContext,
    /// Issue type name by issue id, for status resolution
    issue_types: HashMap<u64, String>,
    /// Status name by status id
    statuses: HashMap<String, String>,
}

impl<'a> ChangelogTransform<'a> {
    fn load(ctx: &'a SubtaskContext) -> Result<Self> {
        let issues = FreshreleaseIssue::TABLE;
        let query = ctx.board_issue_query(issues);
        let id_column = format!("{issues}.issue_id");
        let type_column = format!("{issues}.issue_type");
        let sql = query.select_columns_sql(&[id_column.as_str(), type_column.as_str()], issues);
        let issue_types = ctx
            .store
            .query_rows(&sql, query.params(), 2)?
            .into_iter()
            .map(|row| {
                let mut row = row.into_iter();
                let id = row.next().map(u64::from_value).transpose()?.unwrap_or(0);
                let name = row.next().map(String::from_value).transpose()?.unwrap_or_default();
                Ok((id, name))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let statuses = ctx
            .store
            .query::<FreshreleaseStatus>(
                &Query::new().filter_eq("connection_id", &ctx.connection_id()),
            )?
            .into_iter()
            .map(|s| (s.status_id, s.name))
            .collect::<HashMap<_, _>>();

        debug!(
            "Loaded {} issue types and {} statuses for changelogs",
            issue_types.len(),
            statuses.len()
        );
        Ok(Self {
            ctx,
            issue_types,
            statuses,
        })
    }

    fn items(
        &self,
        changelog: &FreshreleaseIssueChangelogs,
    ) -> Result<Vec<FreshreleaseIssueChangelogItems>> {
        let query = Query::new()
            .filter_eq("connection_id", &changelog.connection_id)
            .filter_eq("changelog_id", &changelog.changelog_id);
        self.ctx.store.query(&query)
    }

    /// Domain value of one side of a change
    fn map_value(&self, issue_id: u64, field: &str, value: &str, display: &str) -> String {
        let conn = self.ctx.connection_id();
        match field {
            "status" => {
                let name = self
                    .statuses
                    .get(value)
                    .map_or(display, String::as_str);
                if name.is_empty() {
                    return String::new();
                }
                let issue_type = self
                    .issue_types
                    .get(&issue_id)
                    .map_or("", String::as_str);
                mapping::resolve_status(&self.ctx.scope_config, issue_type, name)
            }
            "assignee" => account_id(conn, value),
            "Sprint" => value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| SPRINT_IDS.generate(conn, id))
                .collect::<Vec<_>>()
                .join(","),
            _ => display.to_string(),
        }
    }
}

impl Transform for ChangelogTransform<'_> {
    type Input = FreshreleaseIssueChangelogs;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_CHANGELOGS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssueChangelogs::TABLE)
    }

    fn incremental_column(&self) -> Option<&'static str> {
        Some("_tool_freshrelease_issue_changelogs.issue_updated")
    }

    fn convert(&self, input: &FreshreleaseIssueChangelogs) -> Result<Vec<BoxedRecord>> {
        let conn = input.connection_id;
        let issue_id = ISSUE_IDS.generate(conn, input.issue_id);
        let author_id = account_id(conn, &input.author_account_id);

        Ok(self
            .items(input)?
            .into_iter()
            .map(|item| {
                boxed(IssueChangelog {
                    id: CHANGELOG_IDS.generate_parts(conn, &[&item.changelog_id, &item.field]),
                    issue_id: issue_id.clone(),
                    author_id: author_id.clone(),
                    author_name: input.author_display_name.clone(),
                    field_id: item.field.clone(),
                    field_name: item.field.clone(),
                    from_value: self.map_value(
                        input.issue_id,
                        &item.field,
                        &item.from_value,
                        &item.from_string,
                    ),
                    to_value: self.map_value(
                        input.issue_id,
                        &item.field,
                        &item.to_value,
                        &item.to_string,
                    ),
                    original_from_value: item.from_string,
                    original_to_value: item.to_string,
                    created_date: input.created,
                })
            })
            .collect())
    }

    fn last_modified(&self, input: &FreshreleaseIssueChangelogs) -> Option<DateTime<Utc>> {
        input.issue_updated
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, IssueChangelog::TABLE, "issue_id", full_pass)]
    }
}

fn convert_issue_changelogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ChangelogTransform::load(ctx).and_then(|transform| ctx.converter().run(&transform)))
}
