//! Collectors
//!
//! Each collector walks one endpoint into its raw table. Per-issue endpoints
//! are walked once for every issue of the board, with the issue stored as
//! the page input so extractors know the parent.

use super::{SubtaskContext, SubtaskMeta};
use crate::engine::{input_json, CollectInput, RecordsAt, SyncStats};
use crate::error::Result;
use crate::models::{
    FreshreleaseAccount, RAW_CHANGELOG_TABLE, RAW_COMMENT_TABLE, RAW_ISSUE_TABLE,
    RAW_ISSUE_TYPE_TABLE, RAW_REMOTELINK_TABLE, RAW_SPRINT_TABLE, RAW_STATUS_TABLE,
    RAW_USER_TABLE, RAW_WORKLOG_TABLE,
};
use crate::pagination::StartAtPaginator;
use crate::store::{Query, SqlValue};
use futures::future::BoxFuture;
use serde_json::json;

pub(super) const COLLECT_STATUS: SubtaskMeta =
    SubtaskMeta::new("collectStatus", "collect Freshrelease statuses", collect_status);

pub(super) const COLLECT_ISSUE_TYPES: SubtaskMeta = SubtaskMeta::new(
    "collectIssueTypes",
    "collect Freshrelease issue types",
    collect_issue_types,
);

pub(super) const COLLECT_ISSUES: SubtaskMeta =
    SubtaskMeta::new("collectIssues", "collect Freshrelease issues", collect_issues);

pub(super) const COLLECT_ISSUE_COMMENTS: SubtaskMeta = SubtaskMeta::new(
    "collectIssueComments",
    "collect Freshrelease issue comments",
    collect_issue_comments,
);

pub(super) const COLLECT_ISSUE_CHANGELOGS: SubtaskMeta = SubtaskMeta::new(
    "collectIssueChangelogs",
    "collect Freshrelease issue changelogs",
    collect_issue_changelogs,
);

pub(super) const COLLECT_WORKLOGS: SubtaskMeta =
    SubtaskMeta::new("collectWorklogs", "collect Freshrelease work logs", collect_worklogs);

pub(super) const COLLECT_REMOTELINKS: SubtaskMeta = SubtaskMeta::new(
    "collectRemotelinks",
    "collect Freshrelease remote links",
    collect_remotelinks,
);

pub(super) const COLLECT_SPRINTS: SubtaskMeta =
    SubtaskMeta::new("collectSprints", "collect Freshrelease sprints", collect_sprints);

pub(super) const COLLECT_ACCOUNTS: SubtaskMeta = SubtaskMeta::new(
    "collectAccounts",
    "collect Freshrelease account details",
    collect_accounts,
);

fn collect_status(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move { ctx.collector(RAW_STATUS_TABLE).collect("api/2/status").await })
}

fn collect_issue_types(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        ctx.collector(RAW_ISSUE_TYPE_TABLE)
            .collect("api/2/issuetype")
            .await
    })
}

fn collect_issues(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        ctx.collector(RAW_ISSUE_TABLE)
            .query_opt("jql", ctx.options.jql.as_deref())
            .records_at(RecordsAt::Field("issues"))
            .paginator(StartAtPaginator::new(ctx.page_size()))
            .collect(&format!("agile/1.0/board/{}/issue", ctx.board_id()))
            .await
    })
}

fn collect_issue_comments(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        let inputs = issue_inputs(ctx, "comment")?;
        ctx.collector(RAW_COMMENT_TABLE)
            .records_at(RecordsAt::Field("comments"))
            .paginator(StartAtPaginator::new(ctx.page_size()))
            .collect_each(inputs)
            .await
    })
}

fn collect_issue_changelogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        let inputs = issue_inputs(ctx, "changelog")?;
        ctx.collector(RAW_CHANGELOG_TABLE)
            .records_at(RecordsAt::Field("values"))
            .paginator(StartAtPaginator::new(ctx.page_size()))
            .collect_each(inputs)
            .await
    })
}

fn collect_worklogs(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        let inputs = issue_inputs(ctx, "worklog")?;
        ctx.collector(RAW_WORKLOG_TABLE)
            .records_at(RecordsAt::Field("worklogs"))
            .paginator(StartAtPaginator::new(ctx.page_size()))
            .collect_each(inputs)
            .await
    })
}

fn collect_remotelinks(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        let inputs = issue_inputs(ctx, "remotelink")?;
        ctx.collector(RAW_REMOTELINK_TABLE)
            .collect_each(inputs)
            .await
    })
}

fn collect_sprints(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        ctx.collector(RAW_SPRINT_TABLE)
            .records_at(RecordsAt::Field("values"))
            .paginator(StartAtPaginator::new(ctx.page_size()))
            .collect(&format!("agile/1.0/board/{}/sprint", ctx.board_id()))
            .await
    })
}

fn collect_accounts(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    Box::pin(async move {
        let query = Query::new()
            .filter_eq("connection_id", &ctx.connection_id())
            .filter("account_id != ?", vec![SqlValue::Text(String::new())]);
        let inputs = ctx
            .store
            .query::<FreshreleaseAccount>(&query)?
            .into_iter()
            .map(|account| {
                Ok(CollectInput {
                    input: input_json(&json!({ "accountId": account.account_id }))?,
                    path: "api/2/user".to_string(),
                    query: vec![("accountId".to_string(), account.account_id.clone())],
                    key: account.account_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // deleted users keep their harvested row
        ctx.collector(RAW_USER_TABLE)
            .records_at(RecordsAt::Object)
            .skip_not_found()
            .collect_each(inputs)
            .await
    })
}

/// One walk per board issue over `api/2/issue/{id}/{resource}`
fn issue_inputs(ctx: &SubtaskContext, resource: &str) -> Result<Vec<CollectInput>> {
    ctx.board_issues()?
        .into_iter()
        .map(|issue| {
            Ok(CollectInput {
                key: issue.issue_id.to_string(),
                path: format!("api/2/issue/{}/{resource}", issue.issue_id),
                query: Vec::new(),
                input: input_json(&issue)?,
            })
        })
        .collect()
}
