//! Issue converters
//!
//! Issues and the rows hanging directly off them: labels, links and the
//! commits mined from remote links.

use super::purge::{domain_issue_rows, domain_issues, domain_rows_of_issue};
use super::{account_id, ready, SubtaskContext, SubtaskMeta, BOARD_IDS, ISSUE_IDS};
use crate::domain::{
    BoardIssue, Issue, IssueAssignee, IssueCommit, IssueLabel, IssueRelationship,
    IssueRepoCommit, SUBTASK,
};
use crate::engine::{SyncStats, Transform};
use crate::error::Result;
use crate::mapping;
use crate::models::{
    FreshreleaseIssue, FreshreleaseIssueCommit, FreshreleaseIssueLabel,
    FreshreleaseIssueRelationship,
};
use crate::store::{boxed, BoxedRecord, Purge, Query, Record, SqlValue};
use crate::types::DomainType;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

pub(super) const CONVERT_ISSUES: SubtaskMeta =
    SubtaskMeta::new("convertIssues", "convert Freshrelease issues", convert_issues)
        .emits(&[DomainType::Ticket]);

pub(super) const CONVERT_ISSUE_LABELS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueLabels",
    "convert Freshrelease issue labels",
    convert_issue_labels,
)
.emits(&[DomainType::Ticket]);

pub(super) const CONVERT_ISSUE_RELATIONSHIPS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueRelationships",
    "convert Freshrelease issue links",
    convert_issue_relationships,
)
.emits(&[DomainType::Ticket]);

pub(super) const CONVERT_ISSUE_COMMITS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueCommits",
    "convert commits mined from Freshrelease remote links",
    convert_issue_commits,
)
.emits(&[DomainType::Code]);

pub(super) const CONVERT_ISSUE_REPO_COMMITS: SubtaskMeta = SubtaskMeta::new(
    "convertIssueRepoCommits",
    "convert commits with a known repository",
    convert_issue_repo_commits,
)
.emits(&[DomainType::Code]);

/// Browse URL of an issue from its API URL
///
/// The path is cut at the agile or v2 issue endpoint and `browse/{key}` is
/// appended. URLs that do not parse or carry neither marker come back as is.
pub fn convert_url(api_url: &str, issue_key: &str) -> String {
    const MARKERS: [&str; 2] = ["/rest/agile/1.0/issue", "/rest/api/2/issue"];

    let Ok(mut url) = url::Url::parse(api_url) else {
        return api_url.to_string();
    };
    let path = url.path().to_string();
    let Some(base) = MARKERS
        .iter()
        .find_map(|marker| path.find(marker).map(|at| &path[..at]))
    else {
        return api_url.to_string();
    };

    url.set_path(&format!("{}/browse/{issue_key}", base.trim_end_matches('/')));
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

// ============================================================================
// Issues
// ============================================================================

struct IssueTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for IssueTransform<'_> {
    type Input = FreshreleaseIssue;

    fn name(&self) -> &'static str {
        CONVERT_ISSUES.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssue::TABLE)
    }

    fn incremental_column(&self) -> Option<&'static str> {
        Some("_tool_freshrelease_issues.updated")
    }

    fn convert(&self, input: &FreshreleaseIssue) -> Result<Vec<BoxedRecord>> {
        let conn = input.connection_id;
        let (mut issue_type, status) = mapping::resolve(
            &self.ctx.scope_config,
            &input.issue_type,
            &input.status_name,
        );
        if input.subtask {
            issue_type = SUBTASK.to_string();
        }

        let issue = Issue {
            id: ISSUE_IDS.generate(conn, input.issue_id),
            url: convert_url(&input.self_url, &input.issue_key),
            icon_url: input.icon_url.clone(),
            issue_key: input.issue_key.clone(),
            title: input.summary.clone(),
            description: input.description.clone(),
            epic_key: input.epic_key.clone(),
            issue_type,
            original_type: input.issue_type.clone(),
            status,
            original_status: input.status_name.clone(),
            story_point: input.story_point,
            original_estimate_minutes: input.original_estimate_minutes,
            time_spent_minutes: input.spent_minutes,
            time_remaining_minutes: input.remaining_estimate_minutes,
            lead_time_minutes: input.lead_time_minutes,
            creator_id: account_id(conn, &input.creator_account_id),
            creator_name: input.creator_display_name.clone(),
            assignee_id: account_id(conn, &input.assignee_account_id),
            assignee_name: input.assignee_display_name.clone(),
            parent_issue_id: if input.parent_id == 0 {
                String::new()
            } else {
                ISSUE_IDS.generate(conn, input.parent_id)
            },
            priority: input.priority_name.clone(),
            original_project: input.project_name.clone(),
            component: input.components.clone(),
            resolution_date: input.resolution_date,
            created_date: input.created,
            updated_date: input.updated,
        };

        let mut rows = Vec::with_capacity(3);
        if !issue.assignee_id.is_empty() {
            rows.push(boxed(IssueAssignee {
                issue_id: issue.id.clone(),
                assignee_id: issue.assignee_id.clone(),
                assignee_name: issue.assignee_name.clone(),
            }));
        }
        rows.push(boxed(BoardIssue {
            board_id: BOARD_IDS.generate(conn, self.ctx.board_id()),
            issue_id: issue.id.clone(),
        }));
        rows.push(boxed(issue));
        Ok(rows)
    }

    fn last_modified(&self, input: &FreshreleaseIssue) -> Option<DateTime<Utc>> {
        input.updated
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        let mut purges = vec![domain_issue_rows(
            self.ctx,
            IssueAssignee::TABLE,
            "issue_id",
            full_pass,
        )];
        purges.extend(domain_issues(self.ctx, Issue::TABLE, full_pass));
        purges
    }

    /// An issue has at most one assignee, the one it carries now
    fn input_purges(&self, input: &FreshreleaseIssue) -> Vec<Purge> {
        vec![domain_rows_of_issue(
            IssueAssignee::TABLE,
            "issue_id",
            &ISSUE_IDS.generate(input.connection_id, input.issue_id),
        )]
    }
}

fn convert_issues(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&IssueTransform { ctx }))
}

// ============================================================================
// Labels and links
// ============================================================================

struct LabelTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for LabelTransform<'_> {
    type Input = FreshreleaseIssueLabel;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_LABELS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssueLabel::TABLE)
    }

    fn convert(&self, input: &FreshreleaseIssueLabel) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(IssueLabel {
            issue_id: ISSUE_IDS.generate(input.connection_id, input.issue_id),
            label_name: input.label_name.clone(),
        })])
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, IssueLabel::TABLE, "issue_id", full_pass)]
    }
}

fn convert_issue_labels(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&LabelTransform { ctx }))
}

struct RelationshipTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for RelationshipTransform<'_> {
    type Input = FreshreleaseIssueRelationship;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_RELATIONSHIPS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssueRelationship::TABLE)
    }

    /// A link names its other end on one side only
    fn convert(&self, input: &FreshreleaseIssueRelationship) -> Result<Vec<BoxedRecord>> {
        let target = match (input.outward_issue_id, input.inward_issue_id) {
            (0, 0) => return Ok(Vec::new()),
            (0, inward) => inward,
            (outward, _) => outward,
        };
        Ok(vec![boxed(IssueRelationship {
            source_issue_id: ISSUE_IDS.generate(input.connection_id, input.issue_id),
            target_issue_id: ISSUE_IDS.generate(input.connection_id, target),
            original_type: input.issue_link_type_name.clone(),
        })])
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(
            self.ctx,
            IssueRelationship::TABLE,
            "source_issue_id",
            full_pass,
        )]
    }
}

fn convert_issue_relationships(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&RelationshipTransform { ctx }))
}

// ============================================================================
// Commits
// ============================================================================

struct CommitTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for CommitTransform<'_> {
    type Input = FreshreleaseIssueCommit;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_COMMITS.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseIssueCommit::TABLE)
    }

    fn convert(&self, input: &FreshreleaseIssueCommit) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(IssueCommit {
            issue_id: ISSUE_IDS.generate(input.connection_id, input.issue_id),
            commit_sha: input.commit_sha.clone(),
        })])
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, IssueCommit::TABLE, "issue_id", full_pass)]
    }
}

fn convert_issue_commits(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&CommitTransform { ctx }))
}

struct RepoCommitTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for RepoCommitTransform<'_> {
    type Input = FreshreleaseIssueCommit;

    fn name(&self) -> &'static str {
        CONVERT_ISSUE_REPO_COMMITS.name
    }

    fn query(&self) -> Query {
        self.ctx
            .board_issue_query(FreshreleaseIssueCommit::TABLE)
            .filter(
                format!("{}.repo_url != ?", FreshreleaseIssueCommit::TABLE),
                vec![SqlValue::Text(String::new())],
            )
    }

    fn convert(&self, input: &FreshreleaseIssueCommit) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(IssueRepoCommit {
            issue_id: ISSUE_IDS.generate(input.connection_id, input.issue_id),
            commit_sha: input.commit_sha.clone(),
            repo_url: input.repo_url.clone(),
            host: input.host.clone(),
            namespace: input.namespace.clone(),
            repo_name: input.repo_name.clone(),
        })])
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(
            self.ctx,
            IssueRepoCommit::TABLE,
            "issue_id",
            full_pass,
        )]
    }
}

fn convert_issue_repo_commits(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&RepoCommitTransform { ctx }))
}
