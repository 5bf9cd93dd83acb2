//! Subtasks of a board run
//!
//! A run is an ordered list of [`SubtaskMeta`] entries. Collectors come
//! before the extractors that read their pages, and extractors before the
//! converters that read their rows. The list is built by [`subtask_metas`]
//! and handed to the runner by value.

mod collect;
mod context;
mod convert_activity;
mod convert_issue;
mod convert_sprint;
mod extract;
mod purge;
mod runner;

pub use context::{resolve_scope_config, BoardIssueRef, SubtaskContext};
pub use convert_issue::convert_url;
pub use runner::{SubtaskReport, TaskReport, TaskRunner};

use crate::didgen::DomainIdGenerator;
use crate::engine::SyncStats;
use crate::error::Result;
use crate::models::{
    FreshreleaseAccount, FreshreleaseBoard, FreshreleaseIssue, FreshreleaseIssueChangelogItems,
    FreshreleaseIssueComment, FreshreleaseSprint, FreshreleaseWorklog,
};
use crate::types::DomainType;
use futures::future::BoxFuture;

const ACCOUNT_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseAccount>();
const BOARD_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseBoard>();
const ISSUE_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseIssue>();
const SPRINT_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseSprint>();
const COMMENT_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseIssueComment>();
const WORKLOG_IDS: DomainIdGenerator = DomainIdGenerator::of::<FreshreleaseWorklog>();
const CHANGELOG_IDS: DomainIdGenerator =
    DomainIdGenerator::of::<FreshreleaseIssueChangelogItems>();

/// Account id for a local id, empty when there is none
fn account_id(connection_id: u64, local: &str) -> String {
    if local.is_empty() {
        String::new()
    } else {
        ACCOUNT_IDS.generate(connection_id, local)
    }
}

/// Entry point of a subtask
pub type SubtaskFn = for<'a> fn(&'a SubtaskContext) -> BoxFuture<'a, Result<SyncStats>>;

/// One step of a board run
#[derive(Clone, Copy)]
pub struct SubtaskMeta {
    /// Name used for selection and for the converter cursor
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Whether the step runs when no explicit selection is given
    pub enabled_by_default: bool,
    /// Domains the step writes to, empty for collectors and extractors
    pub domain_types: &'static [DomainType],
    entry_point: SubtaskFn,
}

impl SubtaskMeta {
    const fn new(name: &'static str, description: &'static str, entry_point: SubtaskFn) -> Self {
        Self {
            name,
            description,
            enabled_by_default: true,
            domain_types: &[],
            entry_point,
        }
    }

    const fn emits(mut self, domain_types: &'static [DomainType]) -> Self {
        self.domain_types = domain_types;
        self
    }

    /// Run the step
    pub async fn run(&self, ctx: &SubtaskContext) -> Result<SyncStats> {
        (self.entry_point)(ctx).await
    }
}

impl std::fmt::Debug for SubtaskMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtaskMeta")
            .field("name", &self.name)
            .field("enabled_by_default", &self.enabled_by_default)
            .field("domain_types", &self.domain_types)
            .finish_non_exhaustive()
    }
}

/// Every subtask, in execution order
pub fn subtask_metas() -> Vec<SubtaskMeta> {
    vec![
        collect::COLLECT_STATUS,
        extract::EXTRACT_STATUS,
        collect::COLLECT_ISSUE_TYPES,
        extract::EXTRACT_ISSUE_TYPES,
        collect::COLLECT_ISSUES,
        extract::EXTRACT_ISSUES,
        convert_issue::CONVERT_ISSUE_LABELS,
        collect::COLLECT_ISSUE_COMMENTS,
        extract::EXTRACT_ISSUE_COMMENTS,
        collect::COLLECT_ISSUE_CHANGELOGS,
        extract::EXTRACT_ISSUE_CHANGELOGS,
        collect::COLLECT_WORKLOGS,
        extract::EXTRACT_WORKLOGS,
        collect::COLLECT_REMOTELINKS,
        extract::EXTRACT_REMOTELINKS,
        collect::COLLECT_SPRINTS,
        extract::EXTRACT_SPRINTS,
        collect::COLLECT_ACCOUNTS,
        convert_sprint::CONVERT_BOARD,
        convert_issue::CONVERT_ISSUES,
        convert_activity::CONVERT_ISSUE_COMMENTS,
        convert_activity::CONVERT_WORKLOGS,
        convert_activity::CONVERT_ISSUE_CHANGELOGS,
        convert_issue::CONVERT_ISSUE_RELATIONSHIPS,
        convert_sprint::CONVERT_SPRINTS,
        convert_sprint::CONVERT_SPRINT_ISSUES,
        convert_issue::CONVERT_ISSUE_COMMITS,
        convert_issue::CONVERT_ISSUE_REPO_COMMITS,
        extract::EXTRACT_ACCOUNTS,
        convert_sprint::CONVERT_ACCOUNTS,
    ]
}

/// Wrap a synchronous step as an entry point future
fn ready(result: Result<SyncStats>) -> BoxFuture<'static, Result<SyncStats>> {
    Box::pin(futures::future::ready(result))
}
