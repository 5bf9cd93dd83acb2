//! Board, sprint and account converters

use super::purge::{domain_board_rows, domain_issue_rows};
use super::{ready, SubtaskContext, SubtaskMeta, ACCOUNT_IDS, BOARD_IDS, ISSUE_IDS, SPRINT_IDS};
use crate::domain::{sprint_status, Account, Board, BoardSprint, Sprint, SprintIssue};
use crate::engine::{SyncStats, Transform};
use crate::error::Result;
use crate::models::{
    FreshreleaseAccount, FreshreleaseBoard, FreshreleaseBoardSprint, FreshreleaseSprint,
    FreshreleaseSprintIssue,
};
use crate::store::{boxed, BoxedRecord, Purge, Query, Record, SqlValue};
use crate::types::DomainType;
use futures::future::BoxFuture;

pub(super) const CONVERT_BOARD: SubtaskMeta =
    SubtaskMeta::new("convertBoard", "convert the Freshrelease board", convert_board)
        .emits(&[DomainType::Ticket]);

pub(super) const CONVERT_SPRINTS: SubtaskMeta =
    SubtaskMeta::new("convertSprints", "convert Freshrelease sprints", convert_sprints)
        .emits(&[DomainType::Ticket]);

pub(super) const CONVERT_SPRINT_ISSUES: SubtaskMeta = SubtaskMeta::new(
    "convertSprintIssues",
    "convert Freshrelease sprint membership",
    convert_sprint_issues,
)
.emits(&[DomainType::Ticket]);

pub(super) const CONVERT_ACCOUNTS: SubtaskMeta =
    SubtaskMeta::new("convertAccounts", "convert Freshrelease accounts", convert_accounts)
        .emits(&[DomainType::Cross]);

/// Web URL of a board from its API URL
fn board_url(api_url: &str, board_id: u64) -> String {
    let Ok(mut url) = url::Url::parse(api_url) else {
        return api_url.to_string();
    };
    let path = url.path().to_string();
    let Some(at) = path.find("/rest/agile/") else {
        return api_url.to_string();
    };
    url.set_path(&format!("{}/secure/RapidBoard.jspa", path[..at].trim_end_matches('/')));
    url.set_query(Some(&format!("rapidView={board_id}")));
    url.to_string()
}

struct BoardTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for BoardTransform<'_> {
    type Input = FreshreleaseBoard;

    fn name(&self) -> &'static str {
        CONVERT_BOARD.name
    }

    fn query(&self) -> Query {
        Query::new()
            .filter_eq("connection_id", &self.ctx.connection_id())
            .filter_eq("board_id", &self.ctx.board_id())
    }

    fn convert(&self, input: &FreshreleaseBoard) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(Board {
            id: BOARD_IDS.generate(input.connection_id, input.board_id),
            name: input.name.clone(),
            url: board_url(&input.self_url, input.board_id),
            board_type: input.board_type.clone(),
        })])
    }
}

fn convert_board(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&BoardTransform { ctx }))
}

// ============================================================================
// Sprints
// ============================================================================

struct SprintTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for SprintTransform<'_> {
    type Input = FreshreleaseSprint;

    fn name(&self) -> &'static str {
        CONVERT_SPRINTS.name
    }

    fn query(&self) -> Query {
        let bs = FreshreleaseBoardSprint::TABLE;
        let sprints = FreshreleaseSprint::TABLE;
        Query::new()
            .join(format!(
                "JOIN {bs} ON {bs}.connection_id = {sprints}.connection_id AND {bs}.sprint_id = {sprints}.sprint_id"
            ))
            .filter_eq(&format!("{bs}.connection_id"), &self.ctx.connection_id())
            .filter_eq(&format!("{bs}.board_id"), &self.ctx.board_id())
    }

    fn convert(&self, input: &FreshreleaseSprint) -> Result<Vec<BoxedRecord>> {
        let conn = input.connection_id;
        let sprint = Sprint {
            id: SPRINT_IDS.generate(conn, input.sprint_id),
            name: input.name.clone(),
            url: input.self_url.clone(),
            status: sprint_status(&input.state).to_string(),
            original_status: input.state.clone(),
            started_date: input.start_date,
            ended_date: input.end_date,
            completed_date: input.complete_date,
            original_board_id: if input.origin_board_id == 0 {
                String::new()
            } else {
                BOARD_IDS.generate(conn, input.origin_board_id)
            },
        };
        Ok(vec![
            boxed(BoardSprint {
                board_id: BOARD_IDS.generate(conn, self.ctx.board_id()),
                sprint_id: sprint.id.clone(),
            }),
            boxed(sprint),
        ])
    }

    /// Sprints stay, only the board's claim on them is replaced
    fn purges(&self, _full_pass: bool) -> Vec<Purge> {
        vec![domain_board_rows(self.ctx, BoardSprint::TABLE)]
    }
}

fn convert_sprints(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&SprintTransform { ctx }))
}

struct SprintIssueTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for SprintIssueTransform<'_> {
    type Input = FreshreleaseSprintIssue;

    fn name(&self) -> &'static str {
        CONVERT_SPRINT_ISSUES.name
    }

    fn query(&self) -> Query {
        self.ctx.board_issue_query(FreshreleaseSprintIssue::TABLE)
    }

    fn convert(&self, input: &FreshreleaseSprintIssue) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(SprintIssue {
            sprint_id: SPRINT_IDS.generate(input.connection_id, input.sprint_id),
            issue_id: ISSUE_IDS.generate(input.connection_id, input.issue_id),
        })])
    }

    fn purges(&self, full_pass: bool) -> Vec<Purge> {
        vec![domain_issue_rows(self.ctx, SprintIssue::TABLE, "issue_id", full_pass)]
    }
}

fn convert_sprint_issues(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&SprintIssueTransform { ctx }))
}

// ============================================================================
// Accounts
// ============================================================================

struct AccountTransform<'a> {
    ctx: &'a SubtaskContext,
}

impl Transform for AccountTransform<'_> {
    type Input = FreshreleaseAccount;

    fn name(&self) -> &'static str {
        CONVERT_ACCOUNTS.name
    }

    fn query(&self) -> Query {
        Query::new()
            .filter_eq("connection_id", &self.ctx.connection_id())
            .filter("account_id != ?", vec![SqlValue::Text(String::new())])
    }

    fn convert(&self, input: &FreshreleaseAccount) -> Result<Vec<BoxedRecord>> {
        Ok(vec![boxed(Account {
            id: ACCOUNT_IDS.generate(input.connection_id, &input.account_id),
            user_name: input.name.clone(),
            full_name: input.name.clone(),
            email: input.email.clone(),
            avatar_url: input.avatar_url.clone(),
        })])
    }
}

fn convert_accounts(ctx: &SubtaskContext) -> BoxFuture<'_, Result<SyncStats>> {
    ready(ctx.converter().run(&AccountTransform { ctx }))
}

#[cfg(test)]
mod tests {
    use super::board_url;

    #[test]
    fn test_board_url() {
        assert_eq!(
            board_url("https://acme.example.com/rest/agile/1.0/board/8", 8),
            "https://acme.example.com/secure/RapidBoard.jspa?rapidView=8"
        );
        assert_eq!(board_url("not a url", 8), "not a url");
    }
}
