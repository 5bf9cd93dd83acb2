//! Integration tests using mock HTTP server
//!
//! Tests the full board flow: YAML config → HTTP requests → raw pages →
//! tool rows → domain rows in an on-disk DuckDB file.

use chrono::{TimeZone, Utc};
use freshrelease_connector::config::{AppConfig, TaskOptions};
use freshrelease_connector::domain;
use freshrelease_connector::engine::Cancellation;
use freshrelease_connector::http::{ApiClient, HttpClient, RateLimiterPool};
use freshrelease_connector::models::{
    FreshreleaseAccount, FreshreleaseIssue, FreshreleaseIssueComment, FreshreleaseIssueLabel,
    FreshreleaseRemotelink,
};
use freshrelease_connector::store::{Query, Record, Store};
use freshrelease_connector::tasks::{resolve_scope_config, SubtaskContext, TaskReport, TaskRunner};
use freshrelease_connector::types::SyncMode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

const CONFIG: &str = r#"
database: "$DB"
connections:
  - id: 1
    name: acme
    endpoint: "$URI/rest"
    auth:
      type: basic
      username: bot
      password: secret
    rate_limit_per_hour: 36000
    http:
      max_retries: 0
scope_configs:
  - id: 3
    name: shop
    typeMappings:
      Story:
        standardType: REQUIREMENT
        statusMappings:
          In Review:
            standardStatus: IN_PROGRESS
    storyPointField: customfield_10016
    remotelinkCommitShaPattern: ".*/commit/([0-9a-f]{40})$"
    remotelinkRepoPattern:
      - pattern: "https://github.com/{namespace}/{repo_name}/commit/{commit_sha}"
boards:
  - connection_id: 1
    board_id: 8
    scope_config_id: 3
"#;

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    server: MockServer,
    app: AppConfig,
    store: Store,
    client: Arc<dyn ApiClient>,
    _dir: TempDir,
}

impl Fixture {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("freshrelease.duckdb");
        let yaml = CONFIG
            .replace("$URI", &server.uri())
            .replace("$DB", &db.display().to_string());
        let app = AppConfig::from_yaml_str(&yaml).unwrap();
        let store = Store::open(&app.database).unwrap();
        let client = HttpClient::for_connection(app.connection(1).unwrap(), &RateLimiterPool::new())
            .unwrap();
        Self {
            server,
            app,
            store,
            client: Arc::new(client),
            _dir: dir,
        }
    }

    async fn run(&self, mode: SyncMode) -> TaskReport {
        let options = TaskOptions::new(1, 8).with_sync_mode(mode);
        let scope_config = resolve_scope_config(&self.app, &options).unwrap();
        let ctx = SubtaskContext::new(
            options,
            scope_config,
            self.client.clone(),
            self.store.clone(),
            Cancellation::new(),
        )
        .unwrap();
        TaskRunner::for_context(&ctx)
            .unwrap()
            .run(&ctx)
            .await
            .unwrap()
    }

    fn all<R: Record>(&self) -> Vec<R> {
        self.store.query(&Query::new()).unwrap()
    }
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn account(id: &str, name: &str) -> Value {
    json!({ "accountId": id, "displayName": name })
}

/// What the server reports for board 8
struct BoardState {
    /// Issues the board lists, in order
    listed: &'static [u64],
    first_updated: &'static str,
    second_updated: &'static str,
    /// Assignee of 10001 as (account id, display name)
    assignee: (&'static str, &'static str),
    /// Labels of 10001
    labels: &'static [&'static str],
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            listed: &[10001, 10002],
            first_updated: "2024-03-01T10:00:00.000+0000",
            second_updated: "2024-03-02T10:00:00.000+0000",
            assignee: ("acc-1", "Ada"),
            labels: &["checkout"],
        }
    }
}

fn issue(uri: &str, id: u64, state: &BoardState) -> Value {
    let updated = if id == 10001 {
        state.first_updated
    } else {
        state.second_updated
    };
    let mut fields = json!({
        "summary": format!("issue {id}"),
        "issuetype": { "id": "10", "name": "Story", "subtask": false },
        "status": { "name": "In Review", "statusCategory": { "key": "indeterminate" } },
        "project": { "id": "100", "name": "Shop" },
        "creator": account("acc-2", "Grace"),
        "reporter": account("acc-2", "Grace"),
        "created": "2024-02-20T09:00:00.000+0000",
        "updated": updated,
        "customfield_10016": 3.0
    });
    if id == 10001 {
        fields["assignee"] = account(state.assignee.0, state.assignee.1);
        fields["labels"] = json!(state.labels);
        fields["sprint"] = json!({ "id": 5, "state": "active", "name": "Sprint 5", "originBoardId": 8 });
    }
    json!({
        "id": id.to_string(),
        "key": format!("FR-{}", id - 10000),
        "self": format!("{uri}/rest/agile/1.0/issue/{id}"),
        "fields": fields
    })
}

/// Mount every endpoint a board run touches
async fn mount_board(server: &MockServer, second_issue_updated: &'static str) {
    let state = BoardState {
        second_updated: second_issue_updated,
        ..BoardState::default()
    };
    mount_board_state(server, &state).await;
}

async fn mount_board_state(server: &MockServer, state: &BoardState) {
    let uri = server.uri();

    mount_json(
        server,
        "/rest/agile/1.0/board/8",
        json!({
            "id": 8,
            "name": "Shop board",
            "self": format!("{uri}/rest/agile/1.0/board/8"),
            "type": "scrum",
            "location": { "projectId": 100 }
        }),
    )
    .await;
    mount_json(
        server,
        "/rest/api/2/status",
        json!([
            { "id": "1", "name": "Open", "statusCategory": { "key": "new" } },
            { "id": "3", "name": "In Review", "statusCategory": { "key": "indeterminate" } }
        ]),
    )
    .await;
    mount_json(
        server,
        "/rest/api/2/issuetype",
        json!([{ "id": "10", "name": "Story", "subtask": false }]),
    )
    .await;
    mount_json(
        server,
        "/rest/agile/1.0/board/8/issue",
        json!({
            "startAt": 0,
            "maxResults": 50,
            "total": state.listed.len(),
            "issues": state
                .listed
                .iter()
                .map(|id| issue(&uri, *id, state))
                .collect::<Vec<_>>()
        }),
    )
    .await;

    mount_json(
        server,
        "/rest/api/2/issue/10001/comment",
        json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "comments": [{
                "id": "9001",
                "body": "On it",
                "author": account("acc-2", "Grace"),
                "created": "2024-02-21T08:00:00.000+0000",
                "updated": "2024-02-21T08:00:00.000+0000"
            }]
        }),
    )
    .await;
    mount_json(
        server,
        "/rest/api/2/issue/10001/changelog",
        json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "isLast": true,
            "values": [{
                "id": "500",
                "author": account("acc-1", "Ada"),
                "created": "2024-02-21T09:00:00.000+0000",
                "items": [
                    { "field": "status", "fieldtype": "jira", "from": "1", "fromString": "Open", "to": "3", "toString": "In Review" },
                    { "field": "assignee", "fieldtype": "jira", "from": null, "fromString": null, "to": "acc-1", "toString": "Ada" }
                ]
            }]
        }),
    )
    .await;
    mount_json(
        server,
        "/rest/api/2/issue/10001/worklog",
        json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "worklogs": [{
                "id": "3001",
                "author": account("acc-1", "Ada"),
                "timeSpentSeconds": 5400,
                "started": "2024-02-22T09:00:00.000+0000",
                "updated": "2024-02-22T11:00:00.000+0000"
            }]
        }),
    )
    .await;
    mount_json(
        server,
        "/rest/api/2/issue/10001/remotelink",
        json!([
            {
                "id": 7001,
                "self": format!("{uri}/rest/api/2/issue/10001/remotelink/7001"),
                "object": { "url": format!("https://github.com/acme/widgets/commit/{SHA}"), "title": "fix" }
            },
            {
                "id": 7002,
                "self": format!("{uri}/rest/api/2/issue/10001/remotelink/7002"),
                "object": { "url": "https://wiki.example.com/checkout", "title": "docs" }
            }
        ]),
    )
    .await;

    let empty = json!({ "startAt": 0, "maxResults": 50, "total": 0, "isLast": true });
    for resource in ["comment", "changelog", "worklog"] {
        mount_json(server, &format!("/rest/api/2/issue/10002/{resource}"), empty.clone()).await;
    }
    mount_json(server, "/rest/api/2/issue/10002/remotelink", json!([])).await;

    mount_json(
        server,
        "/rest/agile/1.0/board/8/sprint",
        json!({
            "startAt": 0,
            "maxResults": 50,
            "isLast": true,
            "values": [{
                "id": 5,
                "self": format!("{uri}/rest/agile/1.0/sprint/5"),
                "state": "active",
                "name": "Sprint 5",
                "startDate": "2024-02-19T00:00:00.000Z",
                "endDate": "2024-03-04T00:00:00.000Z",
                "originBoardId": 8
            }]
        }),
    )
    .await;

    for (id, name, email) in [
        ("acc-1", "Ada Lovelace", "ada@example.com"),
        ("acc-2", "Grace Hopper", "grace@example.com"),
    ] {
        Mock::given(method("GET"))
            .and(path("/rest/api/2/user"))
            .and(query_param("accountId", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accountId": id,
                "displayName": name,
                "emailAddress": email,
                "avatarUrls": { "48x48": format!("https://avatars.example.com/{id}.png") },
                "active": true
            })))
            .mount(server)
            .await;
    }
}

/// Every domain table the board run writes
#[derive(Debug, PartialEq)]
struct DomainSnapshot {
    boards: Vec<domain::Board>,
    issues: Vec<domain::Issue>,
    board_issues: Vec<domain::BoardIssue>,
    assignees: Vec<domain::IssueAssignee>,
    labels: Vec<domain::IssueLabel>,
    comments: Vec<domain::IssueComment>,
    worklogs: Vec<domain::IssueWorklog>,
    changelogs: Vec<domain::IssueChangelog>,
    sprints: Vec<domain::Sprint>,
    board_sprints: Vec<domain::BoardSprint>,
    sprint_issues: Vec<domain::SprintIssue>,
    commits: Vec<domain::IssueCommit>,
    repo_commits: Vec<domain::IssueRepoCommit>,
    accounts: Vec<domain::Account>,
}

fn snapshot(fixture: &Fixture) -> DomainSnapshot {
    DomainSnapshot {
        boards: fixture.all(),
        issues: fixture.all(),
        board_issues: fixture.all(),
        assignees: fixture.all(),
        labels: fixture.all(),
        comments: fixture.all(),
        worklogs: fixture.all(),
        changelogs: fixture.all(),
        sprints: fixture.all(),
        board_sprints: fixture.all(),
        sprint_issues: fixture.all(),
        commits: fixture.all(),
        repo_commits: fixture.all(),
        accounts: fixture.all(),
    }
}

// ============================================================================
// Board Run Tests
// ============================================================================

#[tokio::test]
async fn test_full_board_run() {
    let fixture = Fixture::start().await;
    mount_board(&fixture.server, "2024-03-02T10:00:00.000+0000").await;

    let report = fixture.run(SyncMode::FullRefresh).await;
    assert_eq!(report.board_id, 8);
    assert_eq!(report.stats("collectIssues").unwrap().pages, 1);
    assert_eq!(report.stats("extractIssues").unwrap().pages, 1);
    assert_eq!(report.stats("convertIssues").unwrap().records_in, 2);

    let domain = snapshot(&fixture);

    assert_eq!(domain.boards.len(), 1);
    assert_eq!(domain.boards[0].id, "freshrelease:FreshreleaseBoard:1:8");
    assert_eq!(domain.boards[0].name, "Shop board");

    let first = &domain.issues[0];
    assert_eq!(first.id, "freshrelease:FreshreleaseIssue:1:10001");
    assert_eq!(first.url, format!("{}/browse/FR-1", fixture.server.uri()));
    assert_eq!(first.issue_type, "REQUIREMENT");
    assert_eq!(first.status, "IN_PROGRESS");
    assert_eq!(first.original_status, "In Review");
    assert_eq!(first.story_point, Some(3.0));
    assert_eq!(first.assignee_id, "freshrelease:FreshreleaseAccount:1:acc-1");
    assert_eq!(domain.issues.len(), 2);
    assert_eq!(domain.board_issues.len(), 2);

    assert_eq!(
        domain.labels,
        vec![domain::IssueLabel {
            issue_id: first.id.clone(),
            label_name: "checkout".to_string(),
        }]
    );

    assert_eq!(domain.comments.len(), 1);
    assert_eq!(
        domain.comments[0].id,
        "freshrelease:FreshreleaseIssueComment:1:10001:9001"
    );
    assert_eq!(domain.worklogs.len(), 1);
    assert_eq!(domain.worklogs[0].time_spent_minutes, 90);

    let status_change = domain
        .changelogs
        .iter()
        .find(|c| c.field_name == "status")
        .unwrap();
    assert_eq!(status_change.from_value, "Open");
    assert_eq!(status_change.to_value, "IN_PROGRESS");
    let assignee_change = domain
        .changelogs
        .iter()
        .find(|c| c.field_name == "assignee")
        .unwrap();
    assert_eq!(
        assignee_change.to_value,
        "freshrelease:FreshreleaseAccount:1:acc-1"
    );

    assert_eq!(domain.sprints.len(), 1);
    assert_eq!(domain.sprints[0].status, "ACTIVE");
    assert_eq!(
        domain.board_sprints,
        vec![domain::BoardSprint {
            board_id: "freshrelease:FreshreleaseBoard:1:8".to_string(),
            sprint_id: "freshrelease:FreshreleaseSprint:1:5".to_string(),
        }]
    );
    assert_eq!(
        domain.sprint_issues,
        vec![domain::SprintIssue {
            sprint_id: "freshrelease:FreshreleaseSprint:1:5".to_string(),
            issue_id: first.id.clone(),
        }]
    );
}

#[tokio::test]
async fn test_remote_links_mine_commits() {
    let fixture = Fixture::start().await;
    mount_board(&fixture.server, "2024-03-02T10:00:00.000+0000").await;
    fixture.run(SyncMode::FullRefresh).await;

    let links: Vec<FreshreleaseRemotelink> = fixture.all();
    assert_eq!(links.len(), 2);
    assert!(links
        .iter()
        .any(|l| l.url == "https://wiki.example.com/checkout"));

    let commits: Vec<domain::IssueCommit> = fixture.all();
    assert_eq!(
        commits,
        vec![domain::IssueCommit {
            issue_id: "freshrelease:FreshreleaseIssue:1:10001".to_string(),
            commit_sha: SHA.to_string(),
        }]
    );

    let repo_commits: Vec<domain::IssueRepoCommit> = fixture.all();
    assert_eq!(repo_commits.len(), 1);
    assert_eq!(repo_commits[0].namespace, "acme");
    assert_eq!(repo_commits[0].repo_name, "widgets");
    assert_eq!(repo_commits[0].repo_url, "https://github.com/acme/widgets");
    assert_eq!(repo_commits[0].host, "github.com");
}

#[tokio::test]
async fn test_assignees_reference_converted_accounts() {
    let fixture = Fixture::start().await;
    mount_board(&fixture.server, "2024-03-02T10:00:00.000+0000").await;
    fixture.run(SyncMode::FullRefresh).await;

    let domain = snapshot(&fixture);
    assert!(!domain.assignees.is_empty());
    for assignee in &domain.assignees {
        assert!(
            domain.accounts.iter().any(|a| a.id == assignee.assignee_id),
            "{} has no account",
            assignee.assignee_id
        );
    }

    // details from the user endpoint replace the names embedded in issues
    let ada = domain
        .accounts
        .iter()
        .find(|a| a.id == "freshrelease:FreshreleaseAccount:1:acc-1")
        .unwrap();
    assert_eq!(ada.full_name, "Ada Lovelace");
    assert_eq!(ada.email, "ada@example.com");

    let tool_accounts: Vec<FreshreleaseAccount> = fixture.all();
    assert_eq!(tool_accounts.len(), 2);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fixture = Fixture::start().await;
    mount_board(&fixture.server, "2024-03-02T10:00:00.000+0000").await;

    fixture.run(SyncMode::FullRefresh).await;
    let first = snapshot(&fixture);
    fixture.run(SyncMode::FullRefresh).await;
    let second = snapshot(&fixture);

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_incremental_run_converts_changed_issues_only() {
    let fixture = Fixture::start().await;
    mount_board(&fixture.server, "2024-03-02T10:00:00.000+0000").await;
    let report = fixture.run(SyncMode::Incremental).await;
    let stats = report.stats("convertIssues").unwrap();
    assert!(!stats.incremental);
    assert_eq!(stats.records_in, 2);

    fixture.server.reset().await;
    mount_board(&fixture.server, "2024-03-05T10:00:00.000+0000").await;
    let report = fixture.run(SyncMode::Incremental).await;
    let stats = report.stats("convertIssues").unwrap();
    assert!(stats.incremental);
    assert_eq!(stats.records_in, 1);

    let issues: Vec<domain::Issue> = fixture.all();
    assert_eq!(
        issues[1].updated_date,
        Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap())
    );
}

// ============================================================================
// Upstream Change Tests
// ============================================================================

#[tokio::test]
async fn test_reassigned_issue_keeps_one_assignee() {
    let fixture = Fixture::start().await;
    mount_board_state(&fixture.server, &BoardState::default()).await;
    fixture.run(SyncMode::Incremental).await;

    fixture.server.reset().await;
    mount_board_state(
        &fixture.server,
        &BoardState {
            first_updated: "2024-03-06T10:00:00.000+0000",
            assignee: ("acc-2", "Grace"),
            ..BoardState::default()
        },
    )
    .await;
    let report = fixture.run(SyncMode::Incremental).await;
    assert!(report.stats("convertIssues").unwrap().incremental);

    let assignees: Vec<domain::IssueAssignee> = fixture.all();
    assert_eq!(
        assignees,
        vec![domain::IssueAssignee {
            issue_id: "freshrelease:FreshreleaseIssue:1:10001".to_string(),
            assignee_id: "freshrelease:FreshreleaseAccount:1:acc-2".to_string(),
            assignee_name: "Grace".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_changed_labels_replace_old_ones() {
    let fixture = Fixture::start().await;
    mount_board_state(&fixture.server, &BoardState::default()).await;
    fixture.run(SyncMode::Incremental).await;

    fixture.server.reset().await;
    mount_board_state(
        &fixture.server,
        &BoardState {
            first_updated: "2024-03-06T10:00:00.000+0000",
            labels: &["payments"],
            ..BoardState::default()
        },
    )
    .await;
    fixture.run(SyncMode::Incremental).await;

    let tool_labels: Vec<FreshreleaseIssueLabel> = fixture.all();
    let names: Vec<&str> = tool_labels.iter().map(|l| l.label_name.as_str()).collect();
    assert_eq!(names, vec!["payments"]);

    let labels: Vec<domain::IssueLabel> = fixture.all();
    assert_eq!(
        labels,
        vec![domain::IssueLabel {
            issue_id: "freshrelease:FreshreleaseIssue:1:10001".to_string(),
            label_name: "payments".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_issue_dropped_from_board_loses_its_rows() {
    let fixture = Fixture::start().await;
    mount_board_state(&fixture.server, &BoardState::default()).await;
    fixture.run(SyncMode::Incremental).await;
    assert_eq!(snapshot(&fixture).comments.len(), 1);

    fixture.server.reset().await;
    mount_board_state(
        &fixture.server,
        &BoardState {
            listed: &[10002],
            ..BoardState::default()
        },
    )
    .await;
    fixture.run(SyncMode::Incremental).await;

    let tool_issues: Vec<FreshreleaseIssue> = fixture.all();
    let ids: Vec<u64> = tool_issues.iter().map(|i| i.issue_id).collect();
    assert_eq!(ids, vec![10002]);
    assert!(fixture.all::<FreshreleaseIssueComment>().is_empty());
    assert!(fixture.all::<FreshreleaseRemotelink>().is_empty());

    let domain = snapshot(&fixture);
    let ids: Vec<&str> = domain.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["freshrelease:FreshreleaseIssue:1:10002"]);
    assert_eq!(domain.board_issues.len(), 1);
    assert!(domain.assignees.is_empty());
    assert!(domain.labels.is_empty());
    assert!(domain.comments.is_empty());
    assert!(domain.worklogs.is_empty());
    assert!(domain.changelogs.is_empty());
    assert!(domain.sprint_issues.is_empty());
    assert!(domain.commits.is_empty());
    assert!(domain.repo_commits.is_empty());

    // the board and its sprint are still there
    assert_eq!(domain.boards.len(), 1);
    assert_eq!(domain.board_sprints.len(), 1);
}

#[tokio::test]
async fn test_missing_account_does_not_fail_run() {
    let fixture = Fixture::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/user"))
        .and(query_param("accountId", "acc-2"))
        .respond_with(ResponseTemplate::new(404).set_body_string("user gone"))
        .with_priority(1)
        .mount(&fixture.server)
        .await;
    mount_board_state(&fixture.server, &BoardState::default()).await;

    let report = fixture.run(SyncMode::FullRefresh).await;
    assert!(report.stats("collectAccounts").is_some());

    let accounts: Vec<domain::Account> = fixture.all();
    let grace = accounts
        .iter()
        .find(|a| a.id == "freshrelease:FreshreleaseAccount:1:acc-2")
        .unwrap();
    // the name embedded in the issues stays
    assert_eq!(grace.full_name, "Grace");
    assert_eq!(grace.email, "");
}

#[tokio::test]
async fn test_failed_subtask_stops_run() {
    let fixture = Fixture::start().await;
    mount_json(
        &fixture.server,
        "/rest/agile/1.0/board/8",
        json!({ "id": 8, "name": "Shop board" }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/status"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&fixture.server)
        .await;

    let options = TaskOptions::new(1, 8);
    let ctx = SubtaskContext::new(
        options.clone(),
        resolve_scope_config(&fixture.app, &options).unwrap(),
        fixture.client.clone(),
        fixture.store.clone(),
        Cancellation::new(),
    )
    .unwrap();
    let err = TaskRunner::for_context(&ctx)
        .unwrap()
        .run(&ctx)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("collectStatus"), "{message}");
    assert!(message.contains("403"), "{message}");

    // the board fetched before the failure stays
    let boards: Vec<freshrelease_connector::models::FreshreleaseBoard> = fixture.all();
    assert_eq!(boards.len(), 1);
}
