//! Tests for the payload shapes

use super::apiv2::{parse_iso8601, Changelog, ChangelogItem, Comment, Issue, Page, RemoteLink};
use super::*;
use crate::store::Record;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

fn issue_payload() -> serde_json::Value {
    json!({
        "id": "10042",
        "self": "https://acme.freshrelease.com/rest/agile/1.0/issue/10042",
        "key": "FR-42",
        "fields": {
            "summary": "Crash on save",
            "description": null,
            "issuetype": {"id": "10004", "name": "Bug", "subtask": false, "iconUrl": "https://x/bug.png"},
            "status": {"name": "In Progress", "statusCategory": {"key": "indeterminate"}},
            "project": {"id": "10000", "name": "Falcon"},
            "priority": {"id": "3", "name": "Medium"},
            "creator": {"accountId": "acc-1", "displayName": "Ada", "emailAddress": "ada@x.test"},
            "reporter": {"accountId": "acc-1", "displayName": "Ada"},
            "assignee": {"accountId": "acc-2", "displayName": "Grace"},
            "parent": {"id": "10001", "key": "FR-1", "fields": {"issuetype": {"name": "Epic"}}},
            "sprint": {"id": 5, "name": "Sprint 5", "state": "active"},
            "closedSprints": [{"id": 4, "name": "Sprint 4", "state": "closed"}],
            "labels": ["backend", "crash"],
            "components": [{"name": "api"}, {"name": "ui"}],
            "issuelinks": [{
                "id": "900",
                "type": {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                "outwardIssue": {"id": "10050", "key": "FR-50"}
            }],
            "created": "2020-05-29T11:00:00.000+0800",
            "updated": "2020-06-01T09:30:00.000+0800",
            "resolutiondate": "2020-05-29T13:00:00.000+0800",
            "timeoriginalestimate": 7200,
            "timespent": 3600,
            "comment": {"total": 2},
            "customfield_10024": 5.0
        }
    })
}

#[test]
fn test_parse_iso8601_variants() {
    let expected = Utc.with_ymd_and_hms(2020, 5, 29, 3, 0, 0).unwrap();
    assert_eq!(parse_iso8601("2020-05-29T11:00:00.000+0800"), Some(expected));
    assert_eq!(parse_iso8601("2020-05-29T11:00:00+08:00"), Some(expected));
    assert_eq!(parse_iso8601("2020-05-29T03:00:00Z"), Some(expected));
    assert_eq!(parse_iso8601("yesterday"), None);
}

#[test]
fn test_issue_projection() {
    let issue: Issue = serde_json::from_value(issue_payload()).unwrap();
    let rows = issue.to_tool_layer(1, 8, "customfield_10024");
    let i = &rows.issue;

    assert_eq!(i.issue_id, 10042);
    assert_eq!(i.issue_key, "FR-42");
    assert_eq!(i.issue_type, "Bug");
    assert_eq!(i.status_name, "In Progress");
    assert_eq!(i.description, "");
    assert_eq!(i.project_id, 10000);
    assert_eq!(i.story_point, Some(5.0));
    assert_eq!(i.original_estimate_minutes, Some(120));
    assert_eq!(i.spent_minutes, Some(60));
    assert_eq!(i.lead_time_minutes, Some(120));
    assert_eq!(i.epic_key, "FR-1");
    assert_eq!(i.parent_id, 10001);
    assert_eq!(i.sprint_id, 5);
    assert_eq!(i.components, "api,ui");
    assert_eq!(i.creator_account_id, "acc-1");
    assert_eq!(i.assignee_display_name, "Grace");
    assert_eq!(i.comment_total, 2);

    assert_eq!(rows.accounts.len(), 3);
    assert_eq!(rows.labels.len(), 2);
    assert_eq!(rows.board_issue.board_id, 8);
    let sprint_ids: Vec<u64> = rows.sprint_issues.iter().map(|s| s.sprint_id).collect();
    assert_eq!(sprint_ids, vec![5, 4]);
    assert_eq!(rows.relationships.len(), 1);
    assert_eq!(rows.relationships[0].outward_issue_key, "FR-50");
    assert_eq!(rows.relationships[0].inward_issue_id, 0);
}

#[test]
fn test_issue_with_missing_fields() {
    let issue: Issue = serde_json::from_value(json!({"id": 7, "fields": {}})).unwrap();
    let rows = issue.to_tool_layer(1, 8, "customfield_10024");
    assert_eq!(rows.issue.issue_id, 7);
    assert_eq!(rows.issue.story_point, None);
    assert_eq!(rows.issue.lead_time_minutes, None);
    assert!(rows.accounts.is_empty());
    assert!(rows.sprint_issues.is_empty());
}

#[test]
fn test_null_fields_decode_as_empty() {
    let mut payload = issue_payload();
    payload["fields"]["summary"] = json!(null);
    payload["fields"]["labels"] = json!(null);
    payload["fields"]["creator"]["emailAddress"] = json!(null);
    payload["fields"]["creator"]["timeZone"] = json!(null);
    payload["fields"]["status"]["name"] = json!(null);

    let issue: Issue = serde_json::from_value(payload).unwrap();
    let rows = issue.to_tool_layer(1, 8, "customfield_10024");
    assert_eq!(rows.issue.summary, "");
    assert_eq!(rows.issue.status_name, "");
    assert!(rows.labels.is_empty());

    let creator = rows
        .accounts
        .iter()
        .find(|a| a.account_id == "acc-1")
        .unwrap();
    assert_eq!(creator.email, "");
    assert_eq!(creator.timezone, "");
}

#[test]
fn test_standalone_account_with_null_email() {
    let account: apiv2::Account = serde_json::from_value(json!({
        "accountId": "acc-7",
        "accountType": null,
        "displayName": "Hidden",
        "emailAddress": null,
        "avatarUrls": null,
        "active": null
    }))
    .unwrap();
    let row = account.to_tool_layer(1).unwrap();
    assert_eq!(row.name, "Hidden");
    assert_eq!(row.email, "");
    assert_eq!(row.avatar_url, "");
}

#[test]
fn test_story_point_as_string() {
    let mut payload = issue_payload();
    payload["fields"]["customfield_10024"] = json!("3");
    let issue: Issue = serde_json::from_value(payload).unwrap();
    assert_eq!(issue.to_tool_layer(1, 8, "customfield_10024").issue.story_point, Some(3.0));
    assert_eq!(issue.to_tool_layer(1, 8, "").issue.story_point, None);
}

#[test]
fn test_bad_timestamp_is_a_decode_error() {
    let result: std::result::Result<Issue, serde_json::Error> =
        serde_json::from_value(json!({"id": 7, "fields": {"created": "not a date"}}));
    assert!(result.is_err());
}

#[test]
fn test_page_items_by_key() {
    let page: Page<Comment> = serde_json::from_value(json!({
        "startAt": 0, "maxResults": 50, "total": 1,
        "comments": [{"id": "11", "body": "hi", "author": {"accountId": "acc-9"}}]
    }))
    .unwrap();
    assert_eq!(page.total, Some(1));
    assert_eq!(page.is_last, None);
    let comments = page.into_items();
    let (row, accounts) = comments[0].to_tool_layer(1, 10042, None);
    assert_eq!(row.comment_id, 11);
    assert_eq!(row.creator_account_id, "acc-9");
    assert_eq!(accounts.len(), 1);
}

#[test]
fn test_changelog_assignee_stubs() {
    let changelog: Changelog = serde_json::from_value(json!({
        "id": "300",
        "author": {"accountId": "acc-1", "displayName": "Ada", "active": true},
        "created": "2020-06-01T09:30:00.000+0800",
        "items": [
            {"field": "assignee", "fieldtype": "jira", "from": "acc-2", "to": "acc-3",
             "fromString": "Grace", "toString": "Linus"},
            {"field": "status", "from": "1", "to": null, "fromString": "Open", "toString": "Done"}
        ]
    }))
    .unwrap();

    let (row, author) = changelog.to_tool_layer(1, 10042, None);
    assert_eq!(row.changelog_id, 300);
    assert!(row.author_active);
    assert_eq!(author.unwrap().name, "Ada");

    let stubs = changelog.items[0].extract_users(1);
    let ids: Vec<&str> = stubs.iter().map(|a| a.account_id.as_str()).collect();
    assert_eq!(ids, vec!["acc-2", "acc-3"]);
    assert_eq!(stubs[0].name, "");
    assert!(changelog.items[1].extract_users(1).is_empty());
    assert_eq!(changelog.items[1].to_tool_layer(1, 300).to_value, "");
}

#[test]
fn test_assignee_stub_skips_empty_side() {
    let item = ChangelogItem {
        field: "assignee".to_string(),
        to_value: "acc-3".to_string(),
        ..ChangelogItem::default()
    };
    assert_eq!(item.extract_users(1).len(), 1);
}

#[test]
fn test_remote_link_projection() {
    let link: RemoteLink = serde_json::from_value(json!({
        "id": 10000,
        "self": "https://x/rest/api/2/issue/FR-42/remotelink/10000",
        "object": {"url": "https://github.com/acme/widgets/commit/abc", "title": "commit"}
    }))
    .unwrap();
    let row = link.to_tool_layer(1, 10042, "{}".to_string(), None);
    assert_eq!(row.remotelink_id, 10000);
    assert_eq!(row.url, "https://github.com/acme/widgets/commit/abc");
}

#[test]
fn test_migrate_creates_tables() {
    let store = Store::open_in_memory().unwrap();
    migrate(&store).unwrap();
    assert_eq!(store.count(FreshreleaseIssue::TABLE).unwrap(), 0);
    assert_eq!(store.count(FreshreleaseAccount::TABLE).unwrap(), 0);
}
