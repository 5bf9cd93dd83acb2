//! Payload shapes of the remote REST API
//!
//! Every field is optional on the wire; missing values fall back to zero or
//! empty. Ids arrive as strings or numbers depending on the endpoint, and
//! timestamps carry numeric offsets such as `+0800`.

use super::tables::{
    FreshreleaseAccount, FreshreleaseBoard, FreshreleaseBoardIssue, FreshreleaseIssue,
    FreshreleaseIssueChangelogItems, FreshreleaseIssueChangelogs, FreshreleaseIssueComment,
    FreshreleaseIssueLabel, FreshreleaseIssueRelationship, FreshreleaseIssueType,
    FreshreleaseRemotelink, FreshreleaseSprint, FreshreleaseSprintIssue, FreshreleaseStatus,
    FreshreleaseWorklog,
};
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

// ============================================================================
// Field helpers
// ============================================================================

/// Parse a remote timestamp
///
/// RFC 3339 is tried first, then the compact offset form the API emits
/// (`2020-05-29T11:00:00.000+0800`).
pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn iso8601<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => parse_iso8601(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
    }
}

fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(0),
        JsonValue::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id {n}"))),
        JsonValue::String(s) if s.is_empty() => Ok(0),
        JsonValue::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{s}'"))),
        other => Err(serde::de::Error::custom(format!("invalid id {other}"))),
    }
}

fn flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(String::new()),
        JsonValue::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Explicit `null` decodes like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn seconds_to_minutes(seconds: Option<i64>) -> Option<i64> {
    seconds.map(|s| s / 60)
}

// ============================================================================
// Pages
// ============================================================================

/// A list page with the pagination echo
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Offset of the first item
    #[serde(default, deserialize_with = "nullable")]
    pub start_at: u64,
    /// Page size the server applied
    #[serde(default, deserialize_with = "nullable")]
    pub max_results: u64,
    /// Total item count, when reported
    #[serde(default)]
    pub total: Option<u64>,
    /// Whether this is the final page, when reported
    #[serde(default)]
    pub is_last: Option<bool>,
    /// Items of endpoints that use `values`
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// Items of the board issue endpoint
    #[serde(default = "Vec::new")]
    pub issues: Vec<T>,
    /// Items of the comment endpoint
    #[serde(default = "Vec::new")]
    pub comments: Vec<T>,
    /// Items of the worklog endpoint
    #[serde(default = "Vec::new")]
    pub worklogs: Vec<T>,
}

impl<T> Page<T> {
    /// Items, whichever key the endpoint used
    pub fn into_items(self) -> Vec<T> {
        [self.values, self.issues, self.comments, self.worklogs]
            .into_iter()
            .flatten()
            .collect()
    }
}

// ============================================================================
// Account
// ============================================================================

/// An embedded or standalone user
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, deserialize_with = "nullable")]
    pub account_id: String,
    /// Server editions identify users by name
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub account_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email_address: String,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_urls: AvatarUrls,
    #[serde(default, deserialize_with = "nullable")]
    pub time_zone: String,
    #[serde(default, deserialize_with = "nullable")]
    pub active: bool,
}

/// Avatar URLs by size
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarUrls {
    #[serde(default, rename = "48x48", deserialize_with = "nullable")]
    pub large: String,
}

impl Account {
    /// Remote id, falling back to the user name
    pub fn id(&self) -> &str {
        if self.account_id.is_empty() {
            &self.name
        } else {
            &self.account_id
        }
    }

    /// Tool row, or `None` for an anonymous user
    pub fn to_tool_layer(&self, connection_id: u64) -> Option<FreshreleaseAccount> {
        let id = self.id();
        if id.is_empty() {
            return None;
        }
        Some(FreshreleaseAccount {
            connection_id,
            account_id: id.to_string(),
            account_type: self.account_type.clone(),
            name: self.display_name.clone(),
            email: self.email_address.clone(),
            avatar_url: self.avatar_urls.large.clone(),
            timezone: self.time_zone.clone(),
        })
    }
}

// ============================================================================
// Board
// ============================================================================

/// A board
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Board {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub board_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: BoardLocation,
}

/// Project a board is attached to
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardLocation {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub project_id: u64,
}

impl Board {
    /// Tool row
    pub fn to_tool_layer(&self, connection_id: u64) -> FreshreleaseBoard {
        FreshreleaseBoard {
            connection_id,
            board_id: self.id,
            project_id: self.location.project_id,
            name: self.name.clone(),
            self_url: self.self_url.clone(),
            board_type: self.board_type.clone(),
        }
    }
}

// ============================================================================
// Issue
// ============================================================================

/// An issue as returned by the board issue endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub fields: IssueFields,
}

/// Named issue fields; custom fields land in `custom`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFields {
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub issuetype: IssueTypeRef,
    #[serde(default, deserialize_with = "nullable")]
    pub status: StatusRef,
    #[serde(default, deserialize_with = "nullable")]
    pub project: ProjectRef,
    #[serde(default)]
    pub priority: Option<PriorityRef>,
    #[serde(default)]
    pub creator: Option<Account>,
    #[serde(default)]
    pub reporter: Option<Account>,
    #[serde(default)]
    pub assignee: Option<Account>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub epic: Option<KeyRef>,
    #[serde(default)]
    pub sprint: Option<Sprint>,
    #[serde(default, deserialize_with = "nullable")]
    pub closed_sprints: Vec<Sprint>,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub components: Vec<NameRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub issuelinks: Vec<IssueLink>,
    #[serde(default, deserialize_with = "iso8601")]
    pub resolutiondate: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timeoriginalestimate: Option<i64>,
    #[serde(default)]
    pub aggregatetimeoriginalestimate: Option<i64>,
    #[serde(default)]
    pub timeestimate: Option<i64>,
    #[serde(default)]
    pub timespent: Option<i64>,
    #[serde(default)]
    pub comment: Option<Counter>,
    #[serde(default)]
    pub worklog: Option<Counter>,
    #[serde(flatten)]
    pub custom: JsonObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTypeRef {
    #[serde(default, deserialize_with = "flexible_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subtask: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub icon_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRef {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status_category: KeyRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectRef {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriorityRef {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyRef {
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRef {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Counter {
    #[serde(default, deserialize_with = "nullable")]
    pub total: i64,
}

/// The parent of a subtask, or the epic of a story
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentRef {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub fields: ParentFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentFields {
    #[serde(default, deserialize_with = "nullable")]
    pub issuetype: IssueTypeRef,
}

/// A directed link between two issues
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub link_type: LinkType,
    #[serde(default)]
    pub inward_issue: Option<LinkedIssue>,
    #[serde(default)]
    pub outward_issue: Option<LinkedIssue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkType {
    #[serde(default, deserialize_with = "flexible_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub inward: String,
    #[serde(default, deserialize_with = "nullable")]
    pub outward: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkedIssue {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub key: String,
}

/// Every tool row one issue payload produces
#[derive(Debug, Clone, Default)]
pub struct IssueRows {
    pub issue: FreshreleaseIssue,
    pub accounts: Vec<FreshreleaseAccount>,
    pub labels: Vec<FreshreleaseIssueLabel>,
    pub board_issue: FreshreleaseBoardIssue,
    pub sprint_issues: Vec<FreshreleaseSprintIssue>,
    pub sprints: Vec<FreshreleaseSprint>,
    pub relationships: Vec<FreshreleaseIssueRelationship>,
}

impl Issue {
    /// Project the payload into tool rows
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        board_id: u64,
        story_point_field: &str,
    ) -> IssueRows {
        let f = &self.fields;
        let mut issue = FreshreleaseIssue {
            connection_id,
            issue_id: self.id,
            project_id: f.project.id,
            project_name: f.project.name.clone(),
            self_url: self.self_url.clone(),
            icon_url: f.issuetype.icon_url.clone(),
            issue_key: self.key.clone(),
            summary: f.summary.clone(),
            description: f.description.clone(),
            issue_type: f.issuetype.name.clone(),
            type_id: f.issuetype.id.clone(),
            status_name: f.status.name.clone(),
            status_key: f.status.status_category.key.clone(),
            story_point: story_point(&f.custom, story_point_field),
            original_estimate_minutes: seconds_to_minutes(f.timeoriginalestimate),
            aggregate_estimate_minutes: seconds_to_minutes(f.aggregatetimeoriginalestimate),
            remaining_estimate_minutes: seconds_to_minutes(f.timeestimate),
            spent_minutes: seconds_to_minutes(f.timespent),
            components: f
                .components
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            subtask: f.issuetype.subtask,
            resolution_date: f.resolutiondate,
            created: f.created,
            updated: f.updated,
            comment_total: f.comment.as_ref().map_or(0, |c| c.total),
            worklog_total: f.worklog.as_ref().map_or(0, |c| c.total),
            ..FreshreleaseIssue::default()
        };

        if let (Some(created), Some(resolved)) = (f.created, f.resolutiondate) {
            issue.lead_time_minutes = Some((resolved - created).num_minutes().max(0));
        }
        if let Some(priority) = &f.priority {
            issue.priority_id = priority.id;
            issue.priority_name = priority.name.clone();
        }
        if let Some(parent) = &f.parent {
            issue.parent_id = parent.id;
            issue.parent_key = parent.key.clone();
            if parent.fields.issuetype.name == "Epic" {
                issue.epic_key = parent.key.clone();
            }
        }
        if let Some(epic) = &f.epic {
            if !epic.key.is_empty() {
                issue.epic_key = epic.key.clone();
            }
        }
        if let Some(sprint) = &f.sprint {
            issue.sprint_id = sprint.id;
            issue.sprint_name = sprint.name.clone();
        }

        let mut accounts = Vec::new();
        if let Some(creator) = &f.creator {
            issue.creator_account_id = creator.id().to_string();
            issue.creator_display_name = creator.display_name.clone();
            accounts.extend(creator.to_tool_layer(connection_id));
        }
        if let Some(assignee) = &f.assignee {
            issue.assignee_account_id = assignee.id().to_string();
            issue.assignee_display_name = assignee.display_name.clone();
            accounts.extend(assignee.to_tool_layer(connection_id));
        }
        if let Some(reporter) = &f.reporter {
            accounts.extend(reporter.to_tool_layer(connection_id));
        }

        let labels = f
            .labels
            .iter()
            .map(|label| FreshreleaseIssueLabel {
                connection_id,
                issue_id: self.id,
                label_name: label.clone(),
            })
            .collect();

        let sprints: Vec<FreshreleaseSprint> = f
            .sprint
            .iter()
            .chain(&f.closed_sprints)
            .map(|s| s.to_tool_layer(connection_id))
            .collect();
        let sprint_issues = sprints
            .iter()
            .map(|s| FreshreleaseSprintIssue {
                connection_id,
                sprint_id: s.sprint_id,
                issue_id: self.id,
            })
            .collect();

        let relationships = f
            .issuelinks
            .iter()
            .map(|link| {
                let inward = link.inward_issue.clone().unwrap_or_default();
                let outward = link.outward_issue.clone().unwrap_or_default();
                FreshreleaseIssueRelationship {
                    connection_id,
                    issue_id: self.id,
                    issue_link_id: link.id,
                    issue_link_type_id: link.link_type.id.clone(),
                    issue_link_type_name: link.link_type.name.clone(),
                    inward: link.link_type.inward.clone(),
                    outward: link.link_type.outward.clone(),
                    inward_issue_id: inward.id,
                    inward_issue_key: inward.key,
                    outward_issue_id: outward.id,
                    outward_issue_key: outward.key,
                }
            })
            .collect();

        IssueRows {
            issue,
            accounts,
            labels,
            board_issue: FreshreleaseBoardIssue {
                connection_id,
                board_id,
                issue_id: self.id,
            },
            sprint_issues,
            sprints,
            relationships,
        }
    }
}

fn story_point(custom: &JsonObject, field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    match custom.get(field)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Sprint
// ============================================================================

/// A sprint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "iso8601")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub complete_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_u64")]
    pub origin_board_id: u64,
}

impl Sprint {
    /// Tool row
    pub fn to_tool_layer(&self, connection_id: u64) -> FreshreleaseSprint {
        FreshreleaseSprint {
            connection_id,
            sprint_id: self.id,
            self_url: self.self_url.clone(),
            state: self.state.clone(),
            name: self.name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            complete_date: self.complete_date,
            origin_board_id: self.origin_board_id,
        }
    }
}

// ============================================================================
// Comment, Worklog, Changelog
// ============================================================================

/// A comment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub body: String,
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default)]
    pub update_author: Option<Account>,
    #[serde(default, deserialize_with = "iso8601")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub updated: Option<DateTime<Utc>>,
}

impl Comment {
    /// Tool row plus the accounts embedded in it
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        issue_id: u64,
        issue_updated: Option<DateTime<Utc>>,
    ) -> (FreshreleaseIssueComment, Vec<FreshreleaseAccount>) {
        let author = self.author.clone().unwrap_or_default();
        let comment = FreshreleaseIssueComment {
            connection_id,
            issue_id,
            comment_id: self.id,
            self_url: self.self_url.clone(),
            body: self.body.clone(),
            creator_account_id: author.id().to_string(),
            creator_display_name: author.display_name.clone(),
            created: self.created,
            updated: self.updated,
            issue_updated,
        };
        let accounts = [&self.author, &self.update_author]
            .into_iter()
            .flatten()
            .filter_map(|a| a.to_tool_layer(connection_id))
            .collect();
        (comment, accounts)
    }
}

/// A worklog
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worklog {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default)]
    pub update_author: Option<Account>,
    #[serde(default, deserialize_with = "nullable")]
    pub time_spent: String,
    #[serde(default, deserialize_with = "nullable")]
    pub time_spent_seconds: i64,
    #[serde(default, deserialize_with = "iso8601")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601")]
    pub updated: Option<DateTime<Utc>>,
}

impl Worklog {
    /// Tool row plus the accounts embedded in it
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        issue_id: u64,
        issue_updated: Option<DateTime<Utc>>,
    ) -> (FreshreleaseWorklog, Vec<FreshreleaseAccount>) {
        let worklog = FreshreleaseWorklog {
            connection_id,
            issue_id,
            worklog_id: self.id,
            author_id: self
                .author
                .as_ref()
                .map(|a| a.id().to_string())
                .unwrap_or_default(),
            update_author_id: self
                .update_author
                .as_ref()
                .map(|a| a.id().to_string())
                .unwrap_or_default(),
            time_spent: self.time_spent.clone(),
            time_spent_seconds: self.time_spent_seconds,
            started: self.started,
            updated: self.updated,
            issue_updated,
        };
        let accounts = [&self.author, &self.update_author]
            .into_iter()
            .flatten()
            .filter_map(|a| a.to_tool_layer(connection_id))
            .collect();
        (worklog, accounts)
    }
}

/// A changelog entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default)]
    pub author: Option<Account>,
    #[serde(default, deserialize_with = "iso8601")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<ChangelogItem>,
}

/// One field change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogItem {
    #[serde(default, deserialize_with = "nullable")]
    pub field: String,
    #[serde(default, deserialize_with = "nullable")]
    pub fieldtype: String,
    #[serde(default, rename = "from", deserialize_with = "flexible_string")]
    pub from_value: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub from_string: String,
    #[serde(default, rename = "to", deserialize_with = "flexible_string")]
    pub to_value: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub to_string: String,
}

impl Changelog {
    /// Tool row plus the author account
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        issue_id: u64,
        issue_updated: Option<DateTime<Utc>>,
    ) -> (FreshreleaseIssueChangelogs, Option<FreshreleaseAccount>) {
        let author = self.author.clone().unwrap_or_default();
        let changelog = FreshreleaseIssueChangelogs {
            connection_id,
            changelog_id: self.id,
            issue_id,
            author_account_id: author.id().to_string(),
            author_display_name: author.display_name.clone(),
            author_active: author.active,
            created: self.created,
            issue_updated,
        };
        (changelog, author.to_tool_layer(connection_id))
    }
}

impl ChangelogItem {
    /// Tool row
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        changelog_id: u64,
    ) -> FreshreleaseIssueChangelogItems {
        FreshreleaseIssueChangelogItems {
            connection_id,
            changelog_id,
            field: self.field.clone(),
            field_type: self.fieldtype.clone(),
            from_value: self.from_value.clone(),
            from_string: self.from_string.clone(),
            to_value: self.to_value.clone(),
            to_string: self.to_string.clone(),
        }
    }

    /// Account stubs for assignee changes, carrying only the id
    pub fn extract_users(&self, connection_id: u64) -> Vec<FreshreleaseAccount> {
        if self.field != "assignee" {
            return Vec::new();
        }
        [&self.from_value, &self.to_value]
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(|id| FreshreleaseAccount {
                connection_id,
                account_id: id.clone(),
                ..FreshreleaseAccount::default()
            })
            .collect()
    }
}

// ============================================================================
// Remote link, issue type, status
// ============================================================================

/// A remote link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteLink {
    #[serde(default, deserialize_with = "flexible_u64")]
    pub id: u64,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub object: RemoteLinkObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteLinkObject {
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
}

impl RemoteLink {
    /// Tool row, keeping the payload it came from
    pub fn to_tool_layer(
        &self,
        connection_id: u64,
        issue_id: u64,
        raw_json: String,
        issue_updated: Option<DateTime<Utc>>,
    ) -> FreshreleaseRemotelink {
        FreshreleaseRemotelink {
            connection_id,
            remotelink_id: self.id,
            issue_id,
            self_url: self.self_url.clone(),
            title: self.object.title.clone(),
            url: self.object.url.clone(),
            raw_json,
            issue_updated,
        }
    }
}

/// An issue type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    #[serde(default, deserialize_with = "flexible_string")]
    pub id: String,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub icon_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subtask: bool,
}

impl IssueType {
    /// Tool row
    pub fn to_tool_layer(&self, connection_id: u64) -> FreshreleaseIssueType {
        FreshreleaseIssueType {
            connection_id,
            type_id: self.id.clone(),
            self_url: self.self_url.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon_url: self.icon_url.clone(),
            subtask: self.subtask,
        }
    }
}

/// A workflow status
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default, deserialize_with = "flexible_string")]
    pub id: String,
    #[serde(default, rename = "self", deserialize_with = "nullable")]
    pub self_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status_category: KeyRef,
}

impl Status {
    /// Tool row
    pub fn to_tool_layer(&self, connection_id: u64) -> FreshreleaseStatus {
        FreshreleaseStatus {
            connection_id,
            status_id: self.id.clone(),
            self_url: self.self_url.clone(),
            name: self.name.clone(),
            status_category: self.status_category.key.clone(),
        }
    }
}
