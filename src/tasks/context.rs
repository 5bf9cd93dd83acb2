//! Shared state of one board run
//!
//! Options are validated and regexes compiled when the context is built,
//! so a bad option fails before any request or table is touched.

use crate::config::{AppConfig, ScopeConfig, TaskOptions};
use crate::domain;
use crate::engine::{ApiCollector, ApiExtractor, Cancellation, RawParams, StatefulConverter};
use crate::error::Result;
use crate::http::ApiClient;
use crate::matcher::LinkMatcher;
use crate::models::{self, apiv2, FreshreleaseBoard, FreshreleaseBoardIssue, FreshreleaseIssue};
use crate::store::{Query, Record, SqlField, SqlValue, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Pick the scope config of a run
///
/// An inline config wins, then the option's `scopeConfigId`, then the one
/// attached to the board in the app config. Without any, mappings are empty.
pub fn resolve_scope_config(app: &AppConfig, options: &TaskOptions) -> Result<ScopeConfig> {
    if let Some(config) = &options.scope_config {
        return Ok(config.clone());
    }
    let id = options.scope_config_id.or_else(|| {
        app.board(options.connection_id, options.board_id)
            .and_then(|b| b.scope_config_id)
    });
    match id {
        Some(id) => app.scope_config(id).cloned(),
        None => Ok(ScopeConfig::default()),
    }
}

/// Parent issue of a per-issue collection, stored in the raw `input` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardIssueRef {
    /// Remote issue id
    pub issue_id: u64,
    /// Issue update time at collection
    pub updated: Option<DateTime<Utc>>,
}

/// Everything a subtask needs
pub struct SubtaskContext {
    /// Validated options
    pub options: TaskOptions,
    /// Effective scope config
    pub scope_config: ScopeConfig,
    /// Compiled link patterns of the scope config
    pub matcher: LinkMatcher,
    /// Remote API
    pub client: Arc<dyn ApiClient>,
    /// Database
    pub store: Store,
    /// Stop signal
    pub cancel: Cancellation,
    params: String,
}

impl SubtaskContext {
    /// Validate options and prepare the tables of a run
    pub fn new(
        options: TaskOptions,
        scope_config: ScopeConfig,
        client: Arc<dyn ApiClient>,
        store: Store,
        cancel: Cancellation,
    ) -> Result<Self> {
        options.validate()?;
        let matcher = LinkMatcher::new(&scope_config)?;
        let params = RawParams::new(options.connection_id, options.board_id).to_json()?;

        models::migrate(&store)?;
        domain::migrate(&store)?;

        Ok(Self {
            options,
            scope_config,
            matcher,
            client,
            store,
            cancel,
            params,
        })
    }

    /// Connection of the run
    pub fn connection_id(&self) -> u64 {
        self.options.connection_id
    }

    /// Board of the run
    pub fn board_id(&self) -> u64 {
        self.options.board_id
    }

    /// Stored form of the raw page params
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Page size after defaulting and clamping
    pub fn page_size(&self) -> u32 {
        self.options.effective_page_size()
    }

    /// Collector into a raw table under this run's params
    pub fn collector(&self, table: &'static str) -> ApiCollector<'_> {
        ApiCollector::new(
            self.client.as_ref(),
            &self.store,
            &self.cancel,
            table,
            self.params.clone(),
        )
    }

    /// Extractor over a raw table under this run's params
    pub fn extractor(&self, table: &'static str) -> ApiExtractor<'_> {
        ApiExtractor::new(&self.store, &self.cancel, table, self.params.clone())
    }

    /// Converter keyed by this board, fingerprinted by the mapping rules
    pub fn converter(&self) -> StatefulConverter<'_> {
        StatefulConverter::new(
            &self.store,
            &self.cancel,
            self.connection_id(),
            self.board_id(),
            self.options.sync_mode,
        )
        .with_fingerprint(self.scope_config.fingerprint())
    }

    /// Join clause restricting a tool table to this board's issues
    pub fn board_issue_join(&self, table: &str) -> String {
        format!(
            "JOIN {bi} ON {bi}.connection_id = {table}.connection_id AND {bi}.issue_id = {table}.issue_id",
            bi = FreshreleaseBoardIssue::TABLE
        )
    }

    /// Scan of a tool table restricted to this board's issues
    pub fn board_issue_query(&self, table: &str) -> Query {
        let bi = FreshreleaseBoardIssue::TABLE;
        Query::new()
            .join(self.board_issue_join(table))
            .filter_eq(&format!("{bi}.connection_id"), &self.connection_id())
            .filter_eq(&format!("{bi}.board_id"), &self.board_id())
    }

    /// Issues of this board, in id order
    pub fn board_issues(&self) -> Result<Vec<BoardIssueRef>> {
        let issues = FreshreleaseIssue::TABLE;
        let query = self
            .board_issue_query(issues)
            .order_by(format!("{issues}.issue_id"));
        let id_column = format!("{issues}.issue_id");
        let updated_column = format!("{issues}.updated");
        let sql = query.select_columns_sql(&[id_column.as_str(), updated_column.as_str()], issues);
        self.store
            .query_rows(&sql, query.params(), 2)?
            .into_iter()
            .map(|row| {
                let mut row = row.into_iter();
                Ok(BoardIssueRef {
                    issue_id: SqlField::from_value(row.next().unwrap_or(SqlValue::Null))?,
                    updated: SqlField::from_value(row.next().unwrap_or(SqlValue::Null))?,
                })
            })
            .collect()
    }

    /// Fetch and store the board row when it is missing
    pub async fn prepare(&self) -> Result<()> {
        let query = Query::new()
            .filter_eq("connection_id", &self.connection_id())
            .filter_eq("board_id", &self.board_id());
        if !self.store.query::<FreshreleaseBoard>(&query)?.is_empty() {
            debug!("Board {} already stored", self.board_id());
            return Ok(());
        }

        let response = self
            .client
            .get(&format!("agile/1.0/board/{}", self.board_id()), &[])
            .await?;
        let board: apiv2::Board = response.json()?;
        self.store
            .upsert(&[board.to_tool_layer(self.connection_id())])?;
        info!("Fetched board {} ({})", self.board_id(), board.name);
        Ok(())
    }
}

impl std::fmt::Debug for SubtaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtaskContext")
            .field("options", &self.options)
            .field("params", &self.params)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
