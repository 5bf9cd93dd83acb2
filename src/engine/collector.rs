//! Pagination collector
//!
//! Walks a list endpoint page by page and stores every response body in a
//! raw table before asking for the next one. A crash therefore loses at
//! most the page in flight, and a rerun overwrites pages by key. Pages left
//! over from earlier runs are removed once every walk has finished.

use super::types::{Cancellation, SyncStats};
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::pagination::{NextPage, NoPaginator, PaginationState, Paginator};
use crate::store::{RawPage, Store};
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Digits of the offset in a page id, enough for any u64
const PAGE_OFFSET_WIDTH: usize = 20;

/// Page id of the page at `offset`, prefixed by the walk key if any
///
/// Offsets are zero padded so page ids sort in walk order.
pub fn page_id(key: &str, offset: u64) -> String {
    if key.is_empty() {
        format!("{offset:0width$}", width = PAGE_OFFSET_WIDTH)
    } else {
        format!("{key}:{offset:0width$}", width = PAGE_OFFSET_WIDTH)
    }
}

/// Where the items of a response body live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsAt {
    /// The body is an array of items
    Root,
    /// The body is an object with the items under this field
    Field(&'static str),
    /// The body is a single item
    Object,
}

impl RecordsAt {
    /// Number of items in a body
    pub fn count(self, body: &Value) -> usize {
        match self {
            Self::Root => body.as_array().map_or(0, Vec::len),
            Self::Field(name) => body
                .get(name)
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
            Self::Object => usize::from(body.is_object()),
        }
    }
}

/// One walk of a per-parent collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectInput {
    /// Prefix of the page ids of this walk
    pub key: String,
    /// Endpoint path
    pub path: String,
    /// Query parameters of this walk only
    pub query: Vec<(String, String)>,
    /// Parent row, as JSON, stored with every page
    pub input: String,
}

/// Collects one endpoint into one raw table
pub struct ApiCollector<'a> {
    client: &'a dyn ApiClient,
    store: &'a Store,
    cancel: &'a Cancellation,
    table: &'static str,
    params: String,
    query: Vec<(String, String)>,
    records_at: RecordsAt,
    paginator: Box<dyn Paginator + 'a>,
    start_offset: u64,
    skip_not_found: bool,
}

impl<'a> ApiCollector<'a> {
    /// Create a collector writing to `table` under `params`
    pub fn new(
        client: &'a dyn ApiClient,
        store: &'a Store,
        cancel: &'a Cancellation,
        table: &'static str,
        params: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            cancel,
            table,
            params: params.into(),
            query: Vec::new(),
            records_at: RecordsAt::Root,
            paginator: Box::new(NoPaginator),
            start_offset: 0,
            skip_not_found: false,
        }
    }

    /// Add a fixed query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a query parameter when the value is non-empty
    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<&str>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Set where items live in the body
    #[must_use]
    pub fn records_at(mut self, records_at: RecordsAt) -> Self {
        self.records_at = records_at;
        self
    }

    /// Set the pagination strategy
    #[must_use]
    pub fn paginator(mut self, paginator: impl Paginator + 'a) -> Self {
        self.paginator = Box::new(paginator);
        self
    }

    /// Start every walk at `offset` instead of 0
    ///
    /// Pages below the offset are assumed to be stored already, so an
    /// offset walk keeps the pages of earlier runs.
    #[must_use]
    pub fn start_at(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Log and skip walks whose endpoint answers 404
    #[must_use]
    pub fn skip_not_found(mut self) -> Self {
        self.skip_not_found = true;
        self
    }

    /// Collect a single endpoint
    ///
    /// Once the walk is done, pages stored by earlier runs under the same
    /// params are removed, so the raw table mirrors exactly this walk.
    pub async fn collect(&self, path: &str) -> Result<SyncStats> {
        self.collect_each(vec![CollectInput {
            key: String::new(),
            path: path.to_string(),
            query: Vec::new(),
            input: String::new(),
        }])
        .await
    }

    /// Collect one walk per parent row
    ///
    /// A failed walk leaves every stored page in place, those of earlier
    /// runs included.
    pub async fn collect_each(&self, inputs: Vec<CollectInput>) -> Result<SyncStats> {
        let start = Instant::now();
        let started_at = Utc::now();
        self.store.ensure_raw_table(self.table)?;

        let mut stats = SyncStats::new();
        for input in &inputs {
            self.cancel.check()?;
            match self.walk(input, &mut stats).await {
                Err(e) if self.skip_not_found && e.is_not_found() => {
                    warn!("Skipping {}: {e}", input.path);
                }
                other => other?,
            }
        }

        if self.start_offset == 0 {
            let removed = self
                .store
                .delete_stale_raw_pages(self.table, &self.params, started_at)?;
            debug!("Removed {removed} stale raw pages from {}", self.table);
        }

        stats.set_duration(start.elapsed().as_millis() as u64);
        Ok(stats)
    }

    async fn walk(&self, input: &CollectInput, stats: &mut SyncStats) -> Result<()> {
        let mut state = PaginationState::with_offset(self.start_offset);
        let mut page_params = self.paginator.initial_params(&state);

        loop {
            self.cancel.check()?;

            let mut query = self.query.clone();
            query.extend(input.query.iter().cloned());
            query.extend(page_params.iter().cloned());

            let response = self.client.get(&input.path, &query).await?;
            let body: Value = response.json()?;
            let count = self.records_at.count(&body);

            self.store.save_raw_page(
                self.table,
                &RawPage {
                    params: self.params.clone(),
                    page_id: page_id(&input.key, state.offset),
                    input: input.input.clone(),
                    url: response.url.clone(),
                    data: response.body,
                    created_at: Some(Utc::now()),
                },
            )?;
            stats.add_page();
            stats.add_input(count);
            debug!(
                "Collected {count} records from {} (offset {})",
                response.url, state.offset
            );

            match self.paginator.process_response(&body, count, &mut state) {
                NextPage::Continue { query_params } => page_params = query_params,
                NextPage::Done => break,
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ApiCollector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCollector")
            .field("table", &self.table)
            .field("params", &self.params)
            .field("records_at", &self.records_at)
            .field("start_offset", &self.start_offset)
            .finish_non_exhaustive()
    }
}

/// Serialize a parent row for the `input` column
pub fn input_json(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::decode(format!("bad collect input: {e}")))
}
