//! Pagination types and traits

use serde_json::Value;

/// Query parameters in the order they are sent
pub type QueryParams = Vec<(String, String)>;

/// Whether another page follows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch again with these paging parameters
    Continue {
        /// Replaces the paging parameters of the previous request
        query_params: QueryParams,
    },
    /// The walk is over
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }
}

/// Signals that end an offset walk, checked in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCondition {
    /// Boolean field set by the server on the final page
    IsLast(String),
    /// Stop once `offset + records >= total`
    TotalCount(String),
    /// Stop when a page has no records
    EmptyPage,
}

impl StopCondition {
    /// Whether the walk stops after this page
    ///
    /// `None` when the body does not carry the signal, so the next
    /// condition in line decides.
    pub fn should_stop(&self, body: &Value, offset: u64, records_count: usize) -> Option<bool> {
        match self {
            Self::IsLast(field) => body.get(field)?.as_bool(),
            Self::TotalCount(field) => {
                let total = body.get(field)?.as_u64()?;
                Some(offset.saturating_add(records_count as u64) >= total)
            }
            Self::EmptyPage => Some(records_count == 0),
        }
    }
}

/// Position of a walk
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Pages processed so far
    pub page: u32,
    /// Offset of the next request
    pub offset: u64,
    /// Records seen so far
    pub total_fetched: u64,
    /// Set once a stop signal was seen
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a walk somewhere other than offset 0
    pub fn with_offset(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }
}

/// A way of walking a list endpoint
pub trait Paginator: Send + Sync {
    /// Paging parameters of the first request
    fn initial_params(&self, state: &PaginationState) -> QueryParams;

    /// Record a response and decide on the next request
    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}
