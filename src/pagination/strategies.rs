//! Pagination strategy implementations

use super::types::{NextPage, PaginationState, Paginator, QueryParams, StopCondition};
use serde_json::Value;

// ============================================================================
// startAt / maxResults Pagination
// ============================================================================

/// Offset pagination driven by the server's `startAt`/`maxResults` echo
///
/// The next offset is the echoed `startAt` plus the echoed `maxResults`, so a
/// server that shrinks the page size is still walked without gaps. The walk
/// ends on `isLast`; responses without it fall back to `total`, and
/// responses without either end on an empty page.
#[derive(Debug, Clone)]
pub struct StartAtPaginator {
    /// Query parameter name for the offset
    pub offset_param: String,
    /// Query parameter name for the page size
    pub limit_param: String,
    /// Requested page size
    pub page_size: u32,
    /// Stop conditions, first one present in the body wins
    pub stop_conditions: Vec<StopCondition>,
}

impl StartAtPaginator {
    /// Create a paginator requesting `page_size` items per page
    pub fn new(page_size: u32) -> Self {
        Self {
            offset_param: "startAt".to_string(),
            limit_param: "maxResults".to_string(),
            page_size: page_size.max(1),
            stop_conditions: vec![
                StopCondition::IsLast("isLast".to_string()),
                StopCondition::TotalCount("total".to_string()),
                StopCondition::EmptyPage,
            ],
        }
    }

    fn params(&self, offset: u64) -> QueryParams {
        vec![
            (self.offset_param.clone(), offset.to_string()),
            (self.limit_param.clone(), self.page_size.to_string()),
        ]
    }

    fn echoed(body: &Value, field: &str) -> Option<u64> {
        body.get(field).and_then(Value::as_u64)
    }

    fn finish(state: &mut PaginationState) -> NextPage {
        state.done = true;
        NextPage::Done
    }
}

impl Paginator for StartAtPaginator {
    fn initial_params(&self, state: &PaginationState) -> QueryParams {
        self.params(state.offset)
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.total_fetched += records_count as u64;

        let start_at = Self::echoed(body, &self.offset_param).unwrap_or(state.offset);
        let stop = self
            .stop_conditions
            .iter()
            .find_map(|c| c.should_stop(body, start_at, records_count))
            .unwrap_or(true);
        if stop {
            return Self::finish(state);
        }

        let max_results = Self::echoed(body, &self.limit_param)
            .filter(|n| *n > 0)
            .unwrap_or(u64::from(self.page_size));
        // the echo must move forward
        let next = match start_at.checked_add(max_results) {
            Some(next) if next > state.offset => next,
            _ => return Self::finish(state),
        };

        state.page += 1;
        state.offset = next;
        NextPage::Continue {
            query_params: self.params(next),
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// Single request, for endpoints that return a plain array or object
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial_params(&self, _state: &PaginationState) -> QueryParams {
        Vec::new()
    }

    fn process_response(
        &self,
        _body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.total_fetched += records_count as u64;
        state.done = true;
        NextPage::Done
    }
}
