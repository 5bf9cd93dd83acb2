//! Pagination module
//!
//! Supports: startAt/maxResults offset walks and single-page endpoints
//!
//! # Overview
//!
//! A [`Paginator`] hands out the query parameters of the first request and,
//! for every response, decides whether another page follows. Strategies read
//! the pagination echo from the response body; they never fetch anything
//! themselves.

mod strategies;
mod types;

pub use strategies::{NoPaginator, StartAtPaginator};
pub use types::{NextPage, PaginationState, Paginator, QueryParams, StopCondition};
