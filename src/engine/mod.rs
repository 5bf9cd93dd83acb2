//! Execution engine module
//!
//! The three drivers every subtask is built from.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ApiCollector` - walks an endpoint into a raw table
//! - `ApiExtractor` - decodes raw pages into tool rows
//! - `StatefulConverter` - turns tool rows into domain rows behind a cursor
//! - `Cancellation`, `RawParams` and `SyncStats` shared by all three

mod collector;
mod converter;
mod extractor;
mod types;

pub use collector::{input_json, page_id, ApiCollector, CollectInput, RecordsAt};
pub use converter::{StatefulConverter, Transform};
pub use extractor::ApiExtractor;
pub use types::{Cancellation, RawParams, SyncStats};
