//! Tabular store
//!
//! DuckDB holds three layers of tables:
//!
//! - `_raw_freshrelease_api_*` - collected pages, verbatim
//! - `_tool_freshrelease_*` - rows in the remote API's own shape
//! - domain tables (`issues`, `boards`, ...) - rows shared with other tools
//!
//! Records declare their table, columns and natural key through
//! [`table!`]; the store offers overwrite-by-key for raw pages, upsert by
//! natural key, merge-upsert for shared accounts, chunked cursor scans and
//! filtered deletes ([`Purge`]) that land in the same transaction as a write.

mod engine;
mod query;
mod record;

pub use duckdb::types::Value as SqlValue;
pub use engine::{Cursor, RawPage, Store, DEFAULT_CHUNK_SIZE};
pub use query::{Purge, Query};
pub(crate) use record::table;
pub use record::{
    boxed, format_timestamp, parse_timestamp, AnyRecord, BoxedRecord, Record, SqlField, WriteMode,
    TIMESTAMP_FORMAT,
};
