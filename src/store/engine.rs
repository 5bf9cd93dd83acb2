//! DuckDB-backed store for raw pages, tool rows and domain rows
//!
//! One connection is shared behind a mutex. Every write goes through a
//! transaction, so a batch spanning several tables lands together or not
//! at all.

use super::query::{Purge, Query};
use super::record::{BoxedRecord, Record, SqlField, WriteMode};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Rows fetched per chunk when scanning
pub const DEFAULT_CHUNK_SIZE: usize = 500;

const RAW_COLUMNS: &[(&str, &str)] = &[
    ("params", "VARCHAR"),
    ("page_id", "VARCHAR"),
    ("input", "VARCHAR"),
    ("url", "VARCHAR"),
    ("data", "VARCHAR"),
    ("created_at", "VARCHAR"),
];

const RAW_KEY: &[&str] = &["params", "page_id"];

/// One collected page, stored verbatim
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// Serialized collection parameters
    pub params: String,
    /// Page position within the collection
    pub page_id: String,
    /// Parent row the page was collected for, as JSON
    pub input: String,
    /// Request URL
    pub url: String,
    /// Response body
    pub data: String,
    /// Collection time
    pub created_at: Option<DateTime<Utc>>,
}

impl RawPage {
    fn to_values(&self) -> Vec<Value> {
        vec![
            self.params.to_value(),
            self.page_id.to_value(),
            self.input.to_value(),
            self.url.to_value(),
            self.data.to_value(),
            self.created_at.to_value(),
        ]
    }

    fn from_values(values: Vec<Value>) -> Result<Self> {
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or(Value::Null);
        Ok(Self {
            params: SqlField::from_value(next())?,
            page_id: SqlField::from_value(next())?,
            input: SqlField::from_value(next())?,
            url: SqlField::from_value(next())?,
            data: SqlField::from_value(next())?,
            created_at: SqlField::from_value(next())?,
        })
    }
}

/// Shared handle to the DuckDB database
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    location: String,
}

impl Store {
    /// Open a database file, or an in-memory database for `:memory:`
    pub fn open(location: &str) -> Result<Self> {
        let conn = if location == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(location)
        }
        .map_err(|e| Error::config(format!("Failed to open DuckDB at {location}: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: location.to_string(),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::store("connection lock poisoned"))
    }

    /// Run one or more statements without parameters
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Run a statement with parameters, returning affected rows
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let conn = self.lock()?;
        let changed = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed)
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Create the table of a record type if missing
    pub fn migrate<R: Record>(&self) -> Result<()> {
        self.execute_batch(&create_table_sql(R::TABLE, R::COLUMNS, R::PRIMARY_KEY))
    }

    /// Create a raw page table if missing
    pub fn ensure_raw_table(&self, table: &str) -> Result<()> {
        self.execute_batch(&create_table_sql(table, RAW_COLUMNS, RAW_KEY))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Upsert records of one type in a single transaction
    pub fn upsert<R: Record + Clone>(&self, rows: &[R]) -> Result<usize> {
        let boxed: Vec<BoxedRecord> = rows
            .iter()
            .cloned()
            .map(|r| Box::new(r) as BoxedRecord)
            .collect();
        self.write(&boxed)
    }

    /// Upsert a mixed batch in a single transaction
    ///
    /// Rows sharing a key within the batch are folded first: the last one
    /// wins for replace tables, non-empty values win for merge tables.
    pub fn write(&self, rows: &[BoxedRecord]) -> Result<usize> {
        self.purge_and_write(&[], rows)
    }

    /// Run `purges` in order, then upsert `rows`, in one transaction
    pub fn purge_and_write(&self, purges: &[Purge], rows: &[BoxedRecord]) -> Result<usize> {
        if purges.is_empty() && rows.is_empty() {
            return Ok(0);
        }

        let groups = group_rows(rows);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for purge in purges {
            deleted += tx.execute(&purge.delete_sql(), params_from_iter(purge.params().iter()))?;
        }
        if deleted > 0 {
            debug!("Purged {deleted} rows before writing");
        }

        let mut written = 0;
        for group in &groups {
            let sql = upsert_sql(group.table, group.columns, group.primary_key, group.mode);
            let mut stmt = tx.prepare(&sql)?;
            for values in &group.rows {
                stmt.execute(params_from_iter(values.iter()))?;
                written += 1;
            }
        }
        tx.commit()?;

        debug!("Wrote {written} rows across {} tables", groups.len());
        Ok(written)
    }

    /// Overwrite a raw page at its (params, page_id) key
    pub fn save_raw_page(&self, table: &str, page: &RawPage) -> Result<()> {
        let sql = upsert_sql(table, RAW_COLUMNS, RAW_KEY, WriteMode::Replace);
        self.execute(&sql, &page.to_values())?;
        Ok(())
    }

    /// Delete the raw pages of one collection saved before `before`
    ///
    /// Pages without a collection time count as stale.
    pub fn delete_stale_raw_pages(
        &self,
        table: &str,
        params: &str,
        before: DateTime<Utc>,
    ) -> Result<usize> {
        self.execute(
            &format!("DELETE FROM {table} WHERE params = ? AND (created_at IS NULL OR created_at < ?)"),
            &[params.to_string().to_value(), before.to_value()],
        )
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read every matching record
    pub fn query<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        let rows = self.query_rows(&query.select_sql::<R>(), query.params(), R::COLUMNS.len())?;
        rows.into_iter().map(R::from_values).collect()
    }

    /// Scan matching records chunk by chunk
    pub fn cursor<R: Record>(&self, query: &Query, chunk_size: usize) -> Cursor<'_, R> {
        Cursor::new(
            self,
            query.select_sql::<R>(),
            query.params().to_vec(),
            R::COLUMNS.len(),
            chunk_size,
            R::from_values,
        )
    }

    /// Scan the raw pages of one collection
    pub fn raw_cursor(&self, table: &str, params: &str, chunk_size: usize) -> Cursor<'_, RawPage> {
        let columns: Vec<&str> = RAW_COLUMNS.iter().map(|(c, _)| *c).collect();
        let query = Query::new()
            .filter("params = ?", vec![params.to_string().to_value()])
            .order_by("page_id");
        Cursor::new(
            self,
            query.select_columns_sql(&columns, table),
            query.params().to_vec(),
            columns.len(),
            chunk_size,
            RawPage::from_values,
        )
    }

    /// Run a select and return `width` values per row
    pub fn query_rows(&self, sql: &str, params: &[Value], width: usize) -> Result<Vec<Vec<Value>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value: Value = row.get(i)?;
                values.push(value);
            }
            out.push(values);
        }
        Ok(out)
    }

    /// Count the rows of a table
    pub fn count(&self, table: &str) -> Result<u64> {
        let rows = self.query_rows(&format!("SELECT COUNT(*) FROM {table}"), &[], 1)?;
        let value = rows
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .unwrap_or(Value::Null);
        match value {
            Value::BigInt(n) => Ok(n as u64),
            Value::HugeInt(n) => Ok(n as u64),
            other => u64::from_value(other),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Chunked scan over a select; each chunk is one LIMIT/OFFSET query
pub struct Cursor<'s, T> {
    store: &'s Store,
    sql: String,
    params: Vec<Value>,
    width: usize,
    chunk_size: usize,
    offset: usize,
    exhausted: bool,
    decode: fn(Vec<Value>) -> Result<T>,
}

impl<'s, T> Cursor<'s, T> {
    fn new(
        store: &'s Store,
        sql: String,
        params: Vec<Value>,
        width: usize,
        chunk_size: usize,
        decode: fn(Vec<Value>) -> Result<T>,
    ) -> Self {
        Self {
            store,
            sql,
            params,
            width,
            chunk_size: chunk_size.max(1),
            offset: 0,
            exhausted: false,
            decode,
        }
    }

    /// Next chunk, or `None` once the scan is complete
    pub fn next_chunk(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }

        let sql = format!(
            "{} LIMIT {} OFFSET {}",
            self.sql, self.chunk_size, self.offset
        );
        let rows = self.store.query_rows(&sql, &self.params, self.width)?;
        if rows.len() < self.chunk_size {
            self.exhausted = true;
        }
        self.offset += rows.len();
        if rows.is_empty() {
            return Ok(None);
        }

        rows.into_iter()
            .map(self.decode)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

// ============================================================================
// SQL helpers
// ============================================================================

struct Group {
    table: &'static str,
    columns: &'static [(&'static str, &'static str)],
    primary_key: &'static [&'static str],
    mode: WriteMode,
    rows: Vec<Vec<Value>>,
    index: HashMap<String, usize>,
}

fn group_rows(rows: &[BoxedRecord]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for row in rows {
        let position = match groups.iter().position(|g| g.table == row.table()) {
            Some(p) => p,
            None => {
                groups.push(Group {
                    table: row.table(),
                    columns: row.columns(),
                    primary_key: row.primary_key(),
                    mode: row.write_mode(),
                    rows: Vec::new(),
                    index: HashMap::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[position];
        let values = row.values();
        let key = key_of(group.columns, group.primary_key, &values);
        match group.index.get(&key) {
            Some(&existing) => match group.mode {
                WriteMode::Replace => group.rows[existing] = values,
                WriteMode::Merge => merge_values(&mut group.rows[existing], values),
            },
            None => {
                group.index.insert(key, group.rows.len());
                group.rows.push(values);
            }
        }
    }
    groups
}

fn key_of(columns: &[(&str, &str)], primary_key: &[&str], values: &[Value]) -> String {
    columns
        .iter()
        .zip(values)
        .filter(|((name, _), _)| primary_key.contains(name))
        .map(|(_, v)| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join("|")
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

fn merge_values(existing: &mut [Value], incoming: Vec<Value>) {
    for (slot, value) in existing.iter_mut().zip(incoming) {
        if !is_empty_value(&value) {
            *slot = value;
        }
    }
}

fn create_table_sql(table: &str, columns: &[(&str, &str)], primary_key: &[&str]) -> String {
    let cols: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({}, PRIMARY KEY ({}))",
        cols.join(", "),
        primary_key.join(", ")
    )
}

pub(crate) fn upsert_sql(
    table: &str,
    columns: &[(&str, &str)],
    primary_key: &[&str],
    mode: WriteMode,
) -> String {
    let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
    let placeholders = vec!["?"; names.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .filter(|(c, _)| !primary_key.contains(c))
        .map(|(c, ty)| match mode {
            WriteMode::Replace => format!("{c} = EXCLUDED.{c}"),
            WriteMode::Merge if *ty == "VARCHAR" => {
                format!("{c} = COALESCE(NULLIF(EXCLUDED.{c}, ''), {c})")
            }
            WriteMode::Merge => format!("{c} = COALESCE(EXCLUDED.{c}, {c})"),
        })
        .collect();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT ({}) {action}",
        names.join(", "),
        primary_key.join(", ")
    )
}
