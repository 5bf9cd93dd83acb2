//! Clause builder for cursor scans

use super::record::{Record, SqlField};
use duckdb::types::Value;

/// Filter, join and sort clauses for a scan over one table
#[derive(Debug, Clone, Default)]
pub struct Query {
    joins: Vec<String>,
    filters: Vec<String>,
    params: Vec<Value>,
    order_by: Vec<String>,
}

impl Query {
    /// An unfiltered scan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a join clause, written in full (`LEFT JOIN x ON ...`)
    #[must_use]
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Add a filter with `?` placeholders
    #[must_use]
    pub fn filter(mut self, clause: impl Into<String>, params: Vec<Value>) -> Self {
        self.filters.push(clause.into());
        self.params.extend(params);
        self
    }

    /// Add a filter on one typed parameter
    #[must_use]
    pub fn filter_eq<T: SqlField>(self, column: &str, value: &T) -> Self {
        self.filter(format!("{column} = ?"), vec![value.to_value()])
    }

    /// Add a sort key
    #[must_use]
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by.push(clause.into());
        self
    }

    /// Bound parameters in placeholder order
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// SQL selecting every column of `R` in declaration order
    ///
    /// Without an explicit order the key columns are used, so chunked
    /// scans page over a stable sequence.
    pub fn select_sql<R: Record>(&self) -> String {
        let columns: Vec<String> = R::COLUMNS
            .iter()
            .map(|(name, _)| format!("{}.{name}", R::TABLE))
            .collect();
        let order: Vec<String> = if self.order_by.is_empty() {
            R::PRIMARY_KEY
                .iter()
                .map(|k| format!("{}.{k}", R::TABLE))
                .collect()
        } else {
            self.order_by.clone()
        };
        self.render(&columns.join(", "), R::TABLE, &order)
    }

    /// SQL selecting explicit expressions from a table
    pub fn select_columns_sql(&self, columns: &[&str], table: &str) -> String {
        self.render(&columns.join(", "), table, &self.order_by)
    }

    fn render(&self, columns: &str, table: &str, order: &[String]) -> String {
        let mut sql = format!("SELECT {columns} FROM {table}");
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        sql
    }
}

/// A filtered delete over one table
///
/// Purges run ahead of the rows written in the same transaction, so a row
/// that is both purged and rewritten survives.
#[derive(Debug, Clone, PartialEq)]
pub struct Purge {
    table: String,
    filter: String,
    params: Vec<Value>,
}

impl Purge {
    /// Delete rows of `table` matching `filter`, with `?` placeholders
    pub fn new(table: impl Into<String>, filter: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            filter: filter.into(),
            params,
        }
    }

    /// Table the rows are deleted from
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Bound parameters in placeholder order
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The DELETE statement
    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {}", self.table, self.filter)
    }
}
