//! Typed rows and their column mapping
//!
//! A [`Record`] is a struct with a fixed table, an ordered column list and a
//! natural key. Structs are declared through the [`table!`] macro, which
//! derives the column list and the value conversions from the field types.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Value;

/// Storage format of timestamps.
///
/// Fixed width and always UTC, so string order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp the way the store keeps it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::store(format!("bad stored timestamp '{s}': {e}")))
}

// ============================================================================
// Write Mode
// ============================================================================

/// How a conflicting row is resolved on write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Incoming values replace stored ones
    Replace,
    /// Empty incoming values keep the stored ones
    Merge,
}

// ============================================================================
// SqlField
// ============================================================================

/// A Rust type that maps to one column
pub trait SqlField: Sized {
    /// DuckDB column type
    const SQL_TYPE: &'static str;

    /// Value bound on insert
    fn to_value(&self) -> Value;

    /// Rebuild from a selected value
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(Error::store(format!("expected {expected}, found {value:?}")))
}

impl SqlField for String {
    const SQL_TYPE: &'static str = "VARCHAR";

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s),
            other => mismatch("VARCHAR", &other),
        }
    }
}

impl SqlField for u64 {
    const SQL_TYPE: &'static str = "UBIGINT";

    fn to_value(&self) -> Value {
        Value::UBigInt(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0),
            Value::UBigInt(v) => Ok(v),
            Value::UInt(v) => Ok(v.into()),
            Value::BigInt(v) if v >= 0 => Ok(v as u64),
            Value::Int(v) if v >= 0 => Ok(v as u64),
            other => mismatch("UBIGINT", &other),
        }
    }
}

impl SqlField for i64 {
    const SQL_TYPE: &'static str = "BIGINT";

    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0),
            Value::BigInt(v) => Ok(v),
            Value::Int(v) => Ok(v.into()),
            Value::HugeInt(v) => {
                i64::try_from(v).or_else(|_| mismatch("BIGINT", &Value::HugeInt(v)))
            }
            other => mismatch("BIGINT", &other),
        }
    }
}

impl SqlField for bool {
    const SQL_TYPE: &'static str = "BOOLEAN";

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(b),
            other => mismatch("BOOLEAN", &other),
        }
    }
}

impl SqlField for f64 {
    const SQL_TYPE: &'static str = "DOUBLE";

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(0.0),
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(v.into()),
            other => mismatch("DOUBLE", &other),
        }
    }
}

impl SqlField for DateTime<Utc> {
    const SQL_TYPE: &'static str = "VARCHAR";

    fn to_value(&self) -> Value {
        Value::Text(format_timestamp(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => parse_timestamp(&s),
            other => mismatch("timestamp text", &other),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const SQL_TYPE: &'static str = T::SQL_TYPE;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, SqlField::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// A struct stored as one row of a fixed table
pub trait Record: Sized + Send + Sync + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Entity name used in generated ids
    const ENTITY: &'static str;

    /// Ordered `(column, sql type)` pairs
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Natural key columns
    const PRIMARY_KEY: &'static [&'static str];

    /// Conflict resolution for this table
    const WRITE_MODE: WriteMode = WriteMode::Replace;

    /// Values in column order
    fn to_values(&self) -> Vec<Value>;

    /// Rebuild from values in column order
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// Object-safe view of a [`Record`], so one batch can span tables
pub trait AnyRecord: Send + Sync {
    /// Table name
    fn table(&self) -> &'static str;
    /// Column list
    fn columns(&self) -> &'static [(&'static str, &'static str)];
    /// Key columns
    fn primary_key(&self) -> &'static [&'static str];
    /// Conflict resolution
    fn write_mode(&self) -> WriteMode;
    /// Values in column order
    fn values(&self) -> Vec<Value>;
}

impl<R: Record> AnyRecord for R {
    fn table(&self) -> &'static str {
        R::TABLE
    }

    fn columns(&self) -> &'static [(&'static str, &'static str)] {
        R::COLUMNS
    }

    fn primary_key(&self) -> &'static [&'static str] {
        R::PRIMARY_KEY
    }

    fn write_mode(&self) -> WriteMode {
        R::WRITE_MODE
    }

    fn values(&self) -> Vec<Value> {
        self.to_values()
    }
}

/// A record of any table
pub type BoxedRecord = Box<dyn AnyRecord>;

/// Box a record for a mixed batch
pub fn boxed<R: Record>(record: R) -> BoxedRecord {
    Box::new(record)
}

/// Declare a [`Record`] struct
///
/// ```ignore
/// table! {
///     /// A board
///     pub struct Board => "boards", key(id) {
///         pub id: String,
///         pub name: String,
///     }
/// }
/// ```
macro_rules! table {
    (@mode) => { $crate::store::WriteMode::Replace };
    (@mode $mode:ident) => { $crate::store::WriteMode::$mode };
    (
        $(#[$meta:meta])*
        pub struct $name:ident => $table:literal, key($($pk:ident),+) $(, mode = $mode:ident)? {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::store::Record for $name {
            const TABLE: &'static str = $table;
            const ENTITY: &'static str = stringify!($name);
            const COLUMNS: &'static [(&'static str, &'static str)] = &[
                $( (stringify!($field), <$ty as $crate::store::SqlField>::SQL_TYPE), )*
            ];
            const PRIMARY_KEY: &'static [&'static str] = &[ $( stringify!($pk), )+ ];
            const WRITE_MODE: $crate::store::WriteMode = $crate::store::table!(@mode $($mode)?);

            fn to_values(&self) -> Vec<$crate::store::SqlValue> {
                vec![ $( $crate::store::SqlField::to_value(&self.$field), )* ]
            }

            fn from_values(values: Vec<$crate::store::SqlValue>) -> $crate::error::Result<Self> {
                let mut values = values.into_iter();
                Ok(Self {
                    $(
                        $field: $crate::store::SqlField::from_value(
                            values.next().unwrap_or($crate::store::SqlValue::Null),
                        )?,
                    )*
                })
            }
        }
    };
}

pub(crate) use table;
