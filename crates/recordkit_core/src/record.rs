//! Persistable record capability and supporting value types.
//!
//! # Responsibility
//! - Define the `Record` trait every storable type implements.
//! - Provide the column/filter/load-policy vocabulary shared with the
//!   repository layer.
//!
//! # Invariants
//! - A record's declared columns are the single source of truth for its
//!   storage schema.
//! - Association loading only happens through relations a record declares.

use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declared shape of one storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Column name as it appears in SQL.
    pub name: &'static str,
    /// SQLite type/constraint declaration appended after the name,
    /// e.g. `TEXT NOT NULL`.
    pub decl: &'static str,
    /// Marks the identifier column used by id-filtered operations.
    pub primary_key: bool,
}

/// Ordered column-to-value mapping used for equality filters and
/// per-column updates. Iteration order is the column name order.
pub type FieldMap = BTreeMap<String, Value>;

/// Explicit association loading policy passed by read callers.
///
/// Replaces implicit whole-graph preloading with an opt-in choice that is
/// visible at every call site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Do not load any relations.
    #[default]
    Skip,
    /// Load every relation the record declares.
    All,
    /// Load only the named relations.
    Only(Vec<String>),
}

/// Validation failure raised by a record's own `validate()` hook.
#[derive(Debug)]
pub struct RecordValidationError {
    pub field: &'static str,
    pub message: String,
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid record field `{}`: {}", self.field, self.message)
    }
}

impl Error for RecordValidationError {}

/// Failure while scanning a storage row back into a record, or while
/// loading one of its relations.
#[derive(Debug)]
pub enum RowDecodeError {
    Sqlite(rusqlite::Error),
    Invalid(String),
}

impl Display for RowDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Invalid(message) => write!(f, "invalid persisted row data: {message}"),
        }
    }
}

impl Error for RowDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<rusqlite::Error> for RowDecodeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Capability contract for types the generic repository can persist.
///
/// # Contract
/// - `columns()` must stay stable for the lifetime of a table; removing or
///   retyping columns is outside `migrate()`'s reconciliation scope.
/// - `insert_values()` must only name declared columns.
/// - `from_row()` must read columns by name, never by position.
pub trait Record: Sized {
    /// Storage table name for this record type.
    const TABLE: &'static str;

    /// Declared storage schema for this record type.
    fn columns() -> &'static [ColumnDef];

    /// Stable identifier of this record instance.
    fn id(&self) -> String;

    /// Name of the identifier column used by id-filtered operations.
    fn id_column() -> &'static str {
        Self::columns()
            .iter()
            .find(|column| column.primary_key)
            .map_or("id", |column| column.name)
    }

    /// Owned column values persisted on insert, in declaration order.
    fn insert_values(&self) -> Vec<(&'static str, Value)>;

    /// Scans one storage row back into a record instance.
    fn from_row(row: &Row<'_>) -> Result<Self, RowDecodeError>;

    /// Model validation consulted by write paths before SQL mutations.
    fn validate(&self) -> Result<(), RecordValidationError> {
        Ok(())
    }

    /// Names of child relations this record can eager-load.
    fn relation_names() -> &'static [&'static str] {
        &[]
    }

    /// Loads one declared relation's child rows into this record.
    ///
    /// The repository only calls this with names from `relation_names()`.
    fn load_relation(
        &mut self,
        _conn: &Connection,
        relation: &str,
    ) -> Result<(), RowDecodeError> {
        Err(RowDecodeError::Invalid(format!(
            "record type `{}` declares no relation `{relation}`",
            Self::TABLE
        )))
    }
}

/// Returns whether a value counts as the "zero value" of its storage type.
///
/// Bulk template updates skip zero-value columns, so a partially filled
/// template only touches the columns it meaningfully sets.
pub fn is_zero_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Integer(inner) => *inner == 0,
        Value::Real(inner) => *inner == 0.0,
        Value::Text(inner) => inner.is_empty(),
        Value::Blob(inner) => inner.is_empty(),
    }
}
