//! Generic record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide one uniform CRUD/migrate call surface over heterogeneous
//!   record types.
//! - Defer all query semantics to the wrapped SQLite engine; forward its
//!   failures verbatim.
//!
//! # Invariants
//! - Write paths call `Record::validate()` before SQL mutations.
//! - Column names arriving through filter/update maps are checked against
//!   the record's declared schema before they reach SQL text.
//! - `find_all_raw` is the only entry point that interpolates caller text
//!   into SQL; every other path binds parameters.

use crate::db::DbError;
use crate::record::{
    is_zero_value, FieldMap, LoadPolicy, Record, RecordValidationError, RowDecodeError,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    NotFound { table: &'static str, id: String },
    InvalidData(String),
    UnknownColumn { table: &'static str, column: String },
    UnknownRelation { table: &'static str, relation: String },
    GlobalUpdateBlocked { table: &'static str },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => {
                write!(f, "record not found in `{table}`: {id}")
            }
            Self::InvalidData(message) => {
                write!(f, "invalid persisted record data: {message}")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::UnknownRelation { table, relation } => {
                write!(f, "unknown relation `{relation}` for table `{table}`")
            }
            Self::GlobalUpdateBlocked { table } => write!(
                f,
                "refusing unfiltered bulk update on `{table}` without allow_global"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RowDecodeError> for RepoError {
    fn from(value: RowDecodeError) -> Self {
        match value {
            RowDecodeError::Sqlite(err) => Self::Db(DbError::Sqlite(err)),
            RowDecodeError::Invalid(message) => Self::InvalidData(message),
        }
    }
}

/// Options for bulk template updates.
///
/// An empty `filters` map addresses every row of the table. That global
/// shape is refused unless `allow_global` is set explicitly, so the
/// whole-table footgun stays visible at the call site.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Equality filters selecting the rows to update.
    pub filters: FieldMap,
    /// Permits an update with no filters to touch the entire table.
    pub allow_global: bool,
}

/// Uniform call surface for schema migration and CRUD over any `Record`.
///
/// Every operation is a stateless, synchronous forward to the wrapped
/// engine; concurrency safety is whatever the shared connection provides.
pub trait RecordRepository<T: Record> {
    /// Reconciles the storage table with the record's declared columns.
    /// Creates the table when absent and adds missing columns; existing
    /// columns are never dropped or retyped. Idempotent.
    fn migrate(&self) -> RepoResult<bool>;

    /// Validates and inserts one record, returning its identifier.
    fn create(&self, record: &T) -> RepoResult<String>;

    /// Scans the whole table through a streaming cursor.
    ///
    /// Row decode failures abort the scan and surface to the caller.
    fn get_rows(&self, policy: &LoadPolicy) -> RepoResult<Vec<T>>;

    /// Returns all records matching the equality filters. An empty map
    /// matches every row; zero matches yield an empty vec, not an error.
    fn get(&self, filters: &FieldMap, policy: &LoadPolicy) -> RepoResult<Vec<T>>;

    /// Loads one record by identifier, failing with `NotFound` when absent.
    fn first(&self, id: &str, policy: &LoadPolicy) -> RepoResult<T>;

    /// Returns every record of the type.
    fn get_all(&self, policy: &LoadPolicy) -> RepoResult<Vec<T>>;

    /// Returns records matching a caller-supplied literal WHERE fragment.
    ///
    /// # Caveats
    /// The fragment is interpolated into SQL text with no parameter
    /// binding. Never pass untrusted input here; use [`Self::get`] for
    /// caller-influenced filters.
    fn find_all_raw(&self, filter: &str) -> RepoResult<Vec<T>>;

    /// Applies one UPDATE statement per map entry, filtered by id.
    ///
    /// Stops at the first failing column, leaving earlier column updates
    /// already committed. There is no multi-column transaction.
    fn update(&self, id: &str, fields: &FieldMap) -> RepoResult<bool>;

    /// Bulk-updates rows from the template's non-zero columns.
    ///
    /// Rows are selected by `options.filters`; an empty filter map
    /// requires `options.allow_global` and then touches every row.
    fn update_matching(&self, template: &T, options: &UpdateOptions) -> RepoResult<()>;

    /// Deletes the row matching the identifier.
    fn delete(&self, id: &str) -> RepoResult<bool>;
}

/// SQLite-backed generic record repository.
///
/// Holds a shared connection injected at construction; the repository
/// never closes it.
pub struct SqliteRecordRepository<'conn, T: Record> {
    conn: &'conn Connection,
    _record: PhantomData<T>,
}

impl<'conn, T: Record> SqliteRecordRepository<'conn, T> {
    /// Creates a repository over an already opened connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    fn fetch_records(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
        relations: &[&'static str],
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }

        self.load_relations(&mut records, relations)?;
        Ok(records)
    }

    fn load_relations(&self, records: &mut [T], relations: &[&'static str]) -> RepoResult<()> {
        for record in records.iter_mut() {
            for relation in relations {
                record.load_relation(self.conn, relation)?;
            }
        }
        Ok(())
    }
}

impl<T: Record> RecordRepository<T> for SqliteRecordRepository<'_, T> {
    fn migrate(&self) -> RepoResult<bool> {
        let columns = T::columns();
        if columns.is_empty() {
            return Err(RepoError::InvalidData(format!(
                "record type `{}` declares no columns",
                T::TABLE
            )));
        }

        if !table_exists(self.conn, T::TABLE)? {
            let body = columns
                .iter()
                .map(|column| format!("{} {}", column.name, column.decl))
                .collect::<Vec<_>>()
                .join(", ");
            self.conn
                .execute_batch(&format!("CREATE TABLE {} ({});", T::TABLE, body))?;
            debug!(
                "event=record_migrate module=repo table={} action=create_table",
                T::TABLE
            );
            return Ok(true);
        }

        for column in columns {
            if table_has_column(self.conn, T::TABLE, column.name)? {
                continue;
            }
            self.conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                T::TABLE,
                column.name,
                column.decl
            ))?;
            debug!(
                "event=record_migrate module=repo table={} action=add_column column={}",
                T::TABLE,
                column.name
            );
        }

        Ok(true)
    }

    fn create(&self, record: &T) -> RepoResult<String> {
        record.validate()?;

        let values = record.insert_values();
        let columns = values
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders});",
                T::TABLE
            ),
            params_from_iter(values.into_iter().map(|(_, value)| value)),
        )?;

        Ok(record.id())
    }

    fn get_rows(&self, policy: &LoadPolicy) -> RepoResult<Vec<T>> {
        let relations = resolve_relations::<T>(policy)?;
        self.fetch_records(&select_sql::<T>(), Vec::new(), &relations)
    }

    fn get(&self, filters: &FieldMap, policy: &LoadPolicy) -> RepoResult<Vec<T>> {
        let relations = resolve_relations::<T>(policy)?;

        let mut sql = select_sql::<T>();
        let mut bind_values = Vec::with_capacity(filters.len());
        if !filters.is_empty() {
            let mut clauses = Vec::with_capacity(filters.len());
            for (column, value) in filters {
                ensure_known_column::<T>(column)?;
                clauses.push(format!("{column} = ?"));
                bind_values.push(value.clone());
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        self.fetch_records(&sql, bind_values, &relations)
    }

    fn first(&self, id: &str, policy: &LoadPolicy) -> RepoResult<T> {
        let relations = resolve_relations::<T>(policy)?;

        let sql = format!("{} WHERE {} = ?1;", select_sql::<T>(), T::id_column());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;

        let Some(row) = rows.next()? else {
            return Err(RepoError::NotFound {
                table: T::TABLE,
                id: id.to_string(),
            });
        };
        let mut record = T::from_row(row)?;

        for relation in &relations {
            record.load_relation(self.conn, relation)?;
        }
        Ok(record)
    }

    fn get_all(&self, policy: &LoadPolicy) -> RepoResult<Vec<T>> {
        let relations = resolve_relations::<T>(policy)?;
        self.fetch_records(&select_sql::<T>(), Vec::new(), &relations)
    }

    fn find_all_raw(&self, filter: &str) -> RepoResult<Vec<T>> {
        let sql = format!("{} WHERE {filter};", select_sql::<T>());
        self.fetch_records(&sql, Vec::new(), &[])
    }

    fn update(&self, id: &str, fields: &FieldMap) -> RepoResult<bool> {
        for (column, value) in fields {
            ensure_known_column::<T>(column)?;

            debug!(
                "event=record_update module=repo table={} column={column}",
                T::TABLE
            );
            self.conn.execute(
                &format!(
                    "UPDATE {} SET {column} = ?1 WHERE {} = ?2;",
                    T::TABLE,
                    T::id_column()
                ),
                params![value, id],
            )?;
        }

        Ok(true)
    }

    fn update_matching(&self, template: &T, options: &UpdateOptions) -> RepoResult<()> {
        let changes: Vec<(&'static str, Value)> = template
            .insert_values()
            .into_iter()
            .filter(|(column, value)| *column != T::id_column() && !is_zero_value(value))
            .collect();
        if changes.is_empty() {
            return Ok(());
        }

        if options.filters.is_empty() && !options.allow_global {
            return Err(RepoError::GlobalUpdateBlocked { table: T::TABLE });
        }

        let assignments = changes
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut bind_values: Vec<Value> =
            changes.into_iter().map(|(_, value)| value).collect();

        let mut sql = format!("UPDATE {} SET {assignments}", T::TABLE);
        if !options.filters.is_empty() {
            let mut clauses = Vec::with_capacity(options.filters.len());
            for (column, value) in &options.filters {
                ensure_known_column::<T>(column)?;
                clauses.push(format!("{column} = ?"));
                bind_values.push(value.clone());
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push(';');

        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))?;
        debug!(
            "event=record_bulk_update module=repo table={} rows={changed} global={}",
            T::TABLE,
            options.filters.is_empty()
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> RepoResult<bool> {
        debug!("event=record_delete module=repo table={}", T::TABLE);
        self.conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::id_column()),
            [id],
        )?;
        Ok(true)
    }
}

fn select_sql<T: Record>() -> String {
    let columns = T::columns()
        .iter()
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", T::TABLE)
}

fn ensure_known_column<T: Record>(column: &str) -> RepoResult<()> {
    if T::columns().iter().any(|known| known.name == column) {
        return Ok(());
    }
    Err(RepoError::UnknownColumn {
        table: T::TABLE,
        column: column.to_string(),
    })
}

fn resolve_relations<T: Record>(policy: &LoadPolicy) -> RepoResult<Vec<&'static str>> {
    match policy {
        LoadPolicy::Skip => Ok(Vec::new()),
        LoadPolicy::All => Ok(T::relation_names().to_vec()),
        LoadPolicy::Only(names) => {
            let mut resolved = Vec::with_capacity(names.len());
            for name in names {
                match T::relation_names()
                    .iter()
                    .find(|candidate| **candidate == name.as_str())
                {
                    Some(candidate) => resolved.push(*candidate),
                    None => {
                        return Err(RepoError::UnknownRelation {
                            table: T::TABLE,
                            relation: name.clone(),
                        });
                    }
                }
            }
            Ok(resolved)
        }
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
