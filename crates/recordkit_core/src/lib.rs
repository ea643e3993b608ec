//! Generic record persistence façade over embedded SQLite.
//!
//! One repository interface offers Create/Read/Update/Delete/Migrate
//! operations parameterized by any type implementing [`Record`]; all query
//! construction and execution is delegated to the wrapped engine.

pub mod db;
pub mod logging;
pub mod record;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use record::{
    is_zero_value, ColumnDef, FieldMap, LoadPolicy, Record, RecordValidationError, RowDecodeError,
};
pub use repo::record_repo::{
    RecordRepository, RepoError, RepoResult, SqliteRecordRepository, UpdateOptions,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
