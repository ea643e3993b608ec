//! SQLite connection bootstrap and storage error type.
//!
//! # Responsibility
//! - Open and configure SQLite connections for recordkit callers.
//! - Surface storage transport failures without transformation.
//!
//! # Invariants
//! - Schema reconciliation is owned by the repository's `migrate()`
//!   operation, not by connection bootstrap.
//! - Returned connections are ready for repository construction.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage transport error. Underlying engine failures pass through
/// verbatim; nothing is retried, remapped, or classified.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
