//! SQLite storage bootstrap and per-type schema management.
//!
//! # Responsibility
//! - Open and configure SQLite connections for recordkit core.
//! - Create or upgrade the table backing each record type.
//!
//! # Invariants
//! - Identifiers interpolated into SQL are validated before use.
//! - Schema upgrades only add columns, never drop or rewrite them.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory, open_db_with_options, OpenOptions};
pub use schema::{auto_migrate, is_valid_identifier, quote_identifier};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidIdentifier(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
