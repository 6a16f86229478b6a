//! Native error representations, one per dialect.
//!
//! These mirror the field sets the backends put on the wire, so drivers (or tests, or the CLI)
//! can hand the classifiers a faithful snapshot. With the `pg`, `mysql` or `sqlite` features
//! the matching sqlx database errors are converted into these structs as well.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

/// Postgres error response (`ErrorResponse` message fields).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{severity}: {message} (SQLSTATE {code})")]
#[serde(default)]
pub struct PgError {
    pub severity: String,
    /// Five-character SQLSTATE, e.g. `23505`.
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub data_type: Option<String>,
    pub constraint: Option<String>,
}

impl PgError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: "ERROR".to_string(),
            code: code.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// SQLSTATE class: the first two characters of the code.
    pub fn class(&self) -> &str {
        self.code.get(..2).unwrap_or("")
    }
}

/// MySQL / MariaDB server error packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Error {number}{}: {message}", sql_state_suffix(.sql_state))]
#[serde(default)]
pub struct MySqlError {
    /// Server error number, e.g. `1062` (ER_DUP_ENTRY).
    pub number: u16,
    pub sql_state: Option<String>,
    pub message: String,
}

fn sql_state_suffix(state: &Option<String>) -> String {
    state.as_ref().map(|s| format!(" ({s})")).unwrap_or_default()
}

impl MySqlError {
    pub fn new(number: u16, message: impl Into<String>) -> Self {
        Self {
            number,
            sql_state: None,
            message: message.into(),
        }
    }
}

/// SQLite result code pair plus `sqlite3_errmsg` text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} (code {code}, extended {extended_code})")]
#[serde(default)]
pub struct SqliteError {
    /// Primary result code, e.g. `19` (SQLITE_CONSTRAINT).
    pub code: i32,
    /// Extended result code, e.g. `2067` (SQLITE_CONSTRAINT_UNIQUE).
    pub extended_code: i32,
    pub message: String,
}

impl SqliteError {
    /// Build from an extended code; the primary code is its low byte.
    pub fn new(extended_code: i32, message: impl Into<String>) -> Self {
        Self {
            code: extended_code & 0xff,
            extended_code,
            message: message.into(),
        }
    }
}

/// SQL Server TDS `ERROR` token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("mssql: {message}")]
#[serde(default)]
pub struct MssqlError {
    pub number: i32,
    pub state: u8,
    /// Severity class, e.g. `14` for permission/uniqueness, `16` for user errors.
    pub class: u8,
    pub message: String,
    pub server_name: String,
    pub proc_name: String,
    pub line_no: i32,
}

impl MssqlError {
    pub fn new(class: u8, number: i32, message: impl Into<String>) -> Self {
        Self {
            number,
            state: 1,
            class,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Walk the `source()` chain and return the first error of type `T`.
pub(crate) fn find_in_chain<'a, T: StdError + 'static>(
    err: &'a (dyn StdError + 'static),
) -> Option<&'a T> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

/// Walk the chain looking for a sqlx database error and hand it to `f`.
#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
pub(crate) fn find_sqlx_database_error<'a, R>(
    err: &'a (dyn StdError + 'static),
    f: impl Fn(&'a (dyn sqlx::error::DatabaseError + 'static)) -> Option<R>,
) -> Option<R> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(sqlx::Error::Database(db)) = e.downcast_ref::<sqlx::Error>() {
            if let Some(found) = f(db.as_ref()) {
                return Some(found);
            }
        }
        current = e.source();
    }
    None
}

#[cfg(feature = "pg")]
impl From<&sqlx::postgres::PgDatabaseError> for PgError {
    fn from(e: &sqlx::postgres::PgDatabaseError) -> Self {
        Self {
            severity: format!("{:?}", e.severity()).to_uppercase(),
            code: e.code().to_string(),
            message: e.message().to_string(),
            detail: e.detail().map(str::to_string),
            hint: e.hint().map(str::to_string),
            schema: e.schema().map(str::to_string),
            table: e.table().map(str::to_string),
            column: e.column().map(str::to_string),
            data_type: e.data_type().map(str::to_string),
            constraint: e.constraint().map(str::to_string),
        }
    }
}

#[cfg(feature = "mysql")]
impl From<&sqlx::mysql::MySqlDatabaseError> for MySqlError {
    fn from(e: &sqlx::mysql::MySqlDatabaseError) -> Self {
        Self {
            number: e.number(),
            sql_state: e.code().map(str::to_string),
            message: e.message().to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<&sqlx::sqlite::SqliteError> for SqliteError {
    fn from(e: &sqlx::sqlite::SqliteError) -> Self {
        use sqlx::error::DatabaseError;
        // sqlx reports the extended result code as a decimal string.
        let extended_code = DatabaseError::code(e)
            .and_then(|c| c.parse::<i32>().ok())
            .unwrap_or_default();
        Self::new(extended_code, DatabaseError::message(e))
    }
}
