//! Canonical error model shared by every dialect.
//!
//! Each violation kind embeds a [`DbError`], which keeps the original driver error and the
//! dialect that produced it. Metadata fields are extracted-or-absent: a backend that does not
//! expose e.g. the table of a duplicate key leaves it `None`.

use crate::dialect::Dialect;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared, immutable handle to the original driver error.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// The original error plus the dialect it came from.
///
/// Equality compares the dialect and the *identity* of the wrapped error.
#[derive(Clone)]
pub struct DbError {
    source: SharedError,
    dialect: Dialect,
}

impl DbError {
    pub fn new(source: SharedError, dialect: Dialect) -> Self {
        Self { source, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The error that was passed to `classify`, unmodified.
    pub fn original(&self) -> &SharedError {
        &self.source
    }
}

impl fmt::Debug for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbError")
            .field("dialect", &self.dialect)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.dialect, self.source)
    }
}

impl StdError for DbError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}

impl PartialEq for DbError {
    fn eq(&self, other: &Self) -> bool {
        self.dialect == other.dialect && Arc::ptr_eq(&self.source, &other.source)
    }
}

impl Eq for DbError {}

impl Serialize for DbError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DbError", 2)?;
        s.serialize_field("dialect", &self.dialect)?;
        s.serialize_field("message", &self.source.to_string())?;
        s.end()
    }
}

/// Renders `schema.table.column (constraint name)` from whichever parts are known.
fn describe(
    schema: &Option<String>,
    table: &Option<String>,
    column: &Option<String>,
    constraint: &Option<String>,
) -> String {
    let path = [schema, table, column]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>();
    let mut out = if path.is_empty() {
        "<unknown>".to_string()
    } else {
        path.join(".")
    };
    if let Some(name) = constraint {
        out.push_str(" (constraint ");
        out.push_str(name);
        out.push(')');
    }
    out
}

/// Invalid data: truncation, conversion or out-of-range failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("data error: {db}")]
pub struct DataError {
    #[source]
    #[serde(rename = "error")]
    pub db: DbError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("unique violation on {}", describe(.schema, .table, .column, .constraint))]
pub struct UniqueViolation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[source]
    #[serde(rename = "error")]
    pub db: DbError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("foreign key violation on {}", describe(.schema, .table, &None, .constraint))]
pub struct ForeignKeyViolation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[source]
    #[serde(rename = "error")]
    pub db: DbError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("not null violation on {}", describe(.schema, .table, .column, &None))]
pub struct NotNullViolation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[source]
    #[serde(rename = "error")]
    pub db: DbError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("check violation on {}", describe(&None, .table, &None, .constraint))]
pub struct CheckViolation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[source]
    #[serde(rename = "error")]
    pub db: DbError,
}

/// Fieldless discriminant of [`CanonicalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Data,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViolationKind::Data => "data",
            ViolationKind::UniqueViolation => "unique_violation",
            ViolationKind::ForeignKeyViolation => "foreign_key_violation",
            ViolationKind::NotNullViolation => "not_null_violation",
            ViolationKind::CheckViolation => "check_violation",
        })
    }
}

/// Backend-independent classification of a driver error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    UniqueViolation(#[from] UniqueViolation),

    #[error(transparent)]
    ForeignKeyViolation(#[from] ForeignKeyViolation),

    #[error(transparent)]
    NotNullViolation(#[from] NotNullViolation),

    #[error(transparent)]
    CheckViolation(#[from] CheckViolation),
}

impl CanonicalError {
    pub fn kind(&self) -> ViolationKind {
        match self {
            CanonicalError::Data(_) => ViolationKind::Data,
            CanonicalError::UniqueViolation(_) => ViolationKind::UniqueViolation,
            CanonicalError::ForeignKeyViolation(_) => ViolationKind::ForeignKeyViolation,
            CanonicalError::NotNullViolation(_) => ViolationKind::NotNullViolation,
            CanonicalError::CheckViolation(_) => ViolationKind::CheckViolation,
        }
    }

    /// The embedded wrapper shared by every kind.
    pub fn db_error(&self) -> &DbError {
        match self {
            CanonicalError::Data(e) => &e.db,
            CanonicalError::UniqueViolation(e) => &e.db,
            CanonicalError::ForeignKeyViolation(e) => &e.db,
            CanonicalError::NotNullViolation(e) => &e.db,
            CanonicalError::CheckViolation(e) => &e.db,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.db_error().dialect()
    }

    pub fn original(&self) -> &SharedError {
        self.db_error().original()
    }
}
