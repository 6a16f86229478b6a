//! Canonical classification of native database errors.
//!
//! Postgres, MySQL, SQLite and SQL Server each report constraint failures in their own shape:
//! structured diagnostic fields for some, free-form message text for others. This crate maps
//! such an error onto one backend-independent [`CanonicalError`] so calling code can branch on
//! "unique violated" or "foreign key violated" without caring which server produced it.
//!
//! # Features
//! - `pg`, `mysql`, `sqlite`: also recognize the matching `sqlx` driver errors, either bare or
//!   wrapped in `sqlx::Error::Database`
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use dberrors::{classify, CanonicalError, Dialect, PgError, SharedError};
//!
//! let err: SharedError = Arc::new(PgError {
//!     table: Some("users".into()),
//!     constraint: Some("users_email_key".into()),
//!     detail: Some("Key (email)=(a@b.c) already exists.".into()),
//!     ..PgError::new("23505", "duplicate key value violates unique constraint")
//! });
//!
//! match classify(Dialect::Postgres, &err) {
//!     Some(CanonicalError::UniqueViolation(v)) => {
//!         assert_eq!(v.column.as_deref(), Some("email"));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod classifier;
pub mod dialect;
pub mod error;
pub mod native;
mod template;

pub use classifier::{
    Classifier, MssqlClassifier, MySqlClassifier, PostgresClassifier, SqliteClassifier,
};
pub use dialect::{Dialect, DialectParseError};
pub use error::{
    CanonicalError, CheckViolation, DataError, DbError, ForeignKeyViolation, NotNullViolation,
    SharedError, UniqueViolation, ViolationKind,
};
pub use native::{MssqlError, MySqlError, PgError, SqliteError};

static POSTGRES: PostgresClassifier = PostgresClassifier;
static MYSQL: MySqlClassifier = MySqlClassifier;
static SQLITE: SqliteClassifier = SqliteClassifier;
static MSSQL: MssqlClassifier = MssqlClassifier;

/// The classifier registered for `dialect`.
pub fn classifier_for(dialect: Dialect) -> &'static dyn Classifier {
    match dialect {
        Dialect::Postgres => &POSTGRES,
        Dialect::MySql => &MYSQL,
        Dialect::Sqlite => &SQLITE,
        Dialect::Mssql => &MSSQL,
    }
}

/// Classify `err` as an error of `dialect`.
///
/// Returns `None` when `err` carries no native error of that dialect or when its code has no
/// canonical meaning (syntax errors, lost connections and the like). `None` does not mean the
/// operation succeeded.
pub fn classify(dialect: Dialect, err: &SharedError) -> Option<CanonicalError> {
    let result = classifier_for(dialect).classify(err);
    match &result {
        Some(canonical) => {
            tracing::debug!(%dialect, kind = %canonical.kind(), "classified database error")
        }
        None => tracing::debug!(%dialect, error = %err, "no canonical interpretation"),
    }
    result
}

/// Like [`classify`], but takes ownership and hands the error back when it stays unclassified.
pub fn classify_owned<E>(dialect: Dialect, err: E) -> Result<CanonicalError, SharedError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let shared: SharedError = std::sync::Arc::new(err);
    classify(dialect, &shared).ok_or(shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn classifier_for_reports_its_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(classifier_for(dialect).dialect(), dialect);
        }
    }

    #[test]
    fn classify_owned_returns_unclassified_error() {
        let err = classify_owned(Dialect::MySql, MySqlError::new(1064, "syntax")).unwrap_err();
        assert_eq!(err.to_string(), MySqlError::new(1064, "syntax").to_string());
    }

    #[test]
    fn classify_owned_classifies() {
        let got = classify_owned(
            Dialect::Sqlite,
            SqliteError::new(2067, "UNIQUE constraint failed: t.c"),
        )
        .unwrap();
        assert_eq!(got.kind(), ViolationKind::UniqueViolation);
        assert_eq!(got.dialect(), Dialect::Sqlite);
    }

    #[test]
    fn foreign_dialect_error_is_ignored() {
        let err: SharedError = Arc::new(PgError::new("23505", "duplicate"));
        for dialect in [Dialect::MySql, Dialect::Sqlite, Dialect::Mssql] {
            assert_eq!(classify(dialect, &err), None);
        }
    }
}
