//! Postgres: SQLSTATE codes with structured diagnostic fields.
//!
//! Postgres reports schema, table, column and constraint as dedicated fields, so only the
//! unique-violation column has to be recovered from the `detail` text.

use super::Classifier;
use crate::dialect::Dialect;
use crate::error::{CanonicalError, DbError, SharedError};
use crate::native::{find_in_chain, PgError};
use crate::template::{non_empty, Metadata, Template, TemplateSet};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::LazyLock;

/// Class 23: integrity constraint violation
pub const INTEGRITY_CONSTRAINT_VIOLATION_CLASS: &str = "23";
/// Class 22: data exception
pub const DATA_EXCEPTION_CLASS: &str = "22";

pub const UNIQUE_VIOLATION: &str = "23505";
pub const NOT_NULL_VIOLATION: &str = "23502";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
pub const CHECK_VIOLATION: &str = "23514";

static UNIQUE_DETAIL: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "unique_violation",
        vec![Template::new(
            "key_already_exists",
            r"Key \((?P<column>.+)\)=\(.*\) already exists",
        )],
    )
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresClassifier;

impl Classifier for PostgresClassifier {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn classify(&self, err: &SharedError) -> Option<CanonicalError> {
        let native = native_error(&**err)?;
        classify_native(&native, || DbError::new(err.clone(), Dialect::Postgres))
    }
}

fn native_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<Cow<'a, PgError>> {
    if let Some(e) = find_in_chain::<PgError>(err) {
        return Some(Cow::Borrowed(e));
    }

    #[cfg(feature = "pg")]
    {
        use sqlx::postgres::PgDatabaseError;

        if let Some(e) = find_in_chain::<PgDatabaseError>(err) {
            return Some(Cow::Owned(PgError::from(e)));
        }
        if let Some(e) = crate::native::find_sqlx_database_error(err, |db| {
            db.try_downcast_ref::<PgDatabaseError>().map(PgError::from)
        }) {
            return Some(Cow::Owned(e));
        }
    }

    None
}

fn classify_native(e: &PgError, db: impl FnOnce() -> DbError) -> Option<CanonicalError> {
    if e.class() == INTEGRITY_CONSTRAINT_VIOLATION_CLASS {
        let structured = Metadata {
            schema: non_empty(e.schema.as_deref()),
            table: non_empty(e.table.as_deref()),
            column: non_empty(e.column.as_deref()),
            constraint: non_empty(e.constraint.as_deref()),
        };

        match e.code.as_str() {
            UNIQUE_VIOLATION => {
                // The column list only appears in the detail text.
                let column = e
                    .detail
                    .as_deref()
                    .and_then(|detail| UNIQUE_DETAIL.extract_or_default(detail).column);
                return Some(Metadata { column, ..structured }.unique(db()));
            }
            NOT_NULL_VIOLATION => return Some(structured.not_null(db())),
            FOREIGN_KEY_VIOLATION => return Some(structured.foreign_key(db())),
            CHECK_VIOLATION => return Some(structured.check(db())),
            other => {
                tracing::trace!(code = other, "unmapped integrity constraint code");
            }
        }
    }

    if e.class() == DATA_EXCEPTION_CLASS {
        return Some(Metadata::data(db()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        CheckViolation, DataError, ForeignKeyViolation, NotNullViolation, UniqueViolation,
    };
    use std::sync::Arc;

    fn shared(e: PgError) -> SharedError {
        Arc::new(e)
    }

    fn unique_error() -> PgError {
        PgError {
            detail: Some("Key (i_am_unique_col)=(1) already exists.".into()),
            schema: Some("public".into()),
            table: Some("theTable".into()),
            constraint: Some("thetable_i_am_unique_col_unique".into()),
            ..PgError::new(
                UNIQUE_VIOLATION,
                "duplicate key value violates unique constraint \"thetable_i_am_unique_col_unique\"",
            )
        }
    }

    #[test]
    fn unique_violation_uses_fields_and_detail() {
        let err = shared(unique_error());
        let got = PostgresClassifier.classify(&err);

        assert_eq!(
            got,
            Some(CanonicalError::UniqueViolation(UniqueViolation {
                schema: Some("public".into()),
                table: Some("theTable".into()),
                column: Some("i_am_unique_col".into()),
                constraint: Some("thetable_i_am_unique_col_unique".into()),
                db: DbError::new(err.clone(), Dialect::Postgres),
            }))
        );
    }

    #[test]
    fn unique_violation_with_composite_key() {
        let mut e = unique_error();
        e.detail = Some("Key (\"uniquePart1\", \"uniquePart2\")=(a, b) already exists.".into());
        let got = PostgresClassifier.classify(&shared(e)).unwrap();

        match got {
            CanonicalError::UniqueViolation(v) => {
                assert_eq!(v.column.as_deref(), Some("\"uniquePart1\", \"uniquePart2\""));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unique_violation_keeps_structured_fields_when_detail_is_unrecognized() {
        let mut e = unique_error();
        e.detail = Some("Schlüssel »(i)=(1)« existiert bereits.".into());
        let got = PostgresClassifier.classify(&shared(e)).unwrap();

        match got {
            CanonicalError::UniqueViolation(v) => {
                assert_eq!(v.column, None);
                assert_eq!(v.table.as_deref(), Some("theTable"));
                assert_eq!(v.schema.as_deref(), Some("public"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn not_null_violation() {
        let err = shared(PgError {
            schema: Some("public".into()),
            table: Some("theTable".into()),
            column: Some("not_null_col".into()),
            ..PgError::new(NOT_NULL_VIOLATION, "null value in column \"not_null_col\"")
        });

        assert_eq!(
            PostgresClassifier.classify(&err),
            Some(CanonicalError::NotNullViolation(NotNullViolation {
                schema: Some("public".into()),
                table: Some("theTable".into()),
                column: Some("not_null_col".into()),
                db: DbError::new(err.clone(), Dialect::Postgres),
            }))
        );
    }

    #[test]
    fn foreign_key_violation() {
        let err = shared(PgError {
            schema: Some("public".into()),
            table: Some("source".into()),
            constraint: Some("source_foreign_key_foreign".into()),
            detail: Some("Key (foreign_key)=(2) is not present in table \"target\".".into()),
            ..PgError::new(FOREIGN_KEY_VIOLATION, "insert or update violates foreign key")
        });

        assert_eq!(
            PostgresClassifier.classify(&err),
            Some(CanonicalError::ForeignKeyViolation(ForeignKeyViolation {
                schema: Some("public".into()),
                table: Some("source".into()),
                constraint: Some("source_foreign_key_foreign".into()),
                db: DbError::new(err.clone(), Dialect::Postgres),
            }))
        );
    }

    #[test]
    fn check_violation() {
        let err = shared(PgError {
            schema: Some("public".into()),
            table: Some("theTable".into()),
            constraint: Some("positive_amount".into()),
            ..PgError::new(CHECK_VIOLATION, "new row violates check constraint")
        });

        assert_eq!(
            PostgresClassifier.classify(&err),
            Some(CanonicalError::CheckViolation(CheckViolation {
                table: Some("theTable".into()),
                constraint: Some("positive_amount".into()),
                db: DbError::new(err.clone(), Dialect::Postgres),
            }))
        );
    }

    #[test]
    fn data_exception_class() {
        for code in ["22001", "22P02", "22003", "22007"] {
            let err = shared(PgError::new(code, "bad data"));
            assert_eq!(
                PostgresClassifier.classify(&err),
                Some(CanonicalError::Data(DataError {
                    db: DbError::new(err.clone(), Dialect::Postgres),
                })),
                "code {code}"
            );
        }
    }

    #[test]
    fn other_codes_are_not_interpreted() {
        for code in ["42601", "23P01", "23001", "08006", ""] {
            let err = shared(PgError::new(code, "nope"));
            assert_eq!(PostgresClassifier.classify(&err), None, "code {code}");
        }
    }

    #[test]
    fn empty_structured_fields_are_absent() {
        let err = shared(PgError {
            schema: Some(String::new()),
            table: Some("t".into()),
            ..PgError::new(NOT_NULL_VIOLATION, "null value")
        });
        match PostgresClassifier.classify(&err).unwrap() {
            CanonicalError::NotNullViolation(v) => {
                assert_eq!(v.schema, None);
                assert_eq!(v.table.as_deref(), Some("t"));
                assert_eq!(v.column, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
