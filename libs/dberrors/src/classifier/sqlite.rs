//! SQLite: primary + extended result codes, metadata only in `sqlite3_errmsg` text.

use super::Classifier;
use crate::dialect::Dialect;
use crate::error::{CanonicalError, DbError, SharedError};
use crate::native::{find_in_chain, SqliteError};
use crate::template::{Metadata, Template, TemplateSet};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::LazyLock;

pub const SQLITE_TOOBIG: i32 = 18;
pub const SQLITE_CONSTRAINT: i32 = 19;
pub const SQLITE_MISMATCH: i32 = 20;

pub const SQLITE_CONSTRAINT_CHECK: i32 = 275;
pub const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
pub const SQLITE_CONSTRAINT_NOTNULL: i32 = 1299;
pub const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
pub const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
pub const SQLITE_CONSTRAINT_DATATYPE: i32 = 3091;

static UNIQUE: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "unique_violation",
        vec![
            Template::new(
                "single_column",
                r"UNIQUE constraint failed: (?P<table>[^.\s,]+)\.(?P<column>[^.\s,]+)$",
            ),
            // `t.a, t.b`: the column list is not a single column, keep the table only.
            Template::new(
                "multi_column",
                r"UNIQUE constraint failed: (?P<table>[^.\s,]+)\.[^.\s,]+(?:, [^.\s,]+\.[^.\s,]+)+$",
            ),
        ],
    )
});

static NOT_NULL: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "not_null_violation",
        vec![Template::new(
            "not_null",
            r"NOT NULL constraint failed: (?P<table>[^.\s,]+)\.(?P<column>[^.\s,]+)$",
        )],
    )
});

static CHECK: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "check_violation",
        // Unnamed checks report their expression instead of a name.
        vec![Template::new(
            "check",
            r"CHECK constraint failed: (?P<constraint>\w+)$",
        )],
    )
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteClassifier;

impl Classifier for SqliteClassifier {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn classify(&self, err: &SharedError) -> Option<CanonicalError> {
        let native = native_error(&**err)?;
        classify_native(&native, || DbError::new(err.clone(), Dialect::Sqlite))
    }
}

fn native_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<Cow<'a, SqliteError>> {
    if let Some(e) = find_in_chain::<SqliteError>(err) {
        return Some(Cow::Borrowed(e));
    }

    #[cfg(feature = "sqlite")]
    {
        use sqlx::sqlite::SqliteError as SqlxSqliteError;

        if let Some(e) = find_in_chain::<SqlxSqliteError>(err) {
            return Some(Cow::Owned(SqliteError::from(e)));
        }
        if let Some(e) = crate::native::find_sqlx_database_error(err, |db| {
            db.try_downcast_ref::<SqlxSqliteError>()
                .map(SqliteError::from)
        }) {
            return Some(Cow::Owned(e));
        }
    }

    None
}

fn classify_native(e: &SqliteError, db: impl FnOnce() -> DbError) -> Option<CanonicalError> {
    let message = e.message.as_str();

    if e.code == SQLITE_CONSTRAINT {
        match e.extended_code {
            SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => {
                return Some(UNIQUE.extract_or_default(message).unique(db()));
            }
            SQLITE_CONSTRAINT_NOTNULL => {
                return Some(NOT_NULL.extract_or_default(message).not_null(db()));
            }
            // SQLite does not name the table or constraint of a failed foreign key.
            SQLITE_CONSTRAINT_FOREIGNKEY => {
                return Some(Metadata::default().foreign_key(db()));
            }
            SQLITE_CONSTRAINT_CHECK => {
                return Some(CHECK.extract_or_default(message).check(db()));
            }
            _ => {}
        }
    }

    if e.extended_code == SQLITE_CONSTRAINT_DATATYPE
        || e.code == SQLITE_MISMATCH
        || e.code == SQLITE_TOOBIG
    {
        return Some(Metadata::data(db()));
    }

    None
}
