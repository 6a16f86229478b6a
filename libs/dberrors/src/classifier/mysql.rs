//! MySQL / MariaDB: numeric server error codes, metadata only in message text.

use super::Classifier;
use crate::dialect::Dialect;
use crate::error::{CanonicalError, DbError, SharedError};
use crate::native::{find_in_chain, MySqlError};
use crate::template::{Metadata, Template, TemplateSet};
use std::borrow::Cow;
use std::error::Error as StdError;
use std::sync::LazyLock;

pub const ER_DUP_ENTRY: u16 = 1062;
pub const ER_DUP_ENTRY_AUTOINCREMENT_CASE: u16 = 1569;
pub const ER_DUP_ENTRY_WITH_KEY_NAME: u16 = 1586;

pub const ER_BAD_NULL_ERROR: u16 = 1048;
pub const ER_NO_DEFAULT_FOR_FIELD: u16 = 1364;

pub const ER_NO_REFERENCED_ROW: u16 = 1216;
pub const ER_ROW_IS_REFERENCED: u16 = 1217;
pub const ER_ROW_IS_REFERENCED_2: u16 = 1451;
pub const ER_NO_REFERENCED_ROW_2: u16 = 1452;

pub const ER_CHECK_CONSTRAINT_VIOLATED: u16 = 3819;
/// MariaDB's CHECK failure.
pub const ER_CONSTRAINT_FAILED: u16 = 4025;

pub const ER_WARN_DATA_OUT_OF_RANGE: u16 = 1264;
pub const WARN_DATA_TRUNCATED: u16 = 1265;
pub const ER_TRUNCATED_WRONG_VALUE: u16 = 1292;
pub const ER_TRUNCATED_WRONG_VALUE_FOR_FIELD: u16 = 1366;
pub const ER_DATA_TOO_LONG: u16 = 1406;

static UNIQUE: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "unique_violation",
        vec![
            // 8.0 qualifies the key with its table.
            Template::new(
                "duplicate_entry_qualified_key",
                r"Duplicate entry '(?P<value>.*)' for key '(?P<table>[^'.]+)\.(?P<constraint>[^']+)'",
            ),
            Template::new(
                "duplicate_entry",
                r"Duplicate entry '(?P<value>.*)' for key '(?P<constraint>[^']+)'",
            ),
        ],
    )
});

static NOT_NULL: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "not_null_violation",
        vec![
            Template::new("bad_null", r"Column '(?P<column>[^']+)' cannot be null"),
            Template::new(
                "no_default_for_field",
                r"Field '(?P<column>[^']+)' doesn't have a default value",
            ),
        ],
    )
});

static FOREIGN_KEY: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "foreign_key_violation",
        vec![Template::new(
            "row_reference",
            r"Cannot (?:add|delete) or update a (?:parent|child) row: a foreign key constraint fails \(`(?P<schema>[^`]+)`\.`(?P<table>[^`]+)`, CONSTRAINT `(?P<constraint>[^`]+)`",
        )],
    )
});

static CHECK: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "check_violation",
        vec![
            Template::new(
                "check_constraint_violated",
                r"Check constraint '(?P<constraint>[^']+)' is violated",
            ),
            Template::new(
                "constraint_failed",
                r"CONSTRAINT `(?P<constraint>[^`]+)` failed for `(?P<schema>[^`]+)`\.`(?P<table>[^`]+)`",
            ),
        ],
    )
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlClassifier;

impl Classifier for MySqlClassifier {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn classify(&self, err: &SharedError) -> Option<CanonicalError> {
        let native = native_error(&**err)?;
        classify_native(&native, || DbError::new(err.clone(), Dialect::MySql))
    }
}

fn native_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<Cow<'a, MySqlError>> {
    if let Some(e) = find_in_chain::<MySqlError>(err) {
        return Some(Cow::Borrowed(e));
    }

    #[cfg(feature = "mysql")]
    {
        use sqlx::mysql::MySqlDatabaseError;

        if let Some(e) = find_in_chain::<MySqlDatabaseError>(err) {
            return Some(Cow::Owned(MySqlError::from(e)));
        }
        if let Some(e) = crate::native::find_sqlx_database_error(err, |db| {
            db.try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlError::from)
        }) {
            return Some(Cow::Owned(e));
        }
    }

    None
}

fn classify_native(e: &MySqlError, db: impl FnOnce() -> DbError) -> Option<CanonicalError> {
    let message = e.message.as_str();

    match e.number {
        ER_DUP_ENTRY | ER_DUP_ENTRY_AUTOINCREMENT_CASE | ER_DUP_ENTRY_WITH_KEY_NAME => {
            Some(UNIQUE.extract_or_default(message).unique(db()))
        }
        ER_BAD_NULL_ERROR | ER_NO_DEFAULT_FOR_FIELD => {
            Some(NOT_NULL.extract_or_default(message).not_null(db()))
        }
        // ER_NO_REFERENCED_ROW / ER_ROW_IS_REFERENCED carry no table or constraint; they show
        // up when the user lacks privileges on the parent table.
        ER_NO_REFERENCED_ROW
        | ER_ROW_IS_REFERENCED
        | ER_ROW_IS_REFERENCED_2
        | ER_NO_REFERENCED_ROW_2 => Some(FOREIGN_KEY.extract_or_default(message).foreign_key(db())),
        ER_CHECK_CONSTRAINT_VIOLATED | ER_CONSTRAINT_FAILED => {
            Some(CHECK.extract_or_default(message).check(db()))
        }
        ER_DATA_TOO_LONG
        | ER_TRUNCATED_WRONG_VALUE
        | ER_TRUNCATED_WRONG_VALUE_FOR_FIELD
        | ER_WARN_DATA_OUT_OF_RANGE
        | WARN_DATA_TRUNCATED => Some(Metadata::data(db())),
        _ => None,
    }
}
