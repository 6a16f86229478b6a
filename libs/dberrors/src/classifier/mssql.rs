//! SQL Server (TDS): severity class + error number, metadata only in message text.
//!
//! Error 547 is shared by foreign key and check conflicts; the wording of the message picks
//! the kind before any metadata is extracted.

use super::Classifier;
use crate::dialect::Dialect;
use crate::error::{CanonicalError, DbError, SharedError};
use crate::native::{find_in_chain, MssqlError};
use crate::template::{Metadata, Template, TemplateSet};
use std::error::Error as StdError;
use std::sync::LazyLock;

/// Uniqueness errors are raised with severity 14.
pub const CLASS_UNIQUE: u8 = 14;
/// Everything else classified here is a severity 16 user error.
pub const CLASS_USER: u8 = 16;

pub const UNIQUE_CONSTRAINT: i32 = 2627;
pub const UNIQUE_INDEX: i32 = 2601;
pub const NULL_NOT_ALLOWED: i32 = 515;
pub const CONSTRAINT_CONFLICT: i32 = 547;
/// Default number of RAISERROR/THROW; only a null-insert message re-raised this way counts.
pub const USER_RAISED: i32 = 50000;

/// 241/242/245: conversion failures, 8152/2628: truncation, 8115: arithmetic overflow.
pub const DATA_EXCEPTIONS: [i32; 6] = [241, 242, 245, 8152, 2628, 8115];

static UNIQUE: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "unique_violation",
        vec![
            Template::new(
                "unique_constraint",
                r"Violation of (?:UNIQUE KEY|PRIMARY KEY) constraint '(?P<constraint>[^']+)'\. Cannot insert duplicate key in object '(?P<schema>[^'.]+)\.(?P<table>[^']+)'",
            ),
            Template::new(
                "unique_index",
                r"Cannot insert duplicate key row in object '(?P<schema>[^'.]+)\.(?P<table>[^']+)' with unique index '(?P<constraint>[^']+)'",
            ),
        ],
    )
});

static NOT_NULL: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "not_null_violation",
        vec![Template::new(
            "insert_null",
            r"Cannot insert the value NULL into column '(?P<column>[^']+)', table '(?P<database>[^'.]+)\.(?P<schema>[^'.]+)\.(?P<table>[^']+)'; column does not allow nulls\. (?:INSERT|UPDATE) fails\.",
        )],
    )
});

static FOREIGN_KEY_WORDING: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "foreign_key_wording",
        r"statement conflicted with the (?:FOREIGN KEY(?: SAME TABLE)?|REFERENCE) constraint",
    )
});

static CHECK_WORDING: LazyLock<Template> = LazyLock::new(|| {
    Template::new(
        "check_wording",
        r"statement conflicted with the CHECK constraint",
    )
});

static FOREIGN_KEY: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "foreign_key_violation",
        vec![
            Template::new(
                "insert_update",
                r#"The (?:INSERT|UPDATE) statement conflicted with the FOREIGN KEY(?: SAME TABLE)? constraint "(?P<constraint>[^"]+)"\. The conflict occurred in database "(?P<database>[^"]+)", table "(?P<schema>[^".]+)\.(?P<table>[^"]+)""#,
            ),
            Template::new(
                "delete_update_reference",
                r#"The (?:DELETE|UPDATE) statement conflicted with the REFERENCE constraint "(?P<constraint>[^"]+)"\. The conflict occurred in database "(?P<database>[^"]+)", table "(?P<schema>[^".]+)\.(?P<table>[^"]+)""#,
            ),
        ],
    )
});

static CHECK: LazyLock<TemplateSet> = LazyLock::new(|| {
    TemplateSet::new(
        "check_violation",
        vec![Template::new(
            "check",
            r#"The (?:INSERT|UPDATE) statement conflicted with the CHECK constraint "(?P<constraint>[^"]+)"\. The conflict occurred in database "(?P<database>[^"]+)", table "(?:(?P<schema>[^".]+)\.)?(?P<table>[^"]+)"(?:, column '(?P<column>[^']+)')?\."#,
        )],
    )
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlClassifier;

impl Classifier for MssqlClassifier {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn classify(&self, err: &SharedError) -> Option<CanonicalError> {
        let native = native_error(&**err)?;
        classify_native(native, || DbError::new(err.clone(), Dialect::Mssql))
    }
}

fn native_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a MssqlError> {
    find_in_chain::<MssqlError>(err)
}

fn is_class_and_number(e: &MssqlError, class: u8, number: i32) -> bool {
    e.class == class && e.number == number
}

fn classify_native(e: &MssqlError, db: impl FnOnce() -> DbError) -> Option<CanonicalError> {
    let message = e.message.as_str();

    if is_class_and_number(e, CLASS_UNIQUE, UNIQUE_CONSTRAINT)
        || is_class_and_number(e, CLASS_UNIQUE, UNIQUE_INDEX)
    {
        return Some(UNIQUE.extract_or_default(message).unique(db()));
    }

    if is_class_and_number(e, CLASS_USER, NULL_NOT_ALLOWED) {
        return Some(NOT_NULL.extract_or_default(message).not_null(db()));
    }

    if is_class_and_number(e, CLASS_USER, USER_RAISED) {
        return NOT_NULL.extract(message).map(|m| m.not_null(db()));
    }

    if is_class_and_number(e, CLASS_USER, CONSTRAINT_CONFLICT) {
        if FOREIGN_KEY_WORDING.is_match(message) {
            return Some(FOREIGN_KEY.extract_or_default(message).foreign_key(db()));
        }
        if CHECK_WORDING.is_match(message) {
            return Some(CHECK.extract_or_default(message).check(db()));
        }
        tracing::debug!(
            number = e.number,
            message,
            "constraint conflict wording not recognized"
        );
        return None;
    }

    if e.class == CLASS_USER && DATA_EXCEPTIONS.contains(&e.number) {
        return Some(Metadata::data(db()));
    }

    None
}
