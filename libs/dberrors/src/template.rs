//! Message templates: ordered regex lists that pull metadata out of free-text driver messages.
//!
//! A template binds its named capture groups to metadata fields by name. Only the groups
//! `schema`, `table`, `column` and `constraint` are bound; any other group (e.g. `value`,
//! `database`) documents the message shape and is ignored.

use crate::error::{
    CanonicalError, CheckViolation, DataError, DbError, ForeignKeyViolation, NotNullViolation,
    UniqueViolation,
};
use regex::Regex;

/// Metadata gathered for one error, before it is shaped into a violation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Metadata {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub constraint: Option<String>,
}

impl Metadata {
    /// Build the kind-specific violation. Fields the kind does not carry are dropped.
    pub fn unique(self, db: DbError) -> CanonicalError {
        CanonicalError::UniqueViolation(UniqueViolation {
            schema: self.schema,
            table: self.table,
            column: self.column,
            constraint: self.constraint,
            db,
        })
    }

    pub fn foreign_key(self, db: DbError) -> CanonicalError {
        CanonicalError::ForeignKeyViolation(ForeignKeyViolation {
            schema: self.schema,
            table: self.table,
            constraint: self.constraint,
            db,
        })
    }

    pub fn not_null(self, db: DbError) -> CanonicalError {
        CanonicalError::NotNullViolation(NotNullViolation {
            schema: self.schema,
            table: self.table,
            column: self.column,
            db,
        })
    }

    pub fn check(self, db: DbError) -> CanonicalError {
        CanonicalError::CheckViolation(CheckViolation {
            table: self.table,
            constraint: self.constraint,
            db,
        })
    }

    pub fn data(db: DbError) -> CanonicalError {
        CanonicalError::Data(DataError { db })
    }
}

/// Treat empty strings reported by a driver as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// One known message shape.
#[derive(Debug)]
pub(crate) struct Template {
    name: &'static str,
    regex: Regex,
}

impl Template {
    /// Compile a template. Patterns are fixed at build time, so a bad one is a bug.
    pub fn new(name: &'static str, pattern: &str) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid message template '{name}': {e}"));
        Self { name, regex }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Bind named groups to metadata, or `None` when the message has another shape.
    pub fn captures(&self, text: &str) -> Option<Metadata> {
        let caps = self.regex.captures(text)?;
        let group = |name: &str| non_empty(caps.name(name).map(|m| m.as_str()));
        Some(Metadata {
            schema: group("schema"),
            table: group("table"),
            column: group("column"),
            constraint: group("constraint"),
        })
    }
}

/// Templates for one violation kind, tried in declared order.
#[derive(Debug)]
pub(crate) struct TemplateSet {
    kind: &'static str,
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn new(kind: &'static str, templates: Vec<Template>) -> Self {
        Self { kind, templates }
    }

    /// First structural match wins; `None` if every template missed.
    pub fn extract(&self, text: &str) -> Option<Metadata> {
        for template in &self.templates {
            if let Some(meta) = template.captures(text) {
                tracing::trace!(kind = self.kind, template = template.name(), "message template matched");
                return Some(meta);
            }
        }
        None
    }

    /// Like [`TemplateSet::extract`], but a miss degrades to empty metadata.
    pub fn extract_or_default(&self, text: &str) -> Metadata {
        self.extract(text).unwrap_or_else(|| {
            tracing::debug!(
                kind = self.kind,
                message = text,
                "no message template matched; metadata left empty"
            );
            Metadata::default()
        })
    }
}
