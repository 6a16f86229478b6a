//! Per-dialect classifiers.
//!
//! Every classifier follows the same contract: a type gate that finds the dialect's native
//! error in the input's `source()` chain, then rules evaluated in a fixed priority order
//! (unique → not null → foreign key → check → data). The first matching rule wins.

use crate::dialect::Dialect;
use crate::error::{CanonicalError, SharedError};

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mssql::MssqlClassifier;
pub use mysql::MySqlClassifier;
pub use postgres::PostgresClassifier;
pub use sqlite::SqliteClassifier;

/// Classifies errors of one dialect.
pub trait Classifier: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// `None` when `err` is not this dialect's native error or matches no rule.
    fn classify(&self, err: &SharedError) -> Option<CanonicalError>;
}
