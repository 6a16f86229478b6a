use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

use dberrors::{
    classify, CanonicalError, DataError, Dialect, ForeignKeyViolation, MssqlError, MySqlError,
    PgError, SharedError, SqliteError, UniqueViolation, ViolationKind,
};

fn shared<E: StdError + Send + Sync + 'static>(err: E) -> SharedError {
    Arc::new(err)
}

fn native_errors() -> Vec<(Dialect, SharedError)> {
    vec![
        (
            Dialect::Postgres,
            shared(PgError {
                detail: Some("Key (i_am_unique_col)=(1) already exists.".into()),
                schema: Some("public".into()),
                table: Some("theTable".into()),
                constraint: Some("thetable_i_am_unique_col_unique".into()),
                ..PgError::new("23505", "duplicate key value violates unique constraint")
            }),
        ),
        (
            Dialect::MySql,
            shared(MySqlError::new(
                1062,
                "Duplicate entry '2' for key 'thetable_i_am_unique_col_unique'",
            )),
        ),
        (
            Dialect::Sqlite,
            shared(SqliteError::new(
                2067,
                "UNIQUE constraint failed: theTable.i_am_unique_col",
            )),
        ),
        (
            Dialect::Mssql,
            shared(MssqlError::new(
                16,
                547,
                r#"The INSERT statement conflicted with the FOREIGN KEY constraint "source_foreign_key_foreign". The conflict occurred in database "db", table "dbo.target", column 'id'."#,
            )),
        ),
    ]
}

#[test]
fn postgres_unique_violation() {
    let (dialect, err) = native_errors().remove(0);
    assert_eq!(
        classify(dialect, &err),
        Some(CanonicalError::UniqueViolation(UniqueViolation {
            schema: Some("public".into()),
            table: Some("theTable".into()),
            column: Some("i_am_unique_col".into()),
            constraint: Some("thetable_i_am_unique_col_unique".into()),
            db: dberrors::DbError::new(err.clone(), Dialect::Postgres),
        }))
    );
}

#[test]
fn mysql_unique_violation_constraint_only() {
    let (dialect, err) = native_errors().remove(1);
    match classify(dialect, &err) {
        Some(CanonicalError::UniqueViolation(v)) => {
            assert_eq!(
                v.constraint.as_deref(),
                Some("thetable_i_am_unique_col_unique")
            );
            assert_eq!(v.table, None);
            assert_eq!(v.schema, None);
            assert_eq!(v.column, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn sqlite_unique_violation_table_and_column() {
    let (dialect, err) = native_errors().remove(2);
    match classify(dialect, &err) {
        Some(CanonicalError::UniqueViolation(v)) => {
            assert_eq!(v.table.as_deref(), Some("theTable"));
            assert_eq!(v.column.as_deref(), Some("i_am_unique_col"));
            assert_eq!(v.constraint, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn mssql_foreign_key_violation() {
    let (dialect, err) = native_errors().remove(3);
    assert_eq!(
        classify(dialect, &err),
        Some(CanonicalError::ForeignKeyViolation(ForeignKeyViolation {
            schema: Some("dbo".into()),
            table: Some("target".into()),
            constraint: Some("source_foreign_key_foreign".into()),
            db: dberrors::DbError::new(err.clone(), Dialect::Mssql),
        }))
    );
}

#[test]
fn syntax_errors_have_no_interpretation() {
    let syntax: Vec<(Dialect, SharedError)> = vec![
        (
            Dialect::Postgres,
            shared(PgError::new("42601", "syntax error at or near \"SELEC\"")),
        ),
        (
            Dialect::MySql,
            shared(MySqlError::new(1064, "You have an error in your SQL syntax")),
        ),
        (
            Dialect::Sqlite,
            shared(SqliteError::new(1, "near \"SELEC\": syntax error")),
        ),
        (
            Dialect::Mssql,
            shared(MssqlError::new(15, 102, "Incorrect syntax near 'SELEC'.")),
        ),
    ];
    for (dialect, err) in syntax {
        assert_eq!(classify(dialect, &err), None, "{dialect}");
    }
}

#[test]
fn postgres_data_exception() {
    let err: SharedError = shared(PgError::new("22P02", "invalid input syntax for type integer"));
    assert_eq!(
        classify(Dialect::Postgres, &err),
        Some(CanonicalError::Data(DataError {
            db: dberrors::DbError::new(err.clone(), Dialect::Postgres),
        }))
    );
}

#[test]
fn non_native_errors_are_absent_for_every_dialect() {
    let foreign: Vec<SharedError> = vec![
        shared(io::Error::other("connection reset")),
        shared(fmt::Error),
    ];
    for dialect in Dialect::ALL {
        for err in &foreign {
            assert_eq!(classify(dialect, err), None, "{dialect}");
        }
    }

    // Each dialect's native error is foreign to every other dialect.
    for (native_dialect, err) in native_errors() {
        for dialect in Dialect::ALL.into_iter().filter(|d| *d != native_dialect) {
            assert_eq!(classify(dialect, &err), None, "{native_dialect} as {dialect}");
        }
    }
}

#[test]
fn classification_is_deterministic() {
    for (dialect, err) in native_errors() {
        let first = classify(dialect, &err);
        for _ in 0..3 {
            assert_eq!(classify(dialect, &err), first);
        }
    }
}

#[test]
fn original_error_is_returned_by_identity() {
    for (dialect, err) in native_errors() {
        let canonical = classify(dialect, &err).expect("classified");
        assert!(Arc::ptr_eq(canonical.original(), &err));
        assert_eq!(canonical.dialect(), dialect);

        let source = canonical.source().expect("source chain");
        let inner = source.source().expect("original behind DbError");
        assert_eq!(inner.to_string(), err.to_string());
    }
}

#[test]
fn equal_content_different_identity_is_not_equal() {
    let a: SharedError = shared(PgError::new("22001", "value too long"));
    let b: SharedError = shared(PgError::new("22001", "value too long"));
    assert_ne!(
        classify(Dialect::Postgres, &a),
        classify(Dialect::Postgres, &b)
    );
}

#[test]
fn richer_messages_never_lose_fields() {
    let bare: SharedError = shared(MySqlError::new(
        1062,
        "Duplicate entry '2' for key 'uq_email'",
    ));
    let qualified: SharedError = shared(MySqlError::new(
        1062,
        "Duplicate entry '2' for key 'users.uq_email'",
    ));

    let (Some(CanonicalError::UniqueViolation(bare)), Some(CanonicalError::UniqueViolation(rich))) = (
        classify(Dialect::MySql, &bare),
        classify(Dialect::MySql, &qualified),
    ) else {
        panic!("both must be unique violations");
    };
    assert_eq!(bare.constraint, rich.constraint);
    assert!(bare.table.is_none() && rich.table.is_some());
}

#[test]
fn unrecognized_message_degrades_to_empty_metadata() {
    let cases: Vec<(Dialect, SharedError, ViolationKind)> = vec![
        (
            Dialect::MySql,
            shared(MySqlError::new(1062, "duplicate, reworded by a future server")),
            ViolationKind::UniqueViolation,
        ),
        (
            Dialect::Sqlite,
            shared(SqliteError::new(1299, "constraint failed")),
            ViolationKind::NotNullViolation,
        ),
        (
            Dialect::Mssql,
            shared(MssqlError::new(16, 515, "NULL not allowed")),
            ViolationKind::NotNullViolation,
        ),
    ];
    for (dialect, err, kind) in cases {
        let canonical = classify(dialect, &err).expect("classified");
        assert_eq!(canonical.kind(), kind, "{dialect}");
        let rendered = serde_json::to_value(&canonical).unwrap();
        for field in ["schema", "table", "column", "constraint"] {
            assert!(rendered.get(field).is_none(), "{dialect} {field}");
        }
    }
}

#[test]
fn shared_code_picks_kind_by_wording() {
    let fk: SharedError = shared(MssqlError::new(
        16,
        547,
        r#"The DELETE statement conflicted with the REFERENCE constraint "fk_orders_users". The conflict occurred in database "shop", table "dbo.orders", column 'user_id'."#,
    ));
    let check: SharedError = shared(MssqlError::new(
        16,
        547,
        r#"The INSERT statement conflicted with the CHECK constraint "ck_amount". The conflict occurred in database "shop", table "dbo.orders", column 'amount'."#,
    ));
    assert_eq!(
        classify(Dialect::Mssql, &fk).map(|c| c.kind()),
        Some(ViolationKind::ForeignKeyViolation)
    );
    assert_eq!(
        classify(Dialect::Mssql, &check).map(|c| c.kind()),
        Some(ViolationKind::CheckViolation)
    );
}

#[test]
fn code_outranks_a_later_rules_wording() {
    // Unique codes carrying foreign key / not-null text stay unique, with no metadata bound.
    let mssql: SharedError = shared(MssqlError::new(
        14,
        2627,
        r#"The INSERT statement conflicted with the FOREIGN KEY constraint "fk". The conflict occurred in database "db", table "dbo.target", column 'id'."#,
    ));
    let mysql: SharedError = shared(MySqlError::new(1062, "Column 'x' cannot be null"));
    let sqlite: SharedError = shared(SqliteError::new(
        2067,
        "NOT NULL constraint failed: users.email",
    ));

    for (dialect, err) in [
        (Dialect::Mssql, mssql),
        (Dialect::MySql, mysql),
        (Dialect::Sqlite, sqlite),
    ] {
        let canonical = classify(dialect, &err).expect("classified");
        assert_eq!(
            canonical.kind(),
            ViolationKind::UniqueViolation,
            "{dialect}"
        );
        match canonical {
            CanonicalError::UniqueViolation(v) => {
                assert_eq!(v.column, None, "{dialect}");
                assert_eq!(v.constraint, None, "{dialect}");
            }
            other => panic!("{dialect}: unexpected {other:?}"),
        }
    }
}

#[derive(Debug)]
struct QueryFailed {
    query: &'static str,
    cause: PgError,
}

impl fmt::Display for QueryFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed: {}", self.query)
    }
}

impl StdError for QueryFailed {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

#[test]
fn native_error_behind_application_wrapper() {
    let err: SharedError = shared(QueryFailed {
        query: "insert into users",
        cause: PgError {
            table: Some("users".into()),
            column: Some("email".into()),
            ..PgError::new("23502", "null value in column \"email\"")
        },
    });

    let canonical = classify(Dialect::Postgres, &err).expect("classified");
    assert_eq!(canonical.kind(), ViolationKind::NotNullViolation);
    assert!(Arc::ptr_eq(canonical.original(), &err));
}

#[test]
fn serializes_as_tagged_record() -> anyhow::Result<()> {
    let (dialect, err) = native_errors().remove(2);
    let canonical = classify(dialect, &err).expect("classified");
    let json = serde_json::to_value(&canonical)?;

    assert_eq!(json["kind"], "unique_violation");
    assert_eq!(json["table"], "theTable");
    assert_eq!(json["column"], "i_am_unique_col");
    assert_eq!(json["error"]["dialect"], "sqlite");
    assert!(json.get("constraint").is_none());
    Ok(())
}

#[test]
fn classifies_from_many_threads() {
    let errors = native_errors();
    std::thread::scope(|s| {
        for (dialect, err) in &errors {
            s.spawn(move || {
                for _ in 0..50 {
                    assert!(classify(*dialect, err).is_some());
                }
            });
        }
    });
}
