use showdb::catalog::{Catalog, QualifiedName};
use showdb::executor::{Datum, ExecutionEngine};
use showdb::Error;
use std::sync::Arc;

fn engine() -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(Arc::new(Catalog::new()));
    engine.execute("CREATE DATABASE db; SET DATABASE = db").unwrap();
    engine
}

/// The DDL text of `SHOW CREATE TABLE|VIEW <name>`
fn show_create(engine: &mut ExecutionEngine, kind: &str, name: &str) -> String {
    let result = engine
        .execute(&format!("SHOW CREATE {} {}", kind, name))
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Datum::string(name));
    result.rows[0][1].to_string()
}

#[test]
fn test_rowid_table_has_no_primary_key_clause() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT NOT NULL, b INT NULL DEFAULT 5)")
        .unwrap();

    let result = engine.execute("SHOW CREATE TABLE t").unwrap();
    let names: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Table", "CreateTable"]);
    assert_eq!(
        show_create(&mut engine, "TABLE", "t"),
        "CREATE TABLE t (\n\ta INTEGER NOT NULL,\n\tb INTEGER NULL DEFAULT 5,\n\tFAMILY \"primary\" (a, b, rowid)\n)"
    );
}

#[test]
fn test_explicit_primary_key_clause() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE users (id INT PRIMARY KEY, name TEXT NOT NULL)")
        .unwrap();
    assert_eq!(
        show_create(&mut engine, "TABLE", "users"),
        "CREATE TABLE users (\n\tid INTEGER NOT NULL,\n\tname TEXT NOT NULL,\n\
         \tCONSTRAINT \"primary\" PRIMARY KEY (id),\n\tFAMILY \"primary\" (id, name)\n)"
    );
}

#[test]
fn test_written_name_is_kept() {
    let mut engine = engine();
    engine.execute("CREATE TABLE t (a INT)").unwrap();
    let result = engine.execute("SHOW CREATE TABLE db.t").unwrap();
    assert_eq!(result.rows[0][0], Datum::string("db.t"));
    assert!(result.rows[0][1].to_string().starts_with("CREATE TABLE db.t ("));
}

#[test]
fn test_create_table_round_trip() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE t (
                id INT PRIMARY KEY,
                name TEXT NOT NULL,
                score INT DEFAULT 0 CHECK (score >= 0),
                email TEXT UNIQUE,
                INDEX by_name (name DESC, score) STORING (email),
                FAMILY f1 (id, name),
                FAMILY f2 (score, email)
            )",
        )
        .unwrap();

    let first = show_create(&mut engine, "TABLE", "t");
    engine.execute("DROP TABLE t").unwrap();
    engine.execute(&first).unwrap();
    let second = show_create(&mut engine, "TABLE", "t");
    assert_eq!(first, second);

    assert!(first.contains("\n\tINDEX by_name (name DESC, score) STORING (email)"));
    assert!(first.contains("\n\tUNIQUE INDEX t_email_key (email)"));
    assert!(first.contains("\n\tCONSTRAINT check_score CHECK (score >= 0)"));
    assert!(first.ends_with("\n\tFAMILY f1 (id, name),\n\tFAMILY f2 (score, email)\n)"));
}

#[test]
fn test_interleaved_round_trip() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE parent (id INT PRIMARY KEY); \
             CREATE TABLE child (pid INT, id INT, v INT, PRIMARY KEY (pid, id DESC)) \
             INTERLEAVE IN PARENT parent (pid)",
        )
        .unwrap();

    let first = show_create(&mut engine, "TABLE", "child");
    assert!(first.contains("CONSTRAINT \"primary\" PRIMARY KEY (pid, id DESC)"));
    assert!(first.ends_with("\n) INTERLEAVE IN PARENT parent (pid)"));

    engine.execute("DROP TABLE child").unwrap();
    engine.execute(&first).unwrap();
    assert_eq!(show_create(&mut engine, "TABLE", "child"), first);
}

#[test]
fn test_interleave_parent_in_other_database() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE DATABASE other; \
             CREATE TABLE other.parent (id INT PRIMARY KEY); \
             CREATE TABLE child (id INT, v INT, PRIMARY KEY (id)) \
             INTERLEAVE IN PARENT other.parent (id)",
        )
        .unwrap();
    let ddl = show_create(&mut engine, "TABLE", "child");
    assert!(ddl.ends_with(") INTERLEAVE IN PARENT other.parent (id)"));
}

#[test]
fn test_view_column_list_only_when_renamed() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT, b TEXT); CREATE VIEW v AS SELECT a, b FROM t")
        .unwrap();

    let result = engine.execute("SHOW CREATE VIEW v").unwrap();
    let names: Vec<_> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["View", "CreateView"]);
    assert_eq!(
        show_create(&mut engine, "VIEW", "v"),
        "CREATE VIEW v AS SELECT a, b FROM db.t"
    );

    engine
        .catalog()
        .update_table(&QualifiedName::new("db", "v"), |desc| {
            desc.columns[0].name = "x".to_string();
            Ok(())
        })
        .unwrap();
    assert_eq!(
        show_create(&mut engine, "VIEW", "v"),
        "CREATE VIEW v (x, b) AS SELECT a, b FROM db.t"
    );

    engine
        .execute("CREATE VIEW w (first, \"select\") AS SELECT a, b FROM t")
        .unwrap();
    assert_eq!(
        show_create(&mut engine, "VIEW", "w"),
        "CREATE VIEW w (first, \"select\") AS SELECT a, b FROM db.t"
    );
}

#[test]
fn test_view_readable_without_underlying_privileges() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE t (a INT); CREATE VIEW v AS SELECT a FROM t; \
             CREATE USER alice; GRANT SELECT ON v TO alice",
        )
        .unwrap();
    engine.set_user("alice");
    assert_eq!(
        show_create(&mut engine, "VIEW", "v"),
        "CREATE VIEW v AS SELECT a FROM db.t"
    );
    assert!(matches!(
        engine.execute("SHOW CREATE TABLE t"),
        Err(Error::PermissionDenied(_))
    ));
}

#[test]
fn test_malformed_view_definition() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT); CREATE VIEW v AS SELECT a FROM t")
        .unwrap();
    engine
        .catalog()
        .update_table(&QualifiedName::new("db", "v"), |desc| {
            desc.view_query = Some("SHOW TABLES".to_string());
            Ok(())
        })
        .unwrap();

    let err = engine.execute("SHOW CREATE VIEW v").unwrap_err();
    assert!(matches!(err, Error::MalformedStoredDefinition(_)));
    assert_eq!(
        err.to_string(),
        "failed to parse underlying query from view \"db.v\" as a select"
    );
    assert_eq!(engine.monitor().used(), 0);
}
