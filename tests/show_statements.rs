use showdb::catalog::{Catalog, QualifiedName, Validity};
use showdb::executor::{Datum, ExecutionEngine, QueryResult};
use showdb::{Config, Error};
use std::sync::Arc;

fn engine() -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(Arc::new(Catalog::new()));
    engine.execute("CREATE DATABASE db; SET DATABASE = db").unwrap();
    engine
}

fn column_names(result: &QueryResult) -> Vec<&str> {
    result.columns.iter().map(|c| c.name.as_str()).collect()
}

fn first_column(result: &QueryResult) -> Vec<String> {
    result.rows.iter().map(|r| r[0].to_string()).collect()
}

fn s(value: &str) -> Datum {
    Datum::string(value)
}

#[test]
fn test_show_all_matches_individual_variables() {
    let mut engine = engine();
    engine.execute("SET TIME ZONE = 'America/New_York'").unwrap();

    let all = engine.execute("SHOW ALL").unwrap();
    assert_eq!(column_names(&all), vec!["Variable", "Value"]);
    let names = first_column(&all);
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    for row in &all.rows {
        let name = row[0].to_string();
        let single = engine.execute(&format!("SHOW {}", name)).unwrap();
        assert_eq!(column_names(&single), vec![name.as_str()]);
        assert_eq!(single.rows, vec![vec![row[1].clone()]], "variable {}", name);
    }
}

#[test]
fn test_show_variable_values() {
    let mut engine = engine();
    let result = engine.execute("SHOW database").unwrap();
    assert_eq!(column_names(&result), vec!["DATABASE"]);
    assert_eq!(result.rows, vec![vec![s("db")]]);

    let result = engine.execute("SHOW SEARCH_PATH").unwrap();
    assert_eq!(result.rows, vec![vec![s("pg_catalog")]]);

    let err = engine.execute("SHOW nonsense").unwrap_err();
    assert!(matches!(err, Error::UnknownVariable(ref name) if name == "NONSENSE"));
}

#[test]
fn test_show_columns() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT NOT NULL, b INT NULL DEFAULT 5)")
        .unwrap();

    let result = engine.execute("SHOW COLUMNS FROM t").unwrap();
    assert_eq!(column_names(&result), vec!["Field", "Type", "Null", "Default"]);
    assert_eq!(
        result.rows,
        vec![
            vec![s("a"), s("INTEGER"), Datum::Bool(false), Datum::Null],
            vec![s("b"), s("INTEGER"), Datum::Bool(true), s("5")],
        ]
    );
}

#[test]
fn test_show_tables_and_databases() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE zebra (a INT); CREATE TABLE apple (a INT); CREATE DATABASE other")
        .unwrap();

    let result = engine.execute("SHOW TABLES").unwrap();
    assert_eq!(column_names(&result), vec!["Table"]);
    assert_eq!(first_column(&result), vec!["apple", "zebra"]);

    let result = engine.execute("SHOW TABLES FROM other").unwrap();
    assert!(result.rows.is_empty());

    let result = engine.execute("SHOW DATABASES").unwrap();
    let names = first_column(&result);
    assert!(names.contains(&"db".to_string()));
    assert!(names.contains(&"other".to_string()));
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_missing_objects() {
    let mut engine = engine();
    let err = engine.execute("SHOW TABLES FROM missingdb").unwrap_err();
    assert!(matches!(err, Error::UndefinedDatabase(ref db) if db == "missingdb"));
    assert_eq!(err.to_string(), "database \"missingdb\" does not exist");

    let err = engine.execute("SHOW COLUMNS FROM db.nosuchtable").unwrap_err();
    assert!(matches!(err, Error::UndefinedTable(ref t) if t == "db.nosuchtable"));

    for sql in [
        "SHOW INDEX FROM db.nosuchtable",
        "SHOW CONSTRAINTS FROM db.nosuchtable",
        "SHOW CREATE TABLE db.nosuchtable",
    ] {
        let err = engine.execute(sql).unwrap_err();
        assert!(
            matches!(err, Error::UndefinedTable(ref t) if t == "db.nosuchtable"),
            "{}: {}",
            sql,
            err
        );
    }

    let err = engine.execute("SHOW COLUMNS FROM missingdb.t").unwrap_err();
    assert!(matches!(err, Error::UndefinedDatabase(ref db) if db == "missingdb"));

    let err = engine.execute("SHOW INDEX FROM missingdb.t").unwrap_err();
    assert!(matches!(err, Error::UndefinedDatabase(_)));

    let mut fresh = ExecutionEngine::new(Arc::new(Catalog::new()));
    assert!(matches!(fresh.execute("SHOW TABLES"), Err(Error::NoDatabase)));
}

#[test]
fn test_show_grants_ordering_and_filter() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE t (a INT); CREATE USER alice; CREATE USER bob; CREATE USER carol; \
             GRANT SELECT, INSERT ON TABLE t TO alice; GRANT SELECT ON t TO bob; \
             GRANT DELETE ON t TO carol",
        )
        .unwrap();

    let result = engine.execute("SHOW GRANTS ON t FOR alice, bob").unwrap();
    assert_eq!(column_names(&result), vec!["Table", "User", "Privileges"]);
    assert_eq!(
        result.rows,
        vec![
            vec![s("t"), s("alice"), s("INSERT")],
            vec![s("t"), s("alice"), s("SELECT")],
            vec![s("t"), s("bob"), s("SELECT")],
        ]
    );

    let result = engine.execute("SHOW GRANTS ON t").unwrap();
    let users: Vec<_> = result.rows.iter().map(|r| r[1].to_string()).collect();
    assert_eq!(users, vec!["alice", "alice", "bob", "carol", "root"]);
}

#[test]
fn test_show_grants_on_database() {
    let mut engine = engine();
    engine
        .execute("CREATE USER alice; GRANT CREATE ON DATABASE db TO alice")
        .unwrap();

    let result = engine.execute("SHOW GRANTS ON DATABASE db").unwrap();
    assert_eq!(column_names(&result), vec!["Database", "User", "Privileges"]);
    assert_eq!(
        result.rows,
        vec![
            vec![s("db"), s("alice"), s("CREATE")],
            vec![s("db"), s("root"), s("ALL")],
        ]
    );

    let err = engine.execute("SHOW GRANTS ON DATABASE db, missingdb").unwrap_err();
    assert!(matches!(err, Error::UndefinedDatabase(ref db) if db == "missingdb"));
}

#[test]
fn test_show_index() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT, b INT, c INT, INDEX ab (a, b DESC) STORING (c))")
        .unwrap();

    let result = engine.execute("SHOW INDEX FROM t").unwrap();
    assert_eq!(
        column_names(&result),
        vec!["Table", "Name", "Unique", "Seq", "Column", "Direction", "Storing"]
    );
    assert_eq!(
        result.rows,
        vec![
            vec![s("t"), s("primary"), Datum::Bool(true), Datum::Int(1), s("rowid"), s("ASC"), Datum::Bool(false)],
            vec![s("t"), s("ab"), Datum::Bool(false), Datum::Int(1), s("a"), s("ASC"), Datum::Bool(false)],
            vec![s("t"), s("ab"), Datum::Bool(false), Datum::Int(2), s("b"), s("DESC"), Datum::Bool(false)],
            vec![s("t"), s("ab"), Datum::Bool(false), Datum::Int(3), s("c"), s("N/A"), Datum::Bool(true)],
        ]
    );
}

#[test]
fn test_show_constraints() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE p (id INT PRIMARY KEY); \
             CREATE TABLE c (id INT PRIMARY KEY, pid INT REFERENCES p, v INT UNIQUE, \
             CONSTRAINT positive CHECK (v > 0))",
        )
        .unwrap();

    let result = engine.execute("SHOW CONSTRAINTS FROM c").unwrap();
    assert_eq!(
        column_names(&result),
        vec!["Table", "Name", "Type", "Column(s)", "Details"]
    );
    let names = result.rows.iter().map(|r| r[1].to_string()).collect::<Vec<_>>();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    let by_name = |name: &str| {
        result
            .rows
            .iter()
            .find(|r| r[1] == s(name))
            .cloned()
            .unwrap_or_else(|| panic!("no constraint {}", name))
    };
    assert_eq!(
        by_name("primary"),
        vec![s("c"), s("primary"), s("PRIMARY KEY"), s("id"), Datum::Null]
    );
    assert_eq!(by_name("c_v_key")[2], s("UNIQUE"));
    assert_eq!(by_name("positive")[2], s("CHECK"));
    assert_eq!(by_name("positive")[4], s("v > 0"));
    assert_eq!(by_name("fk_pid_ref_p")[2], s("FOREIGN KEY"));
}

#[test]
fn test_show_constraints_marks_unvalidated() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (v INT, CONSTRAINT pos CHECK (v > 0))")
        .unwrap();
    engine
        .catalog()
        .update_table(&QualifiedName::new("db", "t"), |desc| {
            desc.checks[0].validity = Validity::Unvalidated;
            Ok(())
        })
        .unwrap();

    let result = engine.execute("SHOW CONSTRAINTS FROM t").unwrap();
    let pos = result
        .rows
        .iter()
        .find(|r| r[1] == s("pos"))
        .cloned()
        .unwrap();
    assert_eq!(
        pos,
        vec![s("t"), s("pos"), s("CHECK (UNVALIDATED)"), Datum::Null, s("v > 0")]
    );
}

#[test]
fn test_wrong_object_type() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT); CREATE VIEW v AS SELECT a FROM t")
        .unwrap();

    for sql in ["SHOW INDEX FROM v", "SHOW CONSTRAINTS FROM v", "SHOW CREATE TABLE v"] {
        let err = engine.execute(sql).unwrap_err();
        assert!(
            matches!(err, Error::WrongObjectType { expected: "table", .. }),
            "{}: {}",
            sql,
            err
        );
    }
    let err = engine.execute("SHOW CREATE VIEW t").unwrap_err();
    assert!(matches!(err, Error::WrongObjectType { expected: "view", .. }));
}

#[test]
fn test_non_root_visibility() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (a INT); CREATE TABLE secret (a INT); CREATE USER alice")
        .unwrap();
    engine.set_user("alice");

    assert!(matches!(
        engine.execute("SHOW COLUMNS FROM t"),
        Err(Error::PermissionDenied(_))
    ));
    assert!(matches!(
        engine.execute("SHOW CREATE TABLE t"),
        Err(Error::PermissionDenied(_))
    ));
    assert!(matches!(engine.execute("SHOW USERS"), Err(Error::PermissionDenied(_))));
    let tables = engine.execute("SHOW TABLES").unwrap();
    assert!(!first_column(&tables).contains(&"t".to_string()));

    engine.set_user("root");
    engine.execute("GRANT SELECT ON t TO alice").unwrap();
    engine.set_user("alice");

    let columns = engine.execute("SHOW COLUMNS FROM t").unwrap();
    assert_eq!(first_column(&columns), vec!["a"]);
    let tables = engine.execute("SHOW TABLES").unwrap();
    assert_eq!(first_column(&tables), vec!["t"]);
    assert!(engine.execute("SHOW INDEX FROM t").is_ok());
    assert!(matches!(
        engine.execute("SHOW INDEX FROM secret"),
        Err(Error::PermissionDenied(_))
    ));
}

#[test]
fn test_show_users() {
    let mut engine = engine();
    engine.execute("CREATE USER zoe; CREATE USER alice").unwrap();
    let result = engine.execute("SHOW USERS").unwrap();
    assert_eq!(column_names(&result), vec!["username"]);
    assert_eq!(first_column(&result), vec!["alice", "root", "zoe"]);
}

#[test]
fn test_help() {
    let mut engine = engine();
    let result = engine.execute("HELP substr").unwrap();
    assert_eq!(
        column_names(&result),
        vec!["Function", "Signature", "Category", "Details"]
    );
    assert_eq!(result.rows.len(), 2);
    assert!(result.rows.iter().all(|r| r[0] == s("substr")));

    let result = engine.execute("HELP nosuchfunction").unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn test_memory_released_after_errors() {
    let catalog = Arc::new(Catalog::new());
    let config = Config::new().default_database("db").max_result_memory(256);
    let mut engine = ExecutionEngine::with_config(catalog.clone(), &config).unwrap();
    engine.execute("CREATE DATABASE db").unwrap();

    let err = engine.execute("SHOW ALL").unwrap_err();
    assert!(matches!(err, Error::MemoryBudgetExceeded { .. }));
    assert_eq!(engine.monitor().used(), 0);

    assert!(engine.execute("SHOW COLUMNS FROM missing").is_err());
    assert_eq!(engine.monitor().used(), 0);

    engine.execute("SHOW DATABASE").unwrap();
    assert_eq!(engine.monitor().used(), 0);
}

#[test]
fn test_prepare_reports_columns_without_reading() {
    let mut engine = engine();
    let columns = engine.prepare("SHOW COLUMNS FROM nosuchtable").unwrap();
    let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Field", "Type", "Null", "Default"]);

    assert!(matches!(
        engine.prepare("SHOW nonsense"),
        Err(Error::UnknownVariable(_))
    ));
}
